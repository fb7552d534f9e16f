//! Fixtures and fakes for reconciliation scenarios.
//!
//! - [`CounterFileBuilder`] writes counter exports in the device's format.
//! - [`FixtureDir`] lays counter, sheet and reference files out on disk.
//! - [`run_pipeline`] drives both parsers and the reconciler the way the CLI does.
//! - [`InMemoryBackOffice`] stands in for the HTTP back office.

use anyhow::{Context, Result};
use ccr_config::LoadedConfig;
use ccr_counter::{parse_counter_file, CounterLayout, DEFAULT_DENOMINATIONS, DENOMINATION_SLOTS};
use ccr_reconcile::{reconcile, ReconcileOptions, ReconcileReport};
use ccr_schemas::{Denomination, ReferenceDirectory};
use ccr_sheet::{parse_sheet_file, DetectionRules};
use std::fs;
use std::path::{Path, PathBuf};

mod back_office;

pub use back_office::InMemoryBackOffice;

/// Builds a counter export line by line.
///
/// Bill counts are given per denomination; slots not mentioned are zero.
#[derive(Debug, Clone)]
pub struct CounterFileBuilder {
    denominations: [Denomination; DENOMINATION_SLOTS],
    lines: Vec<String>,
}

impl Default for CounterFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterFileBuilder {
    pub fn new() -> Self {
        Self::with_denominations(DEFAULT_DENOMINATIONS)
    }

    pub fn with_denominations(denominations: [Denomination; DENOMINATION_SLOTS]) -> Self {
        Self {
            denominations,
            lines: Vec::new(),
        }
    }

    /// Append a data line. Unknown denominations are ignored.
    pub fn machine(
        mut self,
        serial: &str,
        internal_id: &str,
        physical: &[(Denomination, i64)],
        virtual_: &[(Denomination, i64)],
    ) -> Self {
        let mut fields: Vec<String> = vec![
            "D".to_string(),
            serial.to_string(),
            internal_id.to_string(),
            "01/03/2024".to_string(),
            "09:00".to_string(),
        ];
        fields.extend(self.slots(physical));
        fields.extend(self.slots(virtual_));
        self.lines.push(fields.join(";"));
        self
    }

    /// Append a raw line verbatim (malformed input, comments, blanks).
    pub fn raw(mut self, line: &str) -> Self {
        self.lines.push(line.to_string());
        self
    }

    fn slots(&self, counts: &[(Denomination, i64)]) -> Vec<String> {
        self.denominations
            .iter()
            .map(|d| {
                counts
                    .iter()
                    .filter(|(denom, _)| denom == d)
                    .map(|(_, n)| n)
                    .sum::<i64>()
                    .to_string()
            })
            .collect()
    }

    pub fn build(&self) -> String {
        let header: Vec<String> = std::iter::once("H".to_string())
            .chain(self.denominations.iter().map(|d| d.to_string()))
            .collect();
        let mut out = header.join(";");
        out.push('\n');
        for l in &self.lines {
            out.push_str(l);
            out.push('\n');
        }
        out
    }
}

/// A temp directory holding one scenario's input files.
pub struct FixtureDir {
    dir: tempfile::TempDir,
}

impl FixtureDir {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir().context("create fixture dir")?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, name: &str, contents: impl AsRef<[u8]>) -> Result<PathBuf> {
        let p = self.dir.path().join(name);
        fs::write(&p, contents).with_context(|| format!("write fixture {}", p.display()))?;
        Ok(p)
    }

    pub fn write_reference(&self, name: &str, dir: &ReferenceDirectory) -> Result<PathBuf> {
        let s = serde_json::to_string_pretty(dir).context("serialize reference directory")?;
        self.write(name, s)
    }
}

pub fn load_reference_json(path: &Path) -> Result<ReferenceDirectory> {
    let s = fs::read_to_string(path)
        .with_context(|| format!("read reference: {}", path.display()))?;
    serde_json::from_str(&s).context("parse reference json")
}

/// Parse both inputs from disk and reconcile them, reading every tunable
/// from `config` exactly as the CLI does.
pub fn run_pipeline(
    counter: &Path,
    sheet: &Path,
    directory: &ReferenceDirectory,
    config: &LoadedConfig,
) -> Result<ReconcileReport> {
    let layout: CounterLayout = config.section("/counter")?;
    let rules: DetectionRules = config.section("/sheet/columns")?;
    let opts: ReconcileOptions = config.section("/reconcile")?;

    let counted = parse_counter_file(counter, directory, &layout)?;
    let expected = parse_sheet_file(sheet, &rules)?;
    Ok(reconcile(&counted, &expected, directory, &opts)?)
}
