//! `parse-counter` and `parse-sheet`: run one parser and dump its records.

use anyhow::{Context, Result};
use ccr_counter::{parse_counter_file, CounterLayout};
use ccr_schemas::ReferenceDirectory;
use ccr_sheet::{parse_sheet_file, DetectionRules};
use std::path::Path;

use super::{load_config, read_reference_file, write_json};

pub fn run_parse_counter(
    file: &Path,
    reference: Option<&Path>,
    config_paths: &[String],
    out: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_paths)?;
    let layout: CounterLayout = config.section("/counter")?;
    let directory = match reference {
        Some(p) => read_reference_file(p)?,
        None => ReferenceDirectory::new(),
    };

    let records = parse_counter_file(file, &directory, &layout)
        .with_context(|| format!("counter parse failed: {}", file.display()))?;
    write_json(&records, out)
}

pub fn run_parse_sheet(file: &Path, config_paths: &[String], out: Option<&Path>) -> Result<()> {
    let config = load_config(config_paths)?;
    let rules: DetectionRules = config.section("/sheet/columns")?;

    let records = parse_sheet_file(file, &rules)
        .with_context(|| format!("spreadsheet parse failed: {}", file.display()))?;
    write_json(&records, out)
}
