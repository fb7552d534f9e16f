//! Counter-file parsing.
//!
//! ## Line contract (fields separated by `;`, trimmed)
//!
//! | Line   | Layout                                                                |
//! |--------|-----------------------------------------------------------------------|
//! | header | `H` then denominations at `header_denomination_offset..+8`           |
//! | data   | `D;serial;internal_id;date;time;p1..p8;v1..v8` (21 fields minimum)    |
//!
//! Only a missing header is fatal. Short data lines are skipped, and a count
//! that does not parse counts as zero.

use std::fmt;
use std::path::Path;

use ccr_schemas::{Amount, CounterRecord, Denomination, DenominationCounts, ReferenceDirectory, SerialIndex};
use tracing::{debug, info};

use crate::layout::{CounterLayout, DENOMINATION_SLOTS, MIN_DATA_FIELDS};

const UTF8_BOM: char = '\u{feff}';

const SERIAL: usize = 1;
const INTERNAL_ID: usize = 2;
const DATE: usize = 3;
const TIME: usize = 4;
const PHYSICAL_START: usize = 5;
const VIRTUAL_START: usize = PHYSICAL_START + DENOMINATION_SLOTS;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterParseError {
    /// The file could not be read.
    Io(String),
    /// No line starts with the header marker.
    MissingHeader { marker: String },
}

impl fmt::Display for CounterParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterParseError::Io(msg) => write!(f, "counter file io error: {msg}"),
            CounterParseError::MissingHeader { marker } => {
                write!(f, "counter file has no header line (expected a '{marker};' line)")
            }
        }
    }
}

impl std::error::Error for CounterParseError {}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Denominations declared by the header line, in slot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterHeader {
    pub denominations: [Denomination; DENOMINATION_SLOTS],
}

/// Locate and decode the first header line in `src`.
pub fn parse_header(src: &str, layout: &CounterLayout) -> Result<CounterHeader, CounterParseError> {
    src.lines()
        .map(split_fields)
        .find(|fields| layout.is_header(fields))
        .map(|fields| header_from_fields(&fields, layout))
        .ok_or_else(|| CounterParseError::MissingHeader {
            marker: layout.header_marker.clone(),
        })
}

fn header_from_fields(fields: &[&str], layout: &CounterLayout) -> CounterHeader {
    let mut denominations = layout.default_denominations;
    for (slot, denom) in denominations.iter_mut().enumerate() {
        let parsed = fields
            .get(layout.header_denomination_offset + slot)
            .and_then(|f| f.parse::<Denomination>().ok())
            .filter(|d| *d > 0);
        if let Some(d) = parsed {
            *denom = d;
        }
    }
    CounterHeader { denominations }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Read a counter file from disk and parse it.
///
/// Device exports are not reliably UTF-8; invalid sequences are replaced
/// rather than rejected, since only ASCII fields are interpreted.
pub fn parse_counter_file(
    path: &Path,
    directory: &ReferenceDirectory,
    layout: &CounterLayout,
) -> Result<Vec<CounterRecord>, CounterParseError> {
    let bytes = std::fs::read(path)
        .map_err(|e| CounterParseError::Io(format!("read '{}': {e}", path.display())))?;
    let text = String::from_utf8_lossy(&bytes);
    parse_counter_str(&text, directory, layout)
}

/// Parse counter-file text, resolving machine IDs against `directory`.
pub fn parse_counter_str(
    src: &str,
    directory: &ReferenceDirectory,
    layout: &CounterLayout,
) -> Result<Vec<CounterRecord>, CounterParseError> {
    parse_counter_with_index(src, &directory.serial_index(), layout)
}

/// Parse counter-file text with a prebuilt serial index.
///
/// Records come back in order of appearance.
pub fn parse_counter_with_index(
    src: &str,
    serials: &SerialIndex,
    layout: &CounterLayout,
) -> Result<Vec<CounterRecord>, CounterParseError> {
    let src = src.strip_prefix(UTF8_BOM).unwrap_or(src);
    let header = parse_header(src, layout)?;

    let mut out = Vec::new();
    let mut skipped = 0usize;

    for (line_no, line) in src.lines().enumerate() {
        let fields = split_fields(line);
        if !layout.is_data(&fields) {
            continue;
        }
        if fields.len() < MIN_DATA_FIELDS {
            debug!(
                line = line_no + 1,
                fields = fields.len(),
                "counter data line too short, skipped"
            );
            skipped += 1;
            continue;
        }
        out.push(record_from_fields(&fields, &header, serials));
    }

    info!(
        records = out.len(),
        skipped,
        "counter file parsed"
    );
    Ok(out)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn split_fields(line: &str) -> Vec<&str> {
    line.split(';').map(str::trim).collect()
}

fn record_from_fields(fields: &[&str], header: &CounterHeader, serials: &SerialIndex) -> CounterRecord {
    let serial_number = fields[SERIAL].to_string();
    let internal_file_id = fields[INTERNAL_ID].to_string();
    let resolved_machine_id = serials
        .machine_for(&serial_number)
        .map(str::to_string)
        .unwrap_or_else(|| internal_file_id.clone());

    let (physical_denomination_counts, total_physical) =
        count_block(&fields[PHYSICAL_START..VIRTUAL_START], header);
    let (virtual_denomination_counts, total_virtual) =
        count_block(&fields[VIRTUAL_START..VIRTUAL_START + DENOMINATION_SLOTS], header);

    CounterRecord {
        serial_number,
        internal_file_id,
        resolved_machine_id,
        date: fields[DATE].to_string(),
        time: fields[TIME].to_string(),
        physical_denomination_counts,
        virtual_denomination_counts,
        total_physical,
        total_virtual,
        total_counted: total_physical + total_virtual,
    }
}

/// Counts per denomination plus the block's cash value. A header that repeats
/// a denomination adds the counts of both slots together.
fn count_block(fields: &[&str], header: &CounterHeader) -> (DenominationCounts, Amount) {
    let mut counts = DenominationCounts::new();
    let mut total = Amount::ZERO;
    for (raw, denom) in fields.iter().zip(header.denominations) {
        let count = raw.parse::<i64>().unwrap_or(0);
        *counts.entry(denom).or_insert(0) += count;
        total += Amount::bills(count, denom);
    }
    (counts, total)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
