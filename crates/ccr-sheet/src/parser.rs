//! Expected-values extraction.
//!
//! Per row, after column detection:
//! - machine ID: detected column, else any column whose header looks like a
//!   machine ID, else the first non-empty cell
//! - amount: detected column, else any column whose header looks like an
//!   amount, else zero
//! - serial: detected column, else any column whose header looks like a serial
//! - location / zone: detected column only
//!
//! Rows whose machine ID is still empty are dropped. A bad cell never aborts
//! the parse.

use std::fmt;
use std::path::Path;

use ccr_schemas::{Amount, ExpectedRecord};
use tracing::{debug, info};

use crate::detect::{detect_columns, ColumnMap, DetectionRules, Field};
use crate::table::{Cell, SheetFormat, Table};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpreadsheetParseError {
    /// The file could not be read.
    Io(String),
    /// Not a readable workbook (corrupt, encrypted, unsupported).
    Workbook(String),
    /// Delimited text could not be decoded.
    Delimited(String),
    /// No worksheet, or the first sheet has no header row.
    Empty,
}

impl fmt::Display for SpreadsheetParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpreadsheetParseError::Io(msg) => write!(f, "spreadsheet io error: {msg}"),
            SpreadsheetParseError::Workbook(msg) => write!(f, "unreadable workbook: {msg}"),
            SpreadsheetParseError::Delimited(msg) => write!(f, "unreadable delimited file: {msg}"),
            SpreadsheetParseError::Empty => write!(f, "spreadsheet has no data in its first sheet"),
        }
    }
}

impl std::error::Error for SpreadsheetParseError {}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Read and parse a spreadsheet from disk. The extension picks the format;
/// unknown extensions fall back to sniffing the content.
pub fn parse_sheet_file(
    path: &Path,
    rules: &DetectionRules,
) -> Result<Vec<ExpectedRecord>, SpreadsheetParseError> {
    let bytes = std::fs::read(path)
        .map_err(|e| SpreadsheetParseError::Io(format!("read '{}': {e}", path.display())))?;
    parse_sheet_bytes(&bytes, SheetFormat::from_extension(path), rules)
}

/// Parse raw spreadsheet bytes. With no `format` hint the content is sniffed.
pub fn parse_sheet_bytes(
    bytes: &[u8],
    format: Option<SheetFormat>,
    rules: &DetectionRules,
) -> Result<Vec<ExpectedRecord>, SpreadsheetParseError> {
    let format = format.unwrap_or_else(|| SheetFormat::sniff(bytes));
    let table = Table::read(bytes, format)?;
    Ok(records_from_table(&table, rules))
}

/// Turn an already-flattened table into expected records.
pub fn records_from_table(table: &Table, rules: &DetectionRules) -> Vec<ExpectedRecord> {
    let columns = detect_columns(&table.headers, rules);
    debug!(?columns, headers = ?table.headers, "spreadsheet columns detected");

    let mut out = Vec::with_capacity(table.rows.len());
    let mut dropped = 0usize;
    for (i, row) in table.rows.iter().enumerate() {
        let reader = RowReader {
            headers: &table.headers,
            row,
            columns: &columns,
            rules,
        };
        match reader.record() {
            Some(rec) => out.push(rec),
            None => {
                debug!(row = i + 2, "spreadsheet row has no machine id, dropped");
                dropped += 1;
            }
        }
    }

    info!(records = out.len(), dropped, "spreadsheet parsed");
    out
}

// ---------------------------------------------------------------------------
// Row extraction
// ---------------------------------------------------------------------------

struct RowReader<'a> {
    headers: &'a [String],
    row: &'a [Cell],
    columns: &'a ColumnMap,
    rules: &'a DetectionRules,
}

impl RowReader<'_> {
    fn record(&self) -> Option<ExpectedRecord> {
        let machine_id = self.machine_id()?;
        Some(ExpectedRecord {
            machine_id,
            serial_number: self
                .detected(Field::Serial)
                .or_else(|| self.by_header(Field::Serial))
                .map(|c| c.as_string()),
            expected_amount: self.amount(),
            location: self.detected(Field::Location).map(Cell::as_string),
            zone: self.detected(Field::Zone).map(Cell::as_string),
        })
    }

    fn machine_id(&self) -> Option<String> {
        self.detected(Field::MachineId)
            .or_else(|| self.by_header(Field::MachineId))
            .or_else(|| self.row.iter().find(|c| !c.is_empty()))
            .map(Cell::as_string)
            .filter(|id| !id.is_empty())
    }

    fn amount(&self) -> Amount {
        self.detected(Field::Amount)
            .or_else(|| self.by_header(Field::Amount))
            .map(parse_amount)
            .unwrap_or(Amount::ZERO)
    }

    /// Non-empty cell in the detected column for `field`.
    fn detected(&self, field: Field) -> Option<&Cell> {
        let col = self.columns.get(field)?;
        self.row.get(col).filter(|c| !c.is_empty())
    }

    /// First non-empty cell whose header matches `field`'s patterns.
    fn by_header(&self, field: Field) -> Option<&Cell> {
        self.row.iter().enumerate().find_map(|(i, cell)| {
            let header = self.headers.get(i)?;
            (!cell.is_empty() && self.rules.header_matches(field, header)).then_some(cell)
        })
    }
}

/// Numeric cells as-is; text parsed directly, then with everything but
/// digits, sign and decimal point stripped; anything else is zero.
fn parse_amount(cell: &Cell) -> Amount {
    match cell {
        Cell::Empty => Amount::ZERO,
        Cell::Number(n) => Amount::from_f64(*n),
        Cell::Text(s) => Amount::parse_decimal(s).unwrap_or_else(|_| {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'))
                .collect();
            Amount::parse_decimal(&cleaned).unwrap_or(Amount::ZERO)
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
