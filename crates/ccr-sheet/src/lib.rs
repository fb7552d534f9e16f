//! ccr-sheet
//!
//! Parser for the expected-values spreadsheet.
//!
//! The sheet has no fixed schema. Columns are located by an ordered list of
//! header rules per target field ([`detect`]), the first worksheet is flattened
//! into a [`Table`] ([`table`]), and each row is turned into an
//! [`ccr_schemas::ExpectedRecord`] with row-level fallbacks ([`parser`]).

pub mod detect;
pub mod parser;
pub mod table;

pub use detect::{detect_columns, ColumnMap, DetectionRules, Field, Rule};
pub use parser::{parse_sheet_bytes, parse_sheet_file, records_from_table, SpreadsheetParseError};
pub use table::{Cell, SheetFormat, Table};
