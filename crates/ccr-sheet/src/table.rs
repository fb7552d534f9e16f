//! First-sheet flattening for workbook (xlsx/xls/ods) and delimited-text inputs.

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use ccr_schemas::ids::float_to_id;

use crate::parser::SpreadsheetParseError;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    /// xlsx / xlsm / xlsb / xls / ods, read through calamine.
    Workbook,
    /// Delimited text (`;`, `,` or tab).
    Delimited,
}

impl SheetFormat {
    pub fn from_extension(path: &Path) -> Option<SheetFormat> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(SheetFormat::Workbook),
            "csv" | "txt" | "tsv" => Some(SheetFormat::Delimited),
            _ => None,
        }
    }

    pub fn sniff(bytes: &[u8]) -> SheetFormat {
        if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC) {
            SheetFormat::Workbook
        } else {
            SheetFormat::Delimited
        }
    }
}

/// A single cell after normalisation.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn text(s: &str) -> Cell {
        let t = s.trim();
        if t.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(t.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Display form; integral numbers drop their fractional part.
    pub fn as_string(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => float_to_id(*n),
        }
    }
}

/// Header row plus data rows of the first sheet.
///
/// Row 1 is the header even when blank; detection then degrades to column
/// positions. Blank data rows are dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn from_rows(rows: impl IntoIterator<Item = Vec<Cell>>) -> Table {
        let mut rows = rows.into_iter();
        let headers = rows
            .next()
            .map(|r| r.iter().map(Cell::as_string).collect())
            .unwrap_or_default();
        Table {
            headers,
            rows: rows.filter(|r| r.iter().any(|c| !c.is_empty())).collect(),
        }
    }

    pub fn read(bytes: &[u8], format: SheetFormat) -> Result<Table, SpreadsheetParseError> {
        let table = match format {
            SheetFormat::Workbook => read_workbook(bytes)?,
            SheetFormat::Delimited => read_delimited(bytes)?,
        };
        if table.rows.is_empty() && table.headers.iter().all(String::is_empty) {
            return Err(SpreadsheetParseError::Empty);
        }
        Ok(table)
    }
}

fn read_workbook(bytes: &[u8]) -> Result<Table, SpreadsheetParseError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| SpreadsheetParseError::Workbook(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SpreadsheetParseError::Empty)?
        .map_err(|e| SpreadsheetParseError::Workbook(e.to_string()))?;
    // calamine trims the range to the used cells; pad it back to A1 so row 1
    // and column positions are the sheet's own.
    let (row0, col0) = range.start().unwrap_or((0, 0));
    let (row0, col0) = (row0 as usize, col0 as usize);
    let width = col0 + range.width();
    let leading = (0..row0).map(|_| vec![Cell::Empty; width]);
    let used = range.rows().map(|r| {
        std::iter::repeat(Cell::Empty)
            .take(col0)
            .chain(r.iter().map(cell_from_data))
            .collect::<Vec<Cell>>()
    });
    Ok(Table::from_rows(leading.chain(used)))
}

fn cell_from_data(d: &Data) -> Cell {
    match d {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) => Cell::text(s),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        other => Cell::text(&other.to_string()),
    }
}

fn read_delimited(bytes: &[u8]) -> Result<Table, SpreadsheetParseError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let delimiter = sniff_delimiter(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for rec in reader.byte_records() {
        let rec = rec.map_err(|e| SpreadsheetParseError::Delimited(e.to_string()))?;
        rows.push(
            rec.iter()
                .map(|f| Cell::text(&String::from_utf8_lossy(f)))
                .collect(),
        );
    }
    Ok(Table::from_rows(rows))
}

/// Most frequent of `;`, `,`, tab on the first line; `,` on a tie or nothing.
fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let first_line = bytes.split(|b| *b == b'\n').next().unwrap_or_default();
    let count = |d: u8| first_line.iter().filter(|b| **b == d).count();
    [b';', b'\t']
        .into_iter()
        .map(|d| (d, count(d)))
        .filter(|(_, n)| *n > count(b','))
        .max_by_key(|(_, n)| *n)
        .map(|(d, _)| d)
        .unwrap_or(b',')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniff_format_by_magic() {
        assert_eq!(SheetFormat::sniff(b"PK\x03\x04rest"), SheetFormat::Workbook);
        assert_eq!(SheetFormat::sniff(&[0xD0, 0xCF, 0x11, 0xE0, 0]), SheetFormat::Workbook);
        assert_eq!(SheetFormat::sniff(b"machine,amount"), SheetFormat::Delimited);
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(
            SheetFormat::from_extension(Path::new("x/ESPERADO.XLSX")),
            Some(SheetFormat::Workbook)
        );
        assert_eq!(
            SheetFormat::from_extension(Path::new("a.csv")),
            Some(SheetFormat::Delimited)
        );
        assert_eq!(SheetFormat::from_extension(Path::new("a.pdf")), None);
        assert_eq!(SheetFormat::from_extension(Path::new("noext")), None);
    }

    #[test]
    fn delimiter_sniffing() {
        assert_eq!(sniff_delimiter(b"a;b;c\n1,2;3"), b';');
        assert_eq!(sniff_delimiter(b"a\tb\tc"), b'\t');
        assert_eq!(sniff_delimiter(b"a,b,c"), b',');
        assert_eq!(sniff_delimiter(b"single"), b',');
    }

    #[test]
    fn delimited_table_skips_blank_rows() {
        let t = Table::read(b"\xEF\xBB\xBFMachine;Amount\n;\n100;5000\n\n200;1.000,50\n", SheetFormat::Delimited)
            .unwrap();
        assert_eq!(t.headers, vec!["Machine", "Amount"]);
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.rows[1][1], Cell::Text("1.000,50".to_string()));
    }

    #[test]
    fn blank_first_row_is_still_the_header_row() {
        let t = Table::read(b";\n100;5000\n", SheetFormat::Delimited).unwrap();
        assert_eq!(t.headers, vec!["", ""]);
        assert_eq!(t.rows.len(), 1);
        assert_eq!(t.rows[0][0], Cell::Text("100".to_string()));
    }

    #[test]
    fn blank_header_alone_is_empty() {
        assert!(matches!(
            Table::read(b";;\n;;\n", SheetFormat::Delimited),
            Err(SpreadsheetParseError::Empty)
        ));
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(
            Table::read(b"\n\n", SheetFormat::Delimited),
            Err(SpreadsheetParseError::Empty)
        ));
    }

    #[test]
    fn integral_numbers_render_without_fraction() {
        assert_eq!(Cell::Number(100.0).as_string(), "100");
        assert_eq!(Cell::Number(2.5).as_string(), "2.5");
        assert_eq!(Cell::text("  "), Cell::Empty);
    }
}
