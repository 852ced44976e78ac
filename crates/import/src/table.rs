use calamine::{Data, Reader};
use chrono::{Duration, NaiveDate};
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Untyped rows exactly as an ingestion adapter read them: one header line and
/// string cells. Short rows are padded with empty cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                if row.len() < width {
                    row.resize(width, String::new());
                }
                row
            })
            .collect();
        RawTable { headers, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Error, Debug)]
pub enum TableError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Spreadsheet error: {0}")]
    SpreadsheetError(#[from] calamine::Error),
    #[error("Unsupported file format: {0} (expected .csv, .txt, .xls or .xlsx)")]
    UnsupportedFormat(String),
}

/// Reads a delimited text table. With no explicit delimiter, `;` is used when
/// the header line has more semicolons than commas.
pub fn read_csv<R: Read>(mut data: R, delimiter: Option<u8>) -> Result<RawTable, TableError> {
    let mut text = String::new();
    data.read_to_string(&mut text)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(text));
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|s| s.to_string()).collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        rows.push(record.iter().map(|s| s.to_string()).collect());
    }

    tracing::debug!(
        columns = headers.len(),
        rows = rows.len(),
        delimiter = %char::from(delimiter),
        "Read CSV table"
    );
    Ok(RawTable::new(headers, rows))
}

/// Opens a statement file, rejecting formats this adapter cannot parse.
pub fn read_path(path: &Path, delimiter: Option<u8>) -> Result<RawTable, TableError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase();
    match ext.as_str() {
        "csv" | "txt" => read_csv(std::fs::File::open(path)?, delimiter),
        "xls" | "xlsx" => read_xlsx(path),
        _ => Err(TableError::UnsupportedFormat(path.display().to_string())),
    }
}

/// Reads the first worksheet of an Excel workbook. The first row holds the
/// headers; date cells become `YYYY-MM-DD` text.
pub fn read_xlsx(path: &Path) -> Result<RawTable, TableError> {
    // Container format is sniffed from content, so `.XLS` opens too.
    let bytes = std::fs::read(path)?;
    let mut workbook = calamine::open_workbook_auto_from_rs(std::io::Cursor::new(bytes))?;
    let Some(range) = workbook.worksheet_range_at(0) else {
        return Ok(RawTable::default());
    };
    let range = range?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(RawTable::default());
    };
    let headers: Vec<String> = header_row.iter().map(cell_text).collect();
    let rows: Vec<Vec<String>> = rows
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>())
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .collect();

    tracing::debug!(
        columns = headers.len(),
        rows = rows.len(),
        "Read spreadsheet table"
    );
    Ok(RawTable::new(headers, rows))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()).unwrap_or_default(),
        Data::Error(_) | Data::Empty => String::new(),
    }
}

/// Excel serial day numbers count from 1899-12-30 (the 1900 leap-year bug).
fn excel_serial_to_date(serial: f64) -> Option<String> {
    if !serial.is_finite() {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let date = base.checked_add_signed(Duration::try_days(serial.floor() as i64)?)?;
    Some(date.format("%Y-%m-%d").to_string())
}

fn detect_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    let commas = header.matches(',').count();
    let semicolons = header.matches(';').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}
