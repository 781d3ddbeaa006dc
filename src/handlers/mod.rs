use anyhow::{Result, Context};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{ExtractError, ExtractResult};

/// A single spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Empty,
}

impl CellValue {
    /// Interpret a raw cell the way a spreadsheet reader would: blanks and `nan` are empty,
    /// numeric-looking text is a number, anything else is text.
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "nan" || trimmed == "NaN" {
            return CellValue::Empty;
        }

        let numeric_start = trimmed
            .chars()
            .next()
            .map(|c| c.is_ascii_digit() || c == '-' || c == '+' || c == '.')
            .unwrap_or(false);
        if numeric_start {
            if let Ok(number) = trimmed.parse::<f64>() {
                if number.is_finite() {
                    return CellValue::Number(number);
                }
            }
        }

        CellValue::Text(raw.to_string())
    }

    /// Empty cells and numeric NaN carry no value.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Number(n) => n.is_nan(),
            CellValue::Text(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Coerce to text; `None` when the cell has no value.
    pub fn to_text(&self) -> Option<String> {
        match self {
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) if !n.is_nan() => Some(format_number(*n)),
            _ => None,
        }
    }

    /// Integer interpretation used for foreign-key matching.
    pub fn as_key(&self) -> Option<i64> {
        match self {
            CellValue::Number(n) if n.is_finite() && n.fract() == 0.0 => Some(*n as i64),
            CellValue::Text(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

/// One row of a data sheet: column name to cell, in sheet order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataRow {
    cells: Vec<(String, CellValue)>,
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl DataRow {
    pub fn new(cells: Vec<(String, CellValue)>) -> Self {
        Self { cells }
    }

    /// Missing columns read as empty cells.
    pub fn get(&self, column: &str) -> &CellValue {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn text(&self, column: &str) -> Option<String> {
        self.get(column).to_text()
    }

    pub fn cells(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.cells.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// A fully loaded sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<DataRow>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    /// Build a table from a header and positional rows; short rows are padded with empties.
    pub fn from_records<S: AsRef<str>>(columns: &[S], records: Vec<Vec<CellValue>>) -> Self {
        let mut table = Table::new(columns.iter().map(|c| c.as_ref().to_string()).collect());
        for record in records {
            table.push_row(record);
        }
        table
    }

    pub fn push_row(&mut self, values: Vec<CellValue>) {
        let mut values = values.into_iter();
        let cells = self
            .columns
            .iter()
            .map(|column| (column.clone(), values.next().unwrap_or(CellValue::Empty)))
            .collect();
        self.rows.push(DataRow::new(cells));
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Parse CSV text with a header row.
    pub fn from_csv(text: &str) -> ExtractResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes());

        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let mut table = Table::new(columns);

        for record in reader.records() {
            let record = record?;
            table.push_row(record.iter().map(CellValue::from_raw).collect());
        }

        Ok(table)
    }
}

/// Anything that can hand over a named sheet of a named workbook.
pub trait TabularSource {
    fn parse(&self, workbook: &str, sheet: &str) -> Result<Table>;
}

/// Reads `<root>/<workbook>/<sheet>.csv`.
pub struct CsvDirectorySource {
    root: PathBuf,
}

impl CsvDirectorySource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    pub fn sheet_path(&self, workbook: &str, sheet: &str) -> PathBuf {
        self.root.join(workbook).join(format!("{}.csv", sheet))
    }

    /// Every `(workbook, sheet)` pair present under the root.
    pub fn list_sheets(&self) -> Vec<(String, String)> {
        let mut sheets = Vec::new();

        for entry in WalkDir::new(&self.root).min_depth(2).max_depth(2) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", self.root.display(), e);
                    continue;
                }
            };
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let workbook = path
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str());
            let sheet = path.file_stem().and_then(|s| s.to_str());
            if let (Some(workbook), Some(sheet)) = (workbook, sheet) {
                sheets.push((workbook.to_string(), sheet.to_string()));
            }
        }

        sheets.sort();
        sheets
    }
}

impl TabularSource for CsvDirectorySource {
    fn parse(&self, workbook: &str, sheet: &str) -> Result<Table> {
        let path = self.sheet_path(workbook, sheet);
        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read sheet: {}", path.display()))?;

        let encoding = if let Some((enc, _)) = encoding_rs::Encoding::for_bom(&bytes) {
            enc
        } else {
            encoding_rs::UTF_8
        };

        let (text, _, had_errors) = encoding.decode(&bytes);
        if had_errors {
            warn!("Encoding errors detected in sheet: {}", path.display());
        }

        let table = Table::from_csv(&text)
            .with_context(|| format!("Failed to parse sheet: {}", path.display()))?;
        debug!("Loaded {}/{} with {} rows", workbook, sheet, table.rows.len());

        Ok(table)
    }
}

/// In-memory table-of-tables keyed by `(workbook, sheet)`.
#[derive(Debug, Clone, Default)]
pub struct Workbooks {
    tables: HashMap<(String, String), Table>,
}

impl Workbooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, workbook: &str, sheet: &str, table: Table) {
        self.tables.insert((workbook.to_string(), sheet.to_string()), table);
    }

    pub fn with_table(mut self, workbook: &str, sheet: &str, table: Table) -> Self {
        self.insert(workbook, sheet, table);
        self
    }

    pub fn table(&self, workbook: &str, sheet: &str) -> ExtractResult<&Table> {
        self.tables
            .get(&(workbook.to_string(), sheet.to_string()))
            .ok_or_else(|| ExtractError::MissingTable {
                file: workbook.to_string(),
                sheet: sheet.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Load every listed sheet from `source` up front.
    pub fn load<I>(sheets: I, source: &dyn TabularSource) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut workbooks = Workbooks::new();

        for (workbook, sheet) in sheets {
            if workbooks.tables.contains_key(&(workbook.clone(), sheet.clone())) {
                continue;
            }
            let table = source.parse(&workbook, &sheet)?;
            workbooks.insert(&workbook, &sheet, table);
        }

        info!("Loaded {} sheets into memory", workbooks.len());
        Ok(workbooks)
    }
}

impl TabularSource for Workbooks {
    fn parse(&self, workbook: &str, sheet: &str) -> Result<Table> {
        Ok(self.table(workbook, sheet)?.clone())
    }
}
