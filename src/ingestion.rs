use crate::error::{MaturityAnalysisError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Days, NaiveDate, NaiveDateTime};
use log::debug;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Column names of the Consolidated Financial Schedules export.
pub mod columns {
    pub const CONTRACT_ID: &str = "Contract ID";
    pub const ACTIVATION_GROUP_ID: &str = "Activation Group ID";
    pub const PERIOD_END_DATE: &str = "Period End Date";
    pub const PAYMENT: &str = "Payment";
    pub const COMPANY_CURRENCY: &str = "Company Currency";
    pub const INTEREST_PAID: &str = "Interest Paid";
    pub const ST_PRINCIPAL_CLOSING: &str = "ST Principal Liability Closing Balance";
    pub const LT_PRINCIPAL_CLOSING: &str = "Principal Liability LT Closing Balance";
    pub const ACTIVATION_DATE: &str = "Activation Date";
    pub const END_DATE: &str = "End Date";
    pub const CONTRACT_CURRENCY: &str = "Contract Currency";
    pub const SYSTEM: &str = "System";
    pub const INTERNAL_REFERENCE: &str = "Internal Reference Number";
    pub const EXTERNAL_REFERENCE: &str = "External Reference number";
    pub const CONTRACT_NAME: &str = "Contract Name";
    pub const COMPANY_CODE: &str = "Company Code";
    pub const BUSINESS_UNIT: &str = "Business Unit";
    pub const TRADING_PARTNER: &str = "Trading Partner";
    pub const PROFIT_CENTER: &str = "Unit Profit Center (Main)";
    pub const COST_CENTER: &str = "Unit Cost Center (Main)";
    pub const ACTIVATION_GROUP_STATUS: &str = "Activation Group Status";
    pub const ASSET_CLASS: &str = "Unit Internal Asset Class";

    /// Columns a source table must carry before any row is aggregated.
    pub const REQUIRED: [&str; 5] = [
        CONTRACT_ID,
        ACTIVATION_GROUP_ID,
        PERIOD_END_DATE,
        PAYMENT,
        COMPANY_CURRENCY,
    ];
}

const TEXT_DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d-%b-%Y",
    "%d.%m.%Y",
    "%Y%m%d",
];

const TEXT_DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
];

/// Largest serial Excel can represent (9999-12-31).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDateTime),
}

impl CellValue {
    /// Text cells are trimmed; blank text collapses to `Empty`.
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(trimmed.to_string())
        }
    }

    fn from_calamine(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => CellValue::Empty,
            Data::String(s) | Data::DurationIso(s) => CellValue::from_text(s),
            Data::DateTimeIso(s) => parse_text_datetime(s)
                .map(CellValue::Date)
                .unwrap_or_else(|| CellValue::from_text(s)),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Float(f) => CellValue::Number(*f),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) => dt
                .as_datetime()
                .map(CellValue::Date)
                .unwrap_or(CellValue::Number(dt.as_f64())),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Text rendering used for identifiers and descriptive fields. Integral numbers drop
    /// their fractional part so a numeric contract id `1042` stays `"1042"`.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                format!("{}", *n as i64)
            }
            CellValue::Number(n) => n.to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Date(dt) if dt.time() == chrono::NaiveTime::MIN => {
                dt.date().format("%Y-%m-%d").to_string()
            }
            CellValue::Date(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            CellValue::Number(n) => *n,
            CellValue::Text(s) => s.parse::<f64>().ok()?,
            CellValue::Bool(b) => f64::from(u8::from(*b)),
            CellValue::Empty | CellValue::Date(_) => return None,
        };
        value.is_finite().then_some(value)
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(dt) => Some(dt.date()),
            CellValue::Number(serial) => excel_serial_to_date(*serial),
            CellValue::Text(s) => parse_text_datetime(s).map(|dt| dt.date()),
            CellValue::Empty | CellValue::Bool(_) => None,
        }
    }
}

/// Missing cells read as `""`.
pub fn text_or_default(cell: Option<&CellValue>) -> String {
    cell.map(CellValue::as_text).unwrap_or_default()
}

/// Missing or unparseable cells read as `0.0`.
pub fn number_or_default(cell: Option<&CellValue>) -> f64 {
    cell.and_then(CellValue::as_number).unwrap_or(0.0)
}

/// Missing or unparseable cells read as absent.
pub fn date_or_absent(cell: Option<&CellValue>) -> Option<NaiveDate> {
    cell.and_then(CellValue::as_date)
}

fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_EXCEL_SERIAL {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial.trunc() as u64))
}

fn parse_text_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    for format in TEXT_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }

    TEXT_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .map(|date| date.and_time(chrono::NaiveTime::MIN))
}

/// A sheet read from a header row down, with columns addressable by header name.
#[derive(Debug, Clone, Default)]
pub struct SourceTable {
    headers: Vec<String>,
    rows: Vec<Vec<CellValue>>,
    index: HashMap<String, usize>,
}

impl SourceTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let mut index = HashMap::new();
        for (idx, header) in headers.iter().enumerate() {
            // First occurrence of a duplicated header wins.
            index.entry(header.clone()).or_insert(idx);
        }

        let rows = rows
            .into_iter()
            .filter(|row| row.iter().any(|cell| !cell.is_empty()))
            .collect();

        Self {
            headers,
            rows,
            index,
        }
    }

    /// Reads the first worksheet of a workbook, or a CSV file, by extension.
    /// `header_row` is the 1-indexed sheet row holding the column names.
    pub fn from_path<P: AsRef<Path>>(path: P, header_row: usize) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Self::from_workbook(path, header_row),
            "csv" => Self::from_csv_reader(std::fs::File::open(path)?, header_row),
            other => Err(MaturityAnalysisError::UnsupportedFormat(format!(
                "'{}' ({})",
                other,
                path.display()
            ))),
        }
    }

    pub fn from_workbook<P: AsRef<Path>>(path: P, header_row: usize) -> Result<Self> {
        let path = path.as_ref();
        let mut workbook = open_workbook_auto(path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| MaturityAnalysisError::EmptyWorkbook(path.display().to_string()))??;

        let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
        let first_col = range.start().map(|(_, col)| col as usize).unwrap_or(0);

        let grid = range
            .rows()
            .map(|row| {
                std::iter::repeat(CellValue::Empty)
                    .take(first_col)
                    .chain(row.iter().map(CellValue::from_calamine))
                    .collect()
            })
            .collect();

        debug!("Read worksheet from {} starting at row {}", path.display(), first_row + 1);
        Self::from_grid(grid, header_row, first_row)
    }

    pub fn from_csv_reader<R: Read>(reader: R, header_row: usize) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut grid = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            grid.push(record.iter().map(CellValue::from_text).collect());
        }

        Self::from_grid(grid, header_row, 0)
    }

    /// `first_row` is the 0-indexed sheet row that `grid[0]` came from.
    fn from_grid(grid: Vec<Vec<CellValue>>, header_row: usize, first_row: usize) -> Result<Self> {
        let out_of_range = || MaturityAnalysisError::HeaderRowOutOfRange {
            header_row,
            rows: first_row + grid.len(),
        };

        let header_idx = header_row
            .checked_sub(1)
            .and_then(|row| row.checked_sub(first_row))
            .filter(|row| *row < grid.len())
            .ok_or_else(out_of_range)?;

        let mut grid = grid;
        let rows = grid.split_off(header_idx + 1);
        let header_cells = grid.pop().unwrap_or_default();

        let headers = header_cells
            .iter()
            .enumerate()
            .map(|(idx, cell)| match cell.as_text() {
                name if name.is_empty() => format!("Unnamed: {}", idx),
                name => name,
            })
            .collect();

        Ok(Self::new(headers, rows))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|name| !self.has_column(name))
            .map(|name| name.to_string())
            .collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = SourceRow<'_>> {
        self.rows.iter().map(move |cells| SourceRow {
            table: self,
            cells,
        })
    }

    /// Distinct non-empty values of a column, sorted.
    pub fn distinct_values(&self, column: &str) -> Result<Vec<String>> {
        let idx = self.require_column(column)?;
        let mut values: Vec<String> = self
            .rows
            .iter()
            .map(|row| text_or_default(row.get(idx)))
            .filter(|value| !value.is_empty())
            .collect();
        values.sort();
        values.dedup();
        Ok(values)
    }

    /// Rows whose `column` renders to exactly `value`.
    pub fn filter_by(&self, column: &str, value: &str) -> Result<SourceTable> {
        let idx = self.require_column(column)?;
        let rows = self
            .rows
            .iter()
            .filter(|row| text_or_default(row.get(idx)) == value)
            .cloned()
            .collect();
        Ok(Self::new(self.headers.clone(), rows))
    }

    fn require_column(&self, column: &str) -> Result<usize> {
        self.column_index(column)
            .ok_or_else(|| MaturityAnalysisError::MissingColumns(vec![column.to_string()]))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SourceRow<'a> {
    table: &'a SourceTable,
    cells: &'a [CellValue],
}

impl<'a> SourceRow<'a> {
    pub fn cell(&self, column: &str) -> Option<&'a CellValue> {
        self.table
            .column_index(column)
            .and_then(|idx| self.cells.get(idx))
    }

    pub fn text(&self, column: &str) -> String {
        text_or_default(self.cell(column))
    }

    pub fn number(&self, column: &str) -> f64 {
        number_or_default(self.cell(column))
    }

    pub fn date(&self, column: &str) -> Option<NaiveDate> {
        date_or_absent(self.cell(column))
    }
}

/// One payment-schedule record with every gap already resolved to its default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputRow {
    pub contract_id: String,
    pub activation_group_id: String,
    pub period_end_date: Option<NaiveDate>,
    pub payment: f64,
    pub interest_paid: f64,
    pub st_principal_closing: f64,
    pub lt_principal_closing: f64,
    pub activation_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub contract_currency: String,
    pub company_currency: String,
    pub system_id: String,
    pub internal_reference: String,
    pub external_reference: String,
    pub contract_name: String,
    pub company_code: String,
    pub business_unit: String,
    pub trading_partner: String,
    pub profit_center: String,
    pub cost_center: String,
    pub activation_group_status: String,
    pub asset_class: String,
}

impl InputRow {
    pub fn from_source(row: &SourceRow<'_>) -> Self {
        Self {
            contract_id: row.text(columns::CONTRACT_ID),
            activation_group_id: row.text(columns::ACTIVATION_GROUP_ID),
            period_end_date: row.date(columns::PERIOD_END_DATE),
            payment: row.number(columns::PAYMENT),
            interest_paid: row.number(columns::INTEREST_PAID),
            st_principal_closing: row.number(columns::ST_PRINCIPAL_CLOSING),
            lt_principal_closing: row.number(columns::LT_PRINCIPAL_CLOSING),
            activation_date: row.date(columns::ACTIVATION_DATE),
            end_date: row.date(columns::END_DATE),
            contract_currency: row.text(columns::CONTRACT_CURRENCY),
            company_currency: row.text(columns::COMPANY_CURRENCY),
            system_id: row.text(columns::SYSTEM),
            internal_reference: row.text(columns::INTERNAL_REFERENCE),
            external_reference: row.text(columns::EXTERNAL_REFERENCE),
            contract_name: row.text(columns::CONTRACT_NAME),
            company_code: row.text(columns::COMPANY_CODE),
            business_unit: row.text(columns::BUSINESS_UNIT),
            trading_partner: row.text(columns::TRADING_PARTNER),
            profit_center: row.text(columns::PROFIT_CENTER),
            cost_center: row.text(columns::COST_CENTER),
            activation_group_status: row.text(columns::ACTIVATION_GROUP_STATUS),
            asset_class: row.text(columns::ASSET_CLASS),
        }
    }
}
