use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaturityAnalysisError {
    #[error("Missing required columns: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("Invalid report year {0}: outside the supported calendar range")]
    InvalidReportYear(i32),

    #[error("Invalid report month {0}: must be between 1 and 12")]
    InvalidReportMonth(u32),

    #[error("Invalid exchange rate {0}: must be a finite positive number")]
    InvalidExchangeRate(f64),

    #[error("Invalid row layout: data start row {data_start} must come after header row {header_row}")]
    InvalidRowLayout { header_row: usize, data_start: usize },

    #[error("Header row {header_row} is outside the sheet ({rows} rows)")]
    HeaderRowOutOfRange { header_row: usize, rows: usize },

    #[error("Unsupported source format: {0}")]
    UnsupportedFormat(String),

    #[error("Workbook has no readable worksheet: {0}")]
    EmptyWorkbook(String),

    #[error("No records found for Company Code: {0}")]
    NoRecordsForCompanyCode(String),

    #[error("Spreadsheet read error: {0}")]
    Spreadsheet(String),

    #[error("Workbook write error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<calamine::Error> for MaturityAnalysisError {
    fn from(err: calamine::Error) -> Self {
        Self::Spreadsheet(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MaturityAnalysisError>;
