use crate::error::Result;
use crate::report::{is_date_column, is_financial_column, MaturityReport, ReportCell, OUTPUT_COLUMNS};
use log::debug;
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, Worksheet};
use std::path::Path;

pub const SHEET_NAME: &str = "Maturity Analysis";
pub const ACCOUNTING_FORMAT: &str = r#"_-* #,##0.00_-;-* #,##0.00_-;_-* "-"??_-;_-@_-"#;
pub const DATE_FORMAT: &str = "yyyy-mm-dd";
const HEADER_FILL: u32 = 0xB3E5FC;
const MIN_COLUMN_WIDTH: usize = 12;

struct Formats {
    header: Format,
    accounting: Format,
    date: Format,
}

impl Formats {
    fn new() -> Self {
        Self {
            header: Format::new()
                .set_bold()
                .set_background_color(Color::RGB(HEADER_FILL))
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter)
                .set_text_wrap(),
            accounting: Format::new().set_num_format(ACCOUNTING_FORMAT),
            date: Format::new().set_num_format(DATE_FORMAT),
        }
    }
}

/// Writes the report as a single-sheet workbook at `path`.
pub fn write_report<P: AsRef<Path>>(report: &MaturityReport, path: P) -> Result<()> {
    let mut workbook = build_workbook(report)?;
    workbook.save(path.as_ref())?;
    debug!(
        "Wrote {} report rows to {}",
        report.output_rows(),
        path.as_ref().display()
    );
    Ok(())
}

/// The workbook serialized in memory, for callers that stream the file themselves.
pub fn report_to_buffer(report: &MaturityReport) -> Result<Vec<u8>> {
    let mut workbook = build_workbook(report)?;
    Ok(workbook.save_to_buffer()?)
}

fn build_workbook(report: &MaturityReport) -> Result<Workbook> {
    let formats = Formats::new();
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    write_headers(worksheet, &formats)?;

    for (idx, row) in report.rows.iter().enumerate() {
        let sheet_row = (idx + 1) as u32;
        for (col_idx, cell) in row.cells().iter().enumerate() {
            write_cell(worksheet, &formats, sheet_row, col_idx, cell)?;
        }
    }

    Ok(workbook)
}

fn write_headers(worksheet: &mut Worksheet, formats: &Formats) -> Result<()> {
    for (col_idx, header) in OUTPUT_COLUMNS.iter().enumerate() {
        let col = col_idx as u16;
        worksheet.write_string_with_format(0, col, *header, &formats.header)?;
        let width = MIN_COLUMN_WIDTH.max(header.len() + 2);
        worksheet.set_column_width(col, width as f64)?;
    }
    Ok(())
}

fn write_cell(
    worksheet: &mut Worksheet,
    formats: &Formats,
    row: u32,
    col_idx: usize,
    cell: &ReportCell,
) -> Result<()> {
    let col = col_idx as u16;
    let column = col_idx + 1;

    match cell {
        ReportCell::Text(value) if !value.is_empty() => {
            worksheet.write_string(row, col, value)?;
        }
        ReportCell::Text(_) | ReportCell::Blank => {}
        ReportCell::Integer(value) => {
            worksheet.write_number(row, col, *value as f64)?;
        }
        ReportCell::Number(value) if is_financial_column(column) => {
            worksheet.write_number_with_format(row, col, *value, &formats.accounting)?;
        }
        ReportCell::Number(value) => {
            worksheet.write_number(row, col, *value)?;
        }
        ReportCell::Date(value) if is_date_column(column) => {
            worksheet.write_datetime_with_format(row, col, value, &formats.date)?;
        }
        ReportCell::Date(value) => {
            worksheet.write_string(row, col, value.format("%Y-%m-%d").to_string())?;
        }
    }

    Ok(())
}
