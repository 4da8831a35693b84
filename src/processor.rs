use crate::engine::MaturityAggregator;
use crate::error::{MaturityAnalysisError, Result};
use crate::ingestion::{columns, InputRow, SourceTable};
use crate::report::MaturityReport;
use crate::schema::{ProcessingSummary, ReportParameters};
use crate::writer::write_report;
use log::{debug, error, info};
use std::path::Path;
use std::time::Instant;

/// What one in-memory pass produced, before anything touches the filesystem.
#[derive(Debug, Clone)]
pub struct ProcessingOutcome {
    pub report: MaturityReport,
    pub input_rows: usize,
    /// Set when a company-code filter ran: rows before filtering.
    pub original_rows: Option<usize>,
}

pub struct MaturityAnalysisProcessor;

impl MaturityAnalysisProcessor {
    /// Validates the table, aggregates every row in source order and builds the report.
    pub fn process_table(
        table: &SourceTable,
        params: &ReportParameters,
    ) -> Result<ProcessingOutcome> {
        params.validate()?;

        let missing = table.missing_columns(&columns::REQUIRED);
        if !missing.is_empty() {
            return Err(MaturityAnalysisError::MissingColumns(missing));
        }

        let filtered;
        let (table, original_rows) = match params.company_code.as_deref() {
            Some(code) => {
                filtered = filter_company(table, code)?;
                (&filtered, Some(table.len()))
            }
            None => (table, None),
        };

        let mut aggregator =
            MaturityAggregator::new(params.report_year, params.report_month, params.exchange_rate);

        let mut skipped = 0usize;
        for row in table.rows() {
            if !aggregator.absorb(&InputRow::from_source(&row)) {
                skipped += 1;
            }
        }
        if skipped > 0 {
            debug!("{} rows had no contract/activation group key", skipped);
        }

        let report = MaturityReport::build(aggregator);
        info!(
            "Aggregated {} rows into {} contracts ({} with maturities after {})",
            table.len(),
            report.total_contracts,
            report.output_rows(),
            params.report_date_label()
        );

        Ok(ProcessingOutcome {
            report,
            input_rows: table.len(),
            original_rows,
        })
    }

    /// Runs the whole pipeline from source file to output workbook. Never fails: every error
    /// is folded into an unsuccessful summary.
    pub fn process_file<P: AsRef<Path>, Q: AsRef<Path>>(
        source: P,
        output: Q,
        params: &ReportParameters,
    ) -> ProcessingSummary {
        let started = Instant::now();
        let source = source.as_ref();
        let output = output.as_ref();

        info!(
            "Processing maturity analysis for {} from {}",
            params.report_date_label(),
            source.display()
        );

        match Self::run(source, output, params) {
            Ok(mut summary) => {
                summary.processing_time_secs = Some(started.elapsed().as_secs_f64());
                summary
            }
            Err(err) => {
                error!("Maturity analysis failed for {}: {}", source.display(), err);
                let mut summary = ProcessingSummary::failure(&err);
                summary.processing_time_secs = Some(started.elapsed().as_secs_f64());
                summary
            }
        }
    }

    fn run(source: &Path, output: &Path, params: &ReportParameters) -> Result<ProcessingSummary> {
        params.validate()?;

        let table = SourceTable::from_path(source, params.input_header_start)?;
        let outcome = Self::process_table(&table, params)?;

        write_report(&outcome.report, output)?;
        let file_size = std::fs::metadata(output)?.len();

        let message = match &params.company_code {
            Some(code) => format!(
                "Maturity analysis report generated successfully (filtered for Company Code: {})",
                code
            ),
            None => "Maturity analysis report generated successfully".to_string(),
        };

        Ok(ProcessingSummary {
            success: true,
            message,
            input_rows: Some(outcome.input_rows),
            output_rows: Some(outcome.report.output_rows()),
            total_contracts: Some(outcome.report.total_contracts),
            output_file: Some(output.display().to_string()),
            file_size: Some(file_size),
            report_date: Some(params.report_date_label()),
            processing_time_secs: None,
            filtered_by_company_code: params.company_code.clone(),
            original_rows: outcome.original_rows,
            error: None,
        })
    }
}

fn filter_company(table: &SourceTable, code: &str) -> Result<SourceTable> {
    let filtered = table.filter_by(columns::COMPANY_CODE, code)?;
    if filtered.is_empty() {
        return Err(MaturityAnalysisError::NoRecordsForCompanyCode(code.to_string()));
    }
    info!(
        "Filtered from {} to {} rows for Company Code: {}",
        table.len(),
        filtered.len(),
        code
    );
    Ok(filtered)
}

pub fn process_maturity_analysis<P: AsRef<Path>, Q: AsRef<Path>>(
    source: P,
    output: Q,
    params: &ReportParameters,
) -> ProcessingSummary {
    MaturityAnalysisProcessor::process_file(source, output, params)
}

/// Distinct company codes present in a source file, for callers offering a filter choice.
pub fn list_company_codes<P: AsRef<Path>>(source: P, header_row: usize) -> Result<Vec<String>> {
    SourceTable::from_path(source, header_row)?.distinct_values(columns::COMPANY_CODE)
}
