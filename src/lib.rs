//! # Maturity Analysis
//!
//! A library for turning a Consolidated Financial Schedules export (one row per lease
//! payment period) into a maturity analysis workbook: future payments bucketed into
//! Year 1..6 and Thereafter relative to a report date, per contract and activation group,
//! with finance charges, principal balances and a converted target-currency mirror.
//!
//! ## Core Concepts
//!
//! - **Report Date**: a (year, month) pair. Year 1 covers the twelve months after it.
//! - **Aggregation Key**: contract id + activation group id; one output row per key.
//! - **First-wins metadata**: descriptive fields come from the first row seen for a key.
//! - **Dual principal**: "Total Principal Liability" is reported both as payments minus
//!   finance charges and as ST + LT closing balances, side by side and unreconciled.
//!
//! ## Example
//!
//! ```rust,ignore
//! use maturity_analysis::*;
//!
//! let params = ReportParameters::new(2024, 12).with_exchange_rate(0.055);
//! let summary = process_maturity_analysis(
//!     "Consolidated Financial Schedules.xlsx",
//!     "Maturity Analysis.xlsx",
//!     &params,
//! );
//!
//! if summary.success {
//!     println!("{} contracts written", summary.output_rows.unwrap_or(0));
//! } else {
//!     eprintln!("{}", summary.message);
//! }
//! ```

pub mod engine;
pub mod error;
pub mod ingestion;
pub mod processor;
pub mod report;
pub mod schema;
pub mod utils;
pub mod writer;

pub use engine::{AggregationKey, ContractMetadata, ContractState, MaturityAggregator};
pub use error::{MaturityAnalysisError, Result};
pub use ingestion::{columns, CellValue, InputRow, SourceRow, SourceTable};
pub use processor::{
    list_company_codes, process_maturity_analysis, MaturityAnalysisProcessor, ProcessingOutcome,
};
pub use report::{FinancialFigures, MaturityReport, ReportCell, ReportRow, OUTPUT_COLUMNS};
pub use schema::{ProcessingSummary, ReportParameters};
pub use utils::{calculate_period_bucket, calculate_term, PeriodBucket};
pub use writer::{report_to_buffer, write_report};
