use crate::error::{MaturityAnalysisError, Result};
use crate::utils::{validate_report_month, validate_report_year};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

fn default_exchange_rate() -> f64 {
    1.0
}

fn default_header_start() -> usize {
    8
}

fn default_data_start() -> usize {
    9
}

/// Caller-supplied parameters for one maturity analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReportParameters {
    #[schemars(description = "Calendar year of the report date (e.g. 2024).")]
    pub report_year: i32,

    #[schemars(
        description = "Month of the report date (1-12). Year 1 starts the month after this month."
    )]
    pub report_month: u32,

    #[serde(default = "default_exchange_rate")]
    #[schemars(
        description = "Rate applied to every contract-currency figure to produce the target-currency mirror. Defaults to 1.0."
    )]
    pub exchange_rate: f64,

    #[serde(default = "default_header_start")]
    #[schemars(description = "1-indexed sheet row holding the column headers. Defaults to 8.")]
    pub input_header_start: usize,

    #[serde(default = "default_data_start")]
    #[schemars(
        description = "1-indexed sheet row of the first data record. Must come after the header row. Defaults to 9."
    )]
    pub input_data_start: usize,

    #[serde(default)]
    #[schemars(
        description = "Optional Company Code; when set, only source rows for this company are aggregated."
    )]
    pub company_code: Option<String>,
}

impl ReportParameters {
    pub fn new(report_year: i32, report_month: u32) -> Self {
        Self {
            report_year,
            report_month,
            exchange_rate: default_exchange_rate(),
            input_header_start: default_header_start(),
            input_data_start: default_data_start(),
            company_code: None,
        }
    }

    pub fn with_exchange_rate(mut self, exchange_rate: f64) -> Self {
        self.exchange_rate = exchange_rate;
        self
    }

    pub fn with_header_rows(mut self, header_start: usize, data_start: usize) -> Self {
        self.input_header_start = header_start;
        self.input_data_start = data_start;
        self
    }

    pub fn with_company_code(mut self, company_code: impl Into<String>) -> Self {
        self.company_code = Some(company_code.into());
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        validate_report_year(self.report_year)?;
        validate_report_month(self.report_month)?;

        if !self.exchange_rate.is_finite() || self.exchange_rate <= 0.0 {
            return Err(MaturityAnalysisError::InvalidExchangeRate(self.exchange_rate));
        }

        if self.input_header_start == 0 || self.input_data_start <= self.input_header_start {
            return Err(MaturityAnalysisError::InvalidRowLayout {
                header_row: self.input_header_start,
                data_start: self.input_data_start,
            });
        }

        Ok(())
    }

    /// The report date as `YYYY-MM`.
    pub fn report_date_label(&self) -> String {
        format!("{}-{:02}", self.report_year, self.report_month)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ReportParameters)
    }
}

/// Outcome of a processing run, handed back to whatever collected the upload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProcessingSummary {
    pub success: bool,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_rows: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Contracts written to the report (non-zero maturity total).")]
    pub output_rows: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Distinct contract/activation-group keys seen, including suppressed ones.")]
    pub total_contracts: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_secs: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtered_by_company_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Row count before the company-code filter was applied.")]
    pub original_rows: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessingSummary {
    pub fn failure(error: &MaturityAnalysisError) -> Self {
        Self {
            success: false,
            message: format!("Processing error: {}", error),
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ProcessingSummary)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_defaults_from_json() {
        let params = ReportParameters::from_json(r#"{"report_year": 2024, "report_month": 6}"#)
            .unwrap();
        assert_eq!(params, ReportParameters::new(2024, 6));
        assert_eq!(params.exchange_rate, 1.0);
        assert_eq!(params.input_header_start, 8);
        assert_eq!(params.input_data_start, 9);
        assert_eq!(params.report_date_label(), "2024-06");
    }

    #[test]
    fn test_parameters_reject_bad_month() {
        let err = ReportParameters::from_json(r#"{"report_year": 2024, "report_month": 13}"#)
            .unwrap_err();
        assert!(matches!(err, MaturityAnalysisError::InvalidReportMonth(13)));
    }

    #[test]
    fn test_parameters_reject_unrepresentable_year() {
        let params = ReportParameters::new(i32::MIN + 5, 1).with_header_rows(1, 2);
        assert!(matches!(
            params.validate(),
            Err(MaturityAnalysisError::InvalidReportYear(_))
        ));
    }

    #[test]
    fn test_parameters_reject_bad_rate_and_layout() {
        let params = ReportParameters::new(2024, 1).with_exchange_rate(0.0);
        assert!(matches!(
            params.validate(),
            Err(MaturityAnalysisError::InvalidExchangeRate(_))
        ));
        for rate in [-0.5, f64::NAN, f64::INFINITY] {
            assert!(ReportParameters::new(2024, 1)
                .with_exchange_rate(rate)
                .validate()
                .is_err());
        }

        let params = ReportParameters::new(2024, 1).with_header_rows(5, 5);
        assert!(matches!(
            params.validate(),
            Err(MaturityAnalysisError::InvalidRowLayout {
                header_row: 5,
                data_start: 5
            })
        ));

        assert!(ReportParameters::new(2024, 1)
            .with_header_rows(1, 2)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_failure_summary_serialization() {
        let err = MaturityAnalysisError::MissingColumns(vec!["Payment".to_string()]);
        let summary = ProcessingSummary::failure(&err);
        let json = summary.to_json().unwrap();

        assert!(!summary.success);
        assert!(json.contains("Payment"));
        assert!(!json.contains("output_rows"));
    }

    #[test]
    fn test_schema_generation() {
        let schema_json = ProcessingSummary::schema_as_json().unwrap();
        assert!(schema_json.contains("total_contracts"));

        let params_schema = serde_json::to_string(&ReportParameters::generate_json_schema()).unwrap();
        assert!(params_schema.contains("report_month"));
    }
}
