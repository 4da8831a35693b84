use crate::engine::{AggregationKey, ContractMetadata, ContractState, MaturityAggregator};
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

/// Header row of the maturity analysis sheet. Three names repeat on purpose: the
/// balance-derived "Total Principal Liability" in each currency section and the asset class
/// that opens the target-currency section.
pub const OUTPUT_COLUMNS: [&str; 51] = [
    // Contract / activation group metadata (1-24)
    "Erp System ID",
    "Contract ID",
    "Internal Contract Reference",
    "External Contract Reference",
    "Contract Name",
    "Company Code",
    "Business Unit",
    "Trading Partner ID",
    "Trading Partner Name",
    "Profit Center",
    "Cost Center",
    "Responsible Cost Center",
    "Activation Group ID",
    "Lease Classification",
    "Activation Group Status",
    "Accounting Start Date",
    "Likely Expiration Date",
    "Accounting Term In Months",
    "Accounting Term In Days",
    "Contract Currency",
    "Target Currency",
    "Exchange Rate To LC",
    "Exchange Rate To GC/RC",
    "Asset Class",
    // Contract currency (25-37)
    "Year 1",
    "Year 2",
    "Year 3",
    "Year 4",
    "Year 5",
    "Year 6",
    "Thereafter",
    "Total",
    "Less: Finance Charges",
    "Total Principal Liability",
    "ST Principal Closing Balance",
    "LT Principal Closing Balance",
    "Total Principal Liability",
    // Target currency (38-51)
    "Asset Class",
    "Year 1",
    "Year 2",
    "Year 3",
    "Year 4",
    "Year 5",
    "Year 6",
    "Thereafter",
    "Total",
    "Less: Finance Charges",
    "Total Principal Liability",
    "ST Principal Closing Balance",
    "LT Principal Closing Balance",
    "Total Principal Liability",
];

/// 1-indexed columns holding money amounts.
pub fn is_financial_column(column: usize) -> bool {
    (25..=37).contains(&column) || (39..=51).contains(&column)
}

/// 1-indexed columns holding dates.
pub fn is_date_column(column: usize) -> bool {
    column == 16 || column == 17
}

/// The thirteen money figures of one currency section, in column order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FinancialFigures {
    pub year1: f64,
    pub year2: f64,
    pub year3: f64,
    pub year4: f64,
    pub year5: f64,
    pub year6: f64,
    pub thereafter: f64,
    pub total: f64,
    /// Negative: finance charges are shown as a deduction.
    pub finance_charges: f64,
    /// `total + finance_charges`.
    pub total_principal_from_payments: f64,
    pub st_principal: f64,
    pub lt_principal: f64,
    /// `st_principal + lt_principal`. Not reconciled against the payments-derived figure.
    pub total_principal_from_balances: f64,
}

impl FinancialFigures {
    pub fn from_state(state: &ContractState) -> Self {
        let [year1, year2, year3, year4, year5, year6, thereafter] = state.buckets;
        let total = state.total();
        let finance_charges = -state.finance_charges;

        Self {
            year1,
            year2,
            year3,
            year4,
            year5,
            year6,
            thereafter,
            total,
            finance_charges,
            total_principal_from_payments: total + finance_charges,
            st_principal: state.st_principal,
            lt_principal: state.lt_principal,
            total_principal_from_balances: state.st_principal + state.lt_principal,
        }
    }

    /// Every figure multiplied by `rate`.
    pub fn converted(&self, rate: f64) -> Self {
        let values = self.values().map(|value| value * rate);
        Self::from_values(values)
    }

    pub fn values(&self) -> [f64; 13] {
        [
            self.year1,
            self.year2,
            self.year3,
            self.year4,
            self.year5,
            self.year6,
            self.thereafter,
            self.total,
            self.finance_charges,
            self.total_principal_from_payments,
            self.st_principal,
            self.lt_principal,
            self.total_principal_from_balances,
        ]
    }

    fn from_values(values: [f64; 13]) -> Self {
        let [year1, year2, year3, year4, year5, year6, thereafter, total, finance_charges, total_principal_from_payments, st_principal, lt_principal, total_principal_from_balances] =
            values;
        Self {
            year1,
            year2,
            year3,
            year4,
            year5,
            year6,
            thereafter,
            total,
            finance_charges,
            total_principal_from_payments,
            st_principal,
            lt_principal,
            total_principal_from_balances,
        }
    }
}

/// A single cell of a rendered report row.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportCell {
    Text(String),
    Integer(i64),
    Number(f64),
    Date(NaiveDate),
    Blank,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub key: AggregationKey,
    pub metadata: ContractMetadata,
    pub contract_currency: FinancialFigures,
    pub target_currency: FinancialFigures,
}

impl ReportRow {
    pub fn from_state(key: AggregationKey, state: ContractState) -> Self {
        let contract_currency = FinancialFigures::from_state(&state);
        let target_currency = contract_currency.converted(state.metadata.exchange_rate_to_gc);

        Self {
            key,
            metadata: state.metadata,
            contract_currency,
            target_currency,
        }
    }

    /// The row in `OUTPUT_COLUMNS` order.
    pub fn cells(&self) -> Vec<ReportCell> {
        let m = &self.metadata;
        let text = |value: &str| ReportCell::Text(value.to_string());
        let date = |value: Option<NaiveDate>| value.map(ReportCell::Date).unwrap_or(ReportCell::Blank);

        let mut cells = vec![
            text(&m.erp_system_id),
            text(&m.contract_id),
            text(&m.internal_contract_reference),
            text(&m.external_contract_reference),
            text(&m.contract_name),
            text(&m.company_code),
            text(&m.business_unit),
            text(&m.trading_partner_id),
            text(&m.trading_partner_name),
            text(&m.profit_center),
            text(&m.cost_center),
            text(&m.responsible_cost_center),
            text(&m.activation_group_id),
            text(&m.lease_classification),
            text(&m.activation_group_status),
            date(m.accounting_start_date),
            date(m.likely_expiration_date),
            ReportCell::Integer(i64::from(m.accounting_term_months)),
            ReportCell::Integer(m.accounting_term_days),
            text(&m.contract_currency),
            text(&m.target_currency),
            ReportCell::Number(m.exchange_rate_to_lc),
            ReportCell::Number(m.exchange_rate_to_gc),
            text(&m.asset_class),
        ];
        cells.extend(self.contract_currency.values().map(ReportCell::Number));
        cells.push(text(&m.asset_class));
        cells.extend(self.target_currency.values().map(ReportCell::Number));
        cells
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaturityReport {
    pub report_year: i32,
    pub report_month: u32,
    /// Contracts with a non-zero maturity total, in first-seen order.
    pub rows: Vec<ReportRow>,
    /// Every key the aggregator saw, suppressed ones included.
    pub total_contracts: usize,
}

impl MaturityReport {
    pub fn build(aggregator: MaturityAggregator) -> Self {
        let report_year = aggregator.report_year();
        let report_month = aggregator.report_month();
        let total_contracts = aggregator.contract_count();

        let rows: Vec<ReportRow> = aggregator
            .into_contracts()
            .into_iter()
            .filter(|(key, state)| {
                let keep = state.total() != 0.0;
                if !keep {
                    debug!("Suppressing {} with zero maturity total", key);
                }
                keep
            })
            .map(|(key, state)| ReportRow::from_state(key, state))
            .collect();

        Self {
            report_year,
            report_month,
            rows,
            total_contracts,
        }
    }

    pub fn output_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn find(&self, contract_id: &str, activation_group_id: &str) -> Option<&ReportRow> {
        self.rows.iter().find(|row| {
            row.key.contract_id == contract_id && row.key.activation_group_id == activation_group_id
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::InputRow;

    fn row(contract: &str, period_end: (i32, u32, u32), payment: f64, interest: f64) -> InputRow {
        InputRow {
            contract_id: contract.to_string(),
            activation_group_id: "A1".to_string(),
            period_end_date: NaiveDate::from_ymd_opt(period_end.0, period_end.1, period_end.2),
            payment,
            interest_paid: interest,
            company_currency: "USD".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_header_layout() {
        assert_eq!(OUTPUT_COLUMNS.len(), 51);
        assert_eq!(OUTPUT_COLUMNS[24], "Year 1");
        assert_eq!(OUTPUT_COLUMNS[37], "Asset Class");
        assert_eq!(OUTPUT_COLUMNS[38], "Year 1");
        assert_eq!(OUTPUT_COLUMNS[15], "Accounting Start Date");

        let financial = (1..=51).filter(|c| is_financial_column(*c)).count();
        assert_eq!(financial, 26);
        assert!(!is_financial_column(38));
    }

    #[test]
    fn test_derived_totals() {
        let mut agg = MaturityAggregator::new(2024, 1, 2.0);
        let mut current = row("C1", (2024, 1, 31), 0.0, 0.0);
        current.st_principal_closing = 300.0;
        current.lt_principal_closing = 600.0;
        agg.absorb(&current);
        agg.absorb(&row("C1", (2024, 6, 30), 500.0, -50.0));
        agg.absorb(&row("C1", (2026, 6, 30), 500.0, -25.0));

        let report = MaturityReport::build(agg);
        let figures = report.rows[0].contract_currency;

        assert_eq!(figures.year1, 500.0);
        assert_eq!(figures.year3, 500.0);
        assert_eq!(figures.total, 1000.0);
        assert_eq!(figures.finance_charges, -75.0);
        assert_eq!(figures.total_principal_from_payments, 925.0);
        assert_eq!(figures.total_principal_from_balances, 900.0);
    }

    #[test]
    fn test_zero_total_contracts_are_suppressed() {
        let mut agg = MaturityAggregator::new(2024, 1, 1.0);
        agg.absorb(&row("C1", (2024, 3, 31), 0.0, -80.0));
        agg.absorb(&row("C2", (2024, 3, 31), 100.0, 0.0));
        agg.absorb(&row("C3", (2024, 3, 31), 100.0, 0.0));
        agg.absorb(&row("C3", (2025, 3, 31), -100.0, 0.0));
        agg.absorb(&row("C4", (2023, 3, 31), 100.0, 0.0));

        let report = MaturityReport::build(agg);
        assert_eq!(report.total_contracts, 4);
        assert_eq!(report.output_rows(), 1);
        assert!(report.find("C2", "A1").is_some());
        assert!(report.find("C1", "A1").is_none());
    }

    #[test]
    fn test_target_currency_mirror() {
        let mut agg = MaturityAggregator::new(2024, 1, 0.0537);
        let mut first = row("C1", (2024, 1, 31), 0.0, 0.0);
        first.st_principal_closing = 1234.56;
        first.lt_principal_closing = 7890.12;
        agg.absorb(&first);
        agg.absorb(&row("C1", (2025, 7, 31), 3333.33, -111.11));
        agg.absorb(&row("C1", (2031, 7, 31), 4444.44, -22.22));

        let report = MaturityReport::build(agg);
        let row = &report.rows[0];
        for (cc, tc) in row
            .contract_currency
            .values()
            .iter()
            .zip(row.target_currency.values().iter())
        {
            assert!((cc * 0.0537 - tc).abs() < 1e-9);
        }
    }

    #[test]
    fn test_cells_follow_output_columns() {
        let mut agg = MaturityAggregator::new(2024, 1, 1.5);
        let mut first = row("C1", (2024, 2, 29), 100.0, 0.0);
        first.asset_class = "Buildings".to_string();
        first.activation_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        agg.absorb(&first);

        let report = MaturityReport::build(agg);
        let cells = report.rows[0].cells();

        assert_eq!(cells.len(), OUTPUT_COLUMNS.len());
        assert_eq!(cells[1], ReportCell::Text("C1".to_string()));
        assert_eq!(cells[13], ReportCell::Text("FINANCE".to_string()));
        assert_eq!(
            cells[15],
            ReportCell::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        );
        assert_eq!(cells[16], ReportCell::Blank);
        assert_eq!(cells[22], ReportCell::Number(1.5));
        assert_eq!(cells[24], ReportCell::Number(100.0));
        assert_eq!(cells[37], ReportCell::Text("Buildings".to_string()));
        assert_eq!(cells[38], ReportCell::Number(150.0));
    }
}
