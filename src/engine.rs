use crate::ingestion::InputRow;
use crate::utils::{calculate_period_bucket, calculate_term, is_after_report_period, is_report_period};
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub const DEFAULT_LEASE_CLASSIFICATION: &str = "FINANCE";
pub const EXCHANGE_RATE_TO_LOCAL: f64 = 1.0;

/// Identifies one output row: a contract together with one of its activation groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AggregationKey {
    pub contract_id: String,
    pub activation_group_id: String,
}

impl AggregationKey {
    /// `None` when either identifier is blank.
    pub fn from_row(row: &InputRow) -> Option<Self> {
        if row.contract_id.is_empty() || row.activation_group_id.is_empty() {
            return None;
        }
        Some(Self {
            contract_id: row.contract_id.clone(),
            activation_group_id: row.activation_group_id.clone(),
        })
    }
}

impl fmt::Display for AggregationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.contract_id, self.activation_group_id)
    }
}

/// Descriptive fields captured from the first row seen for a key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractMetadata {
    pub erp_system_id: String,
    pub contract_id: String,
    pub internal_contract_reference: String,
    pub external_contract_reference: String,
    pub contract_name: String,
    pub company_code: String,
    pub business_unit: String,
    pub trading_partner_id: String,
    pub trading_partner_name: String,
    pub profit_center: String,
    pub cost_center: String,
    pub responsible_cost_center: String,
    pub activation_group_id: String,
    pub lease_classification: String,
    pub activation_group_status: String,
    pub accounting_start_date: Option<NaiveDate>,
    pub likely_expiration_date: Option<NaiveDate>,
    pub accounting_term_months: i32,
    pub accounting_term_days: i64,
    pub contract_currency: String,
    /// Taken from the row's company currency, never from run parameters.
    pub target_currency: String,
    pub exchange_rate_to_lc: f64,
    /// Run exchange rate, frozen at capture time.
    pub exchange_rate_to_gc: f64,
    pub asset_class: String,
}

impl ContractMetadata {
    pub fn capture(row: &InputRow, exchange_rate: f64) -> Self {
        let (months, days) = calculate_term(row.activation_date, row.end_date);

        Self {
            erp_system_id: row.system_id.clone(),
            contract_id: row.contract_id.clone(),
            internal_contract_reference: row.internal_reference.clone(),
            external_contract_reference: row.external_reference.clone(),
            contract_name: row.contract_name.clone(),
            company_code: row.company_code.clone(),
            business_unit: row.business_unit.clone(),
            trading_partner_id: row.trading_partner.clone(),
            // Not present in the source export.
            trading_partner_name: String::new(),
            profit_center: row.profit_center.clone(),
            cost_center: row.cost_center.clone(),
            responsible_cost_center: String::new(),
            activation_group_id: row.activation_group_id.clone(),
            lease_classification: DEFAULT_LEASE_CLASSIFICATION.to_string(),
            activation_group_status: row.activation_group_status.clone(),
            accounting_start_date: row.activation_date,
            likely_expiration_date: row.end_date,
            accounting_term_months: months,
            accounting_term_days: days,
            contract_currency: row.contract_currency.clone(),
            target_currency: row.company_currency.clone(),
            exchange_rate_to_lc: EXCHANGE_RATE_TO_LOCAL,
            exchange_rate_to_gc: exchange_rate,
            asset_class: row.asset_class.clone(),
        }
    }
}

/// Running totals for one key. Bucket sums and finance charges only grow; the principal
/// balances hold whatever the latest report-month row said.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractState {
    pub metadata: ContractMetadata,
    /// Year 1..6 then Thereafter.
    pub buckets: [f64; 7],
    pub finance_charges: f64,
    pub st_principal: f64,
    pub lt_principal: f64,
}

impl ContractState {
    fn new(metadata: ContractMetadata) -> Self {
        Self {
            metadata,
            buckets: [0.0; 7],
            finance_charges: 0.0,
            st_principal: 0.0,
            lt_principal: 0.0,
        }
    }

    pub fn total(&self) -> f64 {
        self.buckets.iter().sum()
    }
}

/// Accumulates payment-schedule rows per (contract, activation group) for one report date.
///
/// Keys iterate in the order they were first seen.
#[derive(Debug, Clone)]
pub struct MaturityAggregator {
    report_year: i32,
    report_month: u32,
    exchange_rate: f64,
    positions: HashMap<AggregationKey, usize>,
    contracts: Vec<(AggregationKey, ContractState)>,
}

impl MaturityAggregator {
    pub fn new(report_year: i32, report_month: u32, exchange_rate: f64) -> Self {
        Self {
            report_year,
            report_month,
            exchange_rate,
            positions: HashMap::new(),
            contracts: Vec::new(),
        }
    }

    /// Folds one row into its key's state. Returns `false` if the row had no usable key.
    pub fn absorb(&mut self, row: &InputRow) -> bool {
        let Some(key) = AggregationKey::from_row(row) else {
            debug!("Skipping row without contract or activation group id");
            return false;
        };

        let (report_year, report_month) = (self.report_year, self.report_month);
        let state = self.state_for(key, row);

        let Some(period_end) = row.period_end_date else {
            return true;
        };

        if let Some(slot) = calculate_period_bucket(period_end, report_year, report_month).slot() {
            state.buckets[slot] += row.payment;
        }

        if is_report_period(period_end, report_year, report_month) {
            state.st_principal = row.st_principal_closing;
            state.lt_principal = row.lt_principal_closing;
        }

        if is_after_report_period(period_end, report_year, report_month) {
            state.finance_charges += row.interest_paid.abs();
        }

        true
    }

    /// Insert-if-absent: metadata is captured only when the key is new.
    fn state_for(&mut self, key: AggregationKey, row: &InputRow) -> &mut ContractState {
        let idx = match self.positions.get(&key) {
            Some(&idx) => idx,
            None => {
                let idx = self.contracts.len();
                let metadata = ContractMetadata::capture(row, self.exchange_rate);
                self.positions.insert(key.clone(), idx);
                self.contracts.push((key, ContractState::new(metadata)));
                idx
            }
        };
        &mut self.contracts[idx].1
    }

    pub fn report_year(&self) -> i32 {
        self.report_year
    }

    pub fn report_month(&self) -> u32 {
        self.report_month
    }

    pub fn contract_count(&self) -> usize {
        self.contracts.len()
    }

    pub fn get(&self, key: &AggregationKey) -> Option<&ContractState> {
        self.positions.get(key).map(|&idx| &self.contracts[idx].1)
    }

    pub fn total(&self, key: &AggregationKey) -> f64 {
        self.get(key).map(ContractState::total).unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AggregationKey, &ContractState)> {
        self.contracts.iter().map(|(key, state)| (key, state))
    }

    pub fn into_contracts(self) -> Vec<(AggregationKey, ContractState)> {
        self.contracts
    }
}
