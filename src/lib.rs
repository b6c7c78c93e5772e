//! # Balancete Consolidator
//!
//! A library for turning a trial balance (balancete) exported by the ledger
//! system into the fiscal aggregates used to pre-fill a tax simulation.
//!
//! ## Core Concepts
//!
//! - **Ledger Rows**: Loosely typed records with a hierarchical account code,
//!   a name, a leaf/aggregator indicator and one or more balance columns
//! - **Account Codes**: Normalized so that `"03.1.1,05"` and `"3.1.1.5"` match
//! - **Taxonomy**: A data table mapping each fiscal bucket to the accounts
//!   that feed it (exact aggregator lines, prefix sums, or name heuristics)
//! - **Fiscal Aggregate**: Flat map of named figures rounded to two decimals,
//!   empty when there was nothing to consolidate
//!
//! ## Example
//!
//! ```rust
//! use balancete_consolidator::*;
//! use serde_json::json;
//!
//! let rows = rows_from_value(&json!([
//!     { "bdctalon": "03", "bdsaldo_atual": "1.000,00", "bdtipcta": 0 },
//!     { "bdctalon": "03.1.1.01", "bdsaldo_atual": "600,00", "bdtipcta": 1 },
//!     { "bdctalon": "03.1.1.03", "bdsaldo_atual": "400,00", "bdtipcta": 1 },
//! ]));
//!
//! let aggregate = consolidate(&rows);
//! assert_eq!(aggregate.get(AggregateField::GoodsRevenue), Some(600.0));
//! assert_eq!(aggregate.get(AggregateField::TotalRevenue), Some(1000.0));
//! ```

pub mod account_code;
pub mod company;
pub mod engine;
pub mod error;
pub mod ingestion;
pub mod prefill;
pub mod regime;
pub mod schema;
pub mod taxonomy;
pub mod utils;

pub use account_code::{normalize_prefix, AccountCode};
pub use company::{company_from_rows, resolve_company, CompanyRecord};
pub use engine::{
    consolidate_rows, is_credit_line, sum_by_predicate, sum_by_prefixes, value_at, Resolver,
    RevenueFigures, RevenueSource,
};
pub use error::{ConsolidationError, Result};
pub use ingestion::*;
pub use prefill::prefill_form;
pub use regime::TaxRegime;
pub use schema::*;
pub use taxonomy::{Bucket, BucketRule, BucketSource, Taxonomy, CREDIT_SYNONYMS};
pub use utils::*;

use log::{debug, info};
use serde::Serialize;
use serde_json::Value;

/// Outcome of importing one trial balance into a simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceteImport {
    pub company: CompanyRecord,
    pub aggregate: FiscalAggregate,
    pub regime: Option<TaxRegime>,
}

pub struct BalanceteConsolidator {
    config: ConsolidationConfig,
}

impl BalanceteConsolidator {
    pub fn new(config: ConsolidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConsolidationConfig {
        &self.config
    }

    pub fn consolidate(&self, rows: &[RawLedgerRow]) -> FiscalAggregate {
        consolidate_rows(rows, &self.config)
    }

    /// Imports a ledger query response: resolves the company and
    /// consolidates the rows. A spreadsheet regime text, when given, is
    /// normalized into the returned regime.
    pub fn import(
        &self,
        envelope: &BalanceteEnvelope,
        spreadsheet_regime: Option<&str>,
    ) -> Result<BalanceteImport> {
        if envelope.dados.is_empty() {
            return Err(ConsolidationError::NoLedgerRows);
        }

        info!(
            "Importing trial balance for company {} ({} rows, period {} to {})",
            envelope.empresa,
            envelope.dados.len(),
            envelope.periodo.inicio,
            envelope.periodo.fim
        );

        let company = resolve_company(envelope.company_details(), &envelope.dados)?;
        debug!("Resolved company {} ({})", company.razao_social, company.cnpj);

        let aggregate = self.consolidate(&envelope.dados);
        if aggregate.is_empty() {
            return Err(ConsolidationError::Unconsolidated);
        }

        let regime = TaxRegime::preferred(
            None,
            spreadsheet_regime.map(|text| TaxRegime::from_spreadsheet(Some(text))),
        );

        Ok(BalanceteImport {
            company,
            aggregate,
            regime,
        })
    }
}

impl Default for BalanceteConsolidator {
    fn default() -> Self {
        Self::new(ConsolidationConfig::default())
    }
}

/// Consolidates on the current accumulated balance with the standard chart.
pub fn consolidate(rows: &[RawLedgerRow]) -> FiscalAggregate {
    BalanceteConsolidator::default().consolidate(rows)
}

/// Consolidates on the first of `value_fields` present on each row.
pub fn consolidate_with(rows: &[RawLedgerRow], value_fields: impl Into<ValueFields>) -> FiscalAggregate {
    BalanceteConsolidator::new(ConsolidationConfig::with_value_fields(value_fields)).consolidate(rows)
}

/// Consolidates an untyped payload. Anything but an array of rows gives an
/// empty aggregate.
pub fn consolidate_value(payload: &Value, config: &ConsolidationConfig) -> FiscalAggregate {
    consolidate_rows(&rows_from_value(payload), config)
}

pub fn import_balancete(
    envelope: &BalanceteEnvelope,
    config: ConsolidationConfig,
    spreadsheet_regime: Option<&str>,
) -> Result<BalanceteImport> {
    BalanceteConsolidator::new(config).import(envelope, spreadsheet_regime)
}
