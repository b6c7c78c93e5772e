use crate::taxonomy::Taxonomy;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Primary hierarchical account code (`"03.1.1.01"`).
pub const CODE_KEY: &str = "bdctalon";
/// Fallback account code, read when the primary code is absent or null.
pub const FALLBACK_CODE_KEY: &str = "bdcodcta";
pub const NAME_KEY: &str = "bdnomcta";
/// Numeric type indicator; values above zero mark an analytic (postable) account.
pub const TYPE_KEY: &str = "bdtipcta";
/// Current accumulated balance, always the last value candidate.
pub const DEFAULT_VALUE_KEY: &str = "bdsaldo_atual";

/// One trial-balance line as delivered by the ledger query service.
///
/// Rows are loosely typed string-keyed records. Only a handful of keys are
/// ever read; anything else is carried along untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RawLedgerRow(Map<String, Value>);

impl RawLedgerRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// The account code value: the primary key unless it is missing or
    /// null, then the fallback key.
    pub fn code_value(&self) -> Option<&Value> {
        match self.0.get(CODE_KEY) {
            Some(v) if !v.is_null() => Some(v),
            _ => self.0.get(FALLBACK_CODE_KEY).filter(|v| !v.is_null()),
        }
    }
}

impl From<Map<String, Value>> for RawLedgerRow {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Ordered list of candidate keys for the value to consolidate.
///
/// The default balance key is always tried last, so a ledger that names
/// its period movement differently still consolidates on accumulated
/// balance when no candidate is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ValueFields(Vec<String>);

impl ValueFields {
    pub fn new<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(candidates.into_iter().map(Into::into).collect())
    }

    pub fn single(key: impl Into<String>) -> Self {
        Self(vec![key.into()])
    }

    /// Effective search order: caller candidates, then the default key.
    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(DEFAULT_VALUE_KEY))
    }

    /// Picks the first candidate present as a key on `row`, whatever its
    /// value. Falls back to reading the default key directly.
    pub fn select<'a>(&self, row: &'a RawLedgerRow) -> Option<&'a Value> {
        match self.candidates().find(|key| row.contains_key(key)) {
            Some(key) => row.get(key),
            None => row.get(DEFAULT_VALUE_KEY),
        }
    }
}

impl Default for ValueFields {
    fn default() -> Self {
        Self::single(DEFAULT_VALUE_KEY)
    }
}

impl From<Vec<String>> for ValueFields {
    fn from(candidates: Vec<String>) -> Self {
        Self(candidates)
    }
}

impl From<ValueFields> for Vec<String> {
    fn from(fields: ValueFields) -> Self {
        fields.0
    }
}

impl From<&str> for ValueFields {
    fn from(key: &str) -> Self {
        Self::single(key)
    }
}

impl From<&[&str]> for ValueFields {
    fn from(keys: &[&str]) -> Self {
        Self::new(keys.iter().copied())
    }
}

/// Settings for one consolidation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ConsolidationConfig {
    #[schemars(
        description = "Ordered candidate keys for the per-row value (e.g. period movement before accumulated balance). 'bdsaldo_atual' is always appended."
    )]
    pub value_fields: ValueFields,

    #[schemars(description = "Chart-of-accounts taxonomy mapping buckets to their source accounts.")]
    pub taxonomy: Taxonomy,
}

impl ConsolidationConfig {
    pub fn with_value_fields(value_fields: impl Into<ValueFields>) -> Self {
        Self {
            value_fields: value_fields.into(),
            ..Self::default()
        }
    }
}

/// Named fields of a consolidated trial balance, keyed by the names the
/// simulation form uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AggregateField {
    TotalRevenue,
    GrossRevenue,
    GoodsRevenue,
    ServicesRevenue,
    ExportRevenue,
    FinancialRevenue,
    OtherRevenues,
    RevenueDeductions,
    RevenueOther,
    TotalCost,
    GoodsCost,
    ServicesCost,
    OtherCost,
    TotalPayroll,
    EmployerInss,
    OperatingExpenses,
    OtherExpenses,
    PisCredits,
    CofinsCredits,
}

impl AggregateField {
    pub const ALL: [AggregateField; 19] = [
        Self::TotalRevenue,
        Self::GrossRevenue,
        Self::GoodsRevenue,
        Self::ServicesRevenue,
        Self::ExportRevenue,
        Self::FinancialRevenue,
        Self::OtherRevenues,
        Self::RevenueDeductions,
        Self::RevenueOther,
        Self::TotalCost,
        Self::GoodsCost,
        Self::ServicesCost,
        Self::OtherCost,
        Self::TotalPayroll,
        Self::EmployerInss,
        Self::OperatingExpenses,
        Self::OtherExpenses,
        Self::PisCredits,
        Self::CofinsCredits,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::TotalRevenue => "receita_total",
            Self::GrossRevenue => "receita_bruta",
            Self::GoodsRevenue => "receita_mercadorias",
            Self::ServicesRevenue => "receita_servicos",
            Self::ExportRevenue => "receita_exportacao",
            Self::FinancialRevenue => "receita_financeira",
            Self::OtherRevenues => "outras_receitas",
            Self::RevenueDeductions => "receita_deducoes",
            Self::RevenueOther => "receita_outros",
            Self::TotalCost => "custo_total",
            Self::GoodsCost => "custo_mercadorias",
            Self::ServicesCost => "custo_servicos",
            Self::OtherCost => "custo_outros",
            Self::TotalPayroll => "folha_total",
            Self::EmployerInss => "inss_patronal",
            Self::OperatingExpenses => "despesas_operacionais",
            Self::OtherExpenses => "despesas_outros",
            Self::PisCredits => "creditos_pis",
            Self::CofinsCredits => "creditos_cofins",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }
}

impl fmt::Display for AggregateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Output of a consolidation: every field rounded to two decimals, or no
/// fields at all when there was nothing to consolidate.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, f64>",
    into = "BTreeMap<String, f64>"
)]
pub struct FiscalAggregate {
    values: BTreeMap<AggregateField, f64>,
}

impl FiscalAggregate {
    pub fn empty() -> Self {
        Self::default()
    }

    /// An empty aggregate means "insufficient data", not an all-zero company.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, field: AggregateField) -> Option<f64> {
        self.values.get(&field).copied()
    }

    pub fn get_key(&self, key: &str) -> Option<f64> {
        AggregateField::from_key(key).and_then(|field| self.get(field))
    }

    pub fn iter(&self) -> impl Iterator<Item = (AggregateField, f64)> + '_ {
        self.values.iter().map(|(field, value)| (*field, *value))
    }

    pub(crate) fn insert(&mut self, field: AggregateField, value: f64) {
        self.values.insert(field, value);
    }

    pub fn to_map(&self) -> BTreeMap<String, f64> {
        self.values
            .iter()
            .map(|(field, value)| (field.key().to_string(), *value))
            .collect()
    }
}

impl From<FiscalAggregate> for BTreeMap<String, f64> {
    fn from(aggregate: FiscalAggregate) -> Self {
        aggregate.to_map()
    }
}

impl TryFrom<BTreeMap<String, f64>> for FiscalAggregate {
    type Error = String;

    fn try_from(map: BTreeMap<String, f64>) -> std::result::Result<Self, Self::Error> {
        let mut aggregate = FiscalAggregate::empty();
        for (key, value) in map {
            let field = AggregateField::from_key(&key)
                .ok_or_else(|| format!("Unknown aggregate field '{}'", key))?;
            aggregate.insert(field, value);
        }
        Ok(aggregate)
    }
}
