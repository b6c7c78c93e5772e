use crate::account_code::{number_to_text, AccountCode};
use crate::error::Result;
use crate::schema::{RawLedgerRow, ValueFields, NAME_KEY, TYPE_KEY};
use crate::utils::parse_ledger_date;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A ledger row ready for consolidation.
///
/// Derived fields sit next to a borrow of the source row, so consumers that
/// need other raw columns can still reach them through [`PreparedRow::source`].
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRow<'a> {
    pub source: &'a RawLedgerRow,
    pub code: AccountCode,
    pub balance: f64,
    pub name: String,
    pub is_leaf: bool,
}

impl PreparedRow<'_> {
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.source.get(key)
    }
}

pub fn prepare_rows<'a>(rows: &'a [RawLedgerRow], value_fields: &ValueFields) -> Vec<PreparedRow<'a>> {
    rows.iter()
        .map(|row| prepare_row(row, value_fields))
        .collect()
}

pub fn prepare_row<'a>(row: &'a RawLedgerRow, value_fields: &ValueFields) -> PreparedRow<'a> {
    let code = row
        .code_value()
        .map(AccountCode::from_value)
        .unwrap_or_default();

    let balance = value_fields.select(row).map(parse_balance).unwrap_or(0.0);

    let name = row
        .get(NAME_KEY)
        .map(value_to_text)
        .unwrap_or_default()
        .to_lowercase();

    let is_leaf = row.get(TYPE_KEY).map(loose_number).unwrap_or(0.0) > 0.0;

    PreparedRow {
        source: row,
        code,
        balance,
        name,
        is_leaf,
    }
}

/// Reads ledger rows out of an untyped JSON payload. Anything other than
/// an array yields no rows; non-object elements become empty rows.
pub fn rows_from_value(value: &Value) -> Vec<RawLedgerRow> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(map) => RawLedgerRow::from(map.clone()),
                _ => RawLedgerRow::new(),
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Parses a balance that may arrive as a number or as pt-BR text
/// (`"1.234,56"`). Anything unparseable counts as zero, and so do booleans,
/// arrays and objects, even a single-element array such as `[5]`.
pub fn parse_balance(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_balance_text(s),
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => 0.0,
    }
}

pub fn parse_balance_text(text: &str) -> f64 {
    let cleaned = text.trim().replace('.', "").replacen(',', ".", 1);
    if cleaned.is_empty() {
        return 0.0;
    }
    match cleaned.parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => 0.0,
    }
}

/// Numeric reading of a loosely typed indicator field; NaN when it is not
/// a number at all.
fn loose_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// Text of a free-form field; null, false and empty values read as "".
pub(crate) fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(false) => String::new(),
        Value::Bool(true) => "true".to_string(),
        Value::Number(n) => number_to_text(n),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CompanyDetails {
    pub codigo: Option<i64>,
    pub razao_social: Option<String>,
    pub cnpj: Option<String>,
    pub cnae: Option<String>,
    pub cod_cidade: Option<Value>,
    pub municipio: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AccountRange {
    pub inicio: i64,
    pub fim: i64,
}

/// Query period as echoed by the ledger service (`DD.MM.YYYY` dates).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Period {
    pub inicio: String,
    pub fim: String,
    pub referencia: String,
}

impl Period {
    pub fn start_date(&self) -> Result<NaiveDate> {
        parse_ledger_date(&self.inicio)
    }

    pub fn end_date(&self) -> Result<NaiveDate> {
        parse_ledger_date(&self.fim)
    }
}

/// Response of the trial-balance query service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BalanceteEnvelope {
    pub empresa: i64,
    pub empresa_detalhes: Option<CompanyDetails>,
    pub plano_contas: String,
    pub intervalo_contas: Option<AccountRange>,
    pub periodo: Period,
    pub total_registros: usize,
    pub dados: Vec<RawLedgerRow>,
}

impl BalanceteEnvelope {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Company details are `{}` when the ledger has no record; treat that
    /// the same as absent.
    pub fn company_details(&self) -> Option<&CompanyDetails> {
        self.empresa_detalhes
            .as_ref()
            .filter(|details| **details != CompanyDetails::default())
    }
}
