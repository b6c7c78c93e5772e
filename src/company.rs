use crate::error::{ConsolidationError, Result};
use crate::ingestion::{value_to_text, CompanyDetails};
use crate::schema::RawLedgerRow;
use crate::utils::digits_only;
use serde::{Deserialize, Serialize};

const NAME_KEYS: [&str; 3] = ["bdnomemp", "razao_social", "nome_empresa"];
const NICKNAME_KEYS: [&str; 2] = ["bdapeemp", "apelido_emp"];
const CNPJ_KEYS: [&str; 5] = [
    "bdcnpjemp",
    "cnpj",
    "bdcpfcnpjverificado",
    "bdcpfcnpj",
    "cnpj_empresa",
];
const CITY_KEYS: [&str; 6] = [
    "bdmunicipio",
    "municipio",
    "bdnomemunicipio",
    "bdnomemun",
    "cidade",
    "bdnomemunicip",
];
const STATE_KEYS: [&str; 3] = ["bdufemp", "uf", "bduf"];
const CNAE_KEYS: [&str; 4] = ["bdcnae", "bdcnaeemp", "cnae", "cnae_principal"];

const CNPJ_LENGTH: usize = 14;

/// Company identification needed to register the simulation's company.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub razao_social: String,
    pub cnpj: String,
    pub cnae_principal: String,
    pub municipio: String,
    pub uf: String,
}

impl CompanyRecord {
    fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.razao_social.is_empty() {
            missing.push("legal name".to_string());
        }
        if self.cnpj.len() != CNPJ_LENGTH {
            missing.push("CNPJ".to_string());
        }
        if self.cnae_principal.is_empty() {
            missing.push("CNAE".to_string());
        }
        missing
    }
}

/// Resolves the company behind a trial balance, preferring the ledger's
/// company details and falling back to columns found on the rows.
pub fn resolve_company(
    details: Option<&CompanyDetails>,
    rows: &[RawLedgerRow],
) -> Result<CompanyRecord> {
    if let Some(details) = details {
        let record = from_details(details);
        if record.missing_fields().is_empty() {
            return Ok(record);
        }
    }

    company_from_rows(rows)
}

fn from_details(details: &CompanyDetails) -> CompanyRecord {
    let text = |v: &Option<String>| v.as_deref().unwrap_or("").trim().to_string();
    CompanyRecord {
        razao_social: text(&details.razao_social),
        cnpj: digits_only(details.cnpj.as_deref().unwrap_or("")),
        cnae_principal: text(&details.cnae),
        municipio: text(&details.municipio),
        uf: String::new(),
    }
}

pub fn company_from_rows(rows: &[RawLedgerRow]) -> Result<CompanyRecord> {
    if rows.is_empty() {
        return Err(ConsolidationError::NoLedgerRows);
    }

    let base = rows
        .iter()
        .find(|row| {
            row.fields()
                .keys()
                .any(|key| key.to_lowercase().contains("cnpj"))
        })
        .ok_or(ConsolidationError::MissingCnpj)?;

    let razao_social = pick_value(base, &NAME_KEYS)
        .or_else(|| pick_value(base, &NICKNAME_KEYS))
        .unwrap_or_default();
    let uf: String = pick_value(base, &STATE_KEYS)
        .map(|s| s.to_uppercase().chars().take(2).collect())
        .unwrap_or_default();

    let record = CompanyRecord {
        razao_social,
        cnpj: digits_only(&pick_value(base, &CNPJ_KEYS).unwrap_or_default()),
        cnae_principal: pick_value(base, &CNAE_KEYS).unwrap_or_default(),
        municipio: pick_value(base, &CITY_KEYS).unwrap_or_default(),
        uf,
    };

    let missing = record.missing_fields();
    if !missing.is_empty() {
        return Err(ConsolidationError::InsufficientCompanyData { missing });
    }

    Ok(record)
}

/// First non-blank value among `candidates`. Each candidate matches a key
/// case-insensitively, or failing that, the first key that contains it.
fn pick_value(row: &RawLedgerRow, candidates: &[&str]) -> Option<String> {
    let keys: Vec<(String, &String)> = row
        .fields()
        .keys()
        .map(|key| (key.to_lowercase(), key))
        .collect();

    candidates.iter().find_map(|candidate| {
        let candidate = candidate.to_lowercase();
        let key = keys
            .iter()
            .find(|(lower, _)| *lower == candidate)
            .or_else(|| keys.iter().find(|(lower, _)| lower.contains(&candidate)))
            .map(|(_, original)| original.as_str())?;

        let text = value_to_text(row.get(key)?);
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}
