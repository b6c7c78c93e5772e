use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsolidationError {
    #[error("Trial balance has no rows for the requested parameters")]
    NoLedgerRows,

    #[error("Trial balance rows could not be consolidated with the current chart of accounts")]
    Unconsolidated,

    #[error("No CNPJ found in the trial balance rows")]
    MissingCnpj,

    #[error("Insufficient company data to register automatically: missing {}", .missing.join(", "))]
    InsufficientCompanyData { missing: Vec<String> },

    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConsolidationError>;
