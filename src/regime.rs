use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Brazilian corporate tax regime as used by the simulations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
pub enum TaxRegime {
    #[schemars(description = "Simples Nacional")]
    Simples,
    #[schemars(description = "Lucro Presumido")]
    Presumido,
    #[schemars(description = "Lucro Real")]
    Real,
    #[default]
    Outras,
}

impl TaxRegime {
    /// Reads the free-text regime column of the management spreadsheet.
    pub fn from_spreadsheet(text: Option<&str>) -> Self {
        let value = match text.map(str::trim) {
            Some(v) if !v.is_empty() => v.to_lowercase(),
            _ => return Self::Outras,
        };
        let compact = value.replace(' ', "");

        match value.as_str() {
            "sn" | "simples" | "simples nacional" => return Self::Simples,
            "lp" | "lucro presumido" => return Self::Presumido,
            "lr" | "lucro real" => return Self::Real,
            _ => {}
        }

        if value.contains("simples") || compact.starts_with("sn") {
            Self::Simples
        } else if value.contains("presum") || compact.starts_with("lp") {
            Self::Presumido
        } else if value.contains("real") || compact.starts_with("lr") {
            Self::Real
        } else {
            Self::Outras
        }
    }

    /// The regime registered for the company wins unless it is unknown.
    pub fn preferred(registered: Option<TaxRegime>, spreadsheet: Option<TaxRegime>) -> Option<Self> {
        match registered {
            Some(regime) if regime != Self::Outras => Some(regime),
            _ => spreadsheet,
        }
    }
}

impl fmt::Display for TaxRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Simples => "Simples",
            Self::Presumido => "Presumido",
            Self::Real => "Real",
            Self::Outras => "Outras",
        };
        f.write_str(label)
    }
}
