use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A chart-of-accounts code in the two forms used for matching.
///
/// - `raw`: the trimmed input with comma runs collapsed into a single dot
///   (`"03,1,1"` becomes `"03.1.1"`), used as an exact-match fallback.
/// - `normalized`: every dot segment reduced to its digits without leading
///   zeros (`"03.1.1.01"` becomes `"3.1.1.1"`). A segment with no digits
///   becomes `"0"`, never an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountCode {
    pub raw: String,
    pub normalized: String,
}

impl AccountCode {
    pub fn parse(code: &str) -> Self {
        if code.is_empty() {
            return Self::default();
        }

        let raw = collapse_commas(code.trim());
        let normalized = raw
            .split('.')
            .map(normalize_segment)
            .collect::<Vec<_>>()
            .join(".");

        Self { raw, normalized }
    }

    /// Normalizes a code read from a loosely typed ledger field.
    ///
    /// `null`, `false` and the empty string yield an empty code, while the
    /// number `0` is a real code (`"0"`).
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null | Value::Bool(false) => Self::default(),
            Value::Bool(true) => Self::parse("true"),
            Value::Number(n) => Self::parse(&number_to_text(n)),
            Value::String(s) => Self::parse(s),
            Value::Array(_) | Value::Object(_) => Self::parse(&value.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }

    /// Whether `self` falls under `prefix` (a normalized code) by plain
    /// string prefix on the normalized form.
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.normalized.starts_with(prefix)
    }
}

/// Normalizes a code, returning only the normalized half.
pub fn normalize_prefix(prefix: &str) -> String {
    AccountCode::parse(prefix).normalized
}

fn collapse_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_comma = false;
    for ch in text.chars() {
        if ch == ',' {
            if !previous_comma {
                out.push('.');
            }
            previous_comma = true;
        } else {
            out.push(ch);
            previous_comma = false;
        }
    }
    out
}

fn normalize_segment(segment: &str) -> String {
    let digits: String = segment.chars().filter(|c| c.is_ascii_digit()).collect();
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Renders a JSON number the way a ledger export prints it: whole floats
/// lose their trailing `.0`.
pub(crate) fn number_to_text(n: &serde_json::Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
            format!("{}", f as i64)
        }
        Some(f) => format!("{}", f),
        None => n.to_string(),
    }
}
