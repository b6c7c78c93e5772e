use crate::error::{ConsolidationError, Result};
use chrono::NaiveDate;

const LEDGER_DATE_FORMATS: [&str; 4] = ["%Y.%m.%d", "%Y-%m-%d", "%d/%m/%Y", "%d.%m.%Y"];

/// Rounds to two decimals, half away from zero. Non-finite input and
/// negative zero both come out as `0.0`.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let rounded = (value * 100.0).round() / 100.0;
    rounded + 0.0
}

/// Parses the date spellings accepted by the ledger query service.
pub fn parse_ledger_date(text: &str) -> Result<NaiveDate> {
    let trimmed = text.trim();
    LEDGER_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| ConsolidationError::InvalidDate(text.to_string()))
}

/// Formats a date the way the ledger stored procedure expects (`DD.MM.YYYY`).
pub fn format_ledger_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// Competence (`YYYYMM`) for an ISO date such as `2024-03-31`.
pub fn competence_from_iso(date_iso: &str) -> String {
    date_iso.replace('-', "").chars().take(6).collect()
}

pub fn digits_only(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// pt-BR rendering with two decimals: `1234.5` becomes `"1.234,50"`.
pub fn format_brl(value: f64) -> String {
    let rounded = round2(value);
    let fixed = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if rounded < 0.0 {
        format!("-{},{}", grouped, frac_part)
    } else {
        format!("{},{}", grouped, frac_part)
    }
}
