//! Amount and timestamp normalization
//!
//! Every component compares money through the canonical textual form used
//! by the capture sources and the external grid: dot-grouped thousands,
//! comma decimal separator, exactly two fractional digits ("1.234,50").
//! Normalization returns an empty string when no usable value is present;
//! callers treat that as "no value", never as an error.

use bigdecimal::{BigDecimal, RoundingMode, Zero};
use chrono::NaiveDateTime;
use regex::Regex;
use std::str::FromStr;
use std::sync::OnceLock;

const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

fn amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{1,3}(?:\.\d{3})*,\d{1,2}").expect("invalid amount regex"))
}

fn signed_amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"-?\d{1,3}(?:\.\d{3})*,\d{1,2}").expect("invalid signed amount regex")
    })
}

fn date_only_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{2}/\d{2}/\d{4}$").expect("invalid date regex"))
}

fn date_minutes_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\d{2}/\d{2}/\d{4}\s+\d{2}:\d{2}$").expect("invalid date-time regex")
    })
}

/// Pad a single fractional digit to two ("1,5" -> "1,50")
fn pad_fraction(num: &str) -> String {
    match num.rfind(',') {
        Some(pos) if num.len() - pos == 2 => format!("{num}0"),
        _ => num.to_string(),
    }
}

/// Extract the first monetary value from `raw` in canonical form.
///
/// Strips the currency symbol and surrounding whitespace, pads a single
/// fractional digit to two. Returns an empty string when no monetary
/// pattern is found.
pub fn normalize_amount(raw: &str) -> String {
    let cleaned = raw.trim().replace("R$", "");
    match amount_re().find(cleaned.trim()) {
        Some(m) => pad_fraction(m.as_str()),
        None => String::new(),
    }
}

/// Like [`normalize_amount`] but preserves a leading minus sign.
///
/// Used by statement expense aggregation, where negative values carry
/// meaning; grid matching only ever sees unsigned values.
pub fn normalize_amount_signed(raw: &str) -> String {
    let cleaned = raw.trim().replace("R$", "");
    match signed_amount_re().find(cleaned.trim()) {
        Some(m) => pad_fraction(m.as_str()),
        None => String::new(),
    }
}

/// Convert a canonical amount string to its numeric value.
///
/// Empty input yields zero, matching the "no usable value" convention.
pub fn amount_to_number(canonical: &str) -> BigDecimal {
    let trimmed = canonical.trim();
    if trimmed.is_empty() {
        return BigDecimal::zero();
    }
    let plain = pad_fraction(trimmed).replace('.', "").replace(',', ".");
    BigDecimal::from_str(&plain).unwrap_or_else(|_| BigDecimal::zero())
}

/// Format a numeric value back into canonical form.
///
/// Always two fractional digits and dot-grouped thousands; the sign is
/// preserved. Inverse of [`amount_to_number`] for values with at most two
/// fractional digits.
pub fn number_to_amount(value: &BigDecimal) -> String {
    let fixed = value.with_scale_round(2, RoundingMode::HalfUp).to_string();
    let (sign, digits) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, "00"));
    format!("{sign}{},{fraction}", group_thousands(whole))
}

fn group_thousands(digits: &str) -> String {
    let bytes = digits.as_bytes();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 && (bytes.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(*b as char);
    }
    out
}

/// Sum a sequence of canonical amount strings
pub fn sum_amounts<'a>(amounts: impl IntoIterator<Item = &'a str>) -> BigDecimal {
    amounts
        .into_iter()
        .fold(BigDecimal::zero(), |acc, a| acc + amount_to_number(a))
}

/// Normalize a timestamp string to `DD/MM/YYYY HH:MM:SS`.
///
/// Accepts date-only and date-plus-minutes forms, padding the missing
/// components with zeros, then validates with a strict parse. Returns an
/// empty string on anything that does not survive the parse.
pub fn normalize_timestamp(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let padded = if date_only_re().is_match(trimmed) {
        format!("{trimmed} 00:00:00")
    } else if date_minutes_re().is_match(trimmed) {
        format!("{trimmed}:00")
    } else {
        trimmed.to_string()
    };
    match NaiveDateTime::parse_from_str(&padded, TIMESTAMP_FORMAT) {
        Ok(_) => padded,
        Err(_) => String::new(),
    }
}

/// Parse a timestamp string (in any accepted form) into a `NaiveDateTime`
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let normalized = normalize_timestamp(raw);
    if normalized.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(&normalized, TIMESTAMP_FORMAT).ok()
}

/// Render a `NaiveDateTime` in the canonical capture format
pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}
