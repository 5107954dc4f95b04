//! Locale-aware date and amount normalization.
//!
//! BBVA exports use `DD/MM/YYYY` dates and the Spanish number convention:
//! dot as thousands separator, comma as decimal separator (`-1.234,56`).
//! Every parser routes its raw tokens through these two functions.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("unrecognized or calendar-invalid date: {0}")]
    InvalidDate(String),
    #[error("empty amount")]
    EmptyAmount,
    #[error("amount has non-numeric residue: {0}")]
    InvalidAmount(String),
}

/// Parses a locale-formatted date string.
///
/// Accepts `DD/MM/YYYY` (primary), `DD-MM-YYYY`, `YYYY-MM-DD` and an
/// Excel serial-date number (days since 1899-12-30, the convention the
/// spreadsheet exports carry). Calendar-invalid dates such as
/// `31/02/2023` fail; they are never clamped to a nearby valid day.
pub fn parse_locale_date(s: &str) -> Result<NaiveDate, NormalizeError> {
    let s = s.trim();

    if let Ok(date) = NaiveDate::parse_from_str(s, "%d/%m/%Y") {
        return Ok(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%d-%m-%Y") {
        return Ok(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }

    // Spreadsheet serial date (a bare number like 45292)
    if let Ok(serial) = s.parse::<f64>() {
        if let Some(date) = serial_to_date(serial) {
            return Ok(date);
        }
    }

    Err(NormalizeError::InvalidDate(s.to_string()))
}

/// Converts an Excel serial-date number to a calendar date.
///
/// Excel counts days since 1899-12-30 (absorbing the 1900 leap-year bug).
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..100_000.0).contains(&serial) {
        return None;
    }
    let days = serial.floor() as i64;
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(chrono::Duration::days(days))
}

/// Parses a locale-formatted amount string into a signed value.
///
/// Primary convention: dot = thousands separator, comma = decimal
/// separator (`-1.234,56` -> -1234.56). A comma-less string whose dots
/// sit in groups of exactly three digits keeps the dots as grouping, so
/// `1.500` is fifteen hundred, never one-and-a-half. When a comma is
/// followed by a dot (`1,234.56`) the commas are American grouping and
/// are stripped. A trailing `-` (used by some export variants) marks the
/// value negative and wins over any computed sign.
pub fn parse_locale_amount(s: &str) -> Result<f64, NormalizeError> {
    let raw = s.trim();
    if raw.is_empty() || raw == "-" || raw == "--" {
        return Err(NormalizeError::EmptyAmount);
    }

    let mut cleaned = raw
        .replace('€', "")
        .replace("EUR", "")
        .replace(' ', "")
        .replace('\u{a0}', "");

    let mut negative = false;
    if cleaned.ends_with('-') {
        negative = true;
        cleaned.pop();
    }
    if let Some(rest) = cleaned.strip_prefix('-') {
        negative = true;
        cleaned = rest.to_string();
    } else if let Some(rest) = cleaned.strip_prefix('+') {
        cleaned = rest.to_string();
    }
    if cleaned.is_empty() {
        return Err(NormalizeError::InvalidAmount(raw.to_string()));
    }

    let normalized = if cleaned.contains(',') {
        match (cleaned.rfind(','), cleaned.rfind('.')) {
            // "1,234.56": dot after the last comma, commas are grouping
            (Some(c), Some(d)) if d > c => cleaned.replace(',', ""),
            // "1.234,56" / "45,67": comma is the decimal separator
            _ => cleaned.replace('.', "").replace(',', "."),
        }
    } else if dots_are_grouping(&cleaned) {
        cleaned.replace('.', "")
    } else {
        cleaned
    };

    let magnitude: f64 = normalized
        .parse()
        .map_err(|_| NormalizeError::InvalidAmount(raw.to_string()))?;
    if !magnitude.is_finite() {
        return Err(NormalizeError::InvalidAmount(raw.to_string()));
    }

    Ok(if negative {
        -magnitude.abs()
    } else {
        magnitude
    })
}

/// True when a comma-less digit string uses dots purely as thousands
/// grouping: a leading group of 1-3 digits followed by dot-separated
/// groups of exactly three (`1.500`, `1.234.567`).
fn dots_are_grouping(s: &str) -> bool {
    if !s.contains('.') {
        return false;
    }
    let mut parts = s.split('.');
    let first = match parts.next() {
        Some(p) => p,
        None => return false,
    };
    if first.is_empty() || first.len() > 3 || !first.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    parts.all(|p| p.len() == 3 && p.chars().all(|c| c.is_ascii_digit()))
}

/// Rounds to 2 decimal digits of currency precision.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// True when the value is representable with at most 2 decimal digits.
pub fn has_at_most_two_decimals(value: f64) -> bool {
    let scaled = value * 100.0;
    (scaled - scaled.round()).abs() < 1e-6
}
