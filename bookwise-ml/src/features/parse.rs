//! Parsers for string-encoded listing fields.

use crate::error::PrepError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Parse a percentage such as `"96%"` into `96.0`.
pub fn parse_percent(raw: &str) -> Result<f64, PrepError> {
    let trimmed = raw.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed);
    number
        .trim()
        .parse::<f64>()
        .map_err(|_| PrepError::data_format(format!("invalid percentage '{raw}'")))
}

/// Parse a currency amount such as `"$1,234.00"` into `1234.0`.
///
/// The leading currency symbol and the two-digit decimal suffix are stripped
/// and thousands separators removed, so amounts are whole currency units.
pub fn parse_currency(raw: &str) -> Result<f64, PrepError> {
    let invalid = || PrepError::data_format(format!("invalid currency amount '{raw}'"));
    let trimmed = raw.trim();
    let unsigned = trimmed
        .char_indices()
        .next()
        .filter(|(_, c)| !c.is_ascii_digit())
        .map(|(_, c)| &trimmed[c.len_utf8()..])
        .ok_or_else(invalid)?;

    let whole = match unsigned.rsplit_once('.') {
        Some((whole, cents)) if cents.len() == 2 && cents.bytes().all(|b| b.is_ascii_digit()) => {
            whole
        }
        Some(_) => return Err(invalid()),
        None => unsigned,
    };

    let digits: String = whole.chars().filter(|c| *c != ',').collect();
    if digits.is_empty() {
        return Err(invalid());
    }
    digits.parse::<f64>().map_err(|_| invalid())
}

/// Parse an ISO calendar date, tolerating a trailing time component.
pub fn parse_date(raw: &str) -> Result<NaiveDate, PrepError> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| DateTime::parse_from_rfc3339(trimmed).map(|dt| dt.date_naive()))
        .map_err(|_| PrepError::data_format(format!("invalid date '{raw}'")))
}
