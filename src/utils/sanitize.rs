//! Type-directed coercion of raw cell values.
//!
//! Nothing in here fails: malformed input degrades to `Value::Null` so a
//! single bad cell never aborts a multi-million row load.

use crate::models::{FieldType, Value};
use crate::utils::constants::STATION_ID_WIDTH;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Coerce a raw cell into a storage-ready scalar.
///
/// Absent and empty input is always null, whatever the declared type.
pub fn sanitize(raw: Option<&str>, field_type: FieldType) -> Value {
    let raw = match raw {
        Some(s) if !s.is_empty() => s,
        _ => return Value::Null,
    };

    match field_type {
        FieldType::String => Value::Text(raw.trim().to_string()),
        FieldType::Int => parse_int_prefix(raw).map_or(Value::Null, Value::Int),
        FieldType::Float => parse_float_prefix(raw).map_or(Value::Null, Value::Float),
        FieldType::Date => parse_date(raw).map_or(Value::Null, Value::Timestamp),
    }
}

/// Leading-integer parse: `" 12.7"` -> 12, `"-3abc"` -> -3, `"abc"` -> None.
///
/// Values outside the 32-bit range of the integer columns are treated as
/// unparsable.
pub fn parse_int_prefix(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return None;
    }
    let value = s[..end].parse::<i64>().ok()?;
    if value < i32::MIN as i64 || value > i32::MAX as i64 {
        return None;
    }
    Some(value)
}

/// Leading-decimal parse: `"1.5xyz"` -> 1.5, `".5"` -> 0.5, `"2e3"` -> 2000.
///
/// Non-finite results are rejected.
pub fn parse_float_prefix(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        mantissa_digits += frac_end - frac_start;
        if mantissa_digits > 0 {
            end = frac_end;
        }
    }

    if mantissa_digits == 0 {
        return None;
    }

    // Exponent only counts when followed by at least one digit.
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    let value = s[..end].parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d", "%d/%m/%Y", "%Y/%m/%d"];

/// Parse a date or date-time. Inputs without an offset are taken as UTC.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    for format in NAIVE_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
        }
    }

    None
}

/// Normalize a station identifier to its 8 character zero-padded form.
///
/// Longer identifiers are kept as-is, so the function is idempotent.
pub fn pad_station_id(raw: &str) -> String {
    format!("{:0>width$}", raw.trim(), width = STATION_ID_WIDTH)
}

/// Station identifier from an optional raw cell; absent input becomes an
/// empty string, which callers treat as a rejected key.
pub fn station_id_or_empty(raw: Option<&str>) -> String {
    match raw {
        Some(s) if !s.trim().is_empty() => pad_station_id(s),
        _ => String::new(),
    }
}

/// Convert a `YYYYMMDDHH` stamp into an hourly UTC timestamp.
///
/// Short stamps are left-padded with zeros to 10 digits. Non-digit input or
/// a stamp that does not name a real calendar hour yields `None`.
pub fn parse_hour_stamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() || s.len() > 10 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let padded = format!("{:0>10}", s);

    let year = padded[0..4].parse::<i32>().ok()?;
    let month = padded[4..6].parse::<u32>().ok()?;
    let day = padded[6..8].parse::<u32>().ok()?;
    let hour = padded[8..10].parse::<u32>().ok()?;

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, 0, 0)?;
    Some(Utc.from_utc_datetime(&naive))
}

/// `"2024021310"` -> `"2024-02-13T10:00:00.000Z"`.
pub fn hour_stamp_to_iso(raw: &str) -> Option<String> {
    parse_hour_stamp(raw).map(|ts| crate::models::format_timestamp(&ts))
}
