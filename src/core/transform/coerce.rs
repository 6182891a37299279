//! Per-type coercions for untrusted source values
//!
//! Every function takes any JSON value and returns `None` when the value is
//! absent, blank or not interpretable as the target type. None of them fail.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Parses a date-like value into a UTC timestamp
///
/// Offset-less inputs are taken as UTC. Brazilian `DD/MM/YYYY` is accepted
/// with or without a time part.
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    let s = non_blank(value)?;

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Postgres renders offsets as +00 without minutes
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
        }
    }
    None
}

/// Renders a timestamp as ISO-8601 with a `Z` suffix
pub fn to_iso(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parses a currency-like value
///
/// Currency symbols and spaces are dropped. When both `.` and `,` appear the
/// rightmost one is the decimal separator; a lone `,` is decimal; repeated
/// `.` are thousands separators.
pub fn parse_money(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(_) => {
            let s = non_blank(value)?;
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
                .collect();
            if !cleaned.chars().any(|c| c.is_ascii_digit()) {
                return None;
            }

            let last_dot = cleaned.rfind('.');
            let last_comma = cleaned.rfind(',');
            let normalized = match (last_dot, last_comma) {
                (Some(dot), Some(comma)) if comma > dot => {
                    cleaned.replace('.', "").replace(',', ".")
                }
                (Some(_), Some(_)) => cleaned.replace(',', ""),
                (None, Some(_)) => cleaned.replace(',', "."),
                (Some(_), None) if cleaned.matches('.').count() > 1 => cleaned.replace('.', ""),
                _ => cleaned,
            };
            normalized.parse::<f64>().ok().filter(|v| v.is_finite())
        }
        _ => None,
    }
}

/// Parses a boolean-ish value
pub fn parse_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "sim" | "yes" | "s" | "y" => Some(true),
            "false" | "0" | "não" | "nao" | "no" | "n" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Parses an integer from a number or a numeric string
pub fn parse_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(_) => {
            let s = non_blank(value)?;
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }
}

/// Passes text through; numbers and booleans are stringified
pub fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn non_blank(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(json!("05/03/2024 10:30:00"), Some("2024-03-05T10:30:00Z") ; "brazilian datetime")]
    #[test_case(json!("05/03/2024 10:30"), Some("2024-03-05T10:30:00Z") ; "brazilian without seconds")]
    #[test_case(json!("05/03/2024"), Some("2024-03-05T00:00:00Z") ; "brazilian date")]
    #[test_case(json!("2024-03-05"), Some("2024-03-05T00:00:00Z") ; "iso date")]
    #[test_case(json!("2024-03-05 10:30"), Some("2024-03-05T10:30:00Z") ; "iso minutes")]
    #[test_case(json!("2024-03-05T10:30:00"), Some("2024-03-05T10:30:00Z") ; "naive iso")]
    #[test_case(json!("2024-03-05T10:30:00.250"), Some("2024-03-05T10:30:00.250Z") ; "naive iso millis")]
    #[test_case(json!("2024-03-05T13:30:00+03:00"), Some("2024-03-05T10:30:00Z") ; "rfc3339 offset")]
    #[test_case(json!("2024-03-05 10:30:00+00"), Some("2024-03-05T10:30:00Z") ; "postgres offset")]
    #[test_case(json!("32/13/2024"), None ; "impossible date")]
    #[test_case(json!("amanhã"), None ; "free text")]
    #[test_case(json!(""), None ; "blank")]
    #[test_case(json!(20240305), None ; "number")]
    #[test_case(Value::Null, None ; "null")]
    fn test_parse_date(input: Value, expected: Option<&str>) {
        assert_eq!(parse_date(&input).map(|d| to_iso(&d)).as_deref(), expected);
    }

    #[test_case(json!("R$ 1.234,56"), Some(1234.56) ; "brazilian currency")]
    #[test_case(json!("1234.56"), Some(1234.56) ; "plain decimal")]
    #[test_case(json!("1,234.56"), Some(1234.56) ; "us thousands")]
    #[test_case(json!("150,00"), Some(150.0) ; "comma decimal")]
    #[test_case(json!("1.234.567"), Some(1234567.0) ; "dotted thousands")]
    #[test_case(json!(" R$ 80 "), Some(80.0) ; "padded")]
    #[test_case(json!(99.5), Some(99.5) ; "number")]
    #[test_case(json!("-10,5"), Some(-10.5) ; "negative")]
    #[test_case(json!("R$"), None ; "symbol only")]
    #[test_case(json!("abc"), None ; "text")]
    #[test_case(json!(true), None ; "boolean")]
    fn test_parse_money(input: Value, expected: Option<f64>) {
        assert_eq!(parse_money(&input), expected);
    }

    #[test_case(json!("sim"), Some(true) ; "sim")]
    #[test_case(json!("Não"), Some(false) ; "nao accented")]
    #[test_case(json!("nao"), Some(false) ; "nao plain")]
    #[test_case(json!("Y"), Some(true) ; "upper y")]
    #[test_case(json!("n"), Some(false) ; "lower n")]
    #[test_case(json!("1"), Some(true) ; "string one")]
    #[test_case(json!(0), Some(false) ; "number zero")]
    #[test_case(json!(true), Some(true) ; "json true")]
    #[test_case(json!("talvez"), None ; "unknown word")]
    #[test_case(json!(2), None ; "number two")]
    fn test_parse_bool(input: Value, expected: Option<bool>) {
        assert_eq!(parse_bool(&input), expected);
    }

    #[test_case(json!(42), Some(42) ; "number")]
    #[test_case(json!("42"), Some(42) ; "numeric string")]
    #[test_case(json!(" 7 "), Some(7) ; "padded string")]
    #[test_case(json!("18.0"), Some(18) ; "integral decimal string")]
    #[test_case(json!(18.5), None ; "fractional number")]
    #[test_case(json!("dezoito"), None ; "word")]
    #[test_case(json!(null), None ; "null")]
    fn test_parse_int(input: Value, expected: Option<i64>) {
        assert_eq!(parse_int(&input), expected);
    }

    #[test]
    fn test_text_is_passed_through() {
        assert_eq!(text(&json!("  Ana  ")), Some("  Ana  ".to_string()));
        assert_eq!(text(&json!(123)), Some("123".to_string()));
        assert_eq!(text(&json!(false)), Some("false".to_string()));
        assert_eq!(text(&json!({"a": 1})), None);
    }
}
