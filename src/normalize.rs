//! Coercion of raw provider rows into typed [`AdmissionRecord`]s.
//!
//! The provider serializes decimals as strings and may leave any column null,
//! so each field is coerced on its own. Only the year is load-bearing: a row
//! without one cannot be placed in a series and is dropped.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::stats::AdmissionRecord;

/// A provider row with every field left untyped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAdmissionRecord {
    #[serde(default)]
    pub uid: Value,
    #[serde(default)]
    pub year: Value,
    #[serde(default)]
    pub domestic: Value,
    #[serde(default)]
    pub min_grade: Value,
    #[serde(default)]
    pub max_grade: Value,
    #[serde(default)]
    pub initial_reject: Value,
    #[serde(default)]
    pub final_admit: Value,
}

/// Reads a finite number from a JSON number or a numeric string.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

pub fn coerce_grade(value: &Value) -> Option<f64> {
    coerce_f64(value)
}

/// Non-negative count; anything else becomes `0`. Fractions truncate.
pub fn coerce_count(value: &Value) -> u32 {
    match coerce_f64(value) {
        Some(n) if n >= 0.0 => n.trunc().min(u32::MAX as f64) as u32,
        _ => 0,
    }
}

pub fn coerce_year(value: &Value) -> Option<i32> {
    let n = coerce_f64(value)?;
    if n.fract() != 0.0 || n < i32::MIN as f64 || n > i32::MAX as f64 {
        return None;
    }
    Some(n as i32)
}

pub fn coerce_domestic(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Normalizes one row. Returns `None` only when the year is unusable.
pub fn normalize_record(raw: &RawAdmissionRecord) -> Option<AdmissionRecord> {
    let Some(year) = coerce_year(&raw.year) else {
        warn!(year = %raw.year, uid = %raw.uid, "Dropping admission row without a usable year");
        return None;
    };

    let min_grade = coerce_grade(&raw.min_grade);
    if min_grade.is_none() && !raw.min_grade.is_null() {
        debug!(year, value = %raw.min_grade, "Unparsable cutoff");
    }

    Some(AdmissionRecord {
        year,
        domestic: coerce_domestic(&raw.domestic),
        min_grade,
        max_grade: coerce_grade(&raw.max_grade).unwrap_or(0.0),
        initial_reject: coerce_count(&raw.initial_reject),
        final_admit: coerce_count(&raw.final_admit),
    })
}

/// Normalizes a batch into a new vector; the input is left untouched.
pub fn normalize_records(raws: &[RawAdmissionRecord]) -> Vec<AdmissionRecord> {
    raws.iter().filter_map(normalize_record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawAdmissionRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let r = normalize_record(&raw(json!({
            "uid": 7,
            "year": "2021",
            "domestic": true,
            "min_grade": " 86.50 ",
            "max_grade": "95.2",
            "initial_reject": "120",
            "final_admit": 40
        })))
        .unwrap();

        assert_eq!(r.year, 2021);
        assert_eq!(r.domestic, Some(true));
        assert_eq!(r.min_grade, Some(86.5));
        assert_eq!(r.max_grade, 95.2);
        assert_eq!(r.initial_reject, 120);
        assert_eq!(r.final_admit, 40);
    }

    #[test]
    fn test_bad_field_does_not_spoil_record() {
        let r = normalize_record(&raw(json!({
            "year": 2020,
            "min_grade": "n/a",
            "max_grade": null,
            "initial_reject": "lots",
            "final_admit": 15
        })))
        .unwrap();

        assert_eq!(r.min_grade, None);
        assert_eq!(r.max_grade, 0.0);
        assert_eq!(r.initial_reject, 0);
        assert_eq!(r.final_admit, 15);
        assert_eq!(r.domestic, None);
    }

    #[test]
    fn test_missing_year_drops_record() {
        assert!(normalize_record(&raw(json!({ "min_grade": 80 }))).is_none());
        assert!(normalize_record(&raw(json!({ "year": "soon" }))).is_none());
        assert!(normalize_record(&raw(json!({ "year": 2020.5 }))).is_none());
    }

    #[test]
    fn test_counts_reject_negative_and_truncate() {
        assert_eq!(coerce_count(&json!(-4)), 0);
        assert_eq!(coerce_count(&json!("12.9")), 12);
        assert_eq!(coerce_count(&json!(true)), 0);
        assert_eq!(coerce_count(&json!(1e20)), u32::MAX);
    }

    #[test]
    fn test_non_finite_strings_rejected() {
        assert_eq!(coerce_f64(&json!("NaN")), None);
        assert_eq!(coerce_f64(&json!("inf")), None);
    }

    #[test]
    fn test_domestic_variants() {
        assert_eq!(coerce_domestic(&json!("FALSE")), Some(false));
        assert_eq!(coerce_domestic(&json!(1)), Some(true));
        assert_eq!(coerce_domestic(&json!(0)), Some(false));
        assert_eq!(coerce_domestic(&json!("maybe")), None);
        assert_eq!(coerce_domestic(&Value::Null), None);
    }

    #[test]
    fn test_normalize_records_skips_only_yearless_rows() {
        let rows = vec![
            raw(json!({ "year": 2019, "min_grade": 80 })),
            raw(json!({ "min_grade": 81 })),
            raw(json!({ "year": 2021, "min_grade": "82" })),
        ];
        let records = normalize_records(&rows);
        let years: Vec<i32> = records.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2019, 2021]);
    }
}
