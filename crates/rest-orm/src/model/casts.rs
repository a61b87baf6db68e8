//! Attribute casting
//!
//! Casts run once when a record is hydrated and once when it is serialized,
//! so every cast must be idempotent.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{Number, Value};

/// Target type of an attribute cast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    Integer,
    Float,
    Boolean,
    String,
    Date,
    DateTime,
    Json,
    Raw,
}

/// Field name to cast kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CastTable {
    casts: BTreeMap<String, CastKind>,
}

impl CastTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cast(mut self, field: impl Into<String>, kind: CastKind) -> Self {
        self.casts.insert(field.into(), kind);
        self
    }

    pub fn get(&self, field: &str) -> Option<CastKind> {
        self.casts.get(field).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.casts.is_empty()
    }

    /// Cast `value` for `field`, or clone it if the field has no cast
    pub fn apply(&self, field: &str, value: &Value) -> Value {
        match self.get(field) {
            Some(kind) => cast_value(kind, value),
            None => value.clone(),
        }
    }
}

/// Cast a JSON value. Values that cannot be converted are returned unchanged.
pub fn cast_value(kind: CastKind, value: &Value) -> Value {
    if value.is_null() {
        return Value::Null;
    }

    match kind {
        CastKind::Integer => to_integer(value).map(Value::from).unwrap_or_else(|| value.clone()),
        CastKind::Float => to_float(value)
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| value.clone()),
        CastKind::Boolean => to_bool(value).map(Value::Bool).unwrap_or_else(|| value.clone()),
        CastKind::String => match value {
            Value::String(_) => value.clone(),
            Value::Number(n) => Value::String(n.to_string()),
            Value::Bool(b) => Value::String(b.to_string()),
            other => Value::String(other.to_string()),
        },
        CastKind::Date => parse_datetime(value)
            .map(|dt| Value::String(dt.date_naive().format("%Y-%m-%d").to_string()))
            .or_else(|| {
                value
                    .as_str()
                    .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
                    .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            })
            .unwrap_or_else(|| value.clone()),
        CastKind::DateTime => parse_datetime(value)
            .map(|dt| Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
            .unwrap_or_else(|| value.clone()),
        CastKind::Json => match value {
            Value::String(s) => serde_json::from_str::<Value>(s)
                .ok()
                .filter(|parsed| parsed.is_object() || parsed.is_array())
                .unwrap_or_else(|| value.clone()),
            other => other.clone(),
        },
        CastKind::Raw => value.clone(),
    }
}

fn to_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
        }
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn parse_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                    .ok()
                    .map(|naive| Utc.from_utc_datetime(&naive))
            }),
        Value::Number(n) => n.as_i64().and_then(|ts| Utc.timestamp_opt(ts, 0).single()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_casts() {
        assert_eq!(cast_value(CastKind::Integer, &json!("42")), json!(42));
        assert_eq!(cast_value(CastKind::Integer, &json!(4.9)), json!(4));
        assert_eq!(cast_value(CastKind::Float, &json!("1.5")), json!(1.5));
        assert_eq!(cast_value(CastKind::Boolean, &json!("yes")), json!(true));
        assert_eq!(cast_value(CastKind::Boolean, &json!(0)), json!(false));
        assert_eq!(cast_value(CastKind::String, &json!(7)), json!("7"));
        assert_eq!(cast_value(CastKind::Integer, &Value::Null), Value::Null);
    }

    #[test]
    fn test_date_casts() {
        assert_eq!(
            cast_value(CastKind::Date, &json!("2024-03-01 10:15:00")),
            json!("2024-03-01")
        );
        assert_eq!(
            cast_value(CastKind::DateTime, &json!("2024-03-01 10:15:00")),
            json!("2024-03-01T10:15:00Z")
        );
        assert_eq!(cast_value(CastKind::DateTime, &json!(0)), json!("1970-01-01T00:00:00Z"));
    }

    #[test]
    fn test_json_cast_decodes_encoded_strings() {
        assert_eq!(cast_value(CastKind::Json, &json!("{\"a\":1}")), json!({"a": 1}));
        assert_eq!(cast_value(CastKind::Json, &json!("plain")), json!("plain"));
    }

    #[test]
    fn test_casts_are_idempotent() {
        let inputs = [
            (CastKind::Integer, json!("12")),
            (CastKind::Float, json!("3.25")),
            (CastKind::Boolean, json!("off")),
            (CastKind::Date, json!("2024-03-01T23:00:00+00:00")),
            (CastKind::DateTime, json!("2024-03-01T23:00:00+02:00")),
            (CastKind::Json, json!("[1,2]")),
        ];

        for (kind, input) in inputs {
            let once = cast_value(kind, &input);
            assert_eq!(cast_value(kind, &once), once, "{:?}", kind);
        }
    }

    #[test]
    fn test_table_only_casts_known_fields() {
        let table = CastTable::new().cast("age", CastKind::Integer);
        assert_eq!(table.apply("age", &json!("30")), json!(30));
        assert_eq!(table.apply("name", &json!("30")), json!("30"));
    }
}
