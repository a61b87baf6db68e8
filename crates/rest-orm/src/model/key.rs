//! Key comparison for relation matching
//!
//! Remote APIs are loose about key types, so keys compare by a canonical
//! string form: `5`, `5.0` and `"5"` are the same key. Null never matches.

use std::collections::HashSet;

use serde_json::Value;

/// Canonical form of a key value, `None` for values that can't be keys
pub fn canonical_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                let f = n.as_f64()?;
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    Some((f as i64).to_string())
                } else {
                    Some(n.to_string())
                }
            }
        }
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Distinct key values in first-seen order, nulls dropped
pub fn distinct_keys<'a, I>(values: I) -> Vec<Value>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut seen = HashSet::new();
    let mut keys = Vec::new();

    for value in values {
        if let Some(canonical) = canonical_key(value) {
            if seen.insert(canonical) {
                keys.push(value.clone());
            }
        }
    }

    keys
}
