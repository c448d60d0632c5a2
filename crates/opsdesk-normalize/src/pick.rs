use std::collections::BTreeMap;

use serde_json::{Number, Value};

/// Outcome of picking a field that the server may send as an explicit `null`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Nullable<T> {
    /// Field missing or not convertible.
    #[default]
    Absent,
    /// Field present and explicitly `null`.
    Null,
    Present(T),
}

impl<T> Nullable<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Nullable::Present(v) => Some(v),
            Nullable::Absent | Nullable::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Nullable::Null)
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Nullable::Absent)
    }
}

/// Object member access. `None` when `value` is not an object or lacks `key`.
pub fn field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.as_object().and_then(|map| map.get(key))
}

/// First present member among `keys`; lets schemas accept legacy aliases.
pub fn field_any<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| field(value, key))
}

pub fn pick_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => number_to_string(n),
        _ => None,
    }
}

pub fn pick_nullable_string(value: Option<&Value>) -> Nullable<String> {
    match value {
        Some(Value::Null) => Nullable::Null,
        other => match pick_string(other) {
            Some(s) => Nullable::Present(s),
            None => Nullable::Absent,
        },
    }
}

pub fn pick_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
        }
        _ => None,
    }
}

pub fn pick_boolean(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.eq_ignore_ascii_case("true") {
                Some(true)
            } else if trimmed.eq_ignore_ascii_case("false") {
                Some(false)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Maps every element of an array, dropping the ones `mapper` rejects.
/// Anything that is not an array yields an empty vector.
pub fn ensure_array<T, F>(value: Option<&Value>, mut mapper: F) -> Vec<T>
where
    F: FnMut(&Value) -> Option<T>,
{
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(&mut mapper).collect(),
        _ => Vec::new(),
    }
}

/// Non-negative integer count. Fractions are truncated, negatives rejected.
/// Integers, as JSON numbers or digit strings, are taken exactly.
pub fn pick_count(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) if n.is_u64() => return n.as_u64(),
        Value::Number(n) if n.is_i64() => return None,
        Value::String(s) => {
            if let Ok(exact) = s.trim().parse::<u64>() {
                return Some(exact);
            }
        }
        _ => {}
    }
    let n = pick_number(value)?;
    if n < 0.0 {
        return None;
    }
    if n >= u64::MAX as f64 {
        return Some(u64::MAX);
    }
    Some(n.trunc() as u64)
}

/// Sum of counts, saturating at `u64::MAX`.
pub fn sum_counts<I: IntoIterator<Item = u64>>(counts: I) -> u64 {
    counts.into_iter().fold(0, u64::saturating_add)
}

/// Ratio clamped into `[0, 1]`.
pub fn pick_ratio(value: Option<&Value>) -> Option<f64> {
    pick_number(value).map(|n| n.clamp(0.0, 1.0))
}

pub fn ensure_number_map(value: Option<&Value>) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();
    if let Some(Value::Object(map)) = value {
        for (key, raw) in map {
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            if let Some(n) = pick_number(Some(raw)) {
                out.insert(key.to_string(), n);
            }
        }
    }
    out
}

pub fn ensure_count_map(value: Option<&Value>) -> BTreeMap<String, u64> {
    let mut out = BTreeMap::new();
    if let Some(Value::Object(map)) = value {
        for (key, raw) in map {
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            if let Some(n) = pick_count(Some(raw)) {
                out.insert(key.to_string(), n);
            }
        }
    }
    out
}

/// Peels a `{ "data": ... }` wrapper when the server sends one.
pub fn unwrap_envelope(value: &Value) -> &Value {
    match field(value, "data") {
        Some(inner) if inner.is_object() || inner.is_array() => inner,
        _ => value,
    }
}

/// Row list from either a bare array or the first array member among `keys`.
pub fn rows<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let value = unwrap_envelope(value);
    if value.is_array() {
        return Some(value);
    }
    keys.iter()
        .filter_map(|key| field(value, key))
        .find(|candidate| candidate.is_array())
}

fn number_to_string(n: &Number) -> Option<String> {
    if let Some(i) = n.as_i64() {
        return Some(i.to_string());
    }
    if let Some(u) = n.as_u64() {
        return Some(u.to_string());
    }
    let f = n.as_f64().filter(|f| f.is_finite())?;
    if f.fract() == 0.0 && f.abs() < 1e15 {
        Some(format!("{f:.0}"))
    } else {
        Some(f.to_string())
    }
}
