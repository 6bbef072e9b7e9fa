//! Attribute access over loosely-typed vendor responses
//!
//! SOAP results arrive as parsed value trees and report/GA4 results as plain
//! mappings; both get the same lookup contract: present and non-null wins,
//! anything else degrades to the `"N/A"` sentinel. Lookups never fail.

use serde_json::{Map, Value};

/// Sentinel for absent or null fields.
pub const NOT_AVAILABLE: &str = "N/A";

/// Flat per-entity record, in insertion order.
pub type Record = Map<String, Value>;

/// A source of named fields: either a structured result object or a plain
/// string-keyed mapping.
pub trait Fields {
    fn field(&self, name: &str) -> Option<&Value>;
}

/// Structured-object adapter: any non-object value has no fields.
impl Fields for Value {
    fn field(&self, name: &str) -> Option<&Value> {
        self.as_object().and_then(|m| m.get(name))
    }
}

/// Mapping adapter.
impl Fields for Map<String, Value> {
    fn field(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

/// Get a field with a caller-supplied default for absent/null values.
pub fn attr_or<F: Fields + ?Sized>(obj: &F, key: &str, default: Value) -> Value {
    match obj.field(key) {
        Some(Value::Null) | None => default,
        Some(v) => v.clone(),
    }
}

/// Get a field, defaulting to `"N/A"`.
pub fn attr<F: Fields + ?Sized>(obj: &F, key: &str) -> Value {
    attr_or(obj, key, Value::String(NOT_AVAILABLE.to_string()))
}

/// Get a field as a display string. Scalars render naturally; structured
/// values and absent fields yield the default.
pub fn attr_str<F: Fields + ?Sized>(obj: &F, key: &str, default: &str) -> String {
    match obj.field(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => default.to_string(),
    }
}

/// Get a field as an integer, tolerating numeric strings. `None` on
/// anything else.
pub fn attr_i64<F: Fields + ?Sized>(obj: &F, key: &str) -> Option<i64> {
    match obj.field(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// True when a vendor boolean is set: accepts `true`, `"true"`, `"True"`
/// and `1` (SOAP serializers disagree on the wire form).
pub fn attr_flag<F: Fields + ?Sized>(obj: &F, key: &str) -> bool {
    match obj.field(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    }
}
