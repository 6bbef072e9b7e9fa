//! GA4 dimension filter mini-language
//!
//! Four operators, checked in this order:
//! `dim=~regex` (partial regexp), `dim==value` (exact), `dim!=value`
//! (negated exact), `dim=value` (contains, case-insensitive). Anything
//! else means no filter.

use serde_json::{json, Value};

fn string_filter(field: &str, match_type: &str, value: &str) -> Value {
    json!({
        "filter": {
            "fieldName": field.trim(),
            "stringFilter": {
                "matchType": match_type,
                "value": value.trim(),
            },
        }
    })
}

/// Parse a filter expression, `None` when the input matches no operator.
pub fn parse_filter(input: &str) -> Option<Value> {
    if input.is_empty() {
        return None;
    }

    if let Some((dim, pattern)) = input.split_once("=~") {
        return Some(string_filter(dim, "PARTIAL_REGEXP", pattern));
    }

    if let Some((dim, value)) = input.split_once("==") {
        return Some(string_filter(dim, "EXACT", value));
    }

    if let Some((dim, value)) = input.split_once("!=") {
        return Some(json!({
            "notExpression": string_filter(dim, "EXACT", value)
        }));
    }

    if let Some((dim, value)) = input.split_once('=') {
        return Some(json!({
            "filter": {
                "fieldName": dim.trim(),
                "stringFilter": {
                    "matchType": "CONTAINS",
                    "value": value.trim(),
                    "caseSensitive": false,
                },
            }
        }));
    }

    None
}
