//! Lenient `serde` field adapters for upstream records.
//!
//! Upstream APIs and reference exports are inconsistent about scalar types:
//! the same code can arrive as `"21"` or `21`, and measured values as
//! numbers or numeric strings. These adapters accept whatever shape shows up
//! and degrade to `None` instead of failing the whole record.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserializes a string-or-number scalar into a trimmed, non-empty string.
///
/// Integers keep their integer form (`21` becomes `"21"`). Anything else
/// (objects, arrays, booleans, blank strings) becomes `None`. Used for codes
/// and free-text labels alike.
///
/// # Errors
///
/// Only fails when the underlying deserializer itself fails.
pub fn scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_code))
}

/// Deserializes a measured value, accepting JSON numbers or strictly
/// well-formed decimal strings.
///
/// Comma decimals (`"0,5"`), inequality prefixes (`"<0.1"`) and
/// non-finite values all become `None`.
///
/// # Errors
///
/// Only fails when the underlying deserializer itself fails.
pub fn decimal<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_decimal))
}

/// Deserializes an arbitrary JSON value, keeping `null` as `None`.
///
/// # Errors
///
/// Only fails when the underlying deserializer itself fails.
pub fn raw<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.is_null()))
}

/// Converts a JSON scalar to a trimmed, non-empty code string.
#[must_use]
pub fn value_to_code(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s),
        Value::Number(n) => n
            .as_i64()
            .map(|i| i.to_string())
            .or_else(|| n.as_u64().map(|u| u.to_string()))
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.to_string())),
        _ => None,
    }
}

/// Converts a JSON scalar to a finite `f64` using strict decimal parsing.
#[must_use]
pub fn value_to_decimal(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => parse_strict_decimal(s),
        _ => None,
    }
}

/// Parses a well-formed decimal string (surrounding whitespace allowed).
///
/// Rejects comma decimals, inequality prefixes, and the textual `inf`/`NaN`
/// forms that [`str::parse`] would otherwise accept.
#[must_use]
pub fn parse_strict_decimal(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty()
        || !trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
    {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Returns the trimmed string if it is non-empty.
#[must_use]
pub fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
