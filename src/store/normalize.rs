//! Field coercion for bulk uploads and JSON record merging
//!
//! Spreadsheet rows arrive loosely typed: DNIs and codes as numbers, foreign
//! ids as strings, integers as `3.0`. Rows are coerced to the canonical wire
//! types before they are sent.

use crate::core::error::{ApiResult, ErrorInfo};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Number, Value};

fn integral(number: &Number) -> Option<i64> {
    number.as_i64().or_else(|| {
        number
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

/// Text value of a field; numbers are rendered without a trailing `.0`
pub fn optional_string(row: &Value, field: &str) -> Option<String> {
    match row.get(field)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(integral(n).map_or_else(|| n.to_string(), |i| i.to_string())),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn require_string(row: &Value, field: &str) -> ApiResult<String> {
    optional_string(row, field).ok_or_else(|| ErrorInfo::invalid(format!("'{}' is required", field)))
}

/// Integer id given as a number or a numeric string
pub fn optional_id(row: &Value, field: &str) -> ApiResult<Option<i64>> {
    let invalid = || ErrorInfo::invalid(format!("'{}' must be an integer id", field));

    match row.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => integral(n).map(Some).ok_or_else(invalid),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s.trim().parse::<i64>().map(Some).map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

pub fn require_id(row: &Value, field: &str) -> ApiResult<i64> {
    optional_id(row, field)?.ok_or_else(|| ErrorInfo::invalid(format!("'{}' is required", field)))
}

/// Coerce every row, reporting the first failure with its 1-based row number
pub fn coerce_rows<T>(rows: &[Value], coerce: impl Fn(&Value) -> ApiResult<T>) -> ApiResult<Vec<T>> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            if !row.is_object() {
                return Err(ErrorInfo::invalid(format!("Row {}: expected an object", index + 1)));
            }
            coerce(row).map_err(|e| ErrorInfo::invalid(format!("Row {}: {}", index + 1, e.message)))
        })
        .collect()
}

/// Overlay `changes` on a record, keeping every field it does not mention
pub fn merge_record<T>(record: &T, changes: &Map<String, Value>) -> ApiResult<T>
where
    T: Serialize + DeserializeOwned,
{
    let mut value = serde_json::to_value(record)
        .map_err(|e| ErrorInfo::invalid(format!("Unserializable record: {}", e)))?;

    match value.as_object_mut() {
        Some(fields) => {
            for (key, change) in changes {
                fields.insert(key.clone(), change.clone());
            }
        }
        None => return Err(ErrorInfo::invalid("Only object records can be patched")),
    }

    serde_json::from_value(value).map_err(|e| ErrorInfo::invalid(format!("Patched record is invalid: {}", e)))
}
