//! Reusable parameter validators
//!
//! Each validator receives the parameter name and its current value and
//! returns the default error message on failure.

use serde_json::Value;

/// Validator: value is not null, not an empty string and not an empty list
pub fn not_empty() -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    |field: &str, value: &Value| {
        let empty = match value {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Array(items) => items.is_empty(),
            _ => false,
        };
        if empty {
            Err(format!("Parameter '{}' is empty!", field))
        } else {
            Ok(())
        }
    }
}

/// Validator: value is a JSON number (null passes)
pub fn is_number() -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    |field: &str, value: &Value| match value {
        Value::Null | Value::Number(_) => Ok(()),
        _ => Err(format!("Parameter '{}' is not a number!", field)),
    }
}

/// Validator: string length must be within range (non-strings pass)
pub fn string_length(
    min: usize,
    max: usize,
) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |field: &str, value: &Value| {
        let Some(s) = value.as_str() else {
            return Ok(());
        };
        let len = s.chars().count();
        if len < min {
            Err(format!(
                "Parameter '{}' must be at least {} characters long (got {})",
                field, min, len
            ))
        } else if len > max {
            Err(format!(
                "Parameter '{}' must be at most {} characters long (got {})",
                field, max, len
            ))
        } else {
            Ok(())
        }
    }
}
