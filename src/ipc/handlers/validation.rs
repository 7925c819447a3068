//! Shared IPC input validation helpers.
//!
//! These enforce that client-supplied numeric fields are within valid ranges
//! before being passed to the engine, preventing negative or truncated counts.

use crate::types::{Error, Result};
use serde_json::Value;

/// Safely convert an i64 (from JSON) to u32, rejecting out-of-range values.
pub fn safe_i64_to_u32(value: i64, field: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        if value < 0 {
            Error::invalid_argument(format!("{field} must be non-negative, got {value}"))
        } else {
            Error::invalid_argument(format!("{field} value {value} exceeds u32 range"))
        }
    })
}

/// Read an optional count field, falling back to `default` when absent or null.
pub fn count_field(body: &Value, field: &str, default: u32) -> Result<u32> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(default),
        Some(v) => {
            if let Some(n) = v.as_u64() {
                return u32::try_from(n).map_err(|_| {
                    Error::invalid_argument(format!("{field} value {n} exceeds u32 range"))
                });
            }
            let n = v.as_i64().ok_or_else(|| {
                Error::invalid_argument(format!("{field} must be an integer, got {v}"))
            })?;
            safe_i64_to_u32(n, field)
        }
    }
}

/// Like [`count_field`] but without a default.
pub fn opt_count_field(body: &Value, field: &str) -> Result<Option<u32>> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => count_field(body, field, 0).map(Some),
    }
}
