//! Reporting utilities: terminal text and JSON output.

pub mod format;

pub use format::*;

use serde::Serialize;

use crate::error::AppError;

/// Pretty-printed JSON for any report value.
///
/// Non-finite numbers (a `-inf` log-likelihood) are written as `null`.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| AppError::numeric(format!("Failed to serialize report: {e}")))
}
