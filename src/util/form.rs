//! Helpers for turning raw form and query strings into typed values.

use std::fmt::Display;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::{AppError, AppResult};

/// Trimmed value of a field that must be present and non-blank.
pub fn required(value: Option<String>, field: &'static str) -> AppResult<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::ValidationMissingField(field)),
    }
}

pub fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn parse<T>(raw: &str, field: &'static str) -> AppResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim().parse().map_err(|e| AppError::invalid(field, e))
}

pub fn date(raw: &str, field: &'static str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::invalid(field, "expected a date like 2025-09-01"))
}

/// HTML checkboxes are only submitted when ticked.
pub fn checked(value: &Option<String>) -> bool {
    matches!(value.as_deref(), Some("on" | "true" | "1"))
}

/// Query-string filter: blank, `all` and unparseable values mean no filter.
pub fn filter<T: FromStr>(value: &Option<String>) -> Option<T> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "all")
        .and_then(|v| v.parse().ok())
}
