use std::collections::HashSet;

use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use crate::error::AppError;

/// Default page size for list endpoints.
pub const DEFAULT_LIMIT: u64 = 100;

/// Offset pagination shared by list endpoints.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Number of records to skip.
    #[param(example = 0)]
    pub skip: Option<u64>,
    /// Maximum number of records to return (1-1000, default 100).
    #[param(example = 100)]
    pub limit: Option<u64>,
}

impl ListQuery {
    pub fn skip(&self) -> u64 {
        self.skip.unwrap_or(0)
    }

    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, 1000)
    }
}

/// Serde helper for partial updates of nullable fields.
///
/// * JSON field absent  => `None`          (don't update)
/// * JSON field = null  => `Some(None)`    (set to NULL)
/// * JSON field = value => `Some(Some(v))` (set to value)
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

/// Validate a trimmed string against an inclusive character-count range.
pub fn validate_length(label: &str, value: &str, min: usize, max: usize) -> Result<(), AppError> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        return Err(AppError::Validation(format!(
            "{label} must be {min}-{max} characters"
        )));
    }
    Ok(())
}

/// Validate an optional description; `None` and blank strings are accepted.
pub fn validate_description(label: &str, value: Option<&str>) -> Result<(), AppError> {
    match value.map(str::trim) {
        None | Some("") => Ok(()),
        Some(desc) => validate_length(label, desc, 5, 200),
    }
}

/// Trim a description, turning blank input into `None`.
pub fn normalize_description(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Strip markup from user-supplied text before it is stored or echoed back.
///
/// Uses ammonia's default allow-list: `<script>` and `<style>` are removed
/// together with their content, attributes such as `onclick` are dropped and
/// bare `<`, `>` and `&` are entity-escaped.
pub fn sanitize_text(value: &str) -> String {
    ammonia::clean(value)
}

pub fn sanitize_optional(value: Option<String>) -> Option<String> {
    value.map(|v| sanitize_text(&v))
}

/// Validate an ID selection (no duplicates, bounded length). Empty is allowed.
pub fn validate_id_selection(ids: &[Uuid], name: &str, max: usize) -> Result<(), AppError> {
    if ids.len() > max {
        return Err(AppError::Validation(format!("Too many {name}: max {max}")));
    }
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(AppError::Validation(format!("Duplicate {name} ID: {id}")));
        }
    }
    Ok(())
}
