//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Backend timestamp as a short date (`Jan 05, 2025`); `-` when empty.
///
/// Usage in templates: `{{ row.created_at|joined_date }}`
#[askama::filter_fn]
pub fn joined_date(raw: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let raw = raw.to_string();
    Ok(marketplace_core::display_timestamp(
        Some(raw.as_str()).filter(|raw| !raw.is_empty()),
    ))
}
