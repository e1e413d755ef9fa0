//! Field-level validation errors.
//!
//! Checkout forms report every failing field at once so the visitor can fix
//! them in a single pass. Messages are user-facing.

use core::fmt;
use std::collections::BTreeMap;

use serde::Serialize;

/// Map of form field name to a user-facing message.
///
/// Only the first failure per field is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<&'static str, String>);

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.fields().collect();
        write!(f, "validation failed for: {}", fields.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure for `field` unless one is already recorded.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Message recorded for a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }

    /// `Ok(value)` when nothing was recorded, otherwise `Err(self)`.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one field failed.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

/// Check that `value` has at least `min` characters after trimming.
pub(crate) fn min_chars(
    errors: &mut ValidationErrors,
    field: &'static str,
    label: &str,
    value: &str,
    min: usize,
) {
    if value.trim().chars().count() < min {
        errors.add(field, format!("{label} must be at least {min} characters."));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_message_wins() {
        let mut errors = ValidationErrors::new();
        errors.add("city", "first");
        errors.add("city", "second");
        assert_eq!(errors.get("city"), Some("first"));
    }

    #[test]
    fn test_into_result() {
        assert_eq!(ValidationErrors::new().into_result(5), Ok(5));

        let mut errors = ValidationErrors::new();
        errors.add("name", "too short");
        assert!(errors.into_result(5).is_err());
    }

    #[test]
    fn test_min_chars_counts_trimmed_chars() {
        let mut errors = ValidationErrors::new();
        min_chars(&mut errors, "city", "City", "  Köln  ", 4);
        assert!(errors.is_empty());

        min_chars(&mut errors, "city", "City", "   ", 1);
        assert_eq!(errors.get("city"), Some("City must be at least 1 characters."));
    }

    #[test]
    fn test_display_lists_fields() {
        let mut errors = ValidationErrors::new();
        errors.add("zip", "x");
        errors.add("city", "y");
        assert_eq!(errors.to_string(), "validation failed for: city, zip");
    }
}
