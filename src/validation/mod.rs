//! Form validation
//!
//! Validators take the raw JSON body, stop at the first violated rule and
//! return the normalised form on success.

use serde_json::Value;
use std::sync::LazyLock;

use crate::error::ValidationError;

pub mod contact;
pub mod registration;

pub use contact::validate_contact;
pub use registration::{Registration, validate_login, validate_registration};

/// Loose shape check: something, an `@`, something, a dot, something.
static EMAIL_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("EMAIL_REGEX is a valid regex pattern")
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// Length in Unicode scalar values
pub(crate) fn char_len(value: &str) -> usize {
    value.chars().count()
}

/// Trimmed value of a string field, `None` when missing, not a string or blank
pub(crate) fn required_str<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Trimmed value of an optional string field.
///
/// Missing, `null` and blank all mean absent; any other non-string is an error.
pub(crate) fn optional_str<'a>(
    body: &'a Value,
    key: &'static str,
    label: &str,
) -> Result<Option<&'a str>, ValidationError> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            Ok((!trimmed.is_empty()).then_some(trimmed))
        }
        Some(_) => Err(ValidationError::new(key, format!("{} must be text", label))),
    }
}

/// Fail with `message` when `value` is longer than `max` characters
pub(crate) fn check_len(
    field: &'static str,
    value: &str,
    max: usize,
    message: &str,
) -> Result<(), ValidationError> {
    if char_len(value) > max {
        return Err(ValidationError::new(field, message));
    }
    Ok(())
}
