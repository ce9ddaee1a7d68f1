/// Input validators - guards every client-supplied field before it
/// reaches the database.
///
/// Emails are normalized (trimmed, lowercased) here so every lookup and
/// uniqueness check downstream is case-insensitive by construction.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;
const MAX_NAME_LENGTH: usize = 100;
const MAX_SUBJECT_NAME_LENGTH: usize = 70;
const MAX_TITLE_LENGTH: usize = 200;
const MAX_DESCRIPTION_LENGTH: usize = 600;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();
}

/// Validates and normalizes an email address.
///
/// Returns the canonical form (trimmed, lowercased) used both for storage
/// and for login lookups.
pub fn normalize_email(email: &str) -> Result<String, ValidationError> {
    let normalized = email.trim().to_lowercase();

    if normalized.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if normalized.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort(
            "email".to_string(),
            MIN_EMAIL_LENGTH,
        ));
    }

    if normalized.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong(
            "email".to_string(),
            MAX_EMAIL_LENGTH,
        ));
    }

    if !EMAIL_REGEX.is_match(&normalized) {
        return Err(ValidationError::InvalidFormat(
            "email has invalid format".to_string(),
        ));
    }

    Ok(normalized)
}

/// Validates a person name (first or last).
pub fn validate_name(field: &str, name: &str) -> Result<String, ValidationError> {
    validate_text(field, name, MAX_NAME_LENGTH)
}

/// Validates a subject name.
pub fn validate_subject_name(name: &str) -> Result<String, ValidationError> {
    validate_text("name", name, MAX_SUBJECT_NAME_LENGTH)
}

/// Validates a task title.
pub fn validate_title(title: &str) -> Result<String, ValidationError> {
    validate_text("title", title, MAX_TITLE_LENGTH)
}

/// Validates an optional free-text description. `None` and empty strings
/// collapse to `None`.
pub fn validate_description(
    description: Option<&str>,
) -> Result<Option<String>, ValidationError> {
    match description {
        None => Ok(None),
        Some(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            if trimmed.len() > MAX_DESCRIPTION_LENGTH {
                return Err(ValidationError::TooLong(
                    "description".to_string(),
                    MAX_DESCRIPTION_LENGTH,
                ));
            }
            if has_suspicious_content(trimmed) {
                return Err(ValidationError::InvalidFormat(
                    "description contains invalid characters".to_string(),
                ));
            }
            Ok(Some(trimmed.to_string()))
        }
    }
}

/// Validates a task priority (1 = low .. 5 = critical).
pub fn validate_priority(priority: i16) -> Result<i16, ValidationError> {
    if !(1..=5).contains(&priority) {
        return Err(ValidationError::OutOfRange(
            "priority must be between 1 and 5".to_string(),
        ));
    }
    Ok(priority)
}

fn validate_text(field: &str, value: &str, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field.to_string()));
    }

    if trimmed.len() > max {
        return Err(ValidationError::TooLong(field.to_string(), max));
    }

    if has_suspicious_content(trimmed) {
        return Err(ValidationError::InvalidFormat(format!(
            "{} contains invalid characters",
            field
        )));
    }

    Ok(trimmed.to_string())
}

/// Rejects null bytes and control characters (data theft protection).
fn has_suspicious_content(value: &str) -> bool {
    value.contains('\0') || value.chars().any(|c| c.is_control() && c != '\n')
}
