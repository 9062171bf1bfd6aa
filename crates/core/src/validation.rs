//! Credential input validation
//!
//! Used by front ends before any request is sent, so that obviously bad input
//! never reaches the API.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Minimum accepted password length, in characters
pub const MIN_PASSWORD_LENGTH: usize = 8;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

/// Outcome of validating a single input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationResult {
    pub const fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(message.into()),
        }
    }

    /// Convert into a `Result`, for callers that propagate with `?`
    pub fn into_result(self) -> Result<(), String> {
        match self.error {
            Some(error) if !self.valid => Err(error),
            _ => Ok(()),
        }
    }
}

/// Validate an email address (non-empty, `local@domain.tld` shaped)
pub fn validate_email(email: &str) -> ValidationResult {
    if email.is_empty() {
        return ValidationResult::invalid("Email is required");
    }
    if !EMAIL_PATTERN.is_match(email) {
        return ValidationResult::invalid("Please enter a valid email address");
    }
    ValidationResult::ok()
}

/// Validate a password against the account policy.
///
/// Rules are checked in order and the first failure is reported: length,
/// uppercase, lowercase, digit, special character.
pub fn validate_password(password: &str) -> ValidationResult {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return ValidationResult::invalid(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return ValidationResult::invalid("Password must contain at least one uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return ValidationResult::invalid("Password must contain at least one lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return ValidationResult::invalid("Password must contain at least one number");
    }
    if password.chars().all(|c| c.is_ascii_alphanumeric()) {
        return ValidationResult::invalid("Password must contain at least one special character");
    }
    ValidationResult::ok()
}
