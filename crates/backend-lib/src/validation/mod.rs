// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Input validation module.
//!
//! Both checks must pass before the engine touches the store; the engine
//! enforces that ordering, this module only decides valid/invalid.

use crate::config::PasswordRequirements;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

// Common validation constants
const MAX_PASSWORD_LENGTH: usize = 128;
const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());

/// Possible validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Normalize an email into its comparison form.
/// Every store key and registry identity goes through this exactly once,
/// at the engine boundary.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Validate an email address
pub fn validate_email(email: &str) -> ValidationResult<&str> {
    if email.is_empty() {
        return Err(ValidationError::InvalidEmail(
            "Email address cannot be empty".to_string(),
        ));
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::InvalidEmail(format!(
            "Email address cannot exceed {MAX_EMAIL_LENGTH} characters"
        )));
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::InvalidEmail(
            "Invalid email address format".to_string(),
        ));
    }

    Ok(email)
}

/// Validate a password against the configured strength policy
pub fn validate_password<'a>(
    password: &'a str,
    requirements: &PasswordRequirements,
) -> ValidationResult<&'a str> {
    if password.len() < requirements.min_length {
        return Err(ValidationError::InvalidPassword(format!(
            "Password must be at least {} characters",
            requirements.min_length
        )));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::InvalidPassword(format!(
            "Password cannot exceed {MAX_PASSWORD_LENGTH} characters"
        )));
    }

    if requirements.require_uppercase && !password.chars().any(char::is_uppercase) {
        return Err(ValidationError::InvalidPassword(
            "Password must contain at least one uppercase letter".to_string(),
        ));
    }

    if requirements.require_lowercase && !password.chars().any(char::is_lowercase) {
        return Err(ValidationError::InvalidPassword(
            "Password must contain at least one lowercase letter".to_string(),
        ));
    }

    if requirements.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidPassword(
            "Password must contain at least one number".to_string(),
        ));
    }

    if requirements.require_special && !password.chars().any(|c| !c.is_alphanumeric()) {
        return Err(ValidationError::InvalidPassword(
            "Password must contain at least one special character".to_string(),
        ));
    }

    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("Alice@Example.COM"), "alice@example.com");
        assert_eq!(normalize_email("  bob@example.com \n"), "bob@example.com");
        assert_eq!(normalize_email("carol@example.com"), "carol@example.com");
    }

    #[test]
    fn test_validate_email() {
        // Valid emails
        assert!(validate_email("test@example.com").is_ok());
        assert!(validate_email("user.name+tag@example.co.uk").is_ok());

        // Empty
        assert!(matches!(
            validate_email(""),
            Err(ValidationError::InvalidEmail(_))
        ));

        // No @
        assert!(matches!(
            validate_email("test.example.com"),
            Err(ValidationError::InvalidEmail(_))
        ));

        // No domain
        assert!(matches!(
            validate_email("test@"),
            Err(ValidationError::InvalidEmail(_))
        ));

        // No TLD
        assert!(matches!(
            validate_email("test@example"),
            Err(ValidationError::InvalidEmail(_))
        ));

        // Over the SMTP length limit
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(
            validate_email(&long),
            Err(ValidationError::InvalidEmail(_))
        ));
    }

    #[test]
    fn test_validate_password() {
        let req = PasswordRequirements::default();

        // Valid passwords
        assert!(validate_password("Password123!", &req).is_ok());
        assert!(validate_password("Str0ng!Pass", &req).is_ok());

        // Too short
        assert!(matches!(
            validate_password("Short1!", &req),
            Err(ValidationError::InvalidPassword(_))
        ));

        // Too long
        let long = format!("Aa1!{}", "x".repeat(128));
        assert!(matches!(
            validate_password(&long, &req),
            Err(ValidationError::InvalidPassword(_))
        ));

        // Missing uppercase
        assert!(matches!(
            validate_password("password123!", &req),
            Err(ValidationError::InvalidPassword(_))
        ));

        // Missing lowercase
        assert!(matches!(
            validate_password("PASSWORD123!", &req),
            Err(ValidationError::InvalidPassword(_))
        ));

        // Missing digit
        assert!(matches!(
            validate_password("PasswordABC!", &req),
            Err(ValidationError::InvalidPassword(_))
        ));

        // Missing special character
        assert!(matches!(
            validate_password("Password123", &req),
            Err(ValidationError::InvalidPassword(_))
        ));
    }

    #[test]
    fn test_relaxed_requirements() {
        let req = PasswordRequirements {
            min_length: 8,
            require_uppercase: false,
            require_lowercase: true,
            require_digit: true,
            require_special: false,
        };

        assert!(validate_password("weakpass1", &req).is_ok());
        assert!(matches!(
            validate_password("allletters", &req),
            Err(ValidationError::InvalidPassword(_))
        ));
    }
}
