// crates/backend-lib/src/error.rs

//! Central error type for dependency failures.
//!
//! Rejections that belong to an operation's contract (duplicate email,
//! wrong password, unknown account) are variants of that operation's
//! outcome enum, not errors. `AppError` is reserved for the cases where a
//! collaborator broke underneath the engine: store unreachable, commit
//! lost a race it cannot absorb, mail transport down.
use thiserror::Error;

use crate::notify::MailError;
use crate::store::StoreError;

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("Conflicting concurrent change")]
    Conflict,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Mail dispatch error: {0}")]
    Mail(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Store(_) => "STORE_001",
            AppError::Conflict => "CONFLICT_001",
            AppError::NotFound(_) => "NF_001",
            AppError::Mail(_) => "MAIL_001",
            AppError::Internal(_) => "INT_001",
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::Store(_) | AppError::Internal(_) => {
                "An internal server error occurred".to_string()
            },
            AppError::Conflict => {
                "The request conflicted with a concurrent change, try again".to_string()
            },
            AppError::NotFound(_) => "Resource not found".to_string(),
            AppError::Mail(_) => "Sending email failed, try again later".to_string(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => AppError::Conflict,
            StoreError::NotFound(email) => AppError::NotFound(email),
            StoreError::Unavailable(msg) => AppError::Store(msg),
        }
    }
}

impl From<MailError> for AppError {
    fn from(err: MailError) -> Self {
        AppError::Mail(err.to_string())
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Internal(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let store_error = AppError::Store("connection refused".to_string());
        assert_eq!(store_error.to_string(), "Store error: connection refused");

        let conflict = AppError::Conflict;
        assert_eq!(conflict.to_string(), "Conflicting concurrent change");

        let mail_error = AppError::Mail("outbox unavailable".to_string());
        assert!(mail_error.to_string().contains("Mail dispatch error"));
    }

    #[test]
    fn test_app_error_error_codes() {
        assert_eq!(AppError::Store("x".to_string()).error_code(), "STORE_001");
        assert_eq!(AppError::Conflict.error_code(), "CONFLICT_001");
        assert_eq!(
            AppError::NotFound("a@b.com".to_string()).error_code(),
            "NF_001"
        );
        assert_eq!(AppError::Mail("x".to_string()).error_code(), "MAIL_001");
        assert_eq!(AppError::Internal("x".to_string()).error_code(), "INT_001");
    }

    #[test]
    fn test_sanitized_messages_hide_detail() {
        // Internal detail like hostnames or emails must not leak through
        let err = AppError::Store("pg://10.0.0.3 timed out".to_string());
        assert!(!err.sanitized_message().contains("10.0.0.3"));

        let err = AppError::NotFound("carol@example.com".to_string());
        assert!(!err.sanitized_message().contains("carol"));
    }

    #[test]
    fn test_error_from_impls() {
        let app_err: AppError = StoreError::Conflict.into();
        assert!(matches!(app_err, AppError::Conflict));

        let app_err: AppError = StoreError::NotFound("a@b.com".to_string()).into();
        assert!(matches!(app_err, AppError::NotFound(_)));

        let app_err: AppError = StoreError::Unavailable("down".to_string()).into();
        assert!(matches!(app_err, AppError::Store(_)));

        let app_err: AppError = MailError::Unavailable("no outbox".to_string()).into();
        assert!(matches!(app_err, AppError::Mail(_)));

        let app_err: AppError = "boom".into();
        assert!(matches!(app_err, AppError::Internal(_)));
    }
}
