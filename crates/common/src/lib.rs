// ================
// common/src/lib.rs
// ================
//! Shared domain types for the Usergate account backend.
//! This crate defines the account record, its lifecycle states and the
//! typed outcomes the lifecycle engine returns, so that a transport layer
//! can render them without depending on the engine itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role identifier carried by administratively provisioned accounts
pub const ADMIN_ROLE: &str = "admin";

/// Lifecycle state of an account.
///
/// The verification token and the block reason are payloads of the state
/// they belong to, so a record can never carry a token while active or a
/// stale token while blocked.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "state")]
pub enum AccountState {
    /// Registered, waiting for the email round trip
    PendingVerification {
        /// One-time opaque token mailed to the account's address
        token: String,
    },
    /// Verified and usable
    Active,
    /// Administratively locked out
    Blocked {
        /// Free-text reason recorded by the administrator
        reason: String,
    },
}

impl AccountState {
    /// The pending verification token, if any
    pub fn verification_token(&self) -> Option<&str> {
        match self {
            AccountState::PendingVerification { token } => Some(token),
            _ => None,
        }
    }

    /// The block reason, if the account is blocked
    pub fn block_reason(&self) -> Option<&str> {
        match self {
            AccountState::Blocked { reason } => Some(reason),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, AccountState::Active)
    }
}

/// A registered user identity
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Account {
    /// Unique identifier; always stored in normalized (trimmed, lowercased) form
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Derived, opaque digest produced by the credential codec
    pub password_hash: String,
    /// Random per-account value, generated once at registration, immutable
    pub salt: String,
    pub state: AccountState,
    /// Instant after which a login is refused until the password is rotated
    pub password_expires_at: DateTime<Utc>,
    /// Previous password digests, oldest first, bounded by policy
    pub password_history: Vec<String>,
    /// Role identifiers attached to session tokens at login
    pub roles: Vec<String>,
}

/// Registration input before any credential material is derived
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Candidate {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Cleartext password; validated, hashed and never stored
    pub password: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// A session token issued to an authenticated identity
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SessionToken {
    /// Opaque token string presented on subsequent requests
    pub token: String,
    /// Roles copied from the account at issue time
    pub roles: Vec<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionToken {
    /// Lifetime is evaluated lazily; an expired token counts as absent
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Outcome of a registration attempt
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "result")]
pub enum RegisterOutcome {
    /// Account created; the token was also delivered by mail
    Created { verification_token: String },
    /// An account with this email already exists
    AlreadyRegistered,
    /// Email failed format validation
    InvalidEmail { detail: String },
    /// Password failed the strength policy
    WeakPassword { detail: String },
}

/// Outcome of an email verification attempt.
/// Rejection is deliberately generic so it does not leak whether the
/// account exists, is already active, or supplied a wrong token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "result")]
pub enum VerifyOutcome {
    Verified,
    Rejected,
}

/// Outcome of a login attempt
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "result")]
pub enum LoginOutcome {
    Authorized { token: SessionToken },
    NotRegistered,
    Blocked {
        /// The administrator's recorded reason
        notes: String,
    },
    NotVerified,
    PasswordExpired,
    InvalidCredentials,
}

/// Outcome of an administrative block
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "result")]
pub enum BlockOutcome {
    Blocked,
    NotFound,
}

/// Outcome of a password change
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "result")]
pub enum ChangePasswordOutcome {
    Changed,
    NotRegistered,
    InvalidOldPassword,
    InvalidNewPassword { detail: String },
    /// The new password matches the current one or a recent history entry
    PasswordReused,
}

/// Outcome of administrative provisioning
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "result")]
pub enum ProvisionOutcome {
    /// Account created and immediately activated with the admin role
    Provisioned,
    AlreadyRegistered,
    InvalidEmail { detail: String },
    WeakPassword { detail: String },
}
