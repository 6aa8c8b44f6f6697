// ============================
// usergate-backend-lib/src/accounts.rs
// ============================
//! Account lifecycle engine.
//!
//! The single place where state machine invariants are enforced. Every
//! mutation combines store writes, derived credentials and mail side
//! effects into an outcome that is either fully applied or fully rolled
//! back; session tokens live in a separate trust domain and are
//! reconciled explicitly (revoked before the store commit, never after).
use chrono::{Duration, Utc};
use metrics::counter;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use usergate_common::{
    Account, AccountState, BlockOutcome, Candidate, ChangePasswordOutcome, LoginOutcome,
    ProvisionOutcome, RegisterOutcome, VerifyOutcome, ADMIN_ROLE,
};

use crate::auth::{generate_verification_token, CredentialCodec, SessionRegistry};
use crate::config::{PasswordRequirements, Settings};
use crate::error::AppError;
use crate::metrics::{
    ACCOUNT_BLOCKED, ACCOUNT_PROVISIONED, ACCOUNT_REGISTERED, ACCOUNT_VERIFIED, LOGIN_AUTHORIZED,
    LOGIN_REJECTED, MAIL_FAILED, MAIL_SENT, PASSWORD_CHANGED,
};
use crate::notify::{
    Mailer, PASSWORD_CHANGED_SUBJECT, PASSWORD_CHANGED_TEMPLATE, VERIFY_SUBJECT, VERIFY_TEMPLATE,
};
use crate::store::{AccountStore, StoreError};
use crate::validation::{normalize_email, validate_email, validate_password};

/// Policy knobs applied to every account mutation
#[derive(Clone)]
pub struct AccountPolicy {
    /// How long a fresh password stays valid
    pub password_expiry: Duration,
    /// How many previous hashes the reuse check considers
    pub password_history_len: usize,
    pub password_requirements: PasswordRequirements,
    /// Public base URL placed in verification mails
    pub verify_endpoint: String,
}

impl AccountPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            password_expiry: Duration::days(settings.password_expiry_days),
            password_history_len: settings.password_history_len,
            password_requirements: settings.password_requirements.clone(),
            verify_endpoint: settings.verify_endpoint.clone(),
        }
    }
}

/// The account lifecycle engine.
///
/// Stateless; all collaborators are injected at construction. Operations
/// return `Ok` with a typed outcome for everything that belongs to the
/// contract (including rejections) and `Err` only when a collaborator
/// failed underneath the operation.
#[derive(Clone)]
pub struct AccountEngine {
    store: Arc<dyn AccountStore>,
    sessions: Arc<SessionRegistry>,
    mailer: Arc<dyn Mailer>,
    codec: CredentialCodec,
    policy: AccountPolicy,
}

impl AccountEngine {
    pub fn new(
        store: Arc<dyn AccountStore>,
        sessions: Arc<SessionRegistry>,
        mailer: Arc<dyn Mailer>,
        codec: CredentialCodec,
        policy: AccountPolicy,
    ) -> Self {
        Self {
            store,
            sessions,
            mailer,
            codec,
            policy,
        }
    }

    /// Register a new account and mail its verification token.
    ///
    /// The mail is the only delivery path for the token, so a send failure
    /// aborts the whole unit of work; a failed registration leaves no
    /// trace in the store.
    pub async fn register(&self, candidate: &Candidate) -> Result<RegisterOutcome, AppError> {
        let email = normalize_email(&candidate.email);
        if let Err(err) = validate_email(&email) {
            debug!(%email, %err, "registration refused by email validation");
            return Ok(RegisterOutcome::InvalidEmail {
                detail: err.to_string(),
            });
        }
        if let Err(err) = validate_password(&candidate.password, &self.policy.password_requirements)
        {
            debug!(%email, "registration refused by password policy");
            return Ok(RegisterOutcome::WeakPassword {
                detail: err.to_string(),
            });
        }

        let mut unit = self.store.begin().await?;
        if unit.exists(&email).await? {
            debug!(%email, "registration refused, email already taken");
            return Ok(RegisterOutcome::AlreadyRegistered);
        }

        let salt = self.codec.random_salt();
        let verification_token = generate_verification_token();
        let account = Account {
            email: email.clone(),
            first_name: candidate.first_name.clone(),
            last_name: candidate.last_name.clone(),
            password_hash: self.codec.hash(&candidate.password, &salt),
            salt,
            state: AccountState::PendingVerification {
                token: verification_token.clone(),
            },
            password_expires_at: Utc::now() + self.policy.password_expiry,
            password_history: Vec::new(),
            roles: candidate.roles.clone(),
        };
        unit.insert(account);

        let params = json!({
            "name": candidate.first_name,
            "endpoint": self.policy.verify_endpoint,
            "token": verification_token,
            "email": email,
        });
        if let Err(err) = self
            .mailer
            .send(&email, VERIFY_SUBJECT, VERIFY_TEMPLATE, &params)
            .await
        {
            warn!(%email, %err, "verification mail failed, rolling back registration");
            counter!(MAIL_FAILED).increment(1);
            unit.rollback().await;
            return Err(err.into());
        }
        counter!(MAIL_SENT).increment(1);

        match unit.commit().await {
            Ok(()) => {
                info!(%email, "account registered, verification pending");
                counter!(ACCOUNT_REGISTERED).increment(1);
                Ok(RegisterOutcome::Created { verification_token })
            },
            Err(StoreError::Conflict) => {
                // Lost a race against a concurrent registration of the
                // same email
                debug!(%email, "registration lost a concurrent race");
                Ok(RegisterOutcome::AlreadyRegistered)
            },
            Err(err) => Err(err.into()),
        }
    }

    /// Complete the email round trip.
    ///
    /// The rejection is generic on purpose: it does not reveal whether the
    /// account exists, is already active, or supplied a stale token.
    pub async fn verify(&self, email: &str, token: &str) -> Result<VerifyOutcome, AppError> {
        let email = normalize_email(email);
        if token.is_empty() {
            return Ok(VerifyOutcome::Rejected);
        }

        let mut unit = self.store.begin().await?;
        let mut account = match unit.find_by_email(&email).await {
            Ok(account) => account,
            Err(StoreError::NotFound(_)) => return Ok(VerifyOutcome::Rejected),
            Err(err) => return Err(err.into()),
        };

        match &account.state {
            AccountState::PendingVerification { token: stored } if stored == token => {},
            _ => return Ok(VerifyOutcome::Rejected),
        }

        account.state = AccountState::Active;
        unit.update(account);
        match unit.commit().await {
            Ok(()) => {
                info!(%email, "account verified");
                counter!(ACCOUNT_VERIFIED).increment(1);
                Ok(VerifyOutcome::Verified)
            },
            // A concurrent writer consumed or invalidated the token first
            Err(StoreError::Conflict) => Ok(VerifyOutcome::Rejected),
            Err(err) => Err(err.into()),
        }
    }

    /// Authenticate and hand out a session token.
    ///
    /// The checks short-circuit in a fixed order; state checks precede
    /// credential checks, so a blocked account reports blocked even when
    /// the password is also wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AppError> {
        let email = normalize_email(email);
        let account = match self.store.find_by_email(&email).await {
            Ok(account) => account,
            Err(StoreError::NotFound(_)) => {
                counter!(LOGIN_REJECTED).increment(1);
                return Ok(LoginOutcome::NotRegistered);
            },
            Err(err) => return Err(err.into()),
        };

        match &account.state {
            AccountState::Blocked { reason } => {
                debug!(%email, "login refused, account blocked");
                counter!(LOGIN_REJECTED).increment(1);
                return Ok(LoginOutcome::Blocked {
                    notes: reason.clone(),
                });
            },
            AccountState::PendingVerification { .. } => {
                debug!(%email, "login refused, account not verified");
                counter!(LOGIN_REJECTED).increment(1);
                return Ok(LoginOutcome::NotVerified);
            },
            AccountState::Active => {},
        }

        if account.password_expires_at < Utc::now() {
            debug!(%email, "login refused, password expired");
            counter!(LOGIN_REJECTED).increment(1);
            return Ok(LoginOutcome::PasswordExpired);
        }

        if !self
            .codec
            .verify(password, &account.salt, &account.password_hash)
        {
            debug!(%email, "login refused, invalid credentials");
            counter!(LOGIN_REJECTED).increment(1);
            return Ok(LoginOutcome::InvalidCredentials);
        }

        // Reuse the live token if one exists, otherwise mint one carrying
        // the account's roles
        let token = self
            .sessions
            .get_or_install(&email, account.roles.clone())
            .await;
        info!(%email, "login authorized");
        counter!(LOGIN_AUTHORIZED).increment(1);
        Ok(LoginOutcome::Authorized { token })
    }

    /// Revoke any session token for the identity. Idempotent.
    pub async fn logout(&self, email: &str) {
        let email = normalize_email(email);
        self.sessions.revoke(&email).await;
        debug!(%email, "logged out");
    }

    /// Administratively lock an account.
    ///
    /// The token is revoked before the store write so no window exists
    /// where a blocked account still holds a valid session.
    pub async fn block(&self, email: &str, reason: &str) -> Result<BlockOutcome, AppError> {
        let email = normalize_email(email);
        self.sessions.revoke(&email).await;

        let mut unit = self.store.begin().await?;
        let mut account = match unit.find_by_email(&email).await {
            Ok(account) => account,
            Err(StoreError::NotFound(_)) => return Ok(BlockOutcome::NotFound),
            Err(err) => return Err(err.into()),
        };

        account.state = AccountState::Blocked {
            reason: reason.to_string(),
        };
        unit.update(account);
        unit.commit().await?;

        info!(%email, %reason, "account blocked");
        counter!(ACCOUNT_BLOCKED).increment(1);
        Ok(BlockOutcome::Blocked)
    }

    /// Rotate a password, enforcing the reuse history, and force re-login.
    pub async fn change_password(
        &self,
        email: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<ChangePasswordOutcome, AppError> {
        let email = normalize_email(email);
        let mut unit = self.store.begin().await?;
        let mut account = match unit.find_by_email(&email).await {
            Ok(account) => account,
            Err(StoreError::NotFound(_)) => return Ok(ChangePasswordOutcome::NotRegistered),
            Err(err) => return Err(err.into()),
        };

        if !self
            .codec
            .verify(old_password, &account.salt, &account.password_hash)
        {
            debug!(%email, "password change refused, old password mismatch");
            return Ok(ChangePasswordOutcome::InvalidOldPassword);
        }

        if let Err(err) = validate_password(new_password, &self.policy.password_requirements) {
            return Ok(ChangePasswordOutcome::InvalidNewPassword {
                detail: err.to_string(),
            });
        }

        let new_hash = self.codec.hash(new_password, &account.salt);
        if new_hash == account.password_hash || account.password_history.contains(&new_hash) {
            debug!(%email, "password change refused, password reused");
            return Ok(ChangePasswordOutcome::PasswordReused);
        }

        let old_hash = std::mem::replace(&mut account.password_hash, new_hash);
        account.password_history.push(old_hash);
        while account.password_history.len() > self.policy.password_history_len {
            account.password_history.remove(0);
        }
        account.password_expires_at = Utc::now() + self.policy.password_expiry;
        unit.update(account.clone());

        // Revoke before commit: a dropped session for an unchanged account
        // is harmless, a live session for a changed one is not
        self.sessions.revoke(&email).await;
        unit.commit().await?;

        info!(%email, "password changed");
        counter!(PASSWORD_CHANGED).increment(1);

        // Best effort; the user already knows the new password, so a
        // failed notice must not undo the change
        let params = json!({ "name": account.first_name, "email": email });
        if let Err(err) = self
            .mailer
            .send(
                &email,
                PASSWORD_CHANGED_SUBJECT,
                PASSWORD_CHANGED_TEMPLATE,
                &params,
            )
            .await
        {
            warn!(%email, %err, "password change notice failed");
            counter!(MAIL_FAILED).increment(1);
        } else {
            counter!(MAIL_SENT).increment(1);
        }

        Ok(ChangePasswordOutcome::Changed)
    }

    /// Provision an administrator account: register, then activate without
    /// the email round trip.
    ///
    /// Activation runs as a second unit of work after the registration
    /// committed; if it fails the registration is compensated with a
    /// delete, and the activation error is what the caller sees.
    pub async fn provision(&self, candidate: &Candidate) -> Result<ProvisionOutcome, AppError> {
        let mut candidate = candidate.clone();
        if !candidate.roles.iter().any(|role| role == ADMIN_ROLE) {
            candidate.roles.push(ADMIN_ROLE.to_string());
        }

        match self.register(&candidate).await? {
            RegisterOutcome::Created { .. } => {},
            RegisterOutcome::AlreadyRegistered => return Ok(ProvisionOutcome::AlreadyRegistered),
            RegisterOutcome::InvalidEmail { detail } => {
                return Ok(ProvisionOutcome::InvalidEmail { detail })
            },
            RegisterOutcome::WeakPassword { detail } => {
                return Ok(ProvisionOutcome::WeakPassword { detail })
            },
        }

        let email = normalize_email(&candidate.email);
        if let Err(err) = self.activate(&email).await {
            error!(%email, %err, "activation failed after registration, compensating");
            if let Err(cleanup) = self.store.delete(&email).await {
                error!(%email, %cleanup, "compensating delete failed, account left pending");
            }
            return Err(err);
        }

        info!(%email, "administrator account provisioned");
        counter!(ACCOUNT_PROVISIONED).increment(1);
        Ok(ProvisionOutcome::Provisioned)
    }

    async fn activate(&self, email: &str) -> Result<(), AppError> {
        let mut unit = self.store.begin().await?;
        let mut account = unit.find_by_email(email).await?;
        account.state = AccountState::Active;
        unit.update(account);
        unit.commit().await?;
        Ok(())
    }
}
