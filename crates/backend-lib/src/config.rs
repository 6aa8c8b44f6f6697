// ============================
// usergate-backend-lib/src/config.rs
// ============================
//! Configuration management.
use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::path::Path;

/// Application settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Site-wide password hashing secret. Mandatory; an empty value fails
    /// validation so a misconfigured process stops at startup.
    pub secret_key: String,
    /// Days until a password must be rotated
    pub password_expiry_days: i64,
    /// How many previous password hashes are kept for reuse checks
    pub password_history_len: usize,
    /// Session token TTL in seconds
    pub session_ttl_secs: u64,
    /// Public base URL placed in verification mails
    pub verify_endpoint: String,
    /// Log level
    pub log_level: String,
    /// Password requirements
    pub password_requirements: PasswordRequirements,
    /// Administrator account for first-use provisioning, if any
    pub admin: Option<AdminSettings>,
}

/// Password complexity requirements
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PasswordRequirements {
    /// Minimum password length
    pub min_length: usize,
    /// Require uppercase letters
    pub require_uppercase: bool,
    /// Require lowercase letters
    pub require_lowercase: bool,
    /// Require digits
    pub require_digit: bool,
    /// Require special characters
    pub require_special: bool,
}

/// Administrator account provisioned on first use
#[derive(Debug, Clone, Deserialize)]
pub struct AdminSettings {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            password_expiry_days: 90,
            password_history_len: 6,
            session_ttl_secs: 900, // 15 minutes
            verify_endpoint: "http://localhost:8000/users/verify".to_string(),
            log_level: "info".to_string(),
            password_requirements: PasswordRequirements::default(),
            admin: None,
        }
    }
}

impl Default for PasswordRequirements {
    fn default() -> Self {
        Self {
            min_length: 10,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_special: true,
        }
    }
}

impl Settings {
    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.secret_key.is_empty() {
            bail!("secret_key must be set");
        }
        if !["trace", "debug", "info", "warn", "error"].contains(&self.log_level.as_str()) {
            bail!("unknown log_level '{}'", self.log_level);
        }
        if self.password_expiry_days < 1 {
            bail!("password_expiry_days must be at least 1");
        }
        if self.password_history_len < 1 {
            bail!("password_history_len must be at least 1");
        }
        if self.session_ttl_secs < 1 {
            bail!("session_ttl_secs must be at least 1");
        }
        if self.password_requirements.min_length < 8 {
            bail!("password_requirements.min_length must be at least 8");
        }
        Ok(())
    }
}

/// Load settings from the default config file and environment
pub fn load_settings() -> Result<Settings> {
    load_settings_from("usergate.toml")
}

/// Load settings from a config file, with `USERGATE_`-prefixed environment
/// variables taking precedence
pub fn load_settings_from<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let settings: Settings = Figment::new()
        .merge(Toml::file(path.as_ref()))
        .merge(Env::prefixed("USERGATE_"))
        .extract()?;

    settings.validate()?;
    Ok(settings)
}
