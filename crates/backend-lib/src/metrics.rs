// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for Prometheus metric keys
pub const ACCOUNT_REGISTERED: &str = "account.registered";
pub const ACCOUNT_VERIFIED: &str = "account.verified";
pub const ACCOUNT_BLOCKED: &str = "account.blocked";
pub const ACCOUNT_PROVISIONED: &str = "account.provisioned";
pub const LOGIN_AUTHORIZED: &str = "login.authorized";
pub const LOGIN_REJECTED: &str = "login.rejected";
pub const PASSWORD_CHANGED: &str = "password.changed";
pub const SESSION_ISSUED: &str = "session.issued";
pub const SESSION_REVOKED: &str = "session.revoked";
pub const SESSION_ACTIVE: &str = "session.active";
pub const MAIL_SENT: &str = "mail.sent";
pub const MAIL_FAILED: &str = "mail.failed";
