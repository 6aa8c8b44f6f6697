// ============================
// usergate-backend-lib/src/notify.rs
// ============================
//! Notification dispatcher boundary.
//!
//! The engine awaits every send before deciding the enclosing
//! transaction's outcome; transport and template rendering live behind
//! this trait.
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;

/// Template of the account verification mail
pub const VERIFY_TEMPLATE: &str = "verify_account";
/// Subject of the account verification mail
pub const VERIFY_SUBJECT: &str = "Account successfully Registered";
/// Template of the password change notice
pub const PASSWORD_CHANGED_TEMPLATE: &str = "password_changed";
/// Subject of the password change notice
pub const PASSWORD_CHANGED_SUBJECT: &str = "Password changed";

#[derive(Error, Debug)]
pub enum MailError {
    #[error("mail transport unavailable: {0}")]
    Unavailable(String),
}

/// Trait for templated mail senders
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Render `template_id` with `params` and send it to `recipient`
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        template_id: &str,
        params: &Value,
    ) -> Result<(), MailError>;
}

/// A message captured by the recording mailer
#[derive(Debug, Clone)]
pub struct SentMail {
    pub recipient: String,
    pub subject: String,
    pub template_id: String,
    pub params: Value,
}

/// In-memory implementation of the Mailer trait.
///
/// Records every message instead of delivering it, and can be switched
/// into a failing mode to drive the engine's rollback paths.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
    failing: std::sync::atomic::AtomicBool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing
            .store(failing, std::sync::atomic::Ordering::SeqCst);
    }

    /// Everything sent so far, in order
    pub async fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        template_id: &str,
        params: &Value,
    ) -> Result<(), MailError> {
        if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(MailError::Unavailable(
                "recording mailer switched to failing".to_string(),
            ));
        }

        let mut sent = self.sent.lock().await;
        sent.push(SentMail {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            template_id: template_id.to_string(),
            params: params.clone(),
        });
        Ok(())
    }
}
