// ============================
// usergate-backend-lib/src/auth/session.rs
// ============================
//! Session token registry.
//!
//! Tokens live in their own trust domain, outside the account store's
//! transaction boundary. At most one token per identity: issuing over a
//! live token returns the existing one, an explicit revoke clears it.
//! Expiry is evaluated lazily on lookup; there is no background sweeper.
use chrono::{DateTime, Duration, Utc};
use metrics::{counter, gauge};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use usergate_common::SessionToken;
use uuid::Uuid;

use crate::metrics::{SESSION_ACTIVE, SESSION_ISSUED, SESSION_REVOKED};

/// Registry of live session tokens keyed by account identity
#[derive(Clone)]
pub struct SessionRegistry {
    ttl: Duration,
    sessions: Arc<RwLock<HashMap<String, SessionToken>>>,
}

impl SessionRegistry {
    /// Create a registry issuing tokens with the given lifetime
    pub fn new(ttl_secs: u64) -> Self {
        SessionRegistry {
            ttl: Duration::seconds(ttl_secs as i64),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Return the live token for an identity, if one exists
    pub async fn authorize(&self, identity: &str) -> Option<SessionToken> {
        let sessions = self.sessions.read().await;
        sessions
            .get(identity)
            .filter(|token| token.is_live(Utc::now()))
            .cloned()
    }

    /// Mint and install a new token, replacing any existing one
    pub async fn install(&self, identity: &str, roles: Vec<String>) -> SessionToken {
        let now = Utc::now();
        let token = self.mint(now, roles);

        let mut sessions = self.sessions.write().await;
        sessions.insert(identity.to_string(), token.clone());

        counter!(SESSION_ISSUED).increment(1);
        gauge!(SESSION_ACTIVE).set(sessions.len() as f64);

        token
    }

    /// Return the live token for an identity, minting and installing one
    /// if none exists. Check and insert happen under a single lock
    /// acquisition, so concurrent callers converge on one token.
    pub async fn get_or_install(&self, identity: &str, roles: Vec<String>) -> SessionToken {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions.get(identity) {
            if existing.is_live(now) {
                return existing.clone();
            }
        }

        let token = self.mint(now, roles);
        sessions.insert(identity.to_string(), token.clone());

        counter!(SESSION_ISSUED).increment(1);
        gauge!(SESSION_ACTIVE).set(sessions.len() as f64);

        token
    }

    fn mint(&self, now: DateTime<Utc>, roles: Vec<String>) -> SessionToken {
        SessionToken {
            token: Uuid::new_v4().to_string(),
            roles,
            issued_at: now,
            expires_at: now + self.ttl,
        }
    }

    /// Clear any token for the identity; no-op if none exists
    pub async fn revoke(&self, identity: &str) {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(identity).is_some() {
            counter!(SESSION_REVOKED).increment(1);
            gauge!(SESSION_ACTIVE).set(sessions.len() as f64);
        }
    }

    /// Check a presented token against the identity's live token
    pub async fn validate(&self, identity: &str, token: &str) -> bool {
        match self.authorize(identity).await {
            Some(live) => live.token == token,
            None => false,
        }
    }
}
