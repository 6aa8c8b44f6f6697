// ============================
// usergate-backend-lib/src/lib.rs
// ============================
//! Core backend-lib functionality for the `UserGate` account service.

pub mod accounts;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod notify;
pub mod store;
pub mod validation;

use std::sync::Arc;

use tracing::debug;
use usergate_common::{Candidate, ProvisionOutcome};

use crate::accounts::{AccountEngine, AccountPolicy};
use crate::auth::{CredentialCodec, SessionRegistry};
use crate::config::Settings;
use crate::notify::Mailer;
use crate::store::AccountStore;

/// Application state shared across all front ends
#[derive(Clone)]
pub struct AppState {
    /// Account lifecycle engine
    pub engine: Arc<AccountEngine>,
    /// Session token registry
    pub sessions: Arc<SessionRegistry>,
    /// Settings manager
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Wire the engine over the given store and mailer
    pub fn new(store: Arc<dyn AccountStore>, mailer: Arc<dyn Mailer>, settings: Settings) -> Self {
        let sessions = Arc::new(SessionRegistry::new(settings.session_ttl_secs));
        let codec = CredentialCodec::new(&settings.secret_key);
        let policy = AccountPolicy::from_settings(&settings);
        let engine = Arc::new(AccountEngine::new(
            store,
            sessions.clone(),
            mailer,
            codec,
            policy,
        ));
        Self {
            engine,
            sessions,
            settings: Arc::new(settings),
        }
    }

    /// Provision the administrator account named in the settings, if any.
    ///
    /// Safe to call on every start; an account that already exists is
    /// left untouched.
    pub async fn bootstrap_admin(&self) -> anyhow::Result<()> {
        let Some(admin) = &self.settings.admin else {
            return Ok(());
        };
        let candidate = Candidate {
            email: admin.email.clone(),
            first_name: admin.first_name.clone(),
            last_name: admin.last_name.clone(),
            password: admin.password.clone(),
            roles: Vec::new(),
        };
        match self.engine.provision(&candidate).await? {
            ProvisionOutcome::Provisioned => {},
            ProvisionOutcome::AlreadyRegistered => {
                debug!(email = %admin.email, "administrator account already present");
            },
            ProvisionOutcome::InvalidEmail { detail } => {
                anyhow::bail!("administrator email rejected: {detail}");
            },
            ProvisionOutcome::WeakPassword { detail } => {
                anyhow::bail!("administrator password rejected: {detail}");
            },
        }
        Ok(())
    }
}
