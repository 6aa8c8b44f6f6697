// ============================
// usergate-backend-lib/src/logging.rs
// ============================
//! Tracing subscriber bootstrap.
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber at the given default level.
/// `RUST_LOG` overrides the level when set. Repeated calls are no-ops so
/// tests can initialize logging without coordinating.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
