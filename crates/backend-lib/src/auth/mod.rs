// ============================
// usergate-backend-lib/src/auth/mod.rs
// ============================
//! Authentication primitives.

pub mod codec;
pub mod session;
pub mod token;

pub use codec::{CredentialCodec, SALT_BYTES};
pub use session::SessionRegistry;
pub use token::generate_verification_token;
