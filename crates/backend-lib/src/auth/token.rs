// ============================
// crates/backend-lib/src/auth/token.rs
// ============================
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
/** Secure one-time token generation
This module provides cryptographically secure token generation for the
account verification round trip. */
use rand::{rngs::OsRng, RngCore};

/// Default token size in bytes (32 bytes = 256 bits of entropy)
const DEFAULT_TOKEN_BYTES: usize = 32;

/** Generate a cryptographically secure verification token
This uses OS-provided entropy to create a token that is safe to embed in a
mailed link without further encoding.
# Returns
A base64 URL-safe encoded string without padding */
pub fn generate_verification_token() -> String {
    generate_token_with_size(DEFAULT_TOKEN_BYTES)
}

/** Generate a cryptographically secure random token with specified size
# Arguments
* `bytes` - The size of the random token in bytes
# Returns
A base64 URL-safe encoded string without padding */
pub fn generate_token_with_size(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}
