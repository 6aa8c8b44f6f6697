// ============================
// usergate-backend-lib/src/auth/codec.rs
// ============================
//! Keyed password hashing.
//!
//! Digests are deterministic for a given (secret, password, salt) triple,
//! so the same function serves storage at registration and comparison at
//! login. The site secret is a second factor an attacker with a copied
//! store does not have; the per-account salt defeats precomputed tables.
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Per-account salt size in bytes
pub const SALT_BYTES: usize = 8;

/// PBKDF2 stretching rounds
const PBKDF2_ROUNDS: u32 = 100_000;

/// Digest output size in bytes
const DIGEST_BYTES: usize = 32;

/// Derives and verifies password digests under a site-wide secret key.
#[derive(Clone)]
pub struct CredentialCodec {
    secret: String,
}

impl CredentialCodec {
    pub fn new<S: Into<String>>(secret: S) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Derive the digest of `password` under the account `salt`.
    ///
    /// The password is first keyed with HMAC-SHA256 under the site secret,
    /// then stretched with PBKDF2-HMAC-SHA256 over the salt. Deterministic;
    /// same inputs always produce the same digest.
    pub fn hash(&self, password: &str, salt: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(password.as_bytes());
        let keyed: [u8; DIGEST_BYTES] = mac.finalize().into_bytes().into();
        let keyed = Zeroizing::new(keyed);

        let mut digest = [0u8; DIGEST_BYTES];
        pbkdf2_hmac::<Sha256>(&*keyed, salt.as_bytes(), PBKDF2_ROUNDS, &mut digest);
        URL_SAFE_NO_PAD.encode(digest)
    }

    /// Recompute and compare in constant time
    pub fn verify(&self, password: &str, salt: &str, expected: &str) -> bool {
        let computed = self.hash(password, salt);
        computed.as_bytes().ct_eq(expected.as_bytes()).into()
    }

    /// Produce a fresh per-account salt, base64 encoded
    pub fn random_salt(&self) -> String {
        let mut bytes = [0u8; SALT_BYTES];
        OsRng.fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}
