//! HMAC-SHA256 signature engine.

use crate::config::SecretKey;
use crate::crypto::signing::build_signing_string;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Length of a hex-encoded signature.
pub const SIGNATURE_HEX_LEN: usize = 64;

/// Keyed signer and verifier for attendance tokens.
///
/// Holds the process-wide secret. Comparison happens only here and in
/// constant time.
#[derive(Debug, Clone)]
pub struct SignatureEngine {
    secret: SecretKey,
}

impl SignatureEngine {
    /// Create an engine around the configured secret.
    pub fn new(secret: SecretKey) -> Self {
        Self { secret }
    }

    fn mac_for(&self, event_id: &str, issued_at: &DateTime<Utc>, nonce_hex: &str) -> HmacSha256 {
        // HMAC accepts keys of any length; `new_from_slice` cannot fail here.
        let mut mac = HmacSha256::new_from_slice(self.secret.expose())
            .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any size"));
        mac.update(build_signing_string(event_id, issued_at, nonce_hex).as_bytes());
        mac
    }

    /// Compute the lowercase hex signature for a token's fields.
    pub fn sign(&self, event_id: &str, issued_at: &DateTime<Utc>, nonce_hex: &str) -> String {
        hex::encode(self.mac_for(event_id, issued_at, nonce_hex).finalize().into_bytes())
    }

    /// Recompute and compare a signature in constant time.
    ///
    /// Returns `false` for non-hex or wrong-length input.
    pub fn verify(
        &self,
        event_id: &str,
        issued_at: &DateTime<Utc>,
        nonce_hex: &str,
        signature_hex: &str,
    ) -> bool {
        let Ok(expected) = hex::decode(signature_hex) else {
            return false;
        };
        self.mac_for(event_id, issued_at, nonce_hex)
            .verify_slice(&expected)
            .is_ok()
    }
}
