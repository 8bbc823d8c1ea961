//! Random nonce generation.

use rand::{rngs::OsRng, RngCore};

/// Nonce size in bytes.
pub const NONCE_LEN: usize = 16;

/// Draw a fresh nonce from the OS CSPRNG, hex-encoded.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Whether a hex string carries at least [`NONCE_LEN`] bytes of nonce.
pub fn is_valid_nonce(nonce_hex: &str) -> bool {
    hex::decode(nonce_hex).is_ok_and(|b| b.len() >= NONCE_LEN)
}
