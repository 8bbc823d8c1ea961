//! Signing string construction for attendance tokens.
//!
//! The MAC covers exactly three fields, newline-delimited:
//! ```text
//! event-id: <event id>
//! issued-at: <YYYY-MM-DDTHH:MM:SS.mmmZ>
//! nonce: <lowercase hex>
//! ```

use chrono::{DateTime, SecondsFormat, Utc};

/// Canonical text form of an issue timestamp.
///
/// Millisecond precision with a `Z` suffix; the same string goes on the
/// wire and into the signing string.
pub fn format_issued_at(issued_at: &DateTime<Utc>) -> String {
    issued_at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Build the signing string for a token.
///
/// # Arguments
/// * `event_id` - Opaque event identifier
/// * `issued_at` - Token generation time
/// * `nonce_hex` - Hex-encoded random nonce
pub fn build_signing_string(event_id: &str, issued_at: &DateTime<Utc>, nonce_hex: &str) -> String {
    // No trailing newline; nonce is lowercased so hex case never changes the MAC.
    format!(
        "event-id: {}\nissued-at: {}\nnonce: {}",
        event_id,
        format_issued_at(issued_at),
        nonce_hex.to_ascii_lowercase()
    )
}
