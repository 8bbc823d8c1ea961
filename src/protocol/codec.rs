//! Token transport format.
//!
//! Tokens travel as flat JSON, embedded verbatim in the QR code:
//!
//! ```text
//! {"eventId":"E1","timestamp":"2025-01-15T12:00:00.000Z","hash":"<64 hex>",
//!  "nonce":"<32 hex>","version":"2.0",
//!  "metadata":{"eventTitle":"..","clubName":"..","location":"..",
//!              "validFrom":"<rfc3339>","validUntil":"<rfc3339>"}}
//! ```
//!
//! Decoding is strict: unknown keys are rejected, required keys are checked
//! before the version, and field shapes are checked only once the version is
//! known. None of it needs the secret.

use crate::crypto::nonce::is_valid_nonce;
use crate::crypto::signing::format_issued_at;
use crate::crypto::verify::SIGNATURE_HEX_LEN;
use crate::protocol::models::{AttendanceToken, TokenMetadata, SUPPORTED_VERSIONS};
use crate::RollcallError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct WireToken {
    event_id: Option<String>,
    #[serde(alias = "issuedAt")]
    timestamp: Option<String>,
    #[serde(alias = "signature")]
    hash: Option<String>,
    nonce: Option<String>,
    version: Option<String>,
    metadata: Option<WireMetadata>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct WireMetadata {
    #[serde(default)]
    event_title: String,
    #[serde(default)]
    club_name: String,
    #[serde(default)]
    location: String,
    valid_from: Option<String>,
    valid_until: Option<String>,
}

/// Serialize a token to its transport string.
pub fn encode(token: &AttendanceToken) -> Result<String, RollcallError> {
    let wire = WireToken {
        event_id: Some(token.event_id.clone()),
        timestamp: Some(format_issued_at(&token.issued_at)),
        hash: Some(token.signature.clone()),
        nonce: Some(token.nonce.clone()),
        version: Some(token.version.clone()),
        metadata: Some(WireMetadata {
            event_title: token.metadata.event_title.clone(),
            club_name: token.metadata.club_name.clone(),
            location: token.metadata.location.clone(),
            valid_from: Some(token.metadata.valid_from.to_rfc3339()),
            valid_until: Some(token.metadata.valid_until.to_rfc3339()),
        }),
    };

    serde_json::to_string(&wire)
        .map_err(|e| RollcallError::MalformedToken(format!("Failed to serialize token: {}", e)))
}

/// Parse a scanned string into a token.
///
/// # Errors
/// * `MalformedToken` - Not JSON, wrong shape, or a field fails its format check
/// * `MissingField` - A required field is absent, null, or empty
/// * `UnsupportedVersion` - Version tag is not in [`SUPPORTED_VERSIONS`]
pub fn decode(raw: &str) -> Result<AttendanceToken, RollcallError> {
    let wire: WireToken = serde_json::from_str(raw.trim())
        .map_err(|e| RollcallError::MalformedToken(e.to_string()))?;

    // Completeness
    let event_id = required(wire.event_id, "eventId")?;
    let timestamp = required(wire.timestamp, "timestamp")?;
    let hash = required(wire.hash, "hash")?;
    let nonce = required(wire.nonce, "nonce")?;
    let metadata = wire
        .metadata
        .ok_or(RollcallError::MissingField { field: "metadata" })?;
    let version = required(wire.version, "version")?;

    // Version gate
    if !SUPPORTED_VERSIONS.contains(&version.as_str()) {
        return Err(RollcallError::UnsupportedVersion { version });
    }

    // Field shapes
    let issued_at = parse_time(&timestamp, "timestamp")?;

    if !is_valid_nonce(&nonce) {
        return Err(RollcallError::MalformedToken(
            "nonce must be at least 16 hex-encoded bytes".to_string(),
        ));
    }

    if hash.len() != SIGNATURE_HEX_LEN || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(RollcallError::MalformedToken(format!(
            "hash must be {} hex characters",
            SIGNATURE_HEX_LEN
        )));
    }

    let valid_from = parse_time(
        &required(metadata.valid_from, "metadata.validFrom")?,
        "metadata.validFrom",
    )?;
    let valid_until = parse_time(
        &required(metadata.valid_until, "metadata.validUntil")?,
        "metadata.validUntil",
    )?;
    if valid_from > valid_until {
        return Err(RollcallError::MalformedToken(
            "metadata.validFrom is after metadata.validUntil".to_string(),
        ));
    }

    Ok(AttendanceToken {
        event_id,
        issued_at,
        nonce: nonce.to_ascii_lowercase(),
        signature: hash.to_ascii_lowercase(),
        version,
        metadata: TokenMetadata {
            event_title: metadata.event_title,
            club_name: metadata.club_name,
            location: metadata.location,
            valid_from,
            valid_until,
        },
    })
}

fn required(value: Option<String>, field: &'static str) -> Result<String, RollcallError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(RollcallError::MissingField { field }),
    }
}

fn parse_time(value: &str, field: &str) -> Result<DateTime<Utc>, RollcallError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RollcallError::MalformedToken(format!("Invalid {}: {} ({})", field, value, e)))
}
