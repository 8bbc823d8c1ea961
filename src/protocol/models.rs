//! Attendance token and record types.

use crate::crypto::freshness::CheckInWindow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Version tag stamped on newly generated tokens.
pub const CURRENT_VERSION: &str = "2.0";

/// Version tags this build can verify.
pub const SUPPORTED_VERSIONS: &[&str] = &[CURRENT_VERSION];

/// Display-only event details plus the embedded check-in window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetadata {
    /// Event title shown on the scan confirmation.
    pub event_title: String,

    /// Name of the club hosting the event.
    pub club_name: String,

    /// Free-form venue text.
    pub location: String,

    /// Check-in opens (event start minus grace).
    pub valid_from: DateTime<Utc>,

    /// Check-in closes (event end plus grace).
    pub valid_until: DateTime<Utc>,
}

impl TokenMetadata {
    /// The check-in window carried by the token.
    pub fn window(&self) -> CheckInWindow {
        CheckInWindow {
            valid_from: self.valid_from,
            valid_until: self.valid_until,
        }
    }
}

/// Signed, time-bounded payload rendered into the event QR code.
///
/// Ephemeral: generated per display and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceToken {
    /// Target event.
    pub event_id: String,

    /// Generation time, millisecond precision.
    pub issued_at: DateTime<Utc>,

    /// Lowercase hex, at least 16 random bytes.
    pub nonce: String,

    /// Lowercase hex HMAC-SHA256 over event id, issue time and nonce.
    pub signature: String,

    /// Format version tag.
    pub version: String,

    /// Display fields and embedded window.
    pub metadata: TokenMetadata,
}

impl AttendanceToken {
    /// Key under which the replay guard remembers this token.
    pub fn replay_key(&self) -> String {
        format!(
            "{}@{}",
            self.signature,
            crate::crypto::signing::format_issued_at(&self.issued_at)
        )
    }
}

/// How an attendance record came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttendanceMethod {
    /// Attendee scanned the event code on their own device.
    SelfScan,
    /// Organizer scanned on behalf of the attendee.
    StaffScan,
    /// Admin picked the attendee from the directory.
    Manual,
}

impl fmt::Display for AttendanceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SelfScan => "self-scan",
            Self::StaffScan => "staff-scan",
            Self::Manual => "manual",
        })
    }
}

/// Persisted proof that an attendee was checked in.
///
/// At most one per `(event_id, attendee_id)`; never updated or deleted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    /// Event attended.
    pub event_id: String,

    /// Person checked in.
    pub attendee_id: String,

    /// Recording method.
    pub method: AttendanceMethod,

    /// When the record was written.
    pub timestamp: DateTime<Utc>,
}

/// Authoritative event row consumed from the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// Event identifier.
    pub id: String,

    /// Event title.
    pub title: String,

    /// Owning club.
    pub club_id: String,

    /// Owning club's display name.
    pub club_name: String,

    /// Venue text.
    pub location: String,

    /// Scheduled start.
    pub start: DateTime<Utc>,

    /// Scheduled end.
    pub end: DateTime<Utc>,
}

/// Role of the signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Regular member or guest.
    Attendee,
    /// Administrator of one or more clubs.
    ClubAdmin,
    /// Administrator of the whole college.
    CollegeAdmin,
}

/// The signed-in user, as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// User id.
    pub id: String,

    /// User role.
    pub role: Role,
}

impl Identity {
    /// Convenience constructor.
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
}
