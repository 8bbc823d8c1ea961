//! Rollcall error types.

use thiserror::Error;

/// Errors that can occur while issuing, verifying, or recording attendance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RollcallError {
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Scanned text is not a syntactically valid token.
    #[error("Invalid token format: {0}")]
    MalformedToken(String),

    /// Token parsed but a required field is absent.
    #[error("Invalid token format: missing field `{field}`")]
    MissingField {
        /// Wire name of the missing field.
        field: &'static str,
    },

    /// Token carries a version tag this build does not understand.
    #[error("Unsupported token version: {version}")]
    UnsupportedVersion {
        /// The version tag found in the token.
        version: String,
    },

    /// Token signature does not match its fields.
    #[error("Invalid token signature")]
    SignatureInvalid,

    /// Token is older than the absolute age ceiling.
    #[error("Token expired ({age_seconds}s old)")]
    TokenTooOld {
        /// Age of the token in seconds.
        age_seconds: i64,
    },

    /// Token claims to be issued in the future (clock tampering or skew).
    #[error("Token issue time is in the future")]
    TokenFromFuture,

    /// Scan happened outside the event's check-in window.
    #[error("Outside valid time window")]
    OutsideTimeWindow,

    /// The same token was accepted within the replay window.
    #[error("Token recently scanned")]
    ReplayDetected,

    /// Token points at an event the store does not know.
    #[error("Event not found: {event_id}")]
    EventNotFound {
        /// The event id carried by the request.
        event_id: String,
    },

    /// Actor is not allowed to record attendance for this event.
    #[error("Not authorized to record attendance for this event")]
    Unauthorized,

    /// Attendee already has an attendance record for this event.
    #[error("Attendance already logged")]
    AlreadyCheckedIn,

    /// The backing record store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Rendering the token image failed.
    #[error("QR rendering error: {0}")]
    Render(String),
}

/// Coarse failure categories used for user guidance and telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad configuration at startup.
    Config,
    /// Unparseable or incomplete input.
    Format,
    /// Unknown token version.
    UnsupportedVersion,
    /// Forged or tampered token.
    Signature,
    /// Token aged out or scanned outside its window.
    Expired,
    /// Token seen again inside the replay window.
    Replay,
    /// Actor lacks rights on the owning club.
    Authorization,
    /// Attendance already exists.
    DuplicateAttendance,
    /// Record store failure.
    Storage,
    /// Image rendering failure.
    Render,
}

impl RollcallError {
    /// Map this error onto its failure category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigError(_) => ErrorKind::Config,
            Self::MalformedToken(_) | Self::MissingField { .. } | Self::EventNotFound { .. } => {
                ErrorKind::Format
            }
            Self::UnsupportedVersion { .. } => ErrorKind::UnsupportedVersion,
            Self::SignatureInvalid => ErrorKind::Signature,
            Self::TokenTooOld { .. } | Self::TokenFromFuture | Self::OutsideTimeWindow => {
                ErrorKind::Expired
            }
            Self::ReplayDetected => ErrorKind::Replay,
            Self::Unauthorized => ErrorKind::Authorization,
            Self::AlreadyCheckedIn => ErrorKind::DuplicateAttendance,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Render(_) => ErrorKind::Render,
        }
    }

    /// Whether this outcome is an expected, harmless rejection.
    pub fn is_benign(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::DuplicateAttendance | ErrorKind::Replay
        )
    }

    /// Guidance shown to the attendee or organizer.
    pub fn user_message(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Config => {
                "Check-in is not configured correctly. Please contact an organizer."
            }
            ErrorKind::Format => {
                "This QR code isn't a valid event check-in code. Please rescan the code shown at the event."
            }
            ErrorKind::UnsupportedVersion => {
                "This QR code was made by a newer or older version of the app. Ask an organizer to display a fresh code."
            }
            ErrorKind::Signature => {
                "This QR code could not be verified. Please scan the official code displayed by the organizers."
            }
            ErrorKind::Expired => "This QR code has expired or check-in is not open right now.",
            ErrorKind::Replay => {
                "This code was just scanned. Please wait a moment; you may already be checked in."
            }
            ErrorKind::Authorization => {
                "You don't have permission to record attendance for this event."
            }
            ErrorKind::DuplicateAttendance => "Attendance is already logged for this event.",
            ErrorKind::Storage => "We couldn't save your check-in. Please try again.",
            ErrorKind::Render => {
                "The check-in code could not be displayed. Please try refreshing it."
            }
        }
    }
}
