//! Record store and identity collaborators.
//!
//! The hosted backend is consumed through these narrow async traits. Any
//! backend failure surfaces as [`StoreError::Backend`]; the only structured
//! failure is a uniqueness [`StoreError::Conflict`] on attendance inserts.

pub mod memory;

use crate::protocol::models::{AttendanceRecord, EventRecord, Identity};
use async_trait::async_trait;
use thiserror::Error;

pub use memory::{MemoryStore, StaticIdentity};

/// Failures reported by a store backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("record already exists")]
    Conflict,

    /// Any other backend failure (network, permissions, ...).
    #[error("{0}")]
    Backend(String),
}

/// Read access to events.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Load an event by id.
    async fn find_event(&self, event_id: &str) -> Result<Option<EventRecord>, StoreError>;
}

/// Attendance persistence.
///
/// Implementations must enforce uniqueness of `(event_id, attendee_id)`
/// and report violations as [`StoreError::Conflict`].
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Look up the record for one attendee at one event.
    async fn find_attendance(
        &self,
        event_id: &str,
        attendee_id: &str,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Insert a new record.
    async fn insert_attendance(&self, record: &AttendanceRecord) -> Result<(), StoreError>;

    /// All records for an event, oldest first.
    async fn list_attendance(&self, event_id: &str) -> Result<Vec<AttendanceRecord>, StoreError>;
}

/// Club administration lookups.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Whether `user_id` is an approved admin of `club_id`.
    async fn is_club_admin(&self, user_id: &str, club_id: &str) -> Result<bool, StoreError>;
}

/// Source of the signed-in user.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The current user, or `None` when signed out.
    async fn current_user(&self) -> Result<Option<Identity>, StoreError>;
}
