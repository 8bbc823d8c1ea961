//! In-memory store backend.
//!
//! Enforces the attendance uniqueness constraint inside a single write lock,
//! the same guarantee a unique index gives a relational backend.

use crate::protocol::models::{AttendanceRecord, EventRecord, Identity};
use crate::store::{AttendanceStore, EventStore, IdentityProvider, MembershipStore, StoreError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

type AttendanceKey = (String, String);

/// Volatile store holding events, club admins and attendance.
#[derive(Debug, Default)]
pub struct MemoryStore {
    events: RwLock<HashMap<String, EventRecord>>,
    admins: RwLock<HashSet<(String, String)>>,
    attendance: RwLock<HashMap<AttendanceKey, AttendanceRecord>>,
    offline: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an event.
    pub async fn put_event(&self, event: EventRecord) {
        self.events.write().await.insert(event.id.clone(), event);
    }

    /// Approve `user_id` as an admin of `club_id`.
    pub async fn add_club_admin(&self, user_id: &str, club_id: &str) {
        self.admins
            .write()
            .await
            .insert((user_id.to_string(), club_id.to_string()));
    }

    /// Make every call fail with a backend error until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of attendance records across all events.
    pub async fn attendance_count(&self) -> usize {
        self.attendance.read().await.len()
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn find_event(&self, event_id: &str) -> Result<Option<EventRecord>, StoreError> {
        self.ensure_online()?;
        Ok(self.events.read().await.get(event_id).cloned())
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn find_attendance(
        &self,
        event_id: &str,
        attendee_id: &str,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        self.ensure_online()?;
        let key = (event_id.to_string(), attendee_id.to_string());
        Ok(self.attendance.read().await.get(&key).cloned())
    }

    async fn insert_attendance(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        self.ensure_online()?;
        let key = (record.event_id.clone(), record.attendee_id.clone());
        let mut attendance = self.attendance.write().await;
        if attendance.contains_key(&key) {
            return Err(StoreError::Conflict);
        }
        attendance.insert(key, record.clone());
        Ok(())
    }

    async fn list_attendance(&self, event_id: &str) -> Result<Vec<AttendanceRecord>, StoreError> {
        self.ensure_online()?;
        let mut records: Vec<_> = self
            .attendance
            .read()
            .await
            .values()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.attendee_id.cmp(&b.attendee_id))
        });
        Ok(records)
    }
}

#[async_trait]
impl MembershipStore for MemoryStore {
    async fn is_club_admin(&self, user_id: &str, club_id: &str) -> Result<bool, StoreError> {
        self.ensure_online()?;
        Ok(self
            .admins
            .read()
            .await
            .contains(&(user_id.to_string(), club_id.to_string())))
    }
}

/// Identity provider that always reports the same user.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(pub Option<Identity>);

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_user(&self) -> Result<Option<Identity>, StoreError> {
        Ok(self.0.clone())
    }
}
