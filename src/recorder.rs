//! Attendance recording.
//!
//! Turns a verified scan (or an admin's manual pick) into exactly one
//! persisted [`AttendanceRecord`] per `(event, attendee)`.
//!
//! Store calls are awaited with a timeout and never retried: a retried
//! write could double-submit, so failures go straight back to the caller.

use crate::clock::Clock;
use crate::policy::access::{check_recording_rights, needs_membership_lookup, scan_method};
use crate::protocol::models::{AttendanceMethod, AttendanceRecord, EventRecord, Identity};
use crate::store::{AttendanceStore, EventStore, MembershipStore, StoreError};
use crate::validator::{EventSchedule, TokenValidator, ValidationDetails};
use crate::RollcallError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Store handles the recorder needs.
#[derive(Clone)]
pub struct Stores {
    /// Event lookups.
    pub events: Arc<dyn EventStore>,
    /// Attendance persistence.
    pub attendance: Arc<dyn AttendanceStore>,
    /// Club admin lookups.
    pub members: Arc<dyn MembershipStore>,
}

impl Stores {
    /// Use one backend for every concern.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: EventStore + AttendanceStore + MembershipStore + 'static,
    {
        Self {
            events: store.clone(),
            attendance: store.clone(),
            members: store,
        }
    }
}

/// Successful check-in, for UI confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckInOutcome {
    /// Title of the event checked into.
    pub event_title: String,
    /// How the record was made.
    pub method: AttendanceMethod,
    /// The persisted record.
    pub record: AttendanceRecord,
    /// Step flags from token verification; `None` for manual entries.
    pub validation: Option<ValidationDetails>,
}

/// Records attendance after verification and authorization.
pub struct AttendanceRecorder {
    validator: Arc<TokenValidator>,
    stores: Stores,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
}

impl AttendanceRecorder {
    /// Create a recorder.
    pub fn new(
        validator: Arc<TokenValidator>,
        stores: Stores,
        clock: Arc<dyn Clock>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            validator,
            stores,
            clock,
            store_timeout,
        }
    }

    /// Check in `attendee_id` from a scanned event code.
    ///
    /// `scanner` is whoever is holding the camera. When that is the attendee
    /// the record is a self-scan; otherwise it is a staff scan and the
    /// scanner must hold admin rights on the owning club.
    pub async fn record_scan(
        &self,
        raw: &str,
        attendee_id: &str,
        scanner: &Identity,
    ) -> Result<CheckInOutcome, RollcallError> {
        // Unauthenticated input never reaches the store.
        let target = self.validator.authenticate(raw)?;
        let event = self.load_event(&target.event_id).await?;

        // A denied scan must not consume the replay slot.
        let method = scan_method(&scanner.id, attendee_id);
        if method == AttendanceMethod::StaffScan {
            self.authorize(scanner, &event).await?;
        }

        let result = self.validator.validate(
            raw,
            Some(EventSchedule {
                start: event.start,
                end: event.end,
            }),
        );
        let (event_id, _, details) = result.into_result()?;

        let record = self.persist(&event_id, attendee_id, method).await?;
        Ok(CheckInOutcome {
            event_title: event.title,
            method,
            record,
            validation: Some(details),
        })
    }

    /// Record attendance picked by an admin from the directory.
    ///
    /// Skips token verification entirely but still enforces admin rights
    /// and the one-record-per-attendee rule.
    pub async fn record_manual(
        &self,
        event_id: &str,
        attendee_id: &str,
        actor: &Identity,
    ) -> Result<CheckInOutcome, RollcallError> {
        let event = self.load_event(event_id).await?;
        self.authorize(actor, &event).await?;

        let record = self
            .persist(&event.id, attendee_id, AttendanceMethod::Manual)
            .await?;
        Ok(CheckInOutcome {
            event_title: event.title,
            method: AttendanceMethod::Manual,
            record,
            validation: None,
        })
    }

    /// Attendance recorded so far for an event.
    pub async fn attendance_for(
        &self,
        event_id: &str,
    ) -> Result<Vec<AttendanceRecord>, RollcallError> {
        self.call(self.stores.attendance.list_attendance(event_id))
            .await
    }

    async fn load_event(&self, event_id: &str) -> Result<EventRecord, RollcallError> {
        self.call(self.stores.events.find_event(event_id))
            .await?
            .ok_or_else(|| RollcallError::EventNotFound {
                event_id: event_id.to_string(),
            })
    }

    async fn authorize(&self, actor: &Identity, event: &EventRecord) -> Result<(), RollcallError> {
        let is_admin = if needs_membership_lookup(actor) {
            self.call(self.stores.members.is_club_admin(&actor.id, &event.club_id))
                .await?
        } else {
            false
        };

        if let Err(e) = check_recording_rights(actor, is_admin) {
            tracing::warn!(
                actor = %actor.id,
                event_id = %event.id,
                club_id = %event.club_id,
                "attendance write denied"
            );
            return Err(e);
        }
        Ok(())
    }

    async fn persist(
        &self,
        event_id: &str,
        attendee_id: &str,
        method: AttendanceMethod,
    ) -> Result<AttendanceRecord, RollcallError> {
        if self
            .call(self.stores.attendance.find_attendance(event_id, attendee_id))
            .await?
            .is_some()
        {
            tracing::info!(event_id, attendee_id, "attendance already logged");
            return Err(RollcallError::AlreadyCheckedIn);
        }

        let record = AttendanceRecord {
            event_id: event_id.to_string(),
            attendee_id: attendee_id.to_string(),
            method,
            timestamp: self.clock.now_utc(),
        };
        self.call(self.stores.attendance.insert_attendance(&record))
            .await?;

        tracing::info!(event_id, attendee_id, %method, "attendance recorded");
        Ok(record)
    }

    /// Await one store call under the configured timeout.
    async fn call<T, F>(&self, fut: F) -> Result<T, RollcallError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.store_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            // Lost a race with a concurrent check-in of the same attendee.
            Ok(Err(StoreError::Conflict)) => Err(RollcallError::AlreadyCheckedIn),
            Ok(Err(StoreError::Backend(e))) => {
                tracing::error!(error = %e, "attendance store call failed");
                Err(RollcallError::Storage(e))
            }
            Err(_) => {
                tracing::error!(
                    timeout_ms = self.store_timeout.as_millis() as u64,
                    "attendance store call timed out"
                );
                Err(RollcallError::Storage("store call timed out".to_string()))
            }
        }
    }
}
