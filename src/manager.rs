//! Check-in Manager - the main public API for Rollcall.
//!
//! The `CheckInManager` wires one signature engine, one replay guard and one
//! clock into the generator, validator and recorder. Build one per process
//! (or per test) and share it; nothing here is a global.

use crate::cache::replay::ReplayGuard;
use crate::clock::{Clock, SystemClock};
use crate::config::RollcallConfig;
use crate::crypto::verify::SignatureEngine;
use crate::generator::{GeneratedToken, TokenGenerator};
use crate::protocol::models::{AttendanceRecord, EventRecord, Identity};
use crate::recorder::{AttendanceRecorder, CheckInOutcome, Stores};
use crate::scan::ScanDebouncer;
use crate::store::IdentityProvider;
use crate::validator::{EventSchedule, TokenValidator, ValidationResult};
use crate::RollcallError;
use std::sync::Arc;

/// Main entry point for issuing codes and recording attendance.
pub struct CheckInManager {
    config: RollcallConfig,
    clock: Arc<dyn Clock>,
    stores: Stores,
    identity: Arc<dyn IdentityProvider>,
    replay: Arc<ReplayGuard>,
    generator: TokenGenerator,
    validator: Arc<TokenValidator>,
    recorder: AttendanceRecorder,
}

impl CheckInManager {
    /// Create a manager on the system clock.
    ///
    /// # Errors
    /// Returns `ConfigError` if configuration validation fails.
    pub fn new(
        config: RollcallConfig,
        stores: Stores,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self, RollcallError> {
        Self::with_clock(config, stores, identity, Arc::new(SystemClock))
    }

    /// Create a manager on an injected clock.
    pub fn with_clock(
        config: RollcallConfig,
        stores: Stores,
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RollcallError> {
        config.validate()?;

        let engine = Arc::new(SignatureEngine::new(config.secret.clone()));
        let replay = Arc::new(ReplayGuard::new(config.replay_window, clock.clone()));
        let generator = TokenGenerator::new(&config, engine.clone(), clock.clone());
        let validator = Arc::new(TokenValidator::new(
            &config,
            engine,
            replay.clone(),
            clock.clone(),
        ));
        let recorder = AttendanceRecorder::new(
            validator.clone(),
            stores.clone(),
            clock.clone(),
            config.store_timeout,
        );

        Ok(Self {
            config,
            clock,
            stores,
            identity,
            replay,
            generator,
            validator,
            recorder,
        })
    }

    /// Issue a fresh code for an event row the caller already holds.
    pub fn generate(&self, event: &EventRecord) -> Result<GeneratedToken, RollcallError> {
        self.generator.generate_for_event(event)
    }

    /// Issue a fresh code for an event looked up by id.
    pub async fn generate_for(&self, event_id: &str) -> Result<GeneratedToken, RollcallError> {
        let event = tokio::time::timeout(
            self.config.store_timeout,
            self.stores.events.find_event(event_id),
        )
        .await
        .map_err(|_| RollcallError::Storage("store call timed out".to_string()))?
        .map_err(|e| RollcallError::Storage(e.to_string()))?
        .ok_or_else(|| RollcallError::EventNotFound {
            event_id: event_id.to_string(),
        })?;
        self.generate(&event)
    }

    /// Verify a scanned string without recording attendance.
    pub fn validate(&self, raw: &str, schedule: Option<EventSchedule>) -> ValidationResult {
        self.validator.validate(raw, schedule)
    }

    /// The signed-in user checks themself in.
    pub async fn check_in(&self, raw: &str) -> Result<CheckInOutcome, RollcallError> {
        let me = self.current_user().await?;
        self.recorder.record_scan(raw, &me.id, &me).await
    }

    /// The signed-in user checks in someone else by scanning for them.
    pub async fn staff_check_in(
        &self,
        raw: &str,
        attendee_id: &str,
    ) -> Result<CheckInOutcome, RollcallError> {
        let me = self.current_user().await?;
        self.recorder.record_scan(raw, attendee_id, &me).await
    }

    /// The signed-in admin records attendance by hand.
    pub async fn manual_check_in(
        &self,
        event_id: &str,
        attendee_id: &str,
    ) -> Result<CheckInOutcome, RollcallError> {
        let me = self.current_user().await?;
        self.recorder.record_manual(event_id, attendee_id, &me).await
    }

    /// Attendance recorded so far for an event.
    pub async fn attendance(&self, event_id: &str) -> Result<Vec<AttendanceRecord>, RollcallError> {
        self.recorder.attendance_for(event_id).await
    }

    /// A debouncer for one camera session.
    pub fn scan_debouncer(&self) -> ScanDebouncer {
        ScanDebouncer::new(self.config.scan_debounce, self.clock.clone())
    }

    /// Drop expired replay entries now rather than on the next scan.
    pub fn prune_replay_cache(&self) -> usize {
        self.replay.prune()
    }

    /// Get the current configuration.
    pub fn config(&self) -> &RollcallConfig {
        &self.config
    }

    async fn current_user(&self) -> Result<Identity, RollcallError> {
        self.identity
            .current_user()
            .await
            .map_err(|e| RollcallError::Storage(e.to_string()))?
            .ok_or(RollcallError::Unauthorized)
    }
}
