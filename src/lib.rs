//! # Rollcall
//!
//! **Signed, time-bounded QR check-in for campus events.**
//!
//! Rollcall issues attendance tokens for an event, renders them as QR codes,
//! verifies scanned tokens, and records exactly one attendance row per
//! attendee per event.
//!
//! ## Features
//!
//! - **HMAC-SHA256 signatures**: tokens cannot be forged or edited without the secret
//! - **Bounded lifetime**: 24-hour age ceiling plus the event's check-in window
//! - **Replay guard**: the same token is refused for 5 minutes after it is accepted
//! - **Strict decoding**: malformed input is rejected before the secret is touched
//! - **One record per attendee**: existence check backed by a store-level unique constraint
//!
//! ## Quickstart
//!
//! ```no_run
//! use rollcall::{
//!     CheckInManager, Identity, MemoryStore, Role, RollcallConfig, StaticIdentity, Stores,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), rollcall::RollcallError> {
//! let config = RollcallConfig::from_env()?;
//! let store = Arc::new(MemoryStore::new());
//! let me = StaticIdentity(Some(Identity::new("student-42", Role::Attendee)));
//!
//! let manager = CheckInManager::new(config, Stores::shared(store), Arc::new(me))?;
//! let code = manager.generate_for("event-1").await?;
//! println!("{}", code.image.to_data_uri());
//!
//! let outcome = manager.check_in(&code.encoded).await?;
//! println!("Checked in to {}", outcome.event_title);
//! # Ok(())
//! # }
//! ```
//!
//! ## Threat Model
//!
//! Rollcall protects against:
//! - **Forged codes**: signature mismatch without the server secret
//! - **Shared screenshots**: replay guard plus the per-attendee uniqueness rule
//! - **Stale printouts**: age ceiling and the authoritative event window
//!
//! The replay guard is per process. Across several servers the durable
//! defense is the attendance store's uniqueness constraint.

#![warn(missing_docs)]

// Core modules
pub mod clock;
pub mod config;
pub mod errors;

// Crypto layer
pub mod crypto;

// Protocol layer
pub mod protocol;

// Cache layer
pub mod cache;

// Policy layer
pub mod policy;

// Store layer
pub mod store;

// Token lifecycle
pub mod generator;
pub mod render;
pub mod validator;

// Recording
pub mod recorder;
pub mod scan;

// Manager (main public API)
pub mod manager;

// Re-exports for public API
pub use cache::replay::ReplayGuard;
pub use clock::{Clock, SystemClock};
pub use config::{RollcallConfig, SecretKey};
pub use crypto::verify::SignatureEngine;
pub use errors::{ErrorKind, RollcallError};
pub use generator::{GeneratedToken, TokenGenerator};
pub use manager::CheckInManager;
pub use protocol::codec::{decode, encode};
pub use protocol::models::{
    AttendanceMethod, AttendanceRecord, AttendanceToken, EventRecord, Identity, Role,
    TokenMetadata,
};
pub use recorder::{AttendanceRecorder, CheckInOutcome, Stores};
pub use render::QrImage;
pub use scan::{run_scan_loop, ScanDebouncer};
pub use store::{
    AttendanceStore, EventStore, IdentityProvider, MembershipStore, MemoryStore, StaticIdentity,
    StoreError,
};
pub use validator::{EventSchedule, TokenValidator, ValidationDetails, ValidationResult};

#[cfg(any(test, feature = "test-seams"))]
pub use clock::MockClock;
