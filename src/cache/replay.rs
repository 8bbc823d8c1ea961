//! In-memory replay guard for recently accepted tokens.
//!
//! Entries map a replay key (signature plus issue time) to the wall-clock
//! instant it was accepted. Lookups ignore entries older than the window;
//! a full sweep runs at most once per window so memory stays bounded.
//!
//! Per-process only. Durable double-attendance protection lives in the
//! attendance store's uniqueness constraint.

use crate::clock::Clock;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct Entries {
    accepted: HashMap<String, DateTime<Utc>>,
    last_sweep: DateTime<Utc>,
}

/// Short-horizon cache of accepted replay keys.
pub struct ReplayGuard {
    window: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<Entries>,
}

impl ReplayGuard {
    /// Create a guard remembering keys for `window`.
    pub fn new(window: std::time::Duration, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now_utc();
        Self {
            window: crate::config::to_chrono(window),
            clock,
            entries: Mutex::new(Entries {
                accepted: HashMap::new(),
                last_sweep: now,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        // A panic elsewhere cannot leave the map half-updated; keep serving.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_live(&self, accepted_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - accepted_at <= self.window
    }

    /// Whether `key` was accepted within the replay window.
    pub fn seen(&self, key: &str) -> bool {
        let now = self.clock.now_utc();
        let entries = self.lock();
        entries
            .accepted
            .get(key)
            .is_some_and(|at| self.is_live(*at, now))
    }

    /// Remember `key` as accepted now.
    pub fn record(&self, key: &str) {
        let now = self.clock.now_utc();
        let mut entries = self.lock();
        self.sweep_if_due(&mut entries, now);
        entries.accepted.insert(key.to_string(), now);
    }

    /// Atomically test and remember `key`.
    ///
    /// Returns `true` when the key was fresh and is now recorded, `false`
    /// when it was already accepted inside the window.
    pub fn check_and_record(&self, key: &str) -> bool {
        let now = self.clock.now_utc();
        let mut entries = self.lock();
        self.sweep_if_due(&mut entries, now);

        if let Some(at) = entries.accepted.get(key) {
            if self.is_live(*at, now) {
                return false;
            }
        }
        entries.accepted.insert(key.to_string(), now);
        true
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let now = self.clock.now_utc();
        let mut entries = self.lock();
        self.sweep(&mut entries, now)
    }

    /// Number of entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.lock().accepted.len()
    }

    /// Whether the guard holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sweep_if_due(&self, entries: &mut Entries, now: DateTime<Utc>) {
        if now - entries.last_sweep >= self.window {
            self.sweep(entries, now);
        }
    }

    fn sweep(&self, entries: &mut Entries, now: DateTime<Utc>) -> usize {
        let before = entries.accepted.len();
        let window = self.window;
        entries.accepted.retain(|_, at| now - *at <= window);
        entries.last_sweep = now;
        let removed = before - entries.accepted.len();
        if removed > 0 {
            tracing::debug!(removed, "pruned expired replay entries");
        }
        removed
    }
}

impl std::fmt::Debug for ReplayGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayGuard")
            .field("window", &self.window)
            .field("entries", &self.len())
            .finish()
    }
}
