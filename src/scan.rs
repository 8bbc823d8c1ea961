//! Camera scan loop support.
//!
//! A camera decodes the same static code many times per second. The
//! debouncer collapses those repeats into one scan event before anything
//! reaches the validator or the replay guard.

use crate::clock::Clock;
use chrono::{DateTime, Duration, Utc};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

/// Suppresses repeat decodes of the same code within a short window.
pub struct ScanDebouncer {
    window: Duration,
    clock: Arc<dyn Clock>,
    last: Mutex<Option<(String, DateTime<Utc>)>>,
}

impl ScanDebouncer {
    /// Create a debouncer with the given window (at least one second in
    /// practice; see `RollcallConfig::scan_debounce`).
    pub fn new(window: std::time::Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            window: crate::config::to_chrono(window),
            clock,
            last: Mutex::new(None),
        }
    }

    /// Whether this decoded frame should be processed.
    ///
    /// A frame is skipped when it carries the same text as the last
    /// processed frame and arrives inside the window.
    pub fn should_process(&self, raw: &str) -> bool {
        let now = self.clock.now_utc();
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some((prev, at)) = last.as_ref() {
            if prev == raw && now - *at < self.window {
                return false;
            }
        }
        *last = Some((raw.to_string(), now));
        true
    }

    /// Forget the last processed frame.
    pub fn reset(&self) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Drive a scan session until the camera side closes its channel.
///
/// Each decoded frame that survives debouncing is handed to `handler` and
/// awaited to completion before the next frame is read, so closing the
/// camera never interrupts a check-in that already reached the store.
/// Returns the number of frames handed to `handler`.
pub async fn run_scan_loop<H, Fut>(
    mut frames: mpsc::Receiver<String>,
    debouncer: &ScanDebouncer,
    mut handler: H,
) -> usize
where
    H: FnMut(String) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut processed = 0;
    while let Some(raw) = frames.recv().await {
        if !debouncer.should_process(&raw) {
            continue;
        }
        processed += 1;
        handler(raw).await;
    }
    tracing::debug!(processed, "scan loop stopped");
    processed
}
