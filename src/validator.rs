//! Token verification state machine.
//!
//! Checks run in a fixed order and stop at the first failure:
//! 1. Parse (codec)
//! 2. Field completeness (codec)
//! 3. Version gate (codec)
//! 4. Absolute age, plus future-dated rejection
//! 5. Signature
//! 6. Check-in window (embedded, and authoritative when supplied)
//! 7. Replay guard
//!
//! Expected failures never escape as `Err`; they come back inside a
//! [`ValidationResult`] so callers can show specific guidance.

use crate::cache::replay::ReplayGuard;
use crate::clock::Clock;
use crate::config::{to_chrono, RollcallConfig};
use crate::crypto::freshness::{check_token_age, check_windows, CheckInWindow};
use crate::crypto::verify::SignatureEngine;
use crate::protocol::codec::decode;
use crate::protocol::models::{AttendanceToken, TokenMetadata};
use crate::RollcallError;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Authoritative event times from the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventSchedule {
    /// Scheduled start.
    pub start: DateTime<Utc>,
    /// Scheduled end.
    pub end: DateTime<Utc>,
}

/// Per-step outcome flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationDetails {
    /// Token parsed, was complete, and carried a supported version.
    pub format_valid: bool,
    /// Signature matched.
    pub hash_valid: bool,
    /// Scan fell inside every applicable window.
    pub time_valid: bool,
    /// Token was not seen within the replay window and is now recorded.
    pub replay_check: bool,
}

/// Itemized verdict for one scanned string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// All checks passed.
    pub is_valid: bool,
    /// Event id, populated only when valid.
    pub event_id: Option<String>,
    /// Display metadata, populated only when valid.
    pub metadata: Option<TokenMetadata>,
    /// Step flags.
    pub details: ValidationDetails,
    /// First failure, if any.
    pub error: Option<RollcallError>,
}

impl ValidationResult {
    /// Human-readable guidance for the failure, if any.
    pub fn user_message(&self) -> Option<&'static str> {
        self.error.as_ref().map(RollcallError::user_message)
    }

    /// Convert to a `Result`, keeping the validated token fields.
    pub fn into_result(self) -> Result<(String, TokenMetadata, ValidationDetails), RollcallError> {
        match (self.is_valid, self.event_id, self.metadata, self.error) {
            (true, Some(event_id), Some(metadata), _) => Ok((event_id, metadata, self.details)),
            (_, _, _, Some(error)) => Err(error),
            _ => Err(RollcallError::MalformedToken(
                "validation produced no verdict".to_string(),
            )),
        }
    }
}

/// Verifies scanned tokens.
pub struct TokenValidator {
    engine: Arc<SignatureEngine>,
    replay: Arc<ReplayGuard>,
    clock: Arc<dyn Clock>,
    grace_before: Duration,
    grace_after: Duration,
    max_token_age: Duration,
    max_clock_skew: Duration,
}

impl TokenValidator {
    /// Create a validator sharing the given engine, replay guard and clock.
    pub fn new(
        config: &RollcallConfig,
        engine: Arc<SignatureEngine>,
        replay: Arc<ReplayGuard>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engine,
            replay,
            clock,
            grace_before: to_chrono(config.grace_before),
            grace_after: to_chrono(config.grace_after),
            max_token_age: to_chrono(config.max_token_age),
            max_clock_skew: to_chrono(config.max_clock_skew),
        }
    }

    /// Run every check against a raw scanned string.
    ///
    /// When `schedule` is supplied the scan must also fall inside the
    /// grace-widened authoritative event window.
    pub fn validate(&self, raw: &str, schedule: Option<EventSchedule>) -> ValidationResult {
        let mut details = ValidationDetails::default();

        match self.run(raw, schedule, &mut details) {
            Ok(token) => ValidationResult {
                is_valid: true,
                event_id: Some(token.event_id),
                metadata: Some(token.metadata),
                details,
                error: None,
            },
            Err(error) => {
                log_rejection(&error);
                ValidationResult {
                    is_valid: false,
                    event_id: None,
                    metadata: None,
                    details,
                    error: Some(error),
                }
            }
        }
    }

    /// Run the format, age and signature checks only.
    ///
    /// Windows and the replay guard are left alone, so a token that passes
    /// here can still be refused by [`validate`](Self::validate). Callers use
    /// it to authenticate the target event id before any store lookup.
    pub fn authenticate(&self, raw: &str) -> Result<AttendanceToken, RollcallError> {
        let mut details = ValidationDetails::default();
        self.check_authentic(raw, &mut details).map_err(|error| {
            log_rejection(&error);
            error
        })
    }

    fn run(
        &self,
        raw: &str,
        schedule: Option<EventSchedule>,
        details: &mut ValidationDetails,
    ) -> Result<AttendanceToken, RollcallError> {
        let token = self.check_authentic(raw, details)?;

        // 6. Time window
        let mut windows = vec![token.metadata.window()];
        if let Some(schedule) = schedule {
            windows.push(CheckInWindow::around_event(
                schedule.start,
                schedule.end,
                self.grace_before,
                self.grace_after,
            )?);
        }
        check_windows(&windows, self.clock.as_ref())?;
        details.time_valid = true;

        // 7. Replay
        if !self.replay.check_and_record(&token.replay_key()) {
            return Err(RollcallError::ReplayDetected);
        }
        details.replay_check = true;

        tracing::debug!(event_id = %token.event_id, "attendance token accepted");
        Ok(token)
    }

    fn check_authentic(
        &self,
        raw: &str,
        details: &mut ValidationDetails,
    ) -> Result<AttendanceToken, RollcallError> {
        // 1-3. Parse, completeness, version
        let token = decode(raw)?;
        details.format_valid = true;

        // 4. Absolute age
        check_token_age(
            token.issued_at,
            self.max_token_age,
            self.max_clock_skew,
            self.clock.as_ref(),
        )?;

        // 5. Signature
        if !self.engine.verify(
            &token.event_id,
            &token.issued_at,
            &token.nonce,
            &token.signature,
        ) {
            return Err(RollcallError::SignatureInvalid);
        }
        details.hash_valid = true;

        Ok(token)
    }
}

fn log_rejection(error: &RollcallError) {
    match error {
        RollcallError::SignatureInvalid => {
            tracing::warn!("rejected attendance token with invalid signature");
        }
        RollcallError::ReplayDetected
        | RollcallError::TokenTooOld { .. }
        | RollcallError::TokenFromFuture
        | RollcallError::OutsideTimeWindow
        | RollcallError::UnsupportedVersion { .. } => {
            tracing::info!(error = %error, "rejected attendance token");
        }
        _ => {
            tracing::debug!(error = %error, "rejected malformed attendance token");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::config::SecretKey;
    use crate::generator::TokenGenerator;
    use crate::protocol::codec::encode;
    use crate::crypto::nonce::NONCE_LEN;
    use crate::protocol::models::CURRENT_VERSION;
    use chrono::TimeZone;
    use proptest::prelude::*;

    struct Fixture {
        clock: Arc<MockClock>,
        generator: TokenGenerator,
        validator: TokenValidator,
    }

    fn fixture() -> Fixture {
        let config = RollcallConfig::new(SecretKey::new("validator-test-secret"));
        let clock = Arc::new(MockClock::from_rfc3339("2025-01-15T12:00:00Z"));
        let engine = Arc::new(SignatureEngine::new(config.secret.clone()));
        let replay = Arc::new(ReplayGuard::new(config.replay_window, clock.clone()));
        Fixture {
            generator: TokenGenerator::new(&config, engine.clone(), clock.clone()),
            validator: TokenValidator::new(&config, engine, replay, clock.clone()),
            clock,
        }
    }

    fn t(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, h, m, 0).unwrap()
    }

    fn issue(f: &Fixture, start: DateTime<Utc>, end: DateTime<Utc>) -> AttendanceToken {
        f.generator
            .generate("E1", "Hack Night", "CS Club", "Lab 3", start, end)
            .unwrap()
            .token
    }

    #[test]
    fn test_happy_path() {
        let f = fixture();
        let token = issue(&f, t(13, 0), t(15, 0));
        let result = f.validator.validate(&encode(&token).unwrap(), None);

        assert!(result.is_valid, "{:?}", result.error);
        assert_eq!(result.event_id.as_deref(), Some("E1"));
        assert_eq!(result.metadata.unwrap().event_title, "Hack Night");
        assert_eq!(
            result.details,
            ValidationDetails {
                format_valid: true,
                hash_valid: true,
                time_valid: true,
                replay_check: true,
            }
        );
    }

    #[test]
    fn test_garbage_fails_format_only() {
        let f = fixture();
        let result = f.validator.validate("https://example.com/not-a-token", None);
        assert!(!result.is_valid);
        assert_eq!(result.details, ValidationDetails::default());
        assert!(matches!(result.error, Some(RollcallError::MalformedToken(_))));
    }

    #[test]
    fn test_unsupported_version_is_distinct() {
        let f = fixture();
        let mut token = issue(&f, t(13, 0), t(15, 0));
        token.version = "9.0".into();
        let result = f.validator.validate(&encode(&token).unwrap(), None);
        assert_eq!(
            result.error,
            Some(RollcallError::UnsupportedVersion { version: "9.0".into() })
        );
        assert!(!result.details.format_valid);
    }

    #[test]
    fn test_each_signed_field_mutation_fails_at_signature() {
        let f = fixture();
        let token = issue(&f, t(13, 0), t(15, 0));

        let mut by_event = token.clone();
        by_event.event_id = "E2".into();
        let mut by_time = token.clone();
        by_time.issued_at = token.issued_at - Duration::seconds(1);
        let mut by_nonce = token.clone();
        let first = if token.nonce.starts_with('0') { "1" } else { "0" };
        by_nonce.nonce.replace_range(0..1, first);

        for tampered in [by_event, by_time, by_nonce] {
            let result = f.validator.validate(&encode(&tampered).unwrap(), None);
            assert!(!result.is_valid);
            assert!(result.details.format_valid);
            assert!(!result.details.hash_valid);
            assert_eq!(result.error, Some(RollcallError::SignatureInvalid));
        }
    }

    #[test]
    fn test_replay_then_independent_after_window() {
        let f = fixture();
        let token = issue(&f, t(13, 0), t(15, 0));
        let raw = encode(&token).unwrap();

        assert!(f.validator.validate(&raw, None).is_valid);

        let second = f.validator.validate(&raw, None);
        assert!(!second.is_valid);
        assert_eq!(second.error, Some(RollcallError::ReplayDetected));
        assert!(second.details.time_valid);
        assert!(!second.details.replay_check);

        f.clock.advance(Duration::seconds(301));
        assert!(f.validator.validate(&raw, None).is_valid);
    }

    #[test]
    fn test_window_boundaries_inclusive() {
        let f = fixture();
        // Event 12:00-13:00 gives a check-in window of 11:00..=14:00.
        let cases = [
            (t(11, 0) - Duration::milliseconds(1), false),
            (t(11, 0), true),
            (t(14, 0), true),
            (t(14, 0) + Duration::milliseconds(1), false),
        ];
        for (at, expected) in cases {
            f.clock.set(at);
            let token = issue(&f, t(12, 0), t(13, 0));
            let result = f.validator.validate(&encode(&token).unwrap(), None);
            assert_eq!(result.is_valid, expected, "scan at {}", at);
            assert!(result.details.hash_valid);
            if !expected {
                assert_eq!(result.error, Some(RollcallError::OutsideTimeWindow));
                assert!(!result.details.time_valid);
            }
        }
    }

    #[test]
    fn test_stale_token_rejected_by_age() {
        let f = fixture();
        // Event window wide enough that only the age ceiling can fail.
        let token = issue(&f, t(0, 0), t(0, 0) + Duration::days(3));
        f.clock.advance(Duration::hours(25));

        let result = f.validator.validate(&encode(&token).unwrap(), None);
        assert!(matches!(result.error, Some(RollcallError::TokenTooOld { .. })));
        assert!(!result.details.hash_valid);
        assert!(result.error.unwrap().to_string().contains("expired"));
    }

    #[test]
    fn test_future_dated_token_rejected() {
        let f = fixture();
        let token = issue(&f, t(13, 0), t(15, 0));
        f.clock.advance(Duration::minutes(-5));
        let result = f.validator.validate(&encode(&token).unwrap(), None);
        assert_eq!(result.error, Some(RollcallError::TokenFromFuture));
    }

    #[test]
    fn test_authoritative_schedule_overrides_stale_metadata() {
        let f = fixture();
        let token = issue(&f, t(13, 0), t(15, 0));
        let raw = encode(&token).unwrap();

        // Event was moved to tomorrow after this code was printed.
        let moved = EventSchedule {
            start: t(13, 0) + Duration::days(1),
            end: t(15, 0) + Duration::days(1),
        };
        let result = f.validator.validate(&raw, Some(moved));
        assert_eq!(result.error, Some(RollcallError::OutsideTimeWindow));

        let current = EventSchedule {
            start: t(13, 0),
            end: t(15, 0),
        };
        assert!(f.validator.validate(&raw, Some(current)).is_valid);
    }

    #[test]
    fn test_rejections_do_not_consume_replay_slot() {
        let f = fixture();
        let token = issue(&f, t(13, 0), t(15, 0));
        let raw = encode(&token).unwrap();
        let moved = EventSchedule {
            start: t(13, 0) + Duration::days(1),
            end: t(15, 0) + Duration::days(1),
        };
        assert!(!f.validator.validate(&raw, Some(moved)).is_valid);
        assert!(f.validator.validate(&raw, None).is_valid);
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let f = fixture();
        let config = RollcallConfig::new(SecretKey::new("someone-elses-secret"));
        let forger = TokenGenerator::new(
            &config,
            Arc::new(SignatureEngine::new(config.secret.clone())),
            f.clock.clone(),
        );
        let forged = forger
            .generate("E1", "t", "c", "l", t(13, 0), t(15, 0))
            .unwrap();
        let result = f.validator.validate(&forged.encoded, None);
        assert_eq!(result.error, Some(RollcallError::SignatureInvalid));
        assert_eq!(forged.token.version, CURRENT_VERSION);
    }

    #[test]
    fn test_unrepresentable_schedule_is_an_error() {
        let f = fixture();
        let token = issue(&f, t(13, 0), t(15, 0));
        let schedule = EventSchedule {
            start: DateTime::<Utc>::MIN_UTC,
            end: t(15, 0),
        };
        let result = f.validator.validate(&encode(&token).unwrap(), Some(schedule));
        assert!(!result.is_valid);
        assert!(result.details.hash_valid);
        assert!(matches!(result.error, Some(RollcallError::ConfigError(_))));
    }

    #[test]
    fn test_authenticate_leaves_replay_slot() {
        let f = fixture();
        let token = issue(&f, t(13, 0), t(15, 0));
        let raw = encode(&token).unwrap();

        assert_eq!(f.validator.authenticate(&raw).unwrap(), token);
        assert_eq!(f.validator.authenticate(&raw).unwrap(), token);
        assert!(f.validator.validate(&raw, None).is_valid);
    }

    #[test]
    fn test_authenticate_rejects_forgery() {
        let f = fixture();
        let mut token = issue(&f, t(13, 0), t(15, 0));
        token.event_id = "E404".into();
        assert_eq!(
            f.validator.authenticate(&encode(&token).unwrap()),
            Err(RollcallError::SignatureInvalid)
        );
    }

    #[test]
    fn test_into_result() {
        let f = fixture();
        let token = issue(&f, t(13, 0), t(15, 0));
        let raw = encode(&token).unwrap();
        let (event_id, _, details) = f.validator.validate(&raw, None).into_result().unwrap();
        assert_eq!(event_id, "E1");
        assert!(details.replay_check);
        assert_eq!(
            f.validator.validate(&raw, None).into_result().unwrap_err(),
            RollcallError::ReplayDetected
        );
    }

    #[derive(Debug, Clone)]
    enum Tamper {
        EventId(String),
        IssuedAt(i64),
        Nonce([u8; NONCE_LEN]),
    }

    fn arb_event_id() -> impl Strategy<Value = String> {
        prop_oneof![
            any::<String>(),
            "[a-zA-Z0-9 \"\\\\\n\u{e9}\u{4e2d}-]{1,24}",
        ]
        .prop_filter("blank event id", |s| !s.trim().is_empty())
    }

    fn arb_tamper() -> impl Strategy<Value = Tamper> {
        prop_oneof![
            arb_event_id().prop_map(Tamper::EventId),
            // Stays inside the age ceiling and the future-skew tolerance.
            (-3_600_000i64..=60_000)
                .prop_filter("no-op shift", |ms| *ms != 0)
                .prop_map(Tamper::IssuedAt),
            any::<[u8; NONCE_LEN]>().prop_map(Tamper::Nonce),
        ]
    }

    proptest! {
        /// Changing any one signed field fails at the signature step.
        #[test]
        fn any_signed_field_change_fails_signature(
            event_id in arb_event_id(),
            issued_ms in 0i64..3_600_000,
            tamper in arb_tamper(),
        ) {
            let f = fixture();
            f.clock.set(t(12, 0) + Duration::milliseconds(issued_ms));
            let token = f
                .generator
                .generate(&event_id, "Hack Night", "CS Club", "Lab 3", t(13, 0), t(15, 0))
                .unwrap()
                .token;

            let mut tampered = token.clone();
            match tamper {
                Tamper::EventId(id) => tampered.event_id = id,
                Tamper::IssuedAt(ms) => {
                    tampered.issued_at = token.issued_at + Duration::milliseconds(ms)
                }
                Tamper::Nonce(bytes) => tampered.nonce = hex::encode(bytes),
            }
            prop_assume!(tampered != token);

            let result = f.validator.validate(&encode(&tampered).unwrap(), None);
            prop_assert!(!result.is_valid);
            prop_assert!(result.details.format_valid);
            prop_assert!(!result.details.hash_valid);
            prop_assert_eq!(result.error, Some(RollcallError::SignatureInvalid));
        }

        /// Untouched tokens pass for any event id and issue instant.
        #[test]
        fn untouched_token_passes(event_id in arb_event_id(), issued_ms in 0i64..3_600_000) {
            let f = fixture();
            f.clock.set(t(12, 0) + Duration::milliseconds(issued_ms));
            let raw = f
                .generator
                .generate(&event_id, "Hack Night", "CS Club", "Lab 3", t(13, 0), t(15, 0))
                .unwrap()
                .encoded;

            let result = f.validator.validate(&raw, None);
            prop_assert!(result.is_valid, "{:?}", result.error);
            prop_assert_eq!(result.event_id, Some(event_id));
        }
    }
}
