//! Token generation for event check-in codes.
//!
//! Each call produces a wholly new token: fresh nonce, fresh issue time,
//! fresh signature. Earlier tokens for the same event stay valid until they
//! age out or leave the check-in window.

use crate::clock::Clock;
use crate::config::{to_chrono, RollcallConfig};
use crate::crypto::freshness::CheckInWindow;
use crate::crypto::nonce::generate_nonce;
use crate::crypto::verify::SignatureEngine;
use crate::protocol::codec::encode;
use crate::protocol::models::{AttendanceToken, EventRecord, TokenMetadata, CURRENT_VERSION};
use crate::render::{render_qr, QrImage};
use crate::RollcallError;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use std::sync::Arc;

/// A freshly issued token, its transport string, and its image.
#[derive(Debug, Clone)]
pub struct GeneratedToken {
    /// The signed token.
    pub token: AttendanceToken,
    /// Exact text embedded in the QR code.
    pub encoded: String,
    /// Rendered QR code.
    pub image: QrImage,
}

/// Issues signed attendance tokens.
pub struct TokenGenerator {
    engine: Arc<SignatureEngine>,
    clock: Arc<dyn Clock>,
    grace_before: Duration,
    grace_after: Duration,
}

impl TokenGenerator {
    /// Create a generator sharing the given engine and clock.
    pub fn new(
        config: &RollcallConfig,
        engine: Arc<SignatureEngine>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engine,
            clock,
            grace_before: to_chrono(config.grace_before),
            grace_after: to_chrono(config.grace_after),
        }
    }

    /// Generate a token and its QR image for one event.
    pub fn generate(
        &self,
        event_id: &str,
        event_title: &str,
        club_name: &str,
        location: &str,
        event_start: DateTime<Utc>,
        event_end: DateTime<Utc>,
    ) -> Result<GeneratedToken, RollcallError> {
        if event_id.trim().is_empty() {
            return Err(RollcallError::MissingField { field: "eventId" });
        }
        if event_end < event_start {
            return Err(RollcallError::MalformedToken(format!(
                "event {} ends before it starts",
                event_id
            )));
        }

        let metadata = TokenMetadata {
            event_title: event_title.to_string(),
            club_name: club_name.to_string(),
            location: location.to_string(),
            valid_from: event_start,
            valid_until: event_end,
        };
        let token = self.assemble(event_id, metadata, generate_nonce())?;
        let encoded = encode(&token)?;
        let image = render_qr(&encoded)?;

        tracing::info!(
            event_id = %token.event_id,
            issued_at = %token.issued_at,
            valid_from = %token.metadata.valid_from,
            valid_until = %token.metadata.valid_until,
            "issued attendance token"
        );

        Ok(GeneratedToken {
            token,
            encoded,
            image,
        })
    }

    /// Generate a token from a stored event row.
    pub fn generate_for_event(&self, event: &EventRecord) -> Result<GeneratedToken, RollcallError> {
        self.generate(
            &event.id,
            &event.title,
            &event.club_name,
            &event.location,
            event.start,
            event.end,
        )
    }

    /// Build and sign a token around an explicit nonce.
    ///
    /// `metadata` arrives holding the raw event start/end and leaves holding
    /// the grace-widened window.
    pub(crate) fn assemble(
        &self,
        event_id: &str,
        mut metadata: TokenMetadata,
        nonce: String,
    ) -> Result<AttendanceToken, RollcallError> {
        let issued_at = self.clock.now_utc().trunc_subsecs(3);
        let window = CheckInWindow::around_event(
            metadata.valid_from,
            metadata.valid_until,
            self.grace_before,
            self.grace_after,
        )?;
        metadata.valid_from = window.valid_from;
        metadata.valid_until = window.valid_until;

        let signature = self.engine.sign(event_id, &issued_at, &nonce);

        Ok(AttendanceToken {
            event_id: event_id.to_string(),
            issued_at,
            nonce,
            signature,
            version: CURRENT_VERSION.to_string(),
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::config::SecretKey;
    use crate::protocol::codec::decode;
    use chrono::TimeZone;

    fn setup() -> (Arc<MockClock>, TokenGenerator) {
        let config = RollcallConfig::new(SecretKey::new("generator-test-secret"));
        let clock = Arc::new(MockClock::from_rfc3339("2025-01-15T12:00:00.123456Z"));
        let engine = Arc::new(SignatureEngine::new(config.secret.clone()));
        (clock.clone(), TokenGenerator::new(&config, engine, clock))
    }

    fn t(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, h, 0, 0).unwrap()
    }

    #[test]
    fn test_generate_fills_window_and_signature() {
        let (_, generator) = setup();
        let out = generator
            .generate("E1", "Hack Night", "CS Club", "Lab 3", t(13), t(15))
            .unwrap();

        assert_eq!(out.token.event_id, "E1");
        assert_eq!(out.token.version, CURRENT_VERSION);
        assert_eq!(out.token.metadata.valid_from, t(12));
        assert_eq!(out.token.metadata.valid_until, t(16));
        assert_eq!(out.token.nonce.len(), 32);

        let engine = SignatureEngine::new(SecretKey::new("generator-test-secret"));
        assert!(engine.verify("E1", &out.token.issued_at, &out.token.nonce, &out.token.signature));
    }

    #[test]
    fn test_issued_at_truncated_to_millis() {
        let (_, generator) = setup();
        let out = generator
            .generate("E1", "t", "c", "l", t(13), t(15))
            .unwrap();
        assert_eq!(
            out.token.issued_at,
            Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap() + Duration::milliseconds(123)
        );
    }

    #[test]
    fn test_encoded_text_decodes_to_token() {
        let (_, generator) = setup();
        let out = generator
            .generate("E1", "Hack Night", "CS Club", "Lab 3", t(13), t(15))
            .unwrap();
        assert_eq!(decode(&out.encoded).unwrap(), out.token);
        assert!(out.image.svg().contains("<svg"));
    }

    #[test]
    fn test_refresh_issues_distinct_tokens() {
        let (clock, generator) = setup();
        let first = generator.generate("E1", "t", "c", "l", t(13), t(15)).unwrap();
        clock.advance(Duration::seconds(30));
        let second = generator.generate("E1", "t", "c", "l", t(13), t(15)).unwrap();
        assert_ne!(first.token.nonce, second.token.nonce);
        assert_ne!(first.token.signature, second.token.signature);
        assert_ne!(first.token.issued_at, second.token.issued_at);
    }

    #[test]
    fn test_reused_nonce_reproduces_signature() {
        let (_, generator) = setup();
        let meta = TokenMetadata {
            event_title: "t".into(),
            club_name: "c".into(),
            location: "l".into(),
            valid_from: t(13),
            valid_until: t(15),
        };
        let nonce = "00112233445566778899aabbccddeeff".to_string();
        let a = generator.assemble("E1", meta.clone(), nonce.clone()).unwrap();
        let b = generator.assemble("E1", meta, nonce).unwrap();
        assert_eq!(a.signature, b.signature);
        assert_eq!(a.replay_key(), b.replay_key());
    }

    #[test]
    fn test_rejects_empty_event_id() {
        let (_, generator) = setup();
        assert!(matches!(
            generator.generate("  ", "t", "c", "l", t(13), t(15)),
            Err(RollcallError::MissingField { field: "eventId" })
        ));
    }

    #[test]
    fn test_rejects_inverted_event() {
        let (_, generator) = setup();
        assert!(matches!(
            generator.generate("E1", "t", "c", "l", t(15), t(13)),
            Err(RollcallError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_unrepresentable_window_is_an_error() {
        let (_, generator) = setup();
        let result = generator.generate(
            "E1",
            "t",
            "c",
            "l",
            t(13),
            DateTime::<Utc>::MAX_UTC,
        );
        assert!(matches!(result, Err(RollcallError::ConfigError(_))));
    }

    #[test]
    fn test_unvalidated_huge_grace_does_not_panic() {
        let mut config = RollcallConfig::new(SecretKey::new("generator-test-secret"));
        config.grace_before = std::time::Duration::from_secs(1_000_000_000_000_000);
        let clock = Arc::new(MockClock::from_rfc3339("2025-01-15T12:00:00Z"));
        let engine = Arc::new(SignatureEngine::new(config.secret.clone()));
        let generator = TokenGenerator::new(&config, engine, clock);

        let result = generator.generate("E1", "t", "c", "l", t(13), t(15));
        assert!(matches!(result, Err(RollcallError::ConfigError(_))));
    }
}
