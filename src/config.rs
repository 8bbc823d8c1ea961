//! Rollcall configuration.

use crate::RollcallError;
use std::fmt;
use std::time::Duration;

/// Minimum accepted secret length in bytes.
pub const MIN_SECRET_LEN: usize = 16;

/// Longest accepted grace period on either side of an event.
pub const MAX_GRACE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Longest accepted token age ceiling.
pub const MAX_TOKEN_AGE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Longest accepted replay window or clock skew tolerance.
pub const MAX_TOLERANCE: Duration = Duration::from_secs(24 * 60 * 60);

/// Process-wide signing secret.
///
/// SECURITY: never printed. `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(Vec<u8>);

impl SecretKey {
    /// Wrap raw secret bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw key material for the MAC.
    pub(crate) fn expose(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the secret is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}

/// Configuration for token issuing, verification, and check-in recording.
#[derive(Debug, Clone)]
pub struct RollcallConfig {
    /// HMAC secret shared by the issuer and the verifier.
    /// Loaded once at startup; never mutated afterwards.
    pub secret: SecretKey,

    /// Check-in opens this long before the event starts.
    pub grace_before: Duration,

    /// Check-in stays open this long after the event ends.
    pub grace_after: Duration,

    /// How long an accepted token is remembered by the replay guard.
    pub replay_window: Duration,

    /// Hard ceiling on token age, independent of the event window.
    pub max_token_age: Duration,

    /// Tolerance for tokens whose issue time is ahead of our clock.
    pub max_clock_skew: Duration,

    /// Identical camera frames inside this window are processed once.
    pub scan_debounce: Duration,

    /// Upper bound on each record store round-trip.
    pub store_timeout: Duration,
}

impl RollcallConfig {
    /// Environment variable holding the signing secret.
    pub const ENV_SECRET: &'static str = "ROLLCALL_SECRET";

    /// Build a configuration with default windows around the given secret.
    pub fn new(secret: SecretKey) -> Self {
        Self {
            secret,
            grace_before: Duration::from_secs(60 * 60),
            grace_after: Duration::from_secs(60 * 60),
            replay_window: Duration::from_secs(5 * 60),
            max_token_age: Duration::from_secs(24 * 60 * 60),
            max_clock_skew: Duration::from_secs(60),
            scan_debounce: Duration::from_millis(1500),
            store_timeout: Duration::from_secs(10),
        }
    }

    /// Load configuration from `ROLLCALL_*` environment variables.
    ///
    /// Only the secret is required; every duration falls back to its default.
    pub fn from_env() -> Result<Self, RollcallError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RollcallError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup(Self::ENV_SECRET).ok_or_else(|| {
            RollcallError::ConfigError(format!("{} is not set", Self::ENV_SECRET))
        })?;

        let mut config = Self::new(SecretKey::new(secret.into_bytes()));
        let secs = |name: &str, default: Duration| -> Result<Duration, RollcallError> {
            parse_u64(&lookup, name).map(|v| v.map_or(default, Duration::from_secs))
        };

        config.grace_before = secs("ROLLCALL_GRACE_BEFORE_SECS", config.grace_before)?;
        config.grace_after = secs("ROLLCALL_GRACE_AFTER_SECS", config.grace_after)?;
        config.replay_window = secs("ROLLCALL_REPLAY_WINDOW_SECS", config.replay_window)?;
        config.max_token_age = secs("ROLLCALL_MAX_TOKEN_AGE_SECS", config.max_token_age)?;
        config.max_clock_skew = secs("ROLLCALL_MAX_CLOCK_SKEW_SECS", config.max_clock_skew)?;
        config.store_timeout = secs("ROLLCALL_STORE_TIMEOUT_SECS", config.store_timeout)?;
        if let Some(ms) = parse_u64(&lookup, "ROLLCALL_SCAN_DEBOUNCE_MS")? {
            config.scan_debounce = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for obvious errors.
    pub fn validate(&self) -> Result<(), RollcallError> {
        if self.secret.len() < MIN_SECRET_LEN {
            return Err(RollcallError::ConfigError(format!(
                "secret must be at least {} bytes, got {}",
                MIN_SECRET_LEN,
                self.secret.len()
            )));
        }
        if self.replay_window.is_zero() {
            return Err(RollcallError::ConfigError(
                "replay_window cannot be zero".to_string(),
            ));
        }
        if self.max_token_age.is_zero() {
            return Err(RollcallError::ConfigError(
                "max_token_age cannot be zero".to_string(),
            ));
        }
        check_ceiling("grace_before", self.grace_before, MAX_GRACE)?;
        check_ceiling("grace_after", self.grace_after, MAX_GRACE)?;
        check_ceiling("max_token_age", self.max_token_age, MAX_TOKEN_AGE)?;
        check_ceiling("replay_window", self.replay_window, MAX_TOLERANCE)?;
        check_ceiling("max_clock_skew", self.max_clock_skew, MAX_TOLERANCE)?;
        if self.scan_debounce < Duration::from_secs(1) {
            return Err(RollcallError::ConfigError(format!(
                "scan_debounce must be at least 1s, got {}ms",
                self.scan_debounce.as_millis()
            )));
        }
        if self.store_timeout < Duration::from_secs(1) {
            return Err(RollcallError::ConfigError(
                "store_timeout must be at least 1s".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_ceiling(name: &str, value: Duration, max: Duration) -> Result<(), RollcallError> {
    if value > max {
        return Err(RollcallError::ConfigError(format!(
            "{} must be at most {}s, got {}s",
            name,
            max.as_secs(),
            value.as_secs()
        )));
    }
    Ok(())
}

fn parse_u64<F>(lookup: &F, name: &str) -> Result<Option<u64>, RollcallError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<u64>().map(Some).map_err(|e| {
            RollcallError::ConfigError(format!("{} must be an integer: {}", name, e))
        }),
    }
}

/// Convert a configured window to a signed chrono duration.
pub(crate) fn to_chrono(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or(chrono::Duration::MAX)
}
