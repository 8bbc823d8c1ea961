//! Token age and check-in window enforcement.

use crate::clock::Clock;
use crate::RollcallError;
use chrono::{DateTime, Duration, Utc};

/// Inclusive time interval during which check-in is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckInWindow {
    /// First instant at which check-in is accepted.
    pub valid_from: DateTime<Utc>,
    /// Last instant at which check-in is accepted.
    pub valid_until: DateTime<Utc>,
}

impl CheckInWindow {
    /// Widen an event's start/end by the grace periods.
    ///
    /// # Errors
    /// * `ConfigError` - The widened window falls outside the representable range
    pub fn around_event(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        grace_before: Duration,
        grace_after: Duration,
    ) -> Result<Self, RollcallError> {
        let valid_from = start.checked_sub_signed(grace_before).ok_or_else(|| {
            RollcallError::ConfigError(format!("grace before {} is out of range", start))
        })?;
        let valid_until = end.checked_add_signed(grace_after).ok_or_else(|| {
            RollcallError::ConfigError(format!("grace after {} is out of range", end))
        })?;
        Ok(Self {
            valid_from,
            valid_until,
        })
    }

    /// Whether `at` lies in the window; both ends inclusive.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.valid_from <= at && at <= self.valid_until
    }
}

/// Check a token's absolute age against the ceiling.
///
/// # Errors
/// * `TokenTooOld` - Token is older than `max_age`
/// * `TokenFromFuture` - Token is dated more than `max_skew` ahead of the clock
pub fn check_token_age<C: Clock + ?Sized>(
    issued_at: DateTime<Utc>,
    max_age: Duration,
    max_skew: Duration,
    clock: &C,
) -> Result<(), RollcallError> {
    let age = clock.now_utc() - issued_at;

    if age > max_age {
        return Err(RollcallError::TokenTooOld {
            age_seconds: age.num_seconds(),
        });
    }

    if age < -max_skew {
        return Err(RollcallError::TokenFromFuture);
    }

    Ok(())
}

/// Check that the clock lies within every supplied window.
pub fn check_windows<C: Clock + ?Sized>(
    windows: &[CheckInWindow],
    clock: &C,
) -> Result<(), RollcallError> {
    let now = clock.now_utc();
    if windows.iter().all(|w| w.contains(now)) {
        Ok(())
    } else {
        Err(RollcallError::OutsideTimeWindow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use chrono::TimeZone;

    fn t(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, h, m, s).unwrap()
    }

    #[test]
    fn test_age_within_ceiling() {
        let clock = MockClock::new(t(18, 0, 0));
        let result = check_token_age(
            t(12, 0, 0),
            Duration::hours(24),
            Duration::seconds(60),
            &clock,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_age_exactly_at_ceiling() {
        let clock = MockClock::new(t(13, 0, 0));
        let result = check_token_age(
            t(12, 0, 0),
            Duration::hours(1),
            Duration::seconds(60),
            &clock,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_age_just_over_ceiling() {
        let clock = MockClock::new(t(13, 0, 1));
        let result = check_token_age(
            t(12, 0, 0),
            Duration::hours(1),
            Duration::seconds(60),
            &clock,
        );
        assert_eq!(result, Err(RollcallError::TokenTooOld { age_seconds: 3601 }));
    }

    #[test]
    fn test_future_within_skew() {
        let clock = MockClock::new(t(11, 59, 15));
        let result = check_token_age(
            t(12, 0, 0),
            Duration::hours(1),
            Duration::seconds(60),
            &clock,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_future_beyond_skew() {
        let clock = MockClock::new(t(11, 58, 0));
        let result = check_token_age(
            t(12, 0, 0),
            Duration::hours(1),
            Duration::seconds(60),
            &clock,
        );
        assert_eq!(result, Err(RollcallError::TokenFromFuture));
    }

    #[test]
    fn test_window_boundaries_inclusive() {
        let window = CheckInWindow {
            valid_from: t(10, 0, 0),
            valid_until: t(14, 0, 0),
        };
        assert!(window.contains(t(10, 0, 0)));
        assert!(window.contains(t(14, 0, 0)));
        assert!(!window.contains(t(10, 0, 0) - Duration::milliseconds(1)));
        assert!(!window.contains(t(14, 0, 0) + Duration::milliseconds(1)));
    }

    #[test]
    fn test_around_event_applies_grace() {
        let window = CheckInWindow::around_event(
            t(12, 0, 0),
            t(14, 0, 0),
            Duration::hours(1),
            Duration::minutes(30),
        )
        .unwrap();
        assert_eq!(window.valid_from, t(11, 0, 0));
        assert_eq!(window.valid_until, t(14, 30, 0));
    }

    #[test]
    fn test_around_event_overflow_is_an_error() {
        let before = CheckInWindow::around_event(
            t(12, 0, 0),
            t(14, 0, 0),
            Duration::MAX,
            Duration::hours(1),
        );
        assert!(matches!(before, Err(RollcallError::ConfigError(_))));

        let after = CheckInWindow::around_event(
            t(12, 0, 0),
            DateTime::<Utc>::MAX_UTC,
            Duration::hours(1),
            Duration::hours(1),
        );
        assert!(matches!(after, Err(RollcallError::ConfigError(_))));
    }

    #[test]
    fn test_check_windows_requires_all() {
        let clock = MockClock::new(t(12, 0, 0));
        let wide = CheckInWindow {
            valid_from: t(9, 0, 0),
            valid_until: t(15, 0, 0),
        };
        let narrow = CheckInWindow {
            valid_from: t(13, 0, 0),
            valid_until: t(15, 0, 0),
        };
        assert!(check_windows(&[wide], &clock).is_ok());
        assert_eq!(
            check_windows(&[wide, narrow], &clock),
            Err(RollcallError::OutsideTimeWindow)
        );
    }
}
