use super::store::Session;
use chrono::{DateTime, Utc};

/// Cumulative-average run throttle.
///
/// A session is throttled when `invocation_count / seconds since last_activity`
/// exceeds `max_per_sec`. The count never resets, so this is not a sliding
/// window: long-lived sessions trip it more easily after a quiet period and a
/// burst is diluted by the history before it.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiter {
    max_per_sec: f64,
}

impl RateLimiter {
    pub fn new(max_per_sec: f64) -> Self {
        Self { max_per_sec }
    }

    /// Returns `true` if the session's average rate is above the limit.
    /// Zero (or negative, after a clock step) elapsed time is never throttled.
    pub fn should_throttle(&self, session: &Session, now: DateTime<Utc>) -> bool {
        let elapsed = now - session.last_activity;
        let secs = match elapsed.num_microseconds() {
            Some(us) => us as f64 / 1_000_000.0,
            None => elapsed.num_seconds() as f64,
        };
        if secs <= 0.0 {
            return false;
        }
        session.invocation_count as f64 / secs > self.max_per_sec
    }
}
