//! Session closing rules.

use chrono::{DateTime, TimeDelta, Utc};

pub const DEFAULT_SESSION_TIMEOUT_MINS: i64 = 30;
pub const DEFAULT_STOP_KEYWORD: &str = "stop";

/// Decides when a conversation session ends.
///
/// A session closes when the user sends the stop keyword (compared
/// case-insensitively, without trimming) or when strictly more than the
/// timeout has elapsed since the session started.
#[derive(Debug, Clone)]
pub struct SessionPolicy {
    timeout: TimeDelta,
    stop_keyword: String,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self::new(
            TimeDelta::minutes(DEFAULT_SESSION_TIMEOUT_MINS),
            DEFAULT_STOP_KEYWORD,
        )
    }
}

impl SessionPolicy {
    pub fn new(timeout: TimeDelta, stop_keyword: impl Into<String>) -> Self {
        Self {
            timeout,
            stop_keyword: stop_keyword.into().to_lowercase(),
        }
    }

    pub fn timeout(&self) -> TimeDelta {
        self.timeout
    }

    pub fn stop_keyword(&self) -> &str {
        &self.stop_keyword
    }

    /// Whether `question` is the stop keyword.
    pub fn is_stop(&self, question: &str) -> bool {
        question.to_lowercase() == self.stop_keyword
    }

    /// A `start` in the future gives a negative elapsed time and never
    /// times out.
    pub fn should_close(&self, start: DateTime<Utc>, now: DateTime<Utc>, explicit_stop: bool) -> bool {
        explicit_stop || now.signed_duration_since(start) > self.timeout
    }
}
