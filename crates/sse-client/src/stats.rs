//! Attempt bookkeeping and the thread-safe stats snapshot.
//!
//! [`AttemptState`] is a plain value owned by the reconnect loop.  After
//! each change the loop publishes a copy into the [`StatsRecorder`], which
//! is what [`SseClient::stats`](crate::SseClient::stats) reads from other
//! tasks.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::types::ConnectionState;

/// Retry bookkeeping for one stream.
#[derive(Debug, Clone)]
pub(crate) struct AttemptState {
    pub attempt_count: u32,
    pub started: Instant,
    pub start_time: DateTime<Utc>,
    pub last_success_time: Option<DateTime<Utc>>,
    pub current_backoff: Duration,
    pub connections: u64,
}

impl AttemptState {
    pub fn begin() -> Self {
        Self {
            attempt_count: 0,
            started: Instant::now(),
            start_time: Utc::now(),
            last_success_time: None,
            current_backoff: Duration::ZERO,
            connections: 0,
        }
    }

    pub fn record_connected(&mut self) {
        self.connections += 1;
        self.last_success_time = Some(Utc::now());
    }

    pub fn record_frame(&mut self) {
        self.last_success_time = Some(Utc::now());
    }

    /// Count one failed attempt and return the new total.
    pub fn record_failure(&mut self) -> u32 {
        self.attempt_count = self.attempt_count.saturating_add(1);
        self.attempt_count
    }

    /// Clear the counter after a stable connection.  Returns the old value.
    pub fn reset(&mut self) -> u32 {
        self.current_backoff = Duration::ZERO;
        std::mem::take(&mut self.attempt_count)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Read-only snapshot returned by [`SseClient::stats`](crate::SseClient::stats).
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub state: ConnectionState,
    /// Failed attempts since the stream started or last stabilized.
    pub attempt_count: u32,
    /// Successful connects during the current stream.
    pub connections: u64,
    pub start_time: Option<DateTime<Utc>>,
    /// Last successful connect or frame.
    pub last_success_time: Option<DateTime<Utc>>,
    /// Time since `start_time`.
    pub elapsed: Duration,
    /// Most recently computed reconnect delay.
    pub current_backoff: Duration,
    pub last_event_id: Option<String>,
}

#[derive(Debug, Default)]
struct Inner {
    attempts: Option<AttemptState>,
    last_event_id: Option<String>,
    state: ConnectionState,
}

/// Mutex-guarded stats shared between the client handle and its stream task.
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    inner: Mutex<Inner>,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, attempts: &AttemptState) {
        self.inner.lock().attempts = Some(attempts.clone());
    }

    pub fn set_state(&self, state: ConnectionState) {
        self.inner.lock().state = state;
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    /// Empty ids clear the stored value.
    pub fn set_last_event_id(&self, id: String) {
        self.inner.lock().last_event_id = (!id.is_empty()).then_some(id);
    }

    pub fn last_event_id(&self) -> Option<String> {
        self.inner.lock().last_event_id.clone()
    }

    pub fn snapshot(&self) -> Stats {
        let inner = self.inner.lock();
        let attempts = inner.attempts.as_ref();
        Stats {
            state: inner.state,
            attempt_count: attempts.map_or(0, |a| a.attempt_count),
            connections: attempts.map_or(0, |a| a.connections),
            start_time: attempts.map(|a| a.start_time),
            last_success_time: attempts.and_then(|a| a.last_success_time),
            elapsed: attempts.map_or(Duration::ZERO, AttemptState::elapsed),
            current_backoff: attempts.map_or(Duration::ZERO, |a| a.current_backoff),
            last_event_id: inner.last_event_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_before_streaming() {
        let rec = StatsRecorder::new();
        let stats = rec.snapshot();
        assert_eq!(stats.state, ConnectionState::Disconnected);
        assert_eq!(stats.attempt_count, 0);
        assert!(stats.start_time.is_none());
        assert_eq!(stats.elapsed, Duration::ZERO);
    }

    #[test]
    fn failures_and_reset() {
        let mut attempts = AttemptState::begin();
        assert_eq!(attempts.record_failure(), 1);
        assert_eq!(attempts.record_failure(), 2);
        attempts.current_backoff = Duration::from_millis(500);
        assert_eq!(attempts.reset(), 2);
        assert_eq!(attempts.attempt_count, 0);
        assert_eq!(attempts.current_backoff, Duration::ZERO);
    }

    #[test]
    fn publish_makes_state_visible() {
        let rec = StatsRecorder::new();
        let mut attempts = AttemptState::begin();
        attempts.record_connected();
        attempts.record_failure();
        rec.publish(&attempts);
        rec.set_state(ConnectionState::Reconnecting);

        let stats = rec.snapshot();
        assert_eq!(stats.attempt_count, 1);
        assert_eq!(stats.connections, 1);
        assert!(stats.last_success_time.is_some());
        assert_eq!(stats.start_time, Some(attempts.start_time));
        assert_eq!(stats.state, ConnectionState::Reconnecting);
    }

    #[test]
    fn last_event_id_round_trip_and_clear() {
        let rec = StatsRecorder::new();
        rec.set_last_event_id("abc".into());
        assert_eq!(rec.last_event_id().as_deref(), Some("abc"));
        assert_eq!(rec.snapshot().last_event_id.as_deref(), Some("abc"));
        rec.set_last_event_id(String::new());
        assert_eq!(rec.last_event_id(), None);
    }
}
