//! The orchestration loop: connect, pump frames, classify, back off, repeat.
//!
//! One [`Reconnector`] drives one stream.  It owns the [`AttemptState`] and
//! is the only writer of [`ConnectionState`].  At most one [`Connection`] is
//! live at a time; its read loop is awaited before the next attempt starts.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::backoff::ReconnectionConfig;
use crate::classify::classify;
use crate::error::StreamError;
use crate::stats::{AttemptState, StatsRecorder};
use crate::transport::{Connection, Transport};
use crate::types::{ConnectionState, Frame, FrameStream};

/// Stand-in deadline for disabled or out-of-range timers.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365);

/// `now + after`, saturating to [`FAR_FUTURE`] when the sum does not fit.
fn deadline(after: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(after).unwrap_or_else(|| now + FAR_FUTURE)
}

pub(crate) struct Reconnector {
    transport: Transport,
    policy: ReconnectionConfig,
    /// Pre-encoded JSON payload, resent on every attempt.
    body: Option<Vec<u8>>,
    attempts: AttemptState,
    stats: Arc<StatsRecorder>,
    frames: mpsc::Sender<Frame>,
    errors: mpsc::Sender<StreamError>,
    cancel: CancellationToken,
}

impl Reconnector {
    /// Create the loop and the consumer handle it feeds.
    pub fn new(
        transport: Transport,
        policy: ReconnectionConfig,
        body: Option<Vec<u8>>,
        stats: Arc<StatsRecorder>,
        cancel: CancellationToken,
        buffer_size: usize,
    ) -> (Self, FrameStream) {
        let (frame_tx, frames) = mpsc::channel(buffer_size);
        let (err_tx, errors) = mpsc::channel(1);
        let attempts = AttemptState::begin();
        stats.publish(&attempts);

        let reconnector = Self {
            transport,
            policy,
            body,
            attempts,
            stats,
            frames: frame_tx,
            errors: err_tx,
            cancel,
        };
        (reconnector, FrameStream { frames, errors })
    }

    /// One connection attempt, carrying the latest Last-Event-ID.
    pub async fn connect(&mut self) -> Result<Connection, StreamError> {
        self.stats.set_state(ConnectionState::Connecting);
        let last_event_id = self.stats.last_event_id();
        self.transport
            .connect(&self.cancel, self.body.as_deref(), last_event_id.as_deref())
            .await
    }

    /// Drive the stream until cancellation or a terminal error.
    ///
    /// `first` is an already-established connection (single-shot mode
    /// connects eagerly so it can report the failure to the caller).
    pub async fn run(mut self, first: Option<Connection>) {
        let mut pending = first;

        let terminal: Option<StreamError> = loop {
            let attempt = match pending.take() {
                Some(conn) => Ok(conn),
                None => self.connect().await,
            };

            let err = match attempt {
                Ok(mut conn) => {
                    self.attempts.record_connected();
                    self.stats.publish(&self.attempts);
                    self.stats.set_state(ConnectionState::Connected);
                    tracing::info!(
                        connection_id = %conn.id,
                        failed_attempts = self.attempts.attempt_count,
                        "stream connected"
                    );

                    let outcome = self.pump(&mut conn).await;
                    conn.shutdown().await;
                    match outcome {
                        Some(err) => err,
                        None => break None,
                    }
                }
                Err(StreamError::Cancelled) => break None,
                Err(err) => err,
            };

            if self.cancel.is_cancelled() {
                break None;
            }

            let class = classify(&err);
            if !self.policy.enabled {
                // Single connection: whatever ended it, including EOF, is final.
                break Some(err);
            }
            if !class.retryable {
                tracing::debug!(reason = class.reason, "error is not retryable");
                break Some(err);
            }

            let failed = self.attempts.record_failure();
            if self.policy.should_give_up(failed) {
                break Some(StreamError::MaxRetriesExceeded {
                    max: self.policy.max_retries,
                    last: Box::new(err),
                });
            }
            let elapsed = self.attempts.elapsed();
            if self.policy.elapsed_exceeded(elapsed) {
                break Some(StreamError::MaxElapsedExceeded {
                    limit: self.policy.max_elapsed_time,
                    last: Box::new(err),
                });
            }

            let mut delay = self.policy.delay_for_error(failed, &err);
            if !self.policy.max_elapsed_time.is_zero() {
                // Never sleep past the budget; the next failure reports it.
                delay = delay.min(self.policy.max_elapsed_time.saturating_sub(elapsed));
            }
            self.attempts.current_backoff = delay;
            self.stats.publish(&self.attempts);
            self.stats.set_state(ConnectionState::Reconnecting);
            tracing::warn!(
                attempt = failed,
                delay_ms = delay.as_millis() as u64,
                reason = class.reason,
                error = %err,
                "stream interrupted, reconnecting"
            );

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break None,
                _ = sleep_until(deadline(delay)) => {}
            }
        };

        self.stats.publish(&self.attempts);
        match terminal {
            // Only reachable without reconnection: the server finished the body.
            Some(StreamError::Eof) => {
                tracing::info!(endpoint = %self.transport.endpoint(), "stream ended by server");
                self.stats.set_state(ConnectionState::Disconnected);
                let _ = self.errors.try_send(StreamError::Eof);
            }
            Some(err) => {
                tracing::error!(
                    endpoint = %self.transport.endpoint(),
                    attempts = self.attempts.attempt_count,
                    error = %err,
                    "stream failed"
                );
                self.stats.set_state(ConnectionState::Error);
                // Fresh capacity-1 channel, single send.
                let _ = self.errors.try_send(err);
            }
            None => {
                tracing::debug!(endpoint = %self.transport.endpoint(), "stream closed");
                self.stats.set_state(ConnectionState::Disconnected);
            }
        }
    }

    /// Forward frames from `conn` until it fails, goes idle, or the stream
    /// is cancelled (`None`).
    async fn pump(&mut self, conn: &mut Connection) -> Option<StreamError> {
        let cancel = self.cancel.clone();
        let idle = self.policy.idle_timeout();
        let idle_timer = sleep_until(deadline(idle.unwrap_or(FAR_FUTURE)));
        tokio::pin!(idle_timer);

        let reset_interval = self.policy.reset_interval;
        let mut reset_armed = !reset_interval.is_zero();
        let reset_timer = sleep_until(deadline(reset_interval));
        tokio::pin!(reset_timer);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => return None,

                frame = conn.frames.recv() => {
                    let Some(frame) = frame else {
                        // Read loop ended; its error (if any) is already queued.
                        if let Some(err) = conn.errors.recv().await {
                            return Some(err);
                        }
                        if cancel.is_cancelled() {
                            return None;
                        }
                        // Silent exit without cancellation means the task died.
                        return Some(StreamError::Other(format!(
                            "read loop for connection {} exited without a result",
                            conn.id
                        )));
                    };
                    tracing::trace!(connection_id = %conn.id, bytes = frame.data.len(), "frame");
                    self.attempts.record_frame();
                    self.stats.publish(&self.attempts);

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return None,
                        sent = self.frames.send(frame) => {
                            if sent.is_err() {
                                tracing::debug!("frame receiver dropped, stopping stream");
                                return None;
                            }
                        }
                    }
                    if let Some(limit) = idle {
                        idle_timer.as_mut().reset(deadline(limit));
                    }
                }

                _ = &mut reset_timer, if reset_armed => {
                    reset_armed = false;
                    let previous = self.attempts.reset();
                    self.stats.publish(&self.attempts);
                    if previous > 0 {
                        tracing::info!(previous_attempts = previous, "connection stable, attempt counter reset");
                    }
                }

                _ = &mut idle_timer, if idle.is_some() => {
                    return Some(StreamError::IdleTimeout(idle.unwrap_or_default()));
                }
            }
        }
    }
}
