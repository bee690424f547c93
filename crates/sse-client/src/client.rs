//! Public client: owns the HTTP pool, stats, and the one active stream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::backoff::ReconnectionConfig;
use crate::builder::SseClientBuilder;
use crate::config::ClientConfig;
use crate::error::{error_chain, StreamError};
use crate::reconnect::Reconnector;
use crate::stats::{Stats, StatsRecorder};
use crate::transport::Transport;
use crate::types::{ConnectionState, FrameStream, StreamOptions};

/// A configured event-stream client.
///
/// One stream may be active at a time.  Dropping the client, or calling
/// [`close`](Self::close), ends any active stream.
pub struct SseClient {
    config: Arc<ClientConfig>,
    http: Mutex<Option<reqwest::Client>>,
    stats: Arc<StatsRecorder>,
    shutdown: CancellationToken,
    active: Arc<AtomicBool>,
}

/// Clears the client's busy flag when the stream task ends.
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SseClient {
    /// Start a new builder.
    pub fn builder() -> SseClientBuilder {
        SseClientBuilder::new()
    }

    pub fn new(config: ClientConfig) -> Result<Self, StreamError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| StreamError::Config(format!("http client: {}", error_chain(&e))))?;

        Ok(Self {
            config: Arc::new(config),
            http: Mutex::new(Some(http)),
            stats: Arc::new(StatsRecorder::new()),
            shutdown: CancellationToken::new(),
            active: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Open a single connection without reconnection.
    ///
    /// Handshake failures are returned directly.  Once connected, whatever
    /// ends the connection is delivered once on the error channel; the server
    /// finishing the response arrives as [`StreamError::Eof`].
    pub async fn stream(&self, opts: StreamOptions) -> Result<FrameStream, StreamError> {
        let policy = ReconnectionConfig {
            enabled: false,
            ..ReconnectionConfig::default()
        };
        self.start(policy, opts, true).await
    }

    /// Stream with automatic reconnection.
    ///
    /// Returns as soon as the stream task is running; connection failures,
    /// retries, and the eventual terminal error (if any) are reported through
    /// the returned [`FrameStream`].  Only invalid configuration, a
    /// payload that cannot be encoded, or a busy/closed client fail here.
    /// With `policy.enabled == false` this behaves like [`stream`](Self::stream).
    pub async fn stream_with_reconnect(
        &self,
        policy: ReconnectionConfig,
        opts: StreamOptions,
    ) -> Result<FrameStream, StreamError> {
        policy.validate()?;
        let eager = !policy.enabled;
        self.start(policy, opts, eager).await
    }

    async fn start(
        &self,
        policy: ReconnectionConfig,
        opts: StreamOptions,
        eager: bool,
    ) -> Result<FrameStream, StreamError> {
        let http = self.http.lock().clone().ok_or(StreamError::Closed)?;
        if self.shutdown.is_cancelled() {
            return Err(StreamError::Closed);
        }
        let body = opts.payload.as_ref().map(serde_json::to_vec).transpose()?;
        let transport = Transport::new(http, self.config.clone())?;

        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(StreamError::Busy);
        }
        let active = ActiveGuard(self.active.clone());

        let cancel = self.link_cancellation(&opts.cancel);
        let (mut reconnector, stream) = Reconnector::new(
            transport,
            policy,
            body,
            self.stats.clone(),
            cancel.clone(),
            self.config.buffer_size,
        );

        tracing::info!(
            endpoint = %self.config.endpoint,
            reconnect = !eager,
            "starting stream"
        );

        let first = if eager {
            match reconnector.connect().await {
                Ok(conn) => Some(conn),
                Err(e) => {
                    cancel.cancel();
                    let state = match e {
                        StreamError::Cancelled => ConnectionState::Disconnected,
                        _ => ConnectionState::Error,
                    };
                    self.stats.set_state(state);
                    return Err(e);
                }
            }
        } else {
            None
        };

        tokio::spawn(async move {
            let _active = active;
            let _cancel_on_exit = cancel.drop_guard();
            reconnector.run(first).await;
        });

        Ok(stream)
    }

    /// A token cancelled by either the caller's token or [`close`](Self::close).
    fn link_cancellation(&self, caller: &CancellationToken) -> CancellationToken {
        let token = self.shutdown.child_token();
        let caller = caller.clone();
        let linked = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = caller.cancelled() => linked.cancel(),
                _ = linked.cancelled() => {}
            }
        });
        token
    }

    /// Resume position sent as `Last-Event-ID` on the next (re)connect.
    /// An empty id clears it.
    pub fn set_last_event_id(&self, id: impl Into<String>) {
        self.stats.set_last_event_id(id.into());
    }

    pub fn stats(&self) -> Stats {
        self.stats.snapshot()
    }

    pub fn state(&self) -> ConnectionState {
        self.stats.state()
    }

    /// End any active stream and release pooled connections.  Idempotent.
    /// Later `stream*` calls fail with [`StreamError::Closed`].
    pub fn close(&self) {
        self.shutdown.cancel();
        if self.http.lock().take().is_some() {
            tracing::debug!(endpoint = %self.config.endpoint, "client closed");
        }
    }
}

impl Drop for SseClient {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
