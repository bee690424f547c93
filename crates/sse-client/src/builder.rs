//! Builder pattern for constructing an [`SseClient`].

use std::time::Duration;

use crate::client::SseClient;
use crate::config::{ClientConfig, Credential};
use crate::error::StreamError;

/// Fluent builder for [`SseClient`].
///
/// # Example
///
/// ```rust,no_run
/// # use ags_sse::SseClientBuilder;
/// let client = SseClientBuilder::new()
///     .endpoint("https://agents.example.com/agent")
///     .bearer_token("sk-...")
///     .read_timeout(std::time::Duration::from_secs(120))
///     .buffer_size(256)
///     .build()
///     .unwrap();
/// ```
pub struct SseClientBuilder {
    config: ClientConfig,
}

impl SseClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::new("http://localhost:8000/agent"),
        }
    }

    // ── Required ─────────────────────────────────────────────────────

    /// Set the event-stream endpoint URL.
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    // ── Credentials ──────────────────────────────────────────────────

    /// Send `header: value` with every request.
    pub fn credential(mut self, credential: Credential) -> Self {
        self.config.credential = Some(credential);
        self
    }

    /// Shorthand for `Authorization: Bearer <token>`.
    pub fn bearer_token(self, token: impl AsRef<str>) -> Self {
        self.credential(Credential::bearer(token))
    }

    // ── Timeouts / buffering ─────────────────────────────────────────

    /// Bound on the request/response handshake (default 30s).
    pub fn connect_timeout(mut self, d: Duration) -> Self {
        self.config.connect_timeout = d;
        self
    }

    /// Bound on each body read and frame hand-off (default 5m).
    /// `None` waits forever.
    pub fn read_timeout(mut self, d: impl Into<Option<Duration>>) -> Self {
        self.config.read_timeout = d.into();
        self
    }

    /// Frame channel capacity (default 100).
    pub fn buffer_size(mut self, n: usize) -> Self {
        self.config.buffer_size = n;
        self
    }

    /// Build the [`SseClient`].
    pub fn build(self) -> Result<SseClient, StreamError> {
        SseClient::new(self.config)
    }
}

impl Default for SseClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ClientConfig> for SseClientBuilder {
    fn from(config: ClientConfig) -> Self {
        Self { config }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_invalid_config() {
        let err = SseClientBuilder::new().buffer_size(0).build().err();
        assert!(matches!(err, Some(StreamError::Config(_))));

        let err = SseClientBuilder::new().endpoint("").build().err();
        assert!(matches!(err, Some(StreamError::Config(_))));
    }

    #[test]
    fn builder_carries_settings() {
        let client = SseClientBuilder::new()
            .endpoint("http://127.0.0.1:9/stream")
            .bearer_token("t0k")
            .read_timeout(None)
            .buffer_size(8)
            .build()
            .unwrap();
        let cfg = client.config();
        assert_eq!(cfg.endpoint, "http://127.0.0.1:9/stream");
        assert_eq!(cfg.read_timeout, None);
        assert_eq!(cfg.buffer_size, 8);
        assert_eq!(
            cfg.credential.as_ref().map(|c| c.value.as_str()),
            Some("Bearer t0k")
        );
    }
}
