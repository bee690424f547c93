//! Runtime configuration for [`SseClient`](crate::SseClient).

use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};

use crate::error::StreamError;

/// A credential header sent with every request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub header: String,
    pub value: String,
}

impl Credential {
    pub fn new(header: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            value: value.into(),
        }
    }

    /// `Authorization: Bearer <token>`.
    pub fn bearer(token: impl AsRef<str>) -> Self {
        Self::new("Authorization", format!("Bearer {}", token.as_ref()))
    }

    /// Parse into a header pair; the value is marked sensitive.
    pub(crate) fn to_header(&self) -> Result<(HeaderName, HeaderValue), StreamError> {
        let name = HeaderName::from_bytes(self.header.as_bytes())
            .map_err(|e| StreamError::Config(format!("credential header name: {e}")))?;
        let mut value = HeaderValue::from_str(&self.value)
            .map_err(|e| StreamError::Config(format!("credential header value: {e}")))?;
        value.set_sensitive(true);
        Ok((name, value))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("header", &self.header)
            .field("value", &"***")
            .finish()
    }
}

/// Connection-level settings.  Immutable once the client is built.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Event-stream endpoint (`http` or `https`).
    pub endpoint: String,
    pub credential: Option<Credential>,
    /// Bound on the request/response handshake.
    pub connect_timeout: Duration,
    /// Bound on each body read and each frame hand-off.  `None` disables it.
    pub read_timeout: Option<Duration>,
    /// Frame channel capacity.  Must be at least 1.
    pub buffer_size: usize,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            credential: None,
            connect_timeout: Duration::from_secs(30),
            read_timeout: Some(Duration::from_secs(5 * 60)),
            buffer_size: 100,
        }
    }

    /// Build from the operator config.  The credential is resolved by the
    /// caller (environment, keychain, ...).
    pub fn from_stream_config(
        cfg: &ags_domain::config::StreamConfig,
        credential: Option<Credential>,
    ) -> Self {
        Self {
            endpoint: cfg.endpoint.clone(),
            credential,
            connect_timeout: Duration::from_millis(cfg.connect_timeout_ms),
            read_timeout: (cfg.read_timeout_ms > 0)
                .then(|| Duration::from_millis(cfg.read_timeout_ms)),
            buffer_size: cfg.buffer_size,
        }
    }

    pub fn validate(&self) -> Result<(), StreamError> {
        let url = reqwest::Url::parse(&self.endpoint)
            .map_err(|e| StreamError::Config(format!("endpoint {:?}: {e}", self.endpoint)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(StreamError::Config(format!(
                "endpoint scheme must be http or https, got {:?}",
                url.scheme()
            )));
        }
        if self.buffer_size == 0 {
            return Err(StreamError::Config("buffer_size must be at least 1".into()));
        }
        if self.connect_timeout.is_zero() {
            return Err(StreamError::Config("connect_timeout must be non-zero".into()));
        }
        if let Some(credential) = &self.credential {
            credential.to_header()?;
        }
        Ok(())
    }
}
