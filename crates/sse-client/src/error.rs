//! Tagged error variants for every way a stream can fail.
//!
//! Classification ([`crate::classify`]) matches on these variants.  Text
//! inspection only happens for errors surfaced by lower-level libraries
//! (reqwest, hyper, std::io) that carry no structured kind.

use std::fmt;
use std::time::Duration;

/// Low-level cause of a connect or read failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Peer closed the stream.
    Eof,
    /// Connection reset, aborted, or broken pipe.
    Reset,
    /// Connection refused or host unreachable at connect time.
    Refused,
    /// Connect or read deadline elapsed.
    Timeout,
    Other,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eof => "eof",
            Self::Reset => "reset",
            Self::Refused => "refused",
            Self::Timeout => "timeout",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

impl TransportKind {
    pub fn from_io(err: &std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::UnexpectedEof => Self::Eof,
            ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe => {
                Self::Reset
            }
            ErrorKind::ConnectionRefused => Self::Refused,
            ErrorKind::TimedOut => Self::Timeout,
            _ => Self::from_message(&err.to_string()),
        }
    }

    /// Fallback for opaque errors: match well-known message signatures.
    pub fn from_message(message: &str) -> Self {
        let m = message.to_ascii_lowercase();
        if m.contains("eof") || m.contains("end of file") || m.contains("end of stream") {
            Self::Eof
        } else if m.contains("connection reset")
            || m.contains("connection aborted")
            || m.contains("connection closed")
            || m.contains("broken pipe")
        {
            Self::Reset
        } else if m.contains("connection refused") {
            Self::Refused
        } else if m.contains("timeout") || m.contains("timed out") {
            Self::Timeout
        } else {
            Self::Other
        }
    }

    /// Inspect a reqwest error: its own flags first, then any `io::Error`
    /// in the source chain, then the rendered message.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout;
        }

        let mut source = std::error::Error::source(err);
        while let Some(inner) = source {
            if let Some(io) = inner.downcast_ref::<std::io::Error>() {
                let kind = Self::from_io(io);
                if kind != Self::Other {
                    return kind;
                }
            }
            source = inner.source();
        }

        match Self::from_message(&error_chain(err)) {
            Self::Other if err.is_connect() => Self::Refused,
            kind => kind,
        }
    }
}

/// Everything that can end a connection attempt or a stream.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Invalid client or reconnection configuration.
    #[error("config: {0}")]
    Config(String),

    /// The request could not be built (bad header value, payload encoding).
    #[error("request setup: {0}")]
    Setup(String),

    #[error("connect ({kind}): {message}")]
    Connect { kind: TransportKind, message: String },

    #[error("read ({kind}): {message}")]
    Read { kind: TransportKind, message: String },

    /// Non-2xx response.  `retry_after` holds a parsed `Retry-After` header.
    #[error("unexpected status code {status}: {body}")]
    Status {
        status: u16,
        body: String,
        retry_after: Option<Duration>,
    },

    #[error("unexpected content type {content_type:?} (expected text/event-stream): {body}")]
    ContentType { content_type: String, body: String },

    /// The server closed the body.
    #[error("stream ended: EOF")]
    Eof,

    #[error("idle timeout: no frames for {0:?}")]
    IdleTimeout(Duration),

    #[error("max reconnection attempts ({max}) exceeded: {last}")]
    MaxRetriesExceeded { max: u32, last: Box<StreamError> },

    #[error("max elapsed time ({limit:?}) exceeded: {last}")]
    MaxElapsedExceeded { limit: Duration, last: Box<StreamError> },

    #[error("invalid Retry-After value {0:?}")]
    InvalidRetryAfter(String),

    #[error("a stream is already active on this client")]
    Busy,

    #[error("client closed")]
    Closed,

    /// Cancellation observed mid-operation.  Never delivered on the error
    /// channel.
    #[error("cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl StreamError {
    pub(crate) fn connect(err: &reqwest::Error) -> Self {
        Self::Connect {
            kind: TransportKind::from_reqwest(err),
            message: error_chain(err),
        }
    }

    pub(crate) fn read(err: &reqwest::Error) -> Self {
        Self::Read {
            kind: TransportKind::from_reqwest(err),
            message: error_chain(err),
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Server-specified wait before the next attempt.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// True for the retry-limit variants.
    pub fn is_limit_exceeded(&self) -> bool {
        matches!(
            self,
            Self::MaxRetriesExceeded { .. } | Self::MaxElapsedExceeded { .. }
        )
    }
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        Self::Read {
            kind: TransportKind::from_io(&err),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(err: serde_json::Error) -> Self {
        Self::Setup(format!("payload encoding: {err}"))
    }
}

/// Render an error and its sources as `outer: inner: innermost`.
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = inner.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn io_kinds_map_to_transport_kinds() {
        assert_eq!(
            TransportKind::from_io(&IoError::from(ErrorKind::UnexpectedEof)),
            TransportKind::Eof
        );
        assert_eq!(
            TransportKind::from_io(&IoError::from(ErrorKind::ConnectionReset)),
            TransportKind::Reset
        );
        assert_eq!(
            TransportKind::from_io(&IoError::from(ErrorKind::ConnectionRefused)),
            TransportKind::Refused
        );
        assert_eq!(
            TransportKind::from_io(&IoError::from(ErrorKind::TimedOut)),
            TransportKind::Timeout
        );
    }

    #[test]
    fn message_signatures() {
        assert_eq!(TransportKind::from_message("unexpected EOF"), TransportKind::Eof);
        assert_eq!(
            TransportKind::from_message("dial tcp: connection refused"),
            TransportKind::Refused
        );
        assert_eq!(TransportKind::from_message("i/o timeout"), TransportKind::Timeout);
        assert_eq!(
            TransportKind::from_message("connection closed before message completed"),
            TransportKind::Reset
        );
        assert_eq!(TransportKind::from_message("permission denied"), TransportKind::Other);
    }

    #[test]
    fn limit_errors_mention_limit() {
        let err = StreamError::MaxRetriesExceeded {
            max: 3,
            last: Box::new(StreamError::Eof),
        };
        assert!(err.to_string().contains("max reconnection attempts (3) exceeded"));
        assert!(err.is_limit_exceeded());

        let err = StreamError::MaxElapsedExceeded {
            limit: Duration::from_millis(500),
            last: Box::new(StreamError::Eof),
        };
        assert!(err.to_string().contains("max elapsed time (500ms) exceeded"));
    }

    #[test]
    fn status_accessors() {
        let err = StreamError::Status {
            status: 429,
            body: "slow down".into(),
            retry_after: Some(Duration::from_secs(2)),
        };
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));
        assert_eq!(StreamError::Eof.retry_after(), None);
    }

    #[test]
    fn io_error_converts_to_read() {
        let err: StreamError = IoError::from(ErrorKind::BrokenPipe).into();
        assert!(matches!(
            err,
            StreamError::Read {
                kind: TransportKind::Reset,
                ..
            }
        ));
    }
}
