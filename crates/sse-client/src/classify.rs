//! Decides whether a failure is worth another connection attempt.
//!
//! Rules, in priority order:
//! 1. An HTTP status is retryable iff it is 408, 429, or 5xx.
//! 2. End-of-stream, reset, refused, and timeout transport failures are
//!    retryable.  So is the synthetic idle timeout.
//! 3. Everything else is fatal.  Unknown errors surface instead of being
//!    retried forever.

use std::time::Duration;

use crate::error::{StreamError, TransportKind};

/// Outcome of classifying an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub retryable: bool,
    pub reason: &'static str,
}

impl Classification {
    const fn retry(reason: &'static str) -> Self {
        Self {
            retryable: true,
            reason,
        }
    }

    const fn fatal(reason: &'static str) -> Self {
        Self {
            retryable: false,
            reason,
        }
    }
}

/// Classify an HTTP status code.
pub fn classify_status(status: u16) -> Classification {
    match status {
        408 => Classification::retry("request timeout"),
        429 => Classification::retry("rate limited"),
        500..=599 => Classification::retry("server error"),
        400..=499 => Classification::fatal("client error"),
        _ => Classification::fatal("unexpected status"),
    }
}

fn classify_kind(kind: TransportKind) -> Classification {
    match kind {
        TransportKind::Eof => Classification::retry("end of stream"),
        TransportKind::Reset => Classification::retry("connection reset"),
        TransportKind::Refused => Classification::retry("connection refused"),
        TransportKind::Timeout => Classification::retry("timeout"),
        TransportKind::Other => Classification::fatal("transport error"),
    }
}

/// Classify a free-form message from an opaque source.
///
/// A `status code NNN` fragment is honoured first so that wrapped HTTP
/// failures still follow rule 1.
pub fn classify_message(message: &str) -> Classification {
    match status_in_message(message) {
        Some(status) => classify_status(status),
        None => match TransportKind::from_message(message) {
            TransportKind::Other => Classification::fatal("unknown error"),
            kind => classify_kind(kind),
        },
    }
}

/// Classify any [`StreamError`].
pub fn classify(err: &StreamError) -> Classification {
    match err {
        StreamError::Status { status, .. } => classify_status(*status),
        StreamError::Connect { kind, .. } | StreamError::Read { kind, .. } => classify_kind(*kind),
        StreamError::Eof => Classification::retry("end of stream"),
        StreamError::IdleTimeout(_) => Classification::retry("idle timeout"),
        StreamError::ContentType { .. } => Classification::fatal("protocol error"),
        StreamError::Config(_) | StreamError::Setup(_) | StreamError::InvalidRetryAfter(_) => {
            Classification::fatal("setup error")
        }
        StreamError::MaxRetriesExceeded { .. } | StreamError::MaxElapsedExceeded { .. } => {
            Classification::fatal("limit exceeded")
        }
        StreamError::Busy | StreamError::Closed | StreamError::Cancelled => {
            Classification::fatal("client state")
        }
        StreamError::Other(message) => classify_message(message),
    }
}

/// Parse a `Retry-After` value given in whole seconds.
///
/// HTTP-date values and anything that is not a non-negative integer are
/// rejected; callers fall back to the computed backoff.
pub fn parse_retry_after(value: &str) -> Result<Duration, StreamError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(StreamError::InvalidRetryAfter(value.to_owned()));
    }
    trimmed
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| StreamError::InvalidRetryAfter(value.to_owned()))
}

fn status_in_message(message: &str) -> Option<u16> {
    let lower = message.to_ascii_lowercase();
    let idx = lower.find("status code")?;
    let digits: String = lower[idx + "status code".len()..]
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    match digits.len() {
        3 => digits.parse().ok(),
        _ => None,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
