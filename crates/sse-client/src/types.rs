use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::StreamError;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Frames
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One event's `data:` payload plus the time it was read off the wire.
///
/// Multi-line payloads are joined with `\n`.  Non-`data:` fields (`event:`,
/// `id:`, `retry:`) are not carried; decoding them is up to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub data: Vec<u8>,
    pub received_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            received_at: Utc::now(),
        }
    }

    /// The payload as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Connection state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    /// Terminal: the stream ended with an error.
    Error,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Stream options / handles
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-stream inputs.
#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    /// JSON body sent with every (re)connect request.
    pub payload: Option<serde_json::Value>,
    /// Cancelling this token ends the stream without an error.
    pub cancel: CancellationToken,
}

impl StreamOptions {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            payload: None,
            cancel,
        }
    }

    /// Attach a serializable payload.
    pub fn with_payload<T: Serialize>(mut self, payload: &T) -> Result<Self, StreamError> {
        self.payload = Some(serde_json::to_value(payload)?);
        Ok(self)
    }
}

/// The consumer side of a stream: frames plus at most one terminal error.
///
/// Both channels are closed by the producer once the stream ends.  A closed
/// `frames` with nothing on `errors` means a clean shutdown (cancellation
/// or, in single-shot mode, the server finishing the response).
#[derive(Debug)]
pub struct FrameStream {
    pub frames: mpsc::Receiver<Frame>,
    pub errors: mpsc::Receiver<StreamError>,
}

impl FrameStream {
    /// Next frame, then the terminal error (if any), then `None`.
    pub async fn next(&mut self) -> Option<Result<Frame, StreamError>> {
        if let Some(frame) = self.frames.recv().await {
            return Some(Ok(frame));
        }
        self.errors.recv().await.map(Err)
    }

    pub fn into_parts(self) -> (mpsc::Receiver<Frame>, mpsc::Receiver<StreamError>) {
        (self.frames, self.errors)
    }
}
