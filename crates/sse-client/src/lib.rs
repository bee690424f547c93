//! `ags-sse`: resilient `text/event-stream` client for agent endpoints.
//!
//! The client POSTs an optional JSON payload, reads the event stream, and
//! hands each event's `data:` payload to the caller as a [`Frame`].  When
//! the connection drops it reconnects with jittered exponential back-off,
//! resuming from the last recorded `Last-Event-ID`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  stream_with_reconnect  ┌──────────────┐
//! │  SseClient   │ ──────────────────────▶ │ Reconnector  │  one task per stream
//! │  stats()     │ ◀── StatsRecorder ───── │ AttemptState │
//! └──────────────┘                         └──────┬───────┘
//!        ▲ frames / error                         │ connect, await, classify
//!        │                                 ┌──────▼───────┐
//!   FrameStream ◀──────────────────────────│  Transport   │  one read loop
//!                                          └──────────────┘  per connection
//! ```
//!
//! # Ending a stream
//!
//! - Cancelling the caller's token closes both channels with no error.
//! - A terminal failure (non-retryable error or an exhausted retry budget)
//!   is delivered exactly once on the error channel, then both close.
//! - Without reconnection the server ending the body is reported as
//!   [`StreamError::Eof`].
//!
//! ```rust,no_run
//! # async fn demo() -> Result<(), ags_sse::StreamError> {
//! use ags_sse::{ReconnectionConfig, SseClient, StreamOptions};
//! use tokio_util::sync::CancellationToken;
//!
//! let client = SseClient::builder()
//!     .endpoint("http://localhost:8000/agent")
//!     .build()?;
//! let opts = StreamOptions::new(CancellationToken::new())
//!     .with_payload(&serde_json::json!({ "input": "hello" }))?;
//! let mut stream = client
//!     .stream_with_reconnect(ReconnectionConfig::default(), opts)
//!     .await?;
//! while let Some(item) = stream.next().await {
//!     match item {
//!         Ok(frame) => println!("{}", frame.text()),
//!         Err(e) => eprintln!("stream failed: {e}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod builder;
pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod types;

mod decoder;
mod reconnect;
mod stats;
mod transport;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use backoff::ReconnectionConfig;
pub use builder::SseClientBuilder;
pub use classify::{classify, classify_message, classify_status, parse_retry_after, Classification};
pub use client::SseClient;
pub use config::{ClientConfig, Credential};
pub use error::{StreamError, TransportKind};
pub use stats::Stats;
pub use types::{ConnectionState, Frame, FrameStream, StreamOptions};
