//! One HTTP connection at a time: request, response validation, read loop.
//!
//! [`Transport::connect`] performs the handshake and, on success, spawns a
//! single read-loop task that decodes the body into [`Frame`]s.  The loop
//! ends on cancellation, end of body, or a read error.  In the latter two
//! cases it sends exactly one error before both channels close.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{
    HeaderName, HeaderValue, ACCEPT, CACHE_CONTROL, CONTENT_TYPE, RETRY_AFTER,
};
use reqwest::Response;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use uuid::Uuid;

use crate::classify::parse_retry_after;
use crate::config::ClientConfig;
use crate::decoder::FrameDecoder;
use crate::error::{StreamError, TransportKind};
use crate::types::Frame;

pub(crate) const EVENT_STREAM: &str = "text/event-stream";
pub(crate) const LAST_EVENT_ID: HeaderName = HeaderName::from_static("last-event-id");
const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Diagnostic body bytes kept from a rejected response.
const MAX_ERROR_BODY_BYTES: usize = 4 * 1024;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Transport
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Clone)]
pub(crate) struct Transport {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    credential: Option<(HeaderName, HeaderValue)>,
}

/// A live connection: its frame/error channels and the supervised read loop.
pub(crate) struct Connection {
    pub id: Uuid,
    pub frames: mpsc::Receiver<Frame>,
    pub errors: mpsc::Receiver<StreamError>,
    cancel: DropGuard,
    handle: JoinHandle<()>,
}

impl Connection {
    /// Stop the read loop and wait until it has released the response.
    pub async fn shutdown(self) {
        let Connection { cancel, handle, .. } = self;
        drop(cancel);
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "read loop task failed");
        }
    }
}

impl Transport {
    pub fn new(http: reqwest::Client, config: Arc<ClientConfig>) -> Result<Self, StreamError> {
        let credential = config
            .credential
            .as_ref()
            .map(|c| c.to_header())
            .transpose()?;
        Ok(Self {
            http,
            config,
            credential,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Open a connection.  `body` is the already-encoded JSON payload.
    ///
    /// Returns [`StreamError::Cancelled`] if `cancel` fires first.
    pub async fn connect(
        &self,
        cancel: &CancellationToken,
        body: Option<&[u8]>,
        last_event_id: Option<&str>,
    ) -> Result<Connection, StreamError> {
        let id = Uuid::new_v4();
        let request = self.build_request(id, body, last_event_id)?;

        tracing::debug!(
            endpoint = %self.config.endpoint,
            connection_id = %id,
            last_event_id = last_event_id.unwrap_or(""),
            "connecting"
        );

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(StreamError::Cancelled),
            r = self.handshake(request) => r?,
        };

        let loop_cancel = cancel.child_token();
        let (frame_tx, frame_rx) = mpsc::channel(self.config.buffer_size);
        let (err_tx, err_rx) = mpsc::channel(1);
        let handle = tokio::spawn(read_loop(
            id,
            response,
            frame_tx,
            err_tx,
            loop_cancel.clone(),
            self.config.read_timeout,
        ));

        Ok(Connection {
            id,
            frames: frame_rx,
            errors: err_rx,
            cancel: loop_cancel.drop_guard(),
            handle,
        })
    }

    fn build_request(
        &self,
        id: Uuid,
        body: Option<&[u8]>,
        last_event_id: Option<&str>,
    ) -> Result<reqwest::Request, StreamError> {
        let mut rb = self
            .http
            .post(&self.config.endpoint)
            .header(ACCEPT, EVENT_STREAM)
            .header(CACHE_CONTROL, "no-cache")
            .header(REQUEST_ID, id.to_string());

        if let Some((name, value)) = &self.credential {
            rb = rb.header(name.clone(), value.clone());
        }
        if let Some(last_id) = last_event_id.filter(|v| !v.is_empty()) {
            let value = HeaderValue::from_str(last_id)
                .map_err(|e| StreamError::Setup(format!("Last-Event-ID {last_id:?}: {e}")))?;
            rb = rb.header(LAST_EVENT_ID, value);
        }
        if let Some(body) = body {
            rb = rb
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_vec());
        }

        rb.build()
            .map_err(|e| StreamError::Setup(crate::error::error_chain(&e)))
    }

    /// Send the request and validate status and content type.
    async fn handshake(&self, request: reqwest::Request) -> Result<Response, StreamError> {
        let timeout = self.config.connect_timeout;
        let response = match tokio::time::timeout(timeout, self.http.execute(request)).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => return Err(StreamError::connect(&e)),
            Err(_) => {
                return Err(StreamError::Connect {
                    kind: TransportKind::Timeout,
                    message: format!("no response within {timeout:?}"),
                })
            }
        };

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| parse_retry_after(v).ok());
            let body = read_error_body(response, timeout).await;
            return Err(StreamError::Status {
                status: status.as_u16(),
                body,
                retry_after,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_owned();
        if !content_type
            .trim_start()
            .to_ascii_lowercase()
            .starts_with(EVENT_STREAM)
        {
            let body = read_error_body(response, timeout).await;
            return Err(StreamError::ContentType { content_type, body });
        }

        Ok(response)
    }
}

/// Best-effort read of a rejected response body, truncated for logging.
async fn read_error_body(mut response: Response, timeout: Duration) -> String {
    let mut buf = Vec::new();
    let read = async {
        while buf.len() < MAX_ERROR_BODY_BYTES {
            match response.chunk().await {
                Ok(Some(chunk)) => buf.extend_from_slice(&chunk),
                _ => break,
            }
        }
    };
    let _ = tokio::time::timeout(timeout, read).await;
    buf.truncate(MAX_ERROR_BODY_BYTES);
    String::from_utf8_lossy(&buf).trim().to_owned()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Read loop
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

enum Delivery {
    Sent,
    /// Cancelled or the receiver is gone.
    Stop,
    TimedOut,
}

async fn read_loop(
    id: Uuid,
    mut response: Response,
    frames: mpsc::Sender<Frame>,
    errors: mpsc::Sender<StreamError>,
    cancel: CancellationToken,
    read_timeout: Option<Duration>,
) {
    let mut decoder = FrameDecoder::default();

    let outcome: Option<StreamError> = 'read: loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => break 'read None,
            r = read_chunk(&mut response, read_timeout) => r,
        };

        match chunk {
            Ok(Some(bytes)) => {
                let payloads = match decoder.feed(&bytes) {
                    Ok(payloads) => payloads,
                    Err(e) => break 'read Some(e),
                };
                for payload in payloads {
                    match deliver(&frames, Frame::new(payload), &cancel, read_timeout).await {
                        Delivery::Sent => {}
                        Delivery::Stop => break 'read None,
                        Delivery::TimedOut => {
                            break 'read Some(StreamError::Read {
                                kind: TransportKind::Timeout,
                                message: "consumer did not accept frame within read timeout"
                                    .into(),
                            })
                        }
                    }
                }
            }
            Ok(None) => {
                if decoder.has_pending() {
                    tracing::debug!(connection_id = %id, "discarding unterminated event at end of stream");
                }
                break 'read Some(StreamError::Eof);
            }
            Err(e) => break 'read Some(e),
        }
    };

    // Release the connection before signalling so the next attempt never
    // overlaps with this one.
    drop(response);

    match outcome {
        Some(err) => {
            tracing::debug!(connection_id = %id, error = %err, "read loop finished");
            // Capacity 1 and a single send: never blocks.
            let _ = errors.try_send(err);
        }
        None => tracing::debug!(connection_id = %id, "read loop stopped"),
    }
}

async fn read_chunk(
    response: &mut Response,
    read_timeout: Option<Duration>,
) -> Result<Option<Vec<u8>>, StreamError> {
    let result = match read_timeout {
        Some(limit) => match tokio::time::timeout(limit, response.chunk()).await {
            Ok(r) => r,
            Err(_) => {
                return Err(StreamError::Read {
                    kind: TransportKind::Timeout,
                    message: format!("no data within {limit:?}"),
                })
            }
        },
        None => response.chunk().await,
    };
    result
        .map(|chunk| chunk.map(|b| b.to_vec()))
        .map_err(|e| StreamError::read(&e))
}

async fn deliver(
    frames: &mpsc::Sender<Frame>,
    frame: Frame,
    cancel: &CancellationToken,
    read_timeout: Option<Duration>,
) -> Delivery {
    let send = async {
        match read_timeout {
            Some(limit) => match tokio::time::timeout(limit, frames.send(frame)).await {
                Ok(Ok(())) => Delivery::Sent,
                Ok(Err(_)) => Delivery::Stop,
                Err(_) => Delivery::TimedOut,
            },
            None => match frames.send(frame).await {
                Ok(()) => Delivery::Sent,
                Err(_) => Delivery::Stop,
            },
        }
    };

    tokio::select! {
        _ = cancel.cancelled() => Delivery::Stop,
        d = send => d,
    }
}
