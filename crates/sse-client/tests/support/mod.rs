//! In-process event-stream servers for the integration tests.

#![allow(dead_code)]

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ags_sse::{Frame, FrameStream, ReconnectionConfig, StreamError};
use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::Router;
use futures_util::Stream;
use tokio::net::TcpListener;

/// What the server saw, per request.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Default)]
pub struct Recorder {
    pub connections: AtomicU32,
    pub requests: Mutex<Vec<SeenRequest>>,
}

impl Recorder {
    /// Record a request and return its 1-based connection number.
    pub fn record(&self, headers: &HeaderMap, body: &Bytes) -> u32 {
        self.requests.lock().unwrap().push(SeenRequest {
            headers: headers.clone(),
            body: body.clone(),
        });
        self.connections.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn count(&self) -> u32 {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn header(&self, index: usize, name: &str) -> Option<String> {
        let requests = self.requests.lock().unwrap();
        requests
            .get(index)?
            .headers
            .get(name)
            .map(|v| v.to_str().unwrap().to_owned())
    }
}

/// Sets a flag when dropped; parked inside server bodies to detect release.
pub struct DropFlag(pub Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Bind an ephemeral port and serve `app`.  Returns the endpoint URL.
pub async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/agent")
}

/// A 200 `text/event-stream` response streaming `events`.
pub fn event_stream<S>(events: S) -> Response
where
    S: Stream<Item = Result<String, Infallible>> + Send + 'static,
{
    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(events),
    )
        .into_response()
}

pub fn data(payload: &str) -> Result<String, Infallible> {
    Ok(format!("data: {payload}\n\n"))
}

/// Reconnection tuned for tests: short, deterministic delays.
pub fn fast_policy() -> ReconnectionConfig {
    ReconnectionConfig {
        initial_delay: Duration::from_millis(20),
        max_delay: Duration::from_millis(100),
        jitter_factor: 0.0,
        ..Default::default()
    }
}

pub async fn next_within(
    stream: &mut FrameStream,
    limit: Duration,
) -> Option<Result<Frame, StreamError>> {
    tokio::time::timeout(limit, stream.next())
        .await
        .expect("timed out waiting for the stream")
}

/// Read until the terminal error, skipping frames.
pub async fn terminal_error(stream: &mut FrameStream, limit: Duration) -> StreamError {
    tokio::time::timeout(limit, async {
        loop {
            match stream.next().await {
                Some(Ok(_)) => continue,
                Some(Err(e)) => return e,
                None => panic!("stream closed without an error"),
            }
        }
    })
    .await
    .expect("timed out waiting for the terminal error")
}

pub fn json(frame: &Frame) -> serde_json::Value {
    serde_json::from_slice(&frame.data).unwrap()
}
