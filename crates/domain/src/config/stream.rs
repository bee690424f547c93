use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Stream endpoint
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Full URL of the event-stream endpoint.
    #[serde(default = "d_endpoint")]
    pub endpoint: String,
    /// Upper bound on the request/response handshake.
    #[serde(default = "d_30000")]
    pub connect_timeout_ms: u64,
    /// Upper bound on a single body read (and on handing a frame to the
    /// consumer).  `0` disables the timeout.
    #[serde(default = "d_300000")]
    pub read_timeout_ms: u64,
    /// Capacity of the frame channel handed to the consumer.
    #[serde(default = "d_100")]
    pub buffer_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            endpoint: d_endpoint(),
            connect_timeout_ms: 30_000,
            read_timeout_ms: 300_000,
            buffer_size: 100,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_endpoint() -> String {
    "http://localhost:8000/agent".into()
}
fn d_30000() -> u64 {
    30_000
}
fn d_300000() -> u64 {
    300_000
}
fn d_100() -> usize {
    100
}
