use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Reconnection policy
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Reconnection knobs exposed to operators.  A value of `0` for
/// `max_retries`, `max_elapsed_ms`, or `idle_timeout_ms` means "no limit".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "d_true")]
    pub enabled: bool,
    #[serde(default = "d_250")]
    pub initial_delay_ms: u64,
    #[serde(default = "d_30000")]
    pub max_delay_ms: u64,
    #[serde(default = "d_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "d_jitter")]
    pub jitter_factor: f64,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default)]
    pub max_elapsed_ms: u64,
    /// A connection healthy for this long resets the attempt counter.
    #[serde(default = "d_60000")]
    pub reset_interval_ms: u64,
    #[serde(default = "d_300000")]
    pub idle_timeout_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay_ms: 250,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.2,
            max_retries: 0,
            max_elapsed_ms: 0,
            reset_interval_ms: 60_000,
            idle_timeout_ms: 300_000,
        }
    }
}

fn d_true() -> bool {
    true
}
fn d_250() -> u64 {
    250
}
fn d_30000() -> u64 {
    30_000
}
fn d_multiplier() -> f64 {
    2.0
}
fn d_jitter() -> f64 {
    0.2
}
fn d_60000() -> u64 {
    60_000
}
fn d_300000() -> u64 {
    300_000
}
