use serde::{Deserialize, Serialize};

/// Log output settings for the `agstream` binary.  `RUST_LOG` overrides
/// `level` when set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "d_level")]
    pub level: String,
    /// Emit JSON lines instead of compact text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: d_level(),
            json: false,
        }
    }
}

fn d_level() -> String {
    "warn".into()
}
