pub mod config;
pub mod stream;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "AGSTREAM_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "agstream.toml";

/// agstream: resilient event-stream client for agent endpoints.
#[derive(Debug, Parser)]
#[command(name = "agstream", version, about)]
pub struct Cli {
    /// Config file (default: $AGSTREAM_CONFIG, then ./agstream.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open a stream and print frames until it ends or Ctrl-C.
    Stream(StreamArgs),
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Args)]
pub struct StreamArgs {
    /// Override `stream.endpoint`.
    #[arg(long)]
    pub endpoint: Option<String>,
    /// JSON request body.
    #[arg(long)]
    pub payload: Option<String>,
    /// Resume from this event id (sent as `Last-Event-ID`).
    #[arg(long)]
    pub last_event_id: Option<String>,
    /// Single connection; do not reconnect.
    #[arg(long)]
    pub no_reconnect: bool,
    /// Override `reconnect.max_retries` (0 = unlimited).
    #[arg(long)]
    pub max_retries: Option<u32>,
    /// Print one JSON object per frame.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration.  Returns the parsed config and the path that
/// was consulted.
///
/// An explicitly named file (flag or `AGSTREAM_CONFIG`) must exist; the
/// implicit `./agstream.toml` falls back to defaults when absent.
pub fn load_config(
    explicit: Option<&Path>,
) -> anyhow::Result<(ags_domain::config::Config, String)> {
    let (path, required) = match explicit {
        Some(p) => (p.to_path_buf(), true),
        None => match std::env::var(CONFIG_ENV) {
            Ok(p) if !p.is_empty() => (PathBuf::from(p), true),
            _ => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        },
    };
    let shown = path.display().to_string();

    let config = if path.exists() {
        ags_domain::config::Config::from_path(&path).with_context(|| format!("loading {shown}"))?
    } else if required {
        anyhow::bail!("config file {shown} not found");
    } else {
        ags_domain::config::Config::default()
    };

    Ok((config, shown))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_stream_flags() {
        let cli = Cli::try_parse_from([
            "agstream",
            "stream",
            "--endpoint",
            "http://x/agent",
            "--no-reconnect",
            "--max-retries",
            "4",
            "--last-event-id",
            "e-9",
        ])
        .unwrap();
        match cli.command {
            Command::Stream(args) => {
                assert_eq!(args.endpoint.as_deref(), Some("http://x/agent"));
                assert!(args.no_reconnect);
                assert_eq!(args.max_retries, Some(4));
                assert_eq!(args.last_event_id.as_deref(), Some("e-9"));
                assert!(!args.json);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["agstream", "config", "show", "--config", "a.toml"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some(Path::new("a.toml")));
        assert!(matches!(cli.command, Command::Config(ConfigCommand::Show)));
    }

    #[test]
    fn explicit_config_file_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[stream]\nendpoint = \"http://example.test/sse\"").unwrap();
        let (config, shown) = load_config(Some(file.path())).unwrap();
        assert_eq!(config.stream.endpoint, "http://example.test/sse");
        assert_eq!(shown, file.path().display().to_string());
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_config(Some(missing.as_path())).is_err());
    }
}
