use ags_domain::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber, writing to stderr so stdout stays clean
/// for frames.  `RUST_LOG` takes precedence over `logging.level`.
pub fn init_tracing(cfg: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(&cfg.level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    if cfg.json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

/// A bare level applies to our crates only; anything else is used verbatim.
fn filter_directive(level: &str) -> String {
    let level = level.trim();
    match level.to_ascii_lowercase().as_str() {
        "" => "warn".into(),
        l @ ("trace" | "debug" | "info" | "warn" | "error") => {
            format!("warn,ags_sse={l},ags_cli={l},ags_domain={l}")
        }
        _ => level.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_level_targets_workspace_crates() {
        assert_eq!(
            filter_directive("debug"),
            "warn,ags_sse=debug,ags_cli=debug,ags_domain=debug"
        );
        assert_eq!(filter_directive(""), "warn");
    }

    #[test]
    fn full_directives_pass_through() {
        assert_eq!(filter_directive("info,hyper=warn"), "info,hyper=warn");
    }
}
