use ags_domain::config::{Config, ConfigSeverity};

/// Parse and validate the config, printing any issues.
///
/// Returns `false` when errors were found.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();

    if issues.is_empty() {
        println!("Config OK ({config_path})");
        return true;
    }

    let error_count = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();
    let warning_count = issues.len() - error_count;

    for issue in &issues {
        println!("{issue}");
    }

    println!("\n{error_count} error(s), {warning_count} warning(s) in {config_path}");

    error_count == 0
}

/// Dump the resolved config (with all defaults filled in) as TOML.
/// A plaintext `auth.api_key` is masked.
pub fn show(config: &Config) -> anyhow::Result<()> {
    print!("{}", render(config)?);
    Ok(())
}

fn render(config: &Config) -> anyhow::Result<String> {
    let mut shown = config.clone();
    if shown.auth.api_key.is_some() {
        shown.auth.api_key = Some("***".into());
    }
    Ok(shown.to_toml()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_masks_api_key() {
        let mut config = Config::default();
        config.auth.api_key = Some("sk-very-secret".into());
        let out = render(&config).unwrap();
        assert!(!out.contains("sk-very-secret"));
        assert!(out.contains("api_key = \"***\""));
        assert!(out.contains("[reconnect]"));
    }

    #[test]
    fn defaults_validate() {
        assert!(validate(&Config::default(), "defaults"));
    }
}
