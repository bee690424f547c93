//! `agstream stream`: open a stream and print frames.

use std::io::Write;

use ags_domain::config::Config;
use ags_sse::{ClientConfig, ReconnectionConfig, SseClient, StreamError, StreamOptions};
use anyhow::Context;
use tokio_util::sync::CancellationToken;

use crate::auth::resolve_credential;
use crate::cli::StreamArgs;
use crate::display::{self, Rendered};

/// Fold command-line overrides into the loaded config.
pub fn apply_overrides(config: &mut Config, args: &StreamArgs) {
    if let Some(endpoint) = &args.endpoint {
        config.stream.endpoint = endpoint.clone();
    }
    if args.no_reconnect {
        config.reconnect.enabled = false;
    }
    if let Some(max) = args.max_retries {
        config.reconnect.max_retries = max;
    }
}

/// Run the stream to completion.  Returns `false` on a terminal error.
pub async fn run(mut config: Config, args: StreamArgs) -> anyhow::Result<bool> {
    apply_overrides(&mut config, &args);

    let payload = args
        .payload
        .as_deref()
        .map(|p| serde_json::from_str::<serde_json::Value>(p))
        .transpose()
        .context("--payload is not valid JSON")?;

    let credential = resolve_credential(&config.auth)?;
    let client = SseClient::new(ClientConfig::from_stream_config(&config.stream, credential))
        .context("building client")?;
    if let Some(id) = args.last_event_id {
        client.set_last_event_id(id);
    }

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupted, closing stream");
                cancel.cancel();
            }
        }
    });

    let opts = StreamOptions {
        payload,
        cancel: cancel.clone(),
    };
    let policy = ReconnectionConfig::from(&config.reconnect);
    let mut stream = client
        .stream_with_reconnect(policy, opts)
        .await
        .with_context(|| format!("connecting to {}", config.stream.endpoint))?;

    let mut failure = None;
    let mut mid_line = false;
    while let Some(item) = stream.next().await {
        match item {
            Ok(frame) if args.json => println!("{}", display::render_json(&frame)),
            Ok(frame) => match display::render(&frame) {
                Rendered::Inline(text) => {
                    print!("{text}");
                    std::io::stdout().flush().ok();
                    mid_line = true;
                }
                Rendered::Line(line) => {
                    if mid_line {
                        println!();
                        mid_line = false;
                    }
                    println!("{line}");
                }
            },
            // Single connection finished by the server.
            Err(StreamError::Eof) => tracing::info!("server ended the stream"),
            Err(e) => failure = Some(e),
        }
    }
    if mid_line {
        println!();
    }

    let stats = client.stats();
    tracing::info!(
        state = %stats.state,
        connections = stats.connections,
        failed_attempts = stats.attempt_count,
        elapsed_ms = stats.elapsed.as_millis() as u64,
        last_event_id = stats.last_event_id.as_deref().unwrap_or(""),
        "stream finished"
    );
    client.close();

    match failure {
        Some(e) => {
            eprintln!("error: {e}");
            Ok(false)
        }
        None => Ok(true),
    }
}
