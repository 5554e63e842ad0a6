//! Headless host bridge binary for stdin/stdout JSON communication.
//!
//! Runs the widget core with console collaborators. `CommandEnvelope`
//! messages arrive as newline-delimited JSON on stdin; `ResponseEnvelope`
//! and `EventEnvelope` messages are written to stdout.
//!
//! All tracing/diagnostic output goes to stderr so that stdout remains a
//! clean JSON protocol channel.
//!
//! Configuration is read from `config.toml` in the config directory when it
//! exists. Set `INVADER_NO_RECOGNITION=1` to run without speech input.

use invader::config::WidgetConfig;
use invader::gateway::WebhookGateway;
use invader::host::console::console_widget;
use invader::host::handler::HostBridge;
use invader::host::stdio::run_stdio_bridge;
use invader::session::{KeyValueStore, load_or_create_session_id};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise tracing to stderr only (stdout is reserved for the JSON
    // protocol).
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("invader-host starting");

    let config_path = WidgetConfig::default_config_path();
    let config = if config_path.exists() {
        WidgetConfig::from_file(&config_path)
            .map_err(|e| anyhow::anyhow!("failed to load {}: {e}", config_path.display()))?
    } else {
        tracing::info!(path = %config_path.display(), "no config file, using defaults");
        WidgetConfig::default()
    };

    let mut store = KeyValueStore::open(config.session.resolved_store_path());
    let session_id = load_or_create_session_id(&mut store)
        .map_err(|e| anyhow::anyhow!("failed to initialise chat session: {e}"))?;
    tracing::info!(session_id = %session_id, "chat session ready");

    let gateway = WebhookGateway::new(&config.backend, session_id)
        .map_err(|e| anyhow::anyhow!("invalid backend configuration: {e}"))?;

    let with_recognition = std::env::var_os("INVADER_NO_RECOGNITION").is_none();
    let (coordinator, heard) = console_widget(&config, Arc::new(gateway), with_recognition);
    let (handle, widget_task) = coordinator.spawn();

    let result = run_stdio_bridge(HostBridge::new(handle, heard)).await;
    let _ = widget_task.await;

    result.map_err(|e| {
        tracing::error!(error = %e, "invader-host exited with error");
        anyhow::anyhow!("invader-host failed: {e}")
    })?;

    tracing::info!("invader-host shut down cleanly");
    Ok(())
}
