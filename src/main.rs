//! aura-voice daemon
//!
//! Runs the voice controller against the console engines and serves the UI
//! layer over a Unix socket:
//! - stdin lines are recognized speech, stdout carries spoken replies
//! - commands are answered by the HTTP generator when one is configured
//! - settings persist to a JSON file in the data directory

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use aura_voice::capability::ConsoleCapabilities;
use aura_voice::config::Config;
use aura_voice::dispatch::{HttpGenerator, ResponseGenerator, UnconfiguredGenerator};
use aura_voice::ipc::Server;
use aura_voice::lifecycle::ShutdownSignal;
use aura_voice::settings::{JsonFileStore, SettingsStore};
use aura_voice::VoiceController;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "aura-voice starting");

    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, ?config.settings_path, "configuration loaded");

    let mut shutdown = ShutdownSignal::new()?;

    let settings = SettingsStore::load(JsonFileStore::open(&config.settings_path));

    let generator: Arc<dyn ResponseGenerator> = match &config.generator_url {
        Some(url) => {
            info!(%url, "using HTTP response generator");
            Arc::new(HttpGenerator::new(url.clone()))
        }
        None => {
            warn!("AURA_GENERATOR_URL not set, commands will get the fallback reply");
            Arc::new(UnconfiguredGenerator)
        }
    };

    let capabilities = ConsoleCapabilities::new(
        config.recognition.is_enabled(),
        config.synthesis.is_enabled(),
    );

    let (controller, handle) =
        VoiceController::new(&capabilities, generator, settings, config.generator_timeout);
    let controller_task = tokio::spawn(controller.run());

    if config.listen_on_start {
        match handle.toggle_listening().await {
            Ok(true) => info!("listening"),
            Ok(false) => warn!("listening could not be started"),
            Err(e) => error!(?e, "controller unavailable"),
        }
    }

    let server = Server::new(&config.socket_path, handle.clone())?;

    info!("daemon initialized, entering main loop");

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }
        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    info!("shutting down...");

    if let Err(e) = handle.shutdown().await {
        warn!(?e, "controller already stopped");
    }
    if let Err(e) = controller_task.await {
        error!(?e, "controller task failed");
    }
    server.shutdown().await;

    info!("aura-voice stopped");

    Ok(())
}
