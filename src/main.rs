//! audio-bridge - Main entry point
//!
//! Standalone playback worker: connects to the shared state store, opens the
//! audio output device, and runs the real-time playback loop until
//! interrupted. Its only coupling to the rest of the pipeline is the store.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use audio_bridge::audio::CpalOutput;
use audio_bridge::config::Config;
use audio_bridge::playback::PlayerWorker;
use audio_bridge::store::StoreConnection;
use audio_bridge::worker::Harness;

/// Command-line arguments for audio-bridge
#[derive(Parser, Debug)]
#[command(name = "audio-bridge")]
#[command(about = "Real-time synthesized-audio playback worker")]
#[command(version)]
struct Args {
    /// Worker nickname used in startup logging
    #[arg(short, long, default_value = "audio_bridge", env = "AUDIO_BRIDGE_NICKNAME")]
    nickname: String,

    /// State store host
    #[arg(short = 'i', long, default_value = "localhost", env = "AUDIO_BRIDGE_HOST")]
    host: String,

    /// State store port
    #[arg(short, long, default_value = "6379", env = "AUDIO_BRIDGE_PORT")]
    port: u16,

    /// State store unix socket path (takes precedence over host/port)
    #[arg(short, long, env = "AUDIO_BRIDGE_SOCKET")]
    socket: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", env = "AUDIO_BRIDGE_LOG_LEVEL")]
    log_level: String,

    /// Optional TOML configuration file overriding built-in defaults
    #[arg(short, long, env = "AUDIO_BRIDGE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!("audio_bridge={}", args.log_level))
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting audio bridge worker '{}'", args.nickname);

    let config = match &args.config {
        Some(path) => Config::load(path).context("Failed to load configuration file")?,
        None => Config::default(),
    };
    config.validate().context("Invalid configuration")?;
    info!(
        "Streaming '{}' at {} Hz, {} ch (divisor {})",
        config.input_stream, config.sample_rate, config.channels, config.norm_divisor
    );

    // Store unreachable at startup is fatal; the core loop never starts
    let store = StoreConnection::connect(&args.host, args.port, args.socket.as_deref())
        .await
        .context("Failed to connect to the state store")?;

    // Device table, for diagnosing which output the host will pick
    match CpalOutput::list_devices() {
        Ok(devices) => {
            for (index, device) in devices.iter().enumerate() {
                info!(
                    "Audio device {}: {} (max input channels: {})",
                    index, device.name, device.input_channels
                );
            }
        }
        Err(e) => info!("Audio device enumeration unavailable: {}", e),
    }

    let mut sink = CpalOutput::new(&config).context("Failed to open audio output device")?;
    sink.start().context("Failed to start audio output stream")?;

    let mut player = PlayerWorker::new(
        &config,
        store.state_source(&config.state_key),
        store.frame_log(&config.input_stream),
        sink,
    );

    // Interrupt sets the token; the harness drains out of its loop, shuts
    // the sink down, and the store connection drops before exit
    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        canceller.cancel();
    });

    let harness = Harness::new(config.cycle_interval());
    harness
        .run(&mut player, cancel)
        .await
        .context("Worker loop error")?;

    drop(store);
    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
