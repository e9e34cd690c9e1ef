// MIT License - Copyright (c) 2026 Peter Wright
// Garage door daemon

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

use wifly_door::config::FileConfig;
use wifly_door::{event_channel, ConfigFile, DoorController, DoorEvent, DoorState};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "wifly-door")]
#[command(about = "Monitor and operate a garage door through a WiFly module")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity (e.g. RUST_LOG=debug or RUST_LOG=wifly_door=trace).
    // Default: info.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // systemd journal already adds timestamps, so omit them when running under systemd
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt().without_time().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let cli = Cli::parse();

    // Validate once up front; the connector re-reads the file on every attempt.
    let config_text =
        std::fs::read_to_string(&cli.config).context("Failed to read config file")?;
    let config = FileConfig::parse(&config_text).context("Failed to parse config file")?;
    info!(
        "WiFly module at {}:{}",
        config.device.host, config.device.port
    );

    let (event_tx, mut event_rx) = event_channel(64);
    let controller = DoorController::spawn(event_tx, ConfigFile::new(&cli.config));

    let event_handle = tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(DoorEvent::StateChanged(state)) => log_door_state(state),
                Ok(DoorEvent::ConnectionLost) => warn!("Connection problem"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Missed {n} door events");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigusr1 = signal(SignalKind::user_defined1())?;

    controller.open();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                break;
            }
            _ = sigusr1.recv() => {
                info!("Received SIGUSR1, pressing door button");
                controller.press_button();
            }
            _ = sighup.recv() => {
                info!("Received SIGHUP, reconnecting with reloaded config...");
                controller.close();
                controller.open();
            }
        }
    }

    controller.close();
    drop(controller);
    event_handle.abort();

    info!("Shutdown complete");
    Ok(())
}

fn log_door_state(state: DoorState) {
    match state {
        DoorState::Invalid => warn!("Door state invalid: both sensors triggered"),
        other => info!("Door {}", other),
    }
}
