/// Volnorm - keeps music playback at a chosen loudness
use clap::{Parser, Subcommand};
use std::{path::PathBuf, sync::Arc};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use volnorm::{config::KindSetting, Host, HostConfig, Supervisor};
use volnorm_control::{Action, ControlEvent};

#[derive(Parser)]
#[command(name = "volnorm")]
#[command(about = "Volume normalization control loop", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize until the session ends or Ctrl-C
    Run {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Level name (Low, Medium, High, Dynamic or a configured one)
        #[arg(short, long)]
        level: Option<String>,
        /// Hosting strategy
        #[arg(short, long, value_enum)]
        kind: Option<KindSetting>,
        /// Stop a long-running session after this many seconds
        #[arg(long)]
        duration_secs: Option<u64>,
        /// Tick interval in milliseconds
        #[arg(long)]
        tick_ms: Option<u64>,
        /// Print every event as a JSON line
        #[arg(long)]
        json: bool,
    },
    /// List the available levels
    Levels {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the effective configuration
    Config {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "volnorm=info,volnorm_control=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            level,
            kind,
            duration_secs,
            tick_ms,
            json,
        } => {
            let mut config = HostConfig::load(config.as_deref())?;
            if let Some(level) = level {
                config.session.level = level;
            }
            if let Some(kind) = kind {
                config.session.kind = kind;
            }
            if duration_secs.is_some() {
                config.session.duration_secs = duration_secs;
            }
            if tick_ms.is_some() {
                config.session.tick_interval_ms = tick_ms;
            }
            run(config, json).await?;
        }
        Commands::Levels { config } => {
            list_levels(&HostConfig::load(config.as_deref())?)?;
        }
        Commands::Config { config } => {
            let config = HostConfig::load(config.as_deref())?;
            config.validate()?;
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

async fn run(config: HostConfig, json: bool) -> anyhow::Result<()> {
    config.validate()?;

    let table = config.level_table()?;
    let devices = Arc::new(config.devices()?);
    let host = Arc::new(Host::new(table, devices));
    let supervisor = Supervisor::new(host);

    let mut events = supervisor.subscribe_events();
    let reporter = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => report(&event, json),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Event reporter lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    supervisor.start(config.plan()).await;

    tokio::select! {
        _ = supervisor.wait() => {}
        _ = tokio::signal::ctrl_c() => {
            supervisor.cancel().await;
        }
    }

    let outcome = supervisor.join().await;
    reporter.abort();

    match outcome {
        Some(Ok(summary)) => {
            tracing::info!(
                "Done: {} session(s), {} tick(s){}",
                summary.sessions,
                summary.ticks,
                if summary.cancelled { ", cancelled" } else { "" }
            );
            Ok(())
        }
        Some(Err(e)) => Err(e.into()),
        None => Ok(()),
    }
}

fn report(event: &ControlEvent, json: bool) {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::warn!("Failed to encode event: {}", e),
        }
        return;
    }

    match event {
        ControlEvent::Tick(status) if status.action != Action::Hold => {
            tracing::info!(
                tick = status.tick,
                reading = status.reading.millibels(),
                volume = status.volume_after.value(),
                "{}",
                status.action
            );
        }
        ControlEvent::Tick(status) => {
            tracing::debug!(
                tick = status.tick,
                reading = status.reading.millibels(),
                band_lower = status.band.lower,
                band_upper = status.band.upper,
                "hold"
            );
        }
        ControlEvent::ExternalVolumeChange { expected, found } => {
            tracing::info!(
                "Volume changed outside the loop ({} -> {}), statistics reset",
                expected.value(),
                found.value()
            );
        }
        ControlEvent::SessionStarted { .. } | ControlEvent::SessionStopped { .. } => {}
    }
}

fn list_levels(config: &HostConfig) -> anyhow::Result<()> {
    let table = config.level_table()?;

    println!("Levels:");
    for entry in table.entries() {
        println!("  {:<10} {}", entry.name, entry.policy);
    }

    Ok(())
}
