//! cyclehud daemon
//!
//! Runs one of the long-lived processes of the bike computer:
//!
//! - `relay`   bridges the CAN bus and the telemetry FIFOs
//! - `overlay` renders the HUD from telemetry lines for the camera preview
//! - `demo`    feeds simulated ride telemetry to the video FIFO

mod commands;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use cyclehud_core::config::AppConfig;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cyclehud", version, about = "CAN telemetry relay and camera HUD overlay")]
struct Cli {
    /// Configuration file [default: ~/ffs/config/cyclehud.json]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter such as `info` or `cyclehud_core=debug`; RUST_LOG wins when set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Relay telemetry between the CAN bus and the FIFOs
    Relay {
        /// CAN interface, overriding the configuration
        #[arg(short, long)]
        interface: Option<String>,
    },
    /// Render the HUD overlay from the video FIFO
    Overlay,
    /// Write simulated ride telemetry to the video FIFO
    Demo {
        /// Milliseconds between updates
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
    },
    /// Print the effective configuration as JSON
    PrintConfig,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display())),
        None => match AppConfig::default_path() {
            Ok(path) => AppConfig::load_or_default(&path)
                .with_context(|| format!("loading configuration {}", path.display())),
            Err(e) => {
                warn!(error = %e, "Using built-in configuration");
                Ok(AppConfig::default())
            }
        },
    }
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable, waiting for Ctrl-C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = load_config(cli.config.as_deref())?;

    if let Command::Relay {
        interface: Some(interface),
    } = &cli.command
    {
        config.bus.interface = interface.clone();
    }

    if cli.command == Command::PrintConfig {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("cyclehud")
        .build()
        .context("building tokio runtime")?;

    let shutdown = CancellationToken::new();
    let result = runtime.block_on(async {
        let signal_shutdown = shutdown.clone();
        tokio::spawn(async move {
            wait_for_signal().await;
            info!("Shutdown requested");
            signal_shutdown.cancel();
        });

        match cli.command {
            Command::Relay { .. } => commands::relay(config, shutdown).await,
            Command::Overlay => commands::overlay(config, shutdown).await,
            Command::Demo { interval_ms } => {
                commands::demo(config, Duration::from_millis(interval_ms.max(1)), shutdown).await
            }
            Command::PrintConfig => Ok(()),
        }
    });

    // Blocking FIFO opens may still be waiting for a peer
    runtime.shutdown_timeout(Duration::from_secs(1));
    result
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);
    info!(version = cyclehud_core::VERSION, "cyclehud starting");

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_relay_with_interface() {
        let cli = Cli::try_parse_from(["cyclehud", "relay", "--interface", "vcan0"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Relay {
                interface: Some("vcan0".into())
            }
        );
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "cyclehud",
            "demo",
            "--interval-ms",
            "100",
            "--config",
            "/tmp/cyclehud.json",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.command, Command::Demo { interval_ms: 100 });
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/cyclehud.json")));
        assert_eq!(cli.log_level, "debug");
    }

    #[test]
    fn test_missing_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["cyclehud"]).is_err());
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("missing.json"))).is_err());
    }

    #[test]
    fn test_explicit_config_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "bus": {{ "interface": "vcan1" }} }}"#).unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.bus.interface, "vcan1");
    }
}
