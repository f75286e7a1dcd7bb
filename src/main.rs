//! # GCS Telemetry
//!
//! Ground station core for the UMB (umbilical) and TLM (radio) telemetry links.
//!
//! Reads CSV telemetry from both serial links, keeps bounded history for each,
//! mirrors the selected link into a display view and records CSV logs on demand.
//! Operator commands are read from stdin, one per line.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use gcs_telemetry::config::Config;
use gcs_telemetry::console::{ConsoleCommand, HELP};
use gcs_telemetry::coordinator::frame::RefreshCursor;
use gcs_telemetry::coordinator::{Coordinator, LoggingState};
use gcs_telemetry::debug::{DebugLog, DebugSink};
use gcs_telemetry::display::status::{format_rate, render_channels, render_status};
use gcs_telemetry::telemetry::record::{ReceivedPacket, SourceId};

/// Configuration file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Refresh ticks between rate summaries in the application log
const RATE_LOG_INTERVAL_TICKS: u64 = 50;

/// Main entry point
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load and validate configuration (first argument, or the default path)
///    - Start the rate monitor and connect every enabled link
///
/// 2. **Main Loop**
///    - Poll the display on every refresh tick; draw only when new data arrived
///    - Execute operator commands from stdin
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Graceful Shutdown**
///    - Close both links and flush any logging session
///
/// # Errors
///
/// Returns error if the configuration file exists but is invalid
#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries status output, so application logs go to stderr
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stderr());
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("GCS Telemetry v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = load_config(&config_path)?;

    let debug_log = Arc::new(DebugLog::new(config.display.debug_lines));
    let coordinator = Coordinator::new(&config, debug_log.clone());
    coordinator.spawn_rate_monitor();

    for (source, link) in config.links().iter() {
        if !link.enabled {
            debug!("[{}] link disabled in configuration", source);
            continue;
        }
        if let Err(e) = coordinator.connect(source, &link.port, link.baud_rate) {
            warn!("{}", e);
        }
    }

    let mut refresh = interval(config.display.refresh_period());
    let mut cursor = RefreshCursor::new();
    let mut ticks: u64 = 0;
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    info!("Type 'help' for commands, Ctrl+C to exit");

    loop {
        tokio::select! {
            _ = refresh.tick() => {
                ticks += 1;
                if let Some(frame) = cursor.poll(&coordinator) {
                    if let Some(latest) = frame.latest {
                        debug!(
                            "[{}] display updated: {} records, boot_time={}",
                            frame.active_source,
                            frame.records.len(),
                            latest.boot_time
                        );
                    }
                }
                if ticks % RATE_LOG_INTERVAL_TICKS == 0 {
                    info!(
                        "UMB {} / TLM {}",
                        format_rate(coordinator.rate_hz(SourceId::Umb)),
                        format_rate(coordinator.rate_hz(SourceId::Tlm))
                    );
                }
            }

            line = stdin.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) if line.trim().is_empty() => {}
                    Ok(Some(line)) => {
                        if !execute(&coordinator, &config, &debug_log, &line).await {
                            break;
                        }
                    }
                    Ok(None) => {
                        debug!("stdin closed, console disabled");
                        stdin_open = false;
                    }
                    Err(e) => {
                        warn!("Failed to read console input: {}", e);
                        stdin_open = false;
                    }
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    coordinator.shutdown();
    Ok(())
}

/// Load the configuration, falling back to defaults when the file is absent
fn load_config(path: &str) -> Result<Config> {
    if !Path::new(path).exists() {
        warn!("Config file {} not found, using defaults", path);
        return Ok(Config::default());
    }

    let config = Config::load(path).with_context(|| format!("loading {}", path))?;
    info!("Loaded configuration from {}", path);
    Ok(config)
}

/// Execute one console line
///
/// # Returns
///
/// * `bool` - `false` when the operator asked to quit
async fn execute(
    coordinator: &Arc<Coordinator>,
    config: &Config,
    debug_log: &DebugLog,
    line: &str,
) -> bool {
    let command = match line.parse::<ConsoleCommand>() {
        Ok(command) => command,
        Err(e) => {
            println!("{}", e);
            return true;
        }
    };

    match command {
        ConsoleCommand::Connect(source) => {
            let link = config.links()[source];
            if let Err(e) = coordinator.connect(source, &link.port, link.baud_rate) {
                error!("{}", e);
            }
        }
        ConsoleCommand::Disconnect(source) => {
            if let Err(e) = coordinator.disconnect(source) {
                println!("{}", e);
            }
        }
        ConsoleCommand::Source(source) => {
            coordinator.set_active_source(source);
        }
        ConsoleCommand::ToggleLog => match coordinator.toggle_logging() {
            Ok(LoggingState::Active) => println!("logging started"),
            Ok(LoggingState::Idle) => println!("logging stopped"),
            Err(e) => println!("{}", e),
        },
        ConsoleCommand::Valve { command, link } => {
            if let Err(e) = coordinator.send_command(link, command).await {
                println!("{}", e);
            }
        }
        ConsoleCommand::Status => {
            let source = coordinator.active_source();
            match coordinator.latest_record(source) {
                Some(record) => {
                    println!("{}", render_channels(&record, &config.calibration));
                    println!("{}", render_status(&ReceivedPacket::now(record, source)));
                }
                None => println!("[{}] no telemetry yet", source),
            }
            for line in debug_log.lines().iter().rev().take(5).rev() {
                println!("{}", line);
            }
        }
        ConsoleCommand::Help => println!("{}", HELP),
        ConsoleCommand::Quit => {
            debug_log.emit("[CORE] Quit requested");
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        assert!(DEFAULT_CONFIG_PATH.ends_with(".toml"));
    }

    #[test]
    fn test_rate_log_interval() {
        // At the default 10 Hz refresh, 50 ticks = 5 seconds
        let config = Config::default();
        let seconds = RATE_LOG_INTERVAL_TICKS as f64 / config.display.refresh_hz as f64;
        assert_eq!(seconds, 5.0);
    }

    #[test]
    fn test_missing_config_falls_back_to_defaults() {
        let config = load_config("/nonexistent/gcs.toml").unwrap();
        assert_eq!(config.display.default_source, SourceId::Umb);
    }
}
