//! ac-logger - Assetto Corsa Remote Telemetry recorder
//!
//! Connects to the simulator's Remote Telemetry UDP endpoint and writes one
//! folder per session under the log directory. Runs until Ctrl-C.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

use anyhow::{Context, Result};
use clap::Parser;
use racing_wheel_ac_capture::{CaptureConfig, CaptureLoop, StopSignal, reprocess_session};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_TARGETS: [&str; 4] = [
    "ac_logger",
    "racing_wheel_ac_capture",
    "racing_wheel_ac_session_store",
    "racing_wheel_ac_remote_protocol",
];

#[derive(Parser, Debug)]
#[command(name = "ac-logger")]
#[command(about = "Record Assetto Corsa Remote Telemetry sessions to disk")]
#[command(version)]
#[command(long_about = "
ac-logger subscribes to the simulator's Remote Telemetry UDP stream and writes
every session to its own folder: raw.csv keeps each datagram as base64,
parsed.csv holds one decoded row per telemetry update and info.json records
the car, driver and track from the handshake.

The connection is retried until the simulator answers and restarted with a
new session whenever the stream goes quiet. Press Ctrl-C to stop.
")]
struct Cli {
    /// Simulator IP address [default: 127.0.0.1]
    #[arg(env = "AC_LOGGER_ADDRESS")]
    address: Option<IpAddr>,

    /// Simulator Remote Telemetry port [default: 9996]
    #[arg(env = "AC_LOGGER_PORT")]
    port: Option<u16>,

    /// Directory that receives one folder per session [default: ./log]
    #[arg(long, env = "AC_LOGGER_LOG_DIR", value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// YAML capture configuration; command-line values take precedence
    #[arg(long, env = "AC_LOGGER_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Rebuild parsed.reprocessed.csv from a session's raw.csv and exit
    #[arg(long, value_name = "SESSION_DIR")]
    reprocess: Option<PathBuf>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Some(dir) = &cli.reprocess {
        return run_reprocess(dir);
    }

    let config = load_config(&cli)?;
    run_capture(config)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let directives = LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",");

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Defaults, then the YAML file, then command-line and environment values.
fn load_config(cli: &Cli) -> Result<CaptureConfig> {
    let mut config = match &cli.config {
        Some(path) => CaptureConfig::from_yaml_file(path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?,
        None => CaptureConfig::default(),
    };

    if let Some(address) = cli.address {
        config.address = address;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(dir) = &cli.log_dir {
        config.log_root.clone_from(dir);
    }

    config.validate()?;
    Ok(config)
}

fn run_capture(config: CaptureConfig) -> Result<()> {
    let stop = StopSignal::new();
    {
        let handler_stop = stop.clone();
        ctrlc::set_handler(move || handler_stop.trigger())
            .context("failed to install Ctrl-C handler")?;
    }

    info!(
        server = %config.server_addr(),
        log_root = %config.log_root.display(),
        "Starting capture (Ctrl-C to stop)"
    );

    let stats = CaptureLoop::new(config, stop)
        .run()
        .context("capture aborted")?;

    info!(
        sessions = stats.sessions,
        restarts = stats.restarts,
        datagrams = stats.datagrams,
        frames = stats.frames,
        decode_failures = stats.decode_failures,
        "Capture finished"
    );
    Ok(())
}

fn run_reprocess(dir: &Path) -> Result<()> {
    let summary = reprocess_session(dir)
        .with_context(|| format!("failed to reprocess session '{}'", dir.display()))?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
