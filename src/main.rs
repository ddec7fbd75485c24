//! MIDI CC Bridge - serves a device web UI and keeps the device in sync
//!
//! Startup order: load cached state, open the MIDI output, start the resync
//! worker, then serve HTTP. A readiness signal raised by the output before
//! the worker runs waits in the mailbox.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use midi_cc_bridge::api::{self, ApiState};
use midi_cc_bridge::config::{
    BridgeConfig, DEFAULT_DEVICE_DIR, DEFAULT_HTTP_PORT, DEFAULT_PROBE_INTERVAL_MS,
};
use midi_cc_bridge::resync::{readiness_channel, ResyncWorker};
use midi_cc_bridge::state::{load_initial_state, CcCache};
use midi_cc_bridge::transport::{list_output_ports, CcTransport, MidiOutTransport};

/// Web UI bridge that caches MIDI CC state and replays it on device (re)connect
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// MIDI output port to drive (case-insensitive substring of the port name)
    #[arg(short, long, env = "MIDI_NODE", required_unless_present = "list_ports")]
    node: Option<String>,

    /// HTTP server port
    #[arg(short, long, env = "HTTP_PORT", default_value_t = DEFAULT_HTTP_PORT)]
    port: u16,

    /// Device directory (init.json, web/index.html, ...)
    #[arg(short, long, env = "DEVICE_DIR", default_value = DEFAULT_DEVICE_DIR)]
    device: String,

    /// Interval between checks that the output port still exists (ms)
    #[arg(long, default_value_t = DEFAULT_PROBE_INTERVAL_MS)]
    probe_interval_ms: u64,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI output ports and exit
    #[arg(long)]
    list_ports: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    if let Err(e) = init_logging(&args.log_level) {
        eprintln!("Failed to initialize logging: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    if args.list_ports {
        print_ports()?;
        return Ok(());
    }

    let config = BridgeConfig::new(
        args.node.as_deref().unwrap_or_default(),
        args.port,
        &args.device,
        args.probe_interval_ms,
    )?;

    info!("Starting MIDI CC Bridge...");
    info!("Device directory: {}", config.device_dir().display());

    // Seed the cache before anything can read or replay it
    let cache = Arc::new(CcCache::new());
    if let Err(e) = load_initial_state(&cache, config.init_file()).await {
        error!(
            kind = e.as_label(),
            "Initial state unusable, refusing to start"
        );
        return Err(e.into());
    }

    let (readiness, mailbox) = readiness_channel();

    let transport = Arc::new(MidiOutTransport::start(
        config.node.clone(),
        config.probe_interval,
        readiness,
    )?);
    let sink: Arc<dyn CcTransport> = transport.clone();

    let resync = ResyncWorker::spawn(cache.clone(), sink.clone(), mailbox);

    let state = Arc::new(ApiState::new(cache, sink));
    let app = api::build_app(state, config.web_dir());

    info!(
        "Serving web UI from {} (MIDI output matching '{}')",
        config.web_dir().display(),
        config.node
    );
    let served = api::start_server(app, config.bind_addr(), shutdown_signal()).await;

    info!("Shutting down...");
    resync.shutdown().await;
    tokio::task::spawn_blocking(move || transport.shutdown()).await?;
    info!("MIDI CC Bridge shutdown complete");

    served
}

fn print_ports() -> Result<()> {
    let ports = list_output_ports()?;
    if ports.is_empty() {
        println!("No MIDI output ports found");
    }
    for (i, name) in ports.iter().enumerate() {
        println!("  {}: {}", i, name);
    }
    Ok(())
}

/// `RUST_LOG` wins over `--log-level` when set
fn init_logging(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).with_context(|| format!("Invalid log level '{level}'"))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!(e))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
