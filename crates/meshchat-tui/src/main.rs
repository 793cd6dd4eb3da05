//! MeshChat TUI entry point.

use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::Parser;
use meshchat_core::ConnectionProfile;
use meshchat_harness::SimRadioConfig;
use meshchat_tui::{
    App, Runtime, TerminalDriver, config,
    radio::{self, CHATTER_INTERVAL},
    traffic_log::{TRAFFIC_LOG_FILE, TrafficLog},
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// MeshChat terminal client
#[derive(Parser, Debug)]
#[command(name = "meshchat")]
#[command(about = "Terminal chat client for packet-radio mesh networks")]
#[command(version)]
struct Args {
    /// Name of the local node
    #[arg(short, long, default_value = "meshchat")]
    name: String,

    /// Serial port of the radio
    ///
    /// If not provided, the profile saved with `--remember` is used.
    #[arg(short, long)]
    port: Option<String>,

    /// Serial line rate
    #[arg(short, long, default_value_t = meshchat_core::DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Save the connection profile once the link is up
    #[arg(long)]
    remember: bool,

    /// Verbose logging
    #[arg(long)]
    debug: bool,

    /// Log file (the terminal belongs to the UI)
    #[arg(long, default_value = "meshchat.log")]
    log_file: PathBuf,

    /// Log filter, e.g. `info` or `meshchat_core=trace`. Overrides `RUST_LOG`.
    #[arg(long)]
    log_level: Option<String>,

    /// Append every radio event as JSON to `radio_messages.json`
    #[arg(long)]
    traffic_log: bool,

    /// Seed for the simulated radio
    #[arg(long)]
    seed: Option<u64>,
}

fn init_logging(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let filter = match (&args.log_level, args.debug) {
        (Some(level), _) => EnvFilter::try_new(level)?,
        (None, true) => EnvFilter::new("debug"),
        (None, false) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let file = File::create(&args.log_file)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Arc::new(file)).with_ansi(false))
        .init();
    Ok(())
}

/// Profile from the command line, or the stored one when `--port` is absent.
fn resolve_profile(args: &Args) -> Result<ConnectionProfile, Box<dyn std::error::Error>> {
    if let Some(port) = &args.port {
        return Ok(ConnectionProfile {
            name: args.name.clone(),
            address: config::normalize_port(port),
            baud_rate: args.baud,
        });
    }

    let stored = match config::profile_path().map(|path| config::load(&path)) {
        Some(Ok(stored)) => stored,
        Some(Err(err)) => {
            tracing::warn!(%err, "ignoring stored profile");
            None
        },
        None => None,
    };
    stored
        .map(ConnectionProfile::from)
        .ok_or_else(|| "no --port given and no saved profile found".into())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(&args)?;

    let profile = resolve_profile(&args)?;
    tracing::info!(name = %profile.name, address = %profile.address, "starting");

    let traffic =
        if args.traffic_log { Some(TrafficLog::open(Path::new(TRAFFIC_LOG_FILE))?) } else { None };
    let remember_at = if args.remember { config::profile_path() } else { None };

    let seed = args.seed.unwrap_or_else(rand::random);
    let radio = radio::spawn_radio(
        SimRadioConfig {
            seed,
            chatter_rate: 0.5,
            channels: vec!["#public".into()],
            ..Default::default()
        },
        CHATTER_INTERVAL,
    );

    let driver = TerminalDriver::new(radio, traffic, remember_at)?;
    let mut runtime = Runtime::new(driver, App::new(profile));
    runtime.run().await?;
    Ok(())
}
