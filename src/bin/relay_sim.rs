//! # Relay Simulator
//!
//! Runs the relay against a simulated companion on an in-process network.
//! Each stdin line `<sender> <body>` is delivered as an inbound text message;
//! replies are printed to stdout.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use telemetry_relay::clock::{Clock, SystemClock};
use telemetry_relay::config::ConfigManager;
use telemetry_relay::gating::StaticDirectory;
use telemetry_relay::logging::init_structured_logging;
use telemetry_relay::messaging::LoopbackNetwork;
use telemetry_relay::models::{InboundCommand, LocationFix};
use telemetry_relay::orchestration::{
    Collaborators, PositioningProvider, TelemetryRelay, TriggerOrchestrator,
};
use telemetry_relay::simulation::{
    connect_companion, ConsoleCarrier, FixedPositioning, ScriptedSensorPlatform,
};
use telemetry_relay::storage::store_from_config;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "relay-sim")]
#[command(about = "Drive the telemetry relay from stdin against a simulated companion")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration directory (default: $TELEMETRY_RELAY_CONFIG_DIR or ./config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Environment name; overrides TELEMETRY_RELAY_ENV / APP_ENV
    #[arg(short, long)]
    environment: Option<String>,

    /// Additional trusted sender (repeatable)
    #[arg(short, long = "trust")]
    trusted: Vec<String>,

    /// Heart rate the simulated sensor reports
    #[arg(long, default_value_t = 72.0)]
    heart_rate: f32,

    /// Oxygen saturation the simulated sensor reports; no oxygen sensor when omitted
    #[arg(long)]
    spo2: Option<f32>,

    /// Companion lacks body-sensor permission
    #[arg(long)]
    no_body_sensors: bool,

    /// Companion node is off the network
    #[arg(long)]
    companion_offline: bool,

    #[arg(long, requires = "longitude", allow_hyphen_values = true)]
    latitude: Option<f64>,

    #[arg(long, requires = "latitude", allow_hyphen_values = true)]
    longitude: Option<f64>,

    /// Print the effective configuration (sender ids masked) and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let environment = cli
        .environment
        .clone()
        .unwrap_or_else(ConfigManager::detect_environment);
    let manager = ConfigManager::load_from_directory_with_env(cli.config_dir.clone(), &environment)
        .context("Failed to load relay configuration")?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&manager.debug_config())?);
        return Ok(());
    }

    let mut config = manager.config().clone();
    config.gating.trusted_senders.extend(cli.trusted.iter().cloned());
    init_structured_logging(&config.logging);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let network = LoopbackNetwork::new();

    let mut platform = ScriptedSensorPlatform::new()
        .with_heart_rate_sensor([(Duration::from_millis(400), cli.heart_rate)]);
    if let Some(spo2) = cli.spo2 {
        platform = platform.with_oxygen_sensor("Vendor SpO2", [(Duration::from_millis(900), spo2)]);
    }
    if cli.no_body_sensors {
        platform = platform.without_permission();
    }

    let link = connect_companion(&network, &config.companion, Arc::new(platform), clock.clone());
    if cli.companion_offline {
        network.disconnect(&config.companion.node_id);
    }

    let positioning: Option<Arc<dyn PositioningProvider>> = match (cli.latitude, cli.longitude) {
        (Some(latitude), Some(longitude)) => Some(Arc::new(FixedPositioning::new(
            LocationFix::new(latitude, longitude),
        ))),
        _ => None,
    };

    let directory = StaticDirectory::new(&config.gating.trusted_senders);
    if directory.is_empty() {
        warn!("No trusted senders configured; every command will be rejected");
    }

    let orchestrator = TriggerOrchestrator::new(
        Collaborators {
            rate_limit_store: store_from_config(&config.storage),
            directory: Arc::new(directory),
            companion: link.query_client,
            positioning,
            carrier: Arc::new(ConsoleCarrier),
        },
        &config,
    );
    let relay = Arc::new(TelemetryRelay::new(Arc::new(orchestrator)));

    let (tx, rx) = mpsc::channel(32);
    let runner = {
        let relay = Arc::clone(&relay);
        tokio::spawn(async move { relay.run(rx).await })
    };

    let shutdown = relay.shutdown_token();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received");
                shutdown.cancel();
            }
        });
    }

    info!(environment = %manager.environment(), "Reading `<sender> <body>` lines from stdin");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line.context("Failed to read stdin")?,
        };
        let Some(line) = line else { break };

        let Some((sender, body)) = parse_line(&line) else {
            if !line.trim().is_empty() {
                warn!(line = %line, "Expected `<sender> <body>`");
            }
            continue;
        };

        if tx.send(InboundCommand::new(sender, body, clock.now())).await.is_err() {
            break;
        }
    }

    drop(tx);
    runner.await.context("Relay intake task failed")?;
    relay.shutdown().await;
    Ok(())
}

fn parse_line(line: &str) -> Option<(&str, &str)> {
    let (sender, body) = line.trim().split_once(char::is_whitespace)?;
    Some((sender, body))
}
