//! vehcache - poll vehicle telemetry through TTL caches
//!
//! Runs a simulated rate-limited vehicle API behind per-call caches, polls it
//! on an interval and prints each reading. A global cache reset can be
//! published every few polls to show forced refreshes.

use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use vehcache::cli::{Cli, StartupConfig};
use vehcache::clock::SystemClock;
use vehcache::logging;
use vehcache::poller::{PollConfig, PollHandle, PollMessage};
use vehcache::reset::ResetRegistry;
use vehcache::vehicle::{ApiError, SimulatedApi, Vehicle, VehicleSnapshot};

/// Renders one reading as a single line
fn format_snapshot(poll: u32, snapshot: &VehicleSnapshot) -> String {
    format!(
        "poll {}: soc {:.0}% status {} range {} km remaining {} min finish {} climater {}",
        poll,
        snapshot.soc,
        snapshot.status,
        snapshot.range,
        snapshot.remaining_minutes,
        snapshot.finish_time.format("%H:%M:%S"),
        if snapshot.climater_active { "on" } else { "off" },
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init()?;

    let startup = match StartupConfig::from_cli(&cli) {
        Ok(startup) => startup,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    let config = startup.config;

    let resets = Arc::new(ResetRegistry::new());
    let api = Arc::new(SimulatedApi::new(config.vehicle.clone()));
    let vehicle = Arc::new(Vehicle::new(
        api.clone(),
        config.cache_ttl(),
        &resets,
        Arc::new(SystemClock),
    ));

    // Endpoint caches are kept erased, like any getter wired by name.
    let endpoint = startup
        .endpoint
        .as_deref()
        .map(|path| (path.to_string(), vehicle.endpoint(path, &resets).erase()));
    let read_endpoint = match &endpoint {
        Some((path, erased)) => match erased.any_getter::<ApiError>() {
            Ok(getter) => Some((path.clone(), getter)),
            Err(e) => {
                error!(error = %e, path = %path, "endpoint cache misconfigured");
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
        None => None,
    };

    info!(
        cache_secs = config.cache_secs,
        polls = config.polls,
        reset_every = config.reset_every,
        "polling vehicle"
    );

    let mut handle = PollHandle::spawn(
        Arc::clone(&vehicle),
        Arc::clone(&resets),
        PollConfig::from(&config),
    );

    while let Some(message) = handle.recv().await {
        match message {
            PollMessage::Snapshot { poll, snapshot } => {
                if startup.json {
                    let line = serde_json::json!({ "poll": poll, "snapshot": snapshot });
                    println!("{}", line);
                } else {
                    println!("{}", format_snapshot(poll, &snapshot));
                }
            }
            PollMessage::Error { poll, error } => {
                eprintln!("poll {}: {}", poll, error);
            }
            PollMessage::ResetPublished { poll, subscribers } => {
                if !startup.json {
                    println!("poll {}: reset {} caches", poll, subscribers);
                }
            }
            PollMessage::Completed => break,
        }
    }

    if let Some((path, read)) = read_endpoint {
        match read() {
            Ok(value) => match value.downcast_ref::<serde_json::Value>() {
                Some(doc) if startup.json => {
                    println!("{}", serde_json::json!({ "endpoint": path, "value": doc }));
                }
                Some(doc) => println!("endpoint {}: {}", path, doc),
                None => eprintln!("endpoint {}: value is not a JSON document", path),
            },
            Err(e) => eprintln!("endpoint {}: {}", path, e),
        }
    }

    let charger = vehicle.charger_cache().metrics();
    info!(
        hits = charger.hits,
        misses = charger.misses,
        resets = charger.resets,
        upstream_calls = api.charger_calls(),
        "charger cache summary"
    );
    let climater = vehicle.climater_cache().metrics();
    info!(
        hits = climater.hits,
        misses = climater.misses,
        resets = climater.resets,
        upstream_calls = api.climater_calls(),
        "climater cache summary"
    );

    Ok(())
}
