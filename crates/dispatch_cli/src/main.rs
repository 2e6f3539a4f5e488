use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use dispatch_core::format::{format_arrival_time, format_distance, format_duration, format_fare};
use dispatch_core::polyline::{decode_polyline, encode_polyline};
#[cfg(feature = "ors")]
use dispatch_core::routing::{ors::DEFAULT_ORS_ENDPOINT, RouteProviderKind};
use dispatch_core::{
    Coordinate, Leg, LegOutcome, LegUpdate, MatchingEngine, RideSession, RideSimulation,
    RideStatus, SimulationConfig, VehicleClass,
};
use tokio::time::sleep;
use tracing::info;
use tracing_subscriber::EnvFilter;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "dispatch",
    about = "Ride dispatch simulator",
    long_about = "Request a simulated ride, quote fares for a trip, or inspect\n\
                  encoded route polylines."
)]
struct Cli {
    /// JSON simulation config; missing fields take their defaults
    #[arg(long, global = true, env = "DISPATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Seed for driver generation and search outcomes
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// OpenRouteService endpoint, used when an API key is set
    #[cfg(feature = "ors")]
    #[arg(long, global = true, env = "ORS_ENDPOINT", default_value = DEFAULT_ORS_ENDPOINT)]
    ors_endpoint: String,

    /// OpenRouteService API key; routes are straight lines without one
    #[cfg(feature = "ors")]
    #[arg(long, global = true, env = "ORS_API_KEY", hide_env_values = true)]
    ors_api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Request a ride and follow it from search to drop-off
    Ride {
        /// Pickup as `lat,lng`
        #[arg(long, value_parser = parse_coordinate)]
        pickup: Coordinate,
        /// Drop-off as `lat,lng`
        #[arg(long, value_parser = parse_coordinate)]
        dropoff: Coordinate,
        /// `standard` or `accessible`
        #[arg(long, default_value = "standard")]
        class: VehicleClass,
    },
    /// Price a trip for every vehicle class
    Quote {
        #[arg(long, value_parser = parse_coordinate)]
        pickup: Coordinate,
        #[arg(long, value_parser = parse_coordinate)]
        dropoff: Coordinate,
        /// Print the quotes as JSON
        #[arg(long)]
        json: bool,
    },
    /// Decode an encoded polyline into coordinates
    Decode { polyline: String },
    /// Encode `lat,lng` points into a polyline
    Encode {
        #[arg(required = true, value_parser = parse_coordinate)]
        points: Vec<Coordinate>,
    },
}

fn parse_coordinate(raw: &str) -> Result<Coordinate, String> {
    let (lat, lng) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected `lat,lng`, got `{raw}`"))?;
    let lat: f64 = lat.trim().parse().map_err(|err| format!("bad latitude: {err}"))?;
    let lng: f64 = lng.trim().parse().map_err(|err| format!("bad longitude: {err}"))?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(format!("`{raw}` is outside WGS84 bounds"));
    }
    Ok(Coordinate::new(lat, lng))
}

// ── Setup ──────────────────────────────────────────────────────────

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<SimulationConfig> {
    let mut config = match &cli.config {
        Some(path) => SimulationConfig::from_json_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }
    #[cfg(feature = "ors")]
    if let Some(api_key) = &cli.ors_api_key {
        config = config.with_route_provider(RouteProviderKind::Ors {
            endpoint: cli.ors_endpoint.clone(),
            api_key: api_key.clone(),
        });
    }
    config.validate()?;
    Ok(config)
}

// ── Commands ───────────────────────────────────────────────────────

async fn ride(
    config: Arc<SimulationConfig>,
    pickup: Coordinate,
    dropoff: Coordinate,
    class: VehicleClass,
) -> anyhow::Result<()> {
    let mut session = RideSession::from_config(Arc::clone(&config))?;
    session.request_ride(pickup, dropoff, class);

    let mut last_message = None;
    loop {
        let snapshot = session.snapshot();
        if snapshot.search.message != last_message {
            if let Some(message) = &snapshot.search.message {
                println!("{message}");
            }
            last_message = snapshot.search.message;
        }
        match snapshot.ride.as_ref().map(RideSimulation::status) {
            Some(RideStatus::Approaching) => break,
            Some(RideStatus::Searching) => {}
            _ => return Ok(()),
        }
        tokio::select! {
            _ = sleep(POLL_INTERVAL) => {}
            _ = tokio::signal::ctrl_c() => {
                session.cancel_search();
                println!("Search cancelled");
                return Ok(());
            }
        }
    }

    print_match(&session, &config)?;

    for leg in [Leg::Approach, Leg::Trip] {
        println!(
            "{}",
            match leg {
                Leg::Approach => "Driver on the way",
                Leg::Trip => "Trip started",
            }
        );
        let handle = session.start_leg(leg, print_leg_update)?;
        tokio::select! {
            outcome = handle.finished() => match outcome {
                LegOutcome::Completed => {}
                LegOutcome::Cancelled => bail!("{leg:?} leg stopped unexpectedly"),
                LegOutcome::Skipped => bail!("{leg:?} leg has no route"),
            },
            _ = tokio::signal::ctrl_c() => {
                session.cancel_ride();
                println!("Ride cancelled");
                return Ok(());
            }
        }
    }

    info!(status = ?session.status(), "ride finished");
    println!("You have arrived");
    Ok(())
}

fn print_match(session: &RideSession, config: &SimulationConfig) -> anyhow::Result<()> {
    let snapshot = session.snapshot();
    let ride = snapshot.ride.context("matched ride missing from session")?;
    let driver = ride.driver.as_ref().context("matched ride has no driver")?;
    let arrival = format_arrival_time(driver.eta_secs, config.speed_multiplier);

    println!(
        "{} ({}, rated {:.1}) is coming in a {} [{}], {}",
        driver.name,
        driver.avatar,
        driver.rating,
        driver.vehicle.description(),
        driver.vehicle.plate,
        arrival.away_time,
    );
    if let Some(info) = ride.trip_info {
        println!(
            "Trip: {} in about {}",
            format_distance(info.distance_meters),
            format_duration(info.duration_seconds)
        );
    }
    if let Some(fare) = session.fare() {
        println!("Fare: {}", format_fare(fare));
    }
    Ok(())
}

fn print_leg_update(update: LegUpdate) {
    println!(
        "  {:>3.0}%  {:.5}, {:.5}  {} min left",
        update.progress * 100.0,
        update.position.lat,
        update.position.lng,
        update.remaining_minutes
    );
}

async fn quote(
    config: Arc<SimulationConfig>,
    pickup: Coordinate,
    dropoff: Coordinate,
    json: bool,
) -> anyhow::Result<()> {
    let engine = MatchingEngine::from_config(Arc::clone(&config))?;
    let route = engine.gateway().fetch_route_with_info(pickup, dropoff).await;
    let quotes = config.pricing.all_vehicle_pricing(route.info.as_ref());

    if json {
        println!("{}", serde_json::to_string_pretty(&quotes)?);
        return Ok(());
    }

    if let Some(info) = route.info {
        println!(
            "{} / {}",
            format_distance(info.distance_meters),
            format_duration(info.duration_seconds)
        );
    }
    for quote in quotes {
        println!(
            "{:<16} {:>8}  {:<12} pickup {}  drop-off {}",
            quote.config.name,
            quote.pricing.price,
            quote.pricing.away_time,
            quote.pricing.arrival_time,
            quote.pricing.eta
        );
    }
    Ok(())
}

// ── Main ───────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match &cli.command {
        Commands::Decode { polyline } => {
            let route = decode_polyline(polyline)?;
            println!("{}", serde_json::to_string_pretty(&route)?);
        }
        Commands::Encode { points } => println!("{}", encode_polyline(points)),
        Commands::Ride {
            pickup,
            dropoff,
            class,
        } => {
            let config = Arc::new(load_config(&cli)?);
            ride(config, *pickup, *dropoff, *class).await?;
        }
        Commands::Quote {
            pickup,
            dropoff,
            json,
        } => {
            let config = Arc::new(load_config(&cli)?);
            quote(config, *pickup, *dropoff, *json).await?;
        }
    }
    Ok(())
}
