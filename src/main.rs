use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use log::info;
use luna::config::LunaConfig;
use luna::location::{
    AuthorizationModel, BuiltinGeocoder, LocationResult, LocationTracker, NominatimGeocoder,
    ReplayProvider, ReverseGeocoder,
};
use serde_json::json;

/// Luna — replay recorded fixes through the location tracker.
///
/// Reads `lat,lon[,accuracy]` lines and prints one JSON object per
/// location change. Fixes within 100 m of the last resolved place are ignored.
///
/// Examples:
///   luna --fixes walk.csv
///   luna --offline < walk.csv
///   luna --fixes walk.csv --language sv --platform macos
#[derive(Parser)]
#[command(name = "luna", version, about, long_about = None)]
struct Cli {
    /// File with recorded fixes. Reads stdin when omitted.
    #[arg(long, short = 'f')]
    fixes: Option<PathBuf>,

    /// Offline mode: resolve with the built-in neighborhood dataset.
    #[arg(long)]
    offline: bool,

    /// Config file (default: ~/.luna/config.json).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Nominatim base URL.
    #[arg(long)]
    nominatim_url: Option<String>,

    /// User-Agent sent to Nominatim.
    #[arg(long)]
    user_agent: Option<String>,

    /// Preferred language for place names (e.g. en, sv).
    #[arg(long)]
    language: Option<String>,

    /// Platform authorization model: "ios" (runtime permission) or "macos" (none).
    #[arg(long, value_parser = parse_platform)]
    platform: Option<AuthorizationModel>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    log_level: Option<String>,
}

fn parse_platform(s: &str) -> Result<AuthorizationModel, String> {
    match s.to_lowercase().as_str() {
        "ios" | "runtime" => Ok(AuthorizationModel::RuntimePermission),
        "macos" | "osx" | "unrestricted" => Ok(AuthorizationModel::Unrestricted),
        _ => Err(format!("Unknown platform '{}'. Use 'ios' or 'macos'.", s)),
    }
}

fn main() {
    let cli = Cli::parse();

    // ── Configuration ───────────────────────────────────────────

    let loaded = match &cli.config {
        Some(path) => LunaConfig::load_from(path),
        None => LunaConfig::load(),
    };
    let config = apply_overrides(
        loaded.unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }),
        &cli,
    );

    let level = config.level_filter().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
    if let Err(e) = luna::logger::initialize(level) {
        eprintln!("Warning: logger unavailable: {}", e);
    }

    // ── Collaborators ───────────────────────────────────────────

    let provider = match &cli.fixes {
        Some(path) => File::open(path)
            .map_err(luna::location::providers::ReplayError::from)
            .and_then(|f| ReplayProvider::from_reader(BufReader::new(f))),
        None => ReplayProvider::from_reader(io::stdin().lock()),
    };
    let provider = Rc::new(provider.unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }));

    let geocoder: Rc<dyn ReverseGeocoder> = if config.offline {
        info!("Offline mode: using built-in neighborhoods");
        Rc::new(BuiltinGeocoder::new())
    } else {
        Rc::new(
            NominatimGeocoder::new()
                .with_base_url(config.nominatim_url.clone())
                .with_user_agent(config.user_agent.clone())
                .with_language(config.language.clone())
                .with_timeout(config.timeout()),
        )
    };

    // ── Track ───────────────────────────────────────────────────

    let tracker = LocationTracker::new(provider.clone(), geocoder, config.authorization);
    tracker.add_location_change_observer(|result| println!("{}", render(result)));

    let total = provider.remaining();
    let delivered = provider.drain();
    info!("Replayed {} of {} fixes", delivered, total);
}

fn apply_overrides(mut config: LunaConfig, cli: &Cli) -> LunaConfig {
    if cli.offline {
        config.offline = true;
    }
    if let Some(ref url) = cli.nominatim_url {
        config.nominatim_url = url.clone();
    }
    if let Some(ref agent) = cli.user_agent {
        config.user_agent = agent.clone();
    }
    if cli.language.is_some() {
        config.language = cli.language.clone();
    }
    if let Some(model) = cli.platform {
        config.authorization = model;
    }
    if let Some(ref level) = cli.log_level {
        config.log_level = level.clone();
    }
    config
}

fn render(result: &LocationResult) -> serde_json::Value {
    match result {
        LocationResult::Success(loc) => json!({
            "status": "success",
            "city": loc.city,
            "state": loc.state,
            "neighborhood": loc.neighborhood,
            "lat": loc.physical.coordinate.lat,
            "lon": loc.physical.coordinate.lon,
            "accuracy": loc.physical.horizontal_accuracy,
            "timestamp": loc.physical.timestamp.to_rfc3339(),
        }),
        LocationResult::Failure(reason) => json!({
            "status": "failure",
            "reason": reason.to_string(),
        }),
    }
}
