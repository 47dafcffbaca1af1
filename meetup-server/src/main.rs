use std::env;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Utc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use meetup_server::cache::{CachedOracle, OracleCacheConfig};
use meetup_server::catalogue::{Catalogue, load_static_distances};
use meetup_server::matrix::{DistanceMatrix, GeoMetric};
use meetup_server::oracle::{HttpOracle, HttpOracleConfig, OfflineOracle};
use meetup_server::planner::{
    DEFAULT_GEO_PENALTY, MeetingPlanner, PlannerConfig, UnresolvedPolicy,
};
use meetup_server::web::{AppState, create_router};

/// Address to serve on when `MEETUP_BIND` is unset.
const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// How often refined samples for past times are swept from the matrix.
const EVICTION_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("meetup_server=info")),
        )
        .init();

    let catalogue_path = env::var("MEETUP_CATALOGUE")
        .map_err(|_| "MEETUP_CATALOGUE must point to a stop catalogue JSON file")?;
    let metric = match env::var("MEETUP_GEO_METRIC") {
        Ok(name) => GeoMetric::parse(&name).ok_or_else(|| format!("unknown geo metric: {name}"))?,
        Err(_) => GeoMetric::default(),
    };
    let bind: SocketAddr = env::var("MEETUP_BIND")
        .unwrap_or_else(|_| DEFAULT_BIND.to_string())
        .parse()?;

    let mut config = PlannerConfig::default();
    if let Ok(workers) = env::var("MEETUP_WORKERS") {
        config = config.with_workers(workers.parse()?);
    }

    // Load the catalogue (fail fast if unavailable)
    let catalogue = Arc::new(Catalogue::load_json(&catalogue_path)?);
    info!(stops = catalogue.len(), path = %catalogue_path, "Loaded stop catalogue");

    let mut matrix = DistanceMatrix::new(Arc::clone(&catalogue), metric);
    if let Ok(path) = env::var("MEETUP_DISTANCES") {
        let rows = load_static_distances(&path, &catalogue)?;
        matrix.seed(&rows, Utc::now());
        info!(rows = rows.len(), path = %path, "Loaded static distances");
    }
    let matrix = Arc::new(matrix);

    let sweeper = Arc::clone(&matrix);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(EVICTION_INTERVAL);
        loop {
            ticker.tick().await;
            sweeper.evict_before(Local::now().naive_local());
        }
    });

    let app = match env::var("MEETUP_ORACLE_URL") {
        Ok(url) => {
            let mut oracle_config = HttpOracleConfig::new(url)
                .with_max_concurrent(config.workers)
                .with_timeout(config.query_timeout_secs);
            if let Ok(key) = env::var("MEETUP_ORACLE_API_KEY") {
                oracle_config = oracle_config.with_api_key(key);
            }
            let oracle = CachedOracle::new(
                HttpOracle::new(oracle_config)?,
                &OracleCacheConfig::default(),
            );
            info!(url = oracle.inner().base_url(), workers = config.workers, "Using routing oracle");
            create_router(AppState::new(MeetingPlanner::new(matrix, oracle, config)))
        }
        Err(_) => {
            // Without an oracle every pair stays unresolved, so rank on geo estimates
            warn!("MEETUP_ORACLE_URL not set, ranking on geo estimates only");
            let config = config
                .with_unresolved_policy(UnresolvedPolicy::geo_fallback(DEFAULT_GEO_PENALTY));
            create_router(AppState::new(MeetingPlanner::new(
                matrix,
                OfflineOracle,
                config,
            )))
        }
    };

    info!("Meeting point server listening on http://{bind}");
    info!("  GET  /health             - Health check");
    info!("  GET  /api/stops?q=       - Search stops");
    info!("  POST /api/meeting-points - Find meeting points");

    let listener = tokio::net::TcpListener::bind(bind).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
