// Territorial Penetration - Web Server
// Read-only REST API over the reference tables, the resolver and the run log

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use clap::Parser;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use territorial_penetration::{
    get_runs, open_database, pipeline, CityAliasIndex, Config, ProvinceResolver,
    ReferenceGeoTable, ResolutionTier, RunRecord,
};

#[derive(Parser, Debug)]
#[command(name = "territory-server")]
#[command(about = "Read-only API for province resolution and reference data")]
#[command(version)]
struct Args {
    #[arg(short, long, default_value = "3000", env = "TERRITORY_PORT")]
    port: u16,

    /// Config file (TOML)
    #[arg(short, long, env = "TERRITORY_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database written by `territorial-penetration run --db`
    #[arg(long)]
    db: Option<PathBuf>,

    /// Extra aliases, `city,province` CSV
    #[arg(long)]
    aliases: Option<PathBuf>,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    geo: Arc<ReferenceGeoTable>,
    aliases: Arc<CityAliasIndex>,
    db: Option<Arc<Mutex<Connection>>>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ApiResponse {
        success: false,
        data: (),
        error: Some(message.into()),
    };
    (status, Json(body)).into_response()
}

#[derive(Serialize, Deserialize)]
struct ProvinceResponse {
    name: String,
    region_code: String,
    region_name: Option<String>,
    population: u64,
    metropolitan: bool,
}

#[derive(Serialize, Deserialize)]
struct RegionResponse {
    code: String,
    name: String,
    population: u64,
    provinces: usize,
}

#[derive(Deserialize)]
struct ResolveParams {
    city: String,
}

#[derive(Serialize, Deserialize)]
struct ResolveResponse {
    city: String,
    province: Option<String>,
    tier: Option<ResolutionTier>,
    metropolitan: Option<bool>,
}

impl AppState {
    fn province_response(&self, name: &str) -> Option<ProvinceResponse> {
        let p = self.geo.province(name)?;
        Some(ProvinceResponse {
            name: p.name.clone(),
            region_code: p.region_code.clone(),
            region_name: self.geo.region(&p.region_code).map(|r| r.name.clone()),
            population: p.population,
            metropolitan: p.is_metropolitan,
        })
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/provinces - All provinces, by name
async fn get_provinces(State(state): State<AppState>) -> impl IntoResponse {
    let provinces: Vec<ProvinceResponse> = state
        .geo
        .provinces()
        .filter_map(|p| state.province_response(&p.name))
        .collect();

    Json(ApiResponse::ok(provinces))
}

/// GET /api/provinces/:name - One province, name matched case-insensitively
async fn get_province(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let decoded = urlencoding::decode(&name)
        .unwrap_or_else(|_| name.clone().into())
        .into_owned();

    match state
        .geo
        .province_named(decoded.trim())
        .and_then(|canonical| state.province_response(canonical))
    {
        Some(province) => (StatusCode::OK, Json(ApiResponse::ok(province))).into_response(),
        None => failure(StatusCode::NOT_FOUND, format!("Unknown province: {}", decoded)),
    }
}

/// GET /api/regions - All regions with their province count
async fn get_regions(State(state): State<AppState>) -> impl IntoResponse {
    let regions: Vec<RegionResponse> = state
        .geo
        .regions()
        .map(|r| RegionResponse {
            code: r.code.clone(),
            name: r.name.clone(),
            population: r.population,
            provinces: state
                .geo
                .provinces()
                .filter(|p| p.region_code == r.code)
                .count(),
        })
        .collect();

    Json(ApiResponse::ok(regions))
}

/// GET /api/metropolitan - Metropolitan provinces
async fn get_metropolitan(State(state): State<AppState>) -> impl IntoResponse {
    let provinces: Vec<ProvinceResponse> = state
        .geo
        .metropolitan_provinces()
        .filter_map(|p| state.province_response(&p.name))
        .collect();

    Json(ApiResponse::ok(provinces))
}

/// GET /api/resolve?city=... - Resolve one city name
async fn resolve_city(
    State(state): State<AppState>,
    Query(params): Query<ResolveParams>,
) -> impl IntoResponse {
    let resolver = ProvinceResolver::new(&state.aliases, &state.geo);
    let resolution = resolver.resolve_detailed(Some(params.city.as_str()));

    let response = ResolveResponse {
        province: resolution.map(|r| r.province.to_string()),
        tier: resolution.map(|r| r.tier),
        metropolitan: resolution.map(|r| state.geo.is_metropolitan(r.province)),
        city: params.city,
    };

    Json(ApiResponse::ok(response))
}

/// GET /api/runs - Run log, most recent first
async fn get_run_log(State(state): State<AppState>) -> Response {
    let Some(db) = &state.db else {
        return failure(StatusCode::NOT_FOUND, "No database configured");
    };

    let conn = match db.lock() {
        Ok(conn) => conn,
        Err(_) => return failure(StatusCode::INTERNAL_SERVER_ERROR, "Database lock poisoned"),
    };

    match get_runs(&conn) {
        Ok(runs) => (StatusCode::OK, Json(ApiResponse::<Vec<RunRecord>>::ok(runs))).into_response(),
        Err(e) => {
            error!("Error getting runs: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read run log")
        }
    }
}

fn app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/provinces", get(get_provinces))
        .route("/provinces/:name", get(get_province))
        .route("/regions", get(get_regions))
        .route("/metropolitan", get(get_metropolitan))
        .route("/resolve", get(resolve_city))
        .route("/runs", get(get_run_log))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "territory_server=info,territorial_penetration=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref())?;
    if args.db.is_some() {
        config.database = args.db;
    }
    if args.aliases.is_some() {
        config.alias_file = args.aliases;
    }

    let aliases = pipeline::build_alias_index(&config)?;
    let db = match &config.database {
        Some(path) => {
            let conn = open_database(path)?;
            info!("Database opened: {:?}", path);
            Some(Arc::new(Mutex::new(conn)))
        }
        None => None,
    };

    let state = AppState {
        geo: Arc::new(ReferenceGeoTable::italy()),
        aliases: Arc::new(aliases),
        db,
    };

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Server running on http://localhost:{}/api/health", args.port);

    axum::serve(listener, app(state)).await?;

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
