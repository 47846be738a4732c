use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use saferoute::config::AppConfig;
use saferoute::geo::{Coordinate, RiskPoint};
use saferoute::provider::HttpRouteProvider;
use saferoute::repository::{JsonStore, RiskRepository};
use saferoute::resolver::{Resolution, RouteResolver};

// Shared state for concurrency. Resolutions are independent; the only thing
// they share is the risk store handle.
struct AppState {
    resolver: RouteResolver<HttpRouteProvider, Arc<JsonStore>>,
    store: Arc<JsonStore>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 2. Configuration + risk store
    let config = AppConfig::default();
    if let Some(dir) = config
        .risk_store
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
    {
        tokio::fs::create_dir_all(dir).await?;
    }
    let store = Arc::new(JsonStore::new(&config.risk_store));

    // 3. Resolver over the external routing provider
    let provider = HttpRouteProvider::new(config.provider.clone());
    let resolver = RouteResolver::new(provider, store.clone(), config.resolver.clone());
    let shared_state = Arc::new(AppState { resolver, store });

    // 4. CORS (allows the map frontend to talk to this API)
    let cors = CorsLayer::new()
        .allow_methods(tower_http::cors::Any)
        .allow_origin(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any);

    // 5. Router
    let app = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/route", post(resolve_route))
        .route("/risks", get(list_risks).post(report_risk))
        .layer(cors)
        .with_state(shared_state);

    info!("🚀 API server running on http://{}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- API DTOs ---

#[derive(Deserialize)]
struct RouteRequest {
    origin: [f64; 2],      // [lat, lng]
    destination: [f64; 2], // [lat, lng]
}

#[derive(Serialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Serialize)]
struct RouteResponse {
    path: Vec<LatLng>,
    risks: Vec<RiskPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Deserialize)]
struct RiskReport {
    lat: f64,
    lng: f64,
    risk: f64,
}

// --- Handlers ---

async fn resolve_route(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RouteRequest>,
) -> Result<Json<RouteResponse>, (StatusCode, String)> {
    let origin = Coordinate::new(payload.origin[0], payload.origin[1]).map_err(bad_request)?;
    let destination =
        Coordinate::new(payload.destination[0], payload.destination[1]).map_err(bad_request)?;

    match state.resolver.resolve(origin, destination).await {
        Ok(Resolution { path, risks }) => Ok(Json(RouteResponse {
            path: path
                .into_iter()
                .map(|c| LatLng {
                    lat: c.lat,
                    lng: c.lng,
                })
                .collect(),
            risks,
            error: None,
        })),
        Err(err) => {
            // No path to draw, but the hazard markers still render from the
            // already-completed read.
            error!(%err, "route resolution failed");
            let risks = state.store.read_all().await.unwrap_or_default();
            Ok(Json(RouteResponse {
                path: Vec::new(),
                risks,
                error: Some(err.to_string()),
            }))
        }
    }
}

async fn list_risks(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RiskPoint>>, (StatusCode, String)> {
    state
        .store
        .read_all()
        .await
        .map(Json)
        .map_err(internal_error)
}

async fn report_risk(
    State(state): State<Arc<AppState>>,
    Json(report): Json<RiskReport>,
) -> Result<StatusCode, (StatusCode, String)> {
    let point = RiskPoint::new(report.lat, report.lng, report.risk).map_err(bad_request)?;
    state.store.append(point).await.map_err(internal_error)?;
    Ok(StatusCode::CREATED)
}

fn bad_request(err: impl std::fmt::Display) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, err.to_string())
}

fn internal_error(err: impl std::fmt::Display) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}
