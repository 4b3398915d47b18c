//! Layout HTTP service.

pub mod handlers;
pub mod response;

use std::sync::Arc;

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::layout::{AutoPlaced, BoardError, FridgeBoard, GridGeometry};
use crate::persist::PositionWriter;
use crate::store::ItemSource;

/// Shared by every handler. Boards are rebuilt per request from the item
/// listing; the writer is the one long-lived piece.
#[derive(Clone)]
pub struct AppState {
    pub geometry: GridGeometry,
    pub source: Arc<dyn ItemSource>,
    pub writer: PositionWriter,
}

impl AppState {
    pub fn new(geometry: GridGeometry, source: Arc<dyn ItemSource>, writer: PositionWriter) -> Self {
        Self {
            geometry,
            source,
            writer,
        }
    }

    pub async fn load_board(&self, fridge_id: &str) -> Result<(FridgeBoard, Vec<AutoPlaced>), BoardError> {
        FridgeBoard::load(self.source.as_ref(), fridge_id, self.geometry.clone(), self.writer.clone()).await
    }
}

pub fn app(state: AppState, config: &ServerConfig) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(layout_routes())
        .merge(fridge_routes())
        .with_state(state);

    // Global middleware
    if config.enable_cors {
        router = router.layer(cors_layer(&config.cors_origins));
    }
    if config.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router
}

fn layout_routes() -> Router<AppState> {
    Router::new()
        .route("/api/layout/grid", get(handlers::grid))
        .route("/api/layout/snap", post(handlers::snap_point))
        .route("/api/layout/slot", post(handlers::empty_slot))
}

fn fridge_routes() -> Router<AppState> {
    Router::new()
        .route("/api/fridges/:fridge_id/layout", get(handlers::fridge_layout))
        .route("/api/fridges/:fridge_id/items/:item_id/position", put(handlers::move_item))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new().allow_origin(origins).allow_methods(Any).allow_headers(Any)
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Fridge Layout",
            "version": version,
            "description": "Grid placement engine for the virtual fridge",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health",
                "grid": "GET /api/layout/grid",
                "snap": "POST /api/layout/snap",
                "slot": "POST /api/layout/slot",
                "layout": "GET /api/fridges/:fridge_id/layout",
                "move": "PUT /api/fridges/:fridge_id/items/:item_id/position",
            }
        }
    }))
}

async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "data": {
                "status": "ok",
                "timestamp": now,
                "pending_writes": state.writer.in_flight(),
            }
        })),
    )
}
