#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use fridge_layout::config::{ItemApiConfig, ServerConfig};
use fridge_layout::inventory::Item;
use fridge_layout::layout::{GridGeometry, Position};
use fridge_layout::persist::{PositionWriter, RetryPolicy};
use fridge_layout::server::{app, AppState};
use fridge_layout::store::{HttpItemStore, ItemSink, ItemSource, MemoryItemStore, StoreError};
use serde::Deserialize;
use serde_json::{json, Value};

pub const TEST_TOKEN: &str = "test-token";

/// Backoff short enough that retry tests finish quickly.
pub fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(5),
        max_backoff: Duration::from_millis(20),
        multiplier: 2.0,
    }
}

async fn serve(router: Router) -> Result<u16> {
    // Pick an unused port for isolation
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .with_context(|| format!("failed to bind port {}", port))?;

    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(port)
}

async fn wait_ready(url: &str, timeout: Duration) -> Result<()> {
    let client = reqwest::Client::new();
    let deadline = Instant::now() + timeout;
    loop {
        if Instant::now() > deadline {
            break;
        }
        if let Ok(resp) = client.get(url).send().await {
            if resp.status() == StatusCode::OK {
                return Ok(());
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    anyhow::bail!("server did not become ready at {} within {:?}", url, timeout)
}

// ---- Item API stand-in ---------------------------------------------------

#[derive(Deserialize)]
struct ListQuery {
    #[serde(rename = "fridgeId")]
    fridge_id: String,
}

#[derive(Deserialize)]
struct DaysQuery {
    days: i64,
}

fn authorized(headers: &HeaderMap) -> Result<(), Response> {
    let expected = format!("Bearer {}", TEST_TOKEN);
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err((StatusCode::UNAUTHORIZED, Json(json!({ "error": "유효하지 않은 토큰입니다." }))).into_response()),
    }
}

fn store_error(err: StoreError) -> Response {
    let (status, message) = match err {
        StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "Item not found".to_string()),
        StoreError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m),
        StoreError::Rejected { status, message } => {
            (StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR), message)
        }
        StoreError::Transport(m) => (StatusCode::SERVICE_UNAVAILABLE, m),
        StoreError::Decode(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
    };
    (status, Json(json!({ "error": message }))).into_response()
}

/// Unplaced items go over the wire as the legacy `(0,0)` origin.
fn legacy_wire(item: &Item) -> Value {
    let mut value = json!(item);
    if item.position.is_none() {
        value["position"] = json!({ "x": 0, "y": 0 });
    }
    value
}

async fn list_items(
    State(store): State<Arc<MemoryItemStore>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Response {
    if let Err(denied) = authorized(&headers) {
        return denied;
    }
    match store.list_items(&query.fridge_id).await {
        Ok(items) => {
            let items: Vec<Value> = items.iter().map(legacy_wire).collect();
            Json(json!({ "items": items })).into_response()
        }
        Err(e) => store_error(e),
    }
}

async fn expiring_items(
    State(store): State<Arc<MemoryItemStore>>,
    headers: HeaderMap,
    Query(query): Query<DaysQuery>,
) -> Response {
    if let Err(denied) = authorized(&headers) {
        return denied;
    }
    match store.expiring_items(query.days).await {
        Ok(split) => Json(json!(split)).into_response(),
        Err(e) => store_error(e),
    }
}

async fn update_item(
    State(store): State<Arc<MemoryItemStore>>,
    headers: HeaderMap,
    Path(item_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(denied) = authorized(&headers) {
        return denied;
    }
    let position: Position = match serde_json::from_value(body["position"].clone()) {
        Ok(position) => position,
        Err(e) => return (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response(),
    };
    match store.update_position(&item_id, position).await {
        Ok(()) => Json(json!({ "message": "Item updated" })).into_response(),
        Err(e) => store_error(e),
    }
}

/// Start an item API backed by `store`; returns its `/api` base URL.
pub async fn start_item_api(store: Arc<MemoryItemStore>) -> Result<String> {
    let router = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/items", get(list_items))
        .route("/api/items/expiring", get(expiring_items))
        .route("/api/items/:id", put(update_item))
        .with_state(store);

    let port = serve(router).await?;
    wait_ready(&format!("http://127.0.0.1:{}/health", port), Duration::from_secs(5)).await?;
    Ok(format!("http://127.0.0.1:{}/api", port))
}

pub fn http_store(api_url: &str, token: Option<&str>) -> Result<HttpItemStore> {
    let config = ItemApiConfig {
        base_url: api_url.to_string(),
        token: token.map(str::to_string),
        timeout_secs: 5,
    };
    Ok(HttpItemStore::new(&config)?)
}

// ---- Layout service --------------------------------------------------------

pub struct TestServer {
    pub base_url: String,
    pub store: Arc<MemoryItemStore>,
    pub writer: PositionWriter,
    pub client: reqwest::Client,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Item API over `items`, and the layout service in front of it.
pub async fn start_layout_server(items: Vec<Item>) -> Result<TestServer> {
    let store = Arc::new(MemoryItemStore::with_items(items));
    let api_url = start_item_api(store.clone()).await?;

    let http = Arc::new(http_store(&api_url, Some(TEST_TOKEN))?);
    let writer = PositionWriter::new(http.clone(), fast_policy(3));
    let state = AppState::new(GridGeometry::default(), http, writer.clone());

    let server_config = ServerConfig {
        port: 0,
        enable_cors: true,
        cors_origins: vec!["http://localhost:5173".to_string()],
        enable_request_logging: true,
    };
    let port = serve(app(state, &server_config)).await?;

    let base_url = format!("http://127.0.0.1:{}", port);
    wait_ready(&format!("{}/health", base_url), Duration::from_secs(5)).await?;

    Ok(TestServer {
        base_url,
        store,
        writer,
        client: reqwest::Client::new(),
    })
}
