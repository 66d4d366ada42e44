//! HTTP server.
//!
//! Exposes ingestion, listing and the two outfit agents as a JSON API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/api/items?limit=N` | Newest wardrobe items |
//! | `POST` | `/api/ingest` | Multipart `image` + optional `tactile_json` |
//! | `POST` | `/api/agent/stylist` | JSON `{context}` or `{event}` |
//! | `POST` | `/api/agent/visual-match` | Multipart `image` |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "No image part" } }
//! ```
//!
//! Error codes: `bad_request` (400), `embeddings_disabled` (400),
//! `payload_too_large` (413), `upstream_unavailable` (502), `internal` (500).
//!
//! Agent endpoints never fail on reasoning problems: they answer 200 with a
//! degraded outcome instead.

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use wardrobe_core::agent::{AgentSettings, OutfitAgent, StylistOutcome, VisualMatchOutcome};
use wardrobe_core::embedding::EmbeddingProvider;
use wardrobe_core::models::{ItemSummary, Tactile};
use wardrobe_core::reasoning::ReasoningProvider;
use wardrobe_core::store::Store;

use crate::config::Config;
use crate::context::EventContext;
use crate::ingest::{ingest_garment, IngestError, IngestReceipt};

const DEFAULT_LIST_LIMIT: usize = 50;
const MAX_LIST_LIMIT: usize = 500;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub reasoner: Arc<dyn ReasoningProvider>,
    pub settings: AgentSettings,
    pub max_upload_bytes: usize,
    /// `false` when `[embedding] provider = "disabled"`; ingestion is refused.
    pub embeddings_enabled: bool,
}

impl AppState {
    fn agent(&self) -> OutfitAgent<'_> {
        OutfitAgent::new(
            self.store.as_ref(),
            self.embedder.as_ref(),
            self.reasoner.as_ref(),
        )
        .with_settings(self.settings.clone())
    }
}

/// Build the application router around `state`.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let limit = state.max_upload_bytes;

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/items", get(handle_list_items))
        .route("/api/ingest", post(handle_ingest))
        .route("/api/agent/stylist", post(handle_stylist))
        .route("/api/agent/visual-match", post(handle_visual_match))
        .layer(DefaultBodyLimit::max(limit))
        .layer(RequestBodyLimitLayer::new(limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Connect the store, build the providers and serve until terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = crate::db::connect(config).await?;
    crate::migrate::apply_schema(&pool).await?;

    let state = AppState {
        store: Arc::new(crate::sqlite_store::SqliteStore::new(pool)),
        embedder: Arc::from(crate::embedding::create_provider(&config.embedding)?),
        reasoner: Arc::from(crate::reasoning::create_provider(&config.reasoning)?),
        settings: config.agent_settings(),
        max_upload_bytes: config.server.max_upload_bytes,
        embeddings_enabled: config.embedding.is_enabled(),
    };

    if !config.embedding.is_enabled() {
        tracing::warn!("embedding provider disabled: ingestion is refused");
    }
    if !config.reasoning.is_enabled() {
        tracing::warn!("reasoning provider disabled: agents answer with fallbacks");
    }

    tracing::info!(
        bind = %config.server.bind,
        embedding = %config.embedding.provider,
        reasoning = %config.reasoning.provider,
        "server listening"
    );

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, create_router(state)).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(code = self.code, message = %self.message, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::BAD_REQUEST, "bad_request", message)
}

fn internal(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        let status = err.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::new(status, "payload_too_large", err.body_text())
        } else {
            bad_request(format!("Failed to parse multipart: {}", err.body_text()))
        }
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::InvalidInput(_) => bad_request(err.to_string()),
            IngestError::Analysis(_) | IngestError::Embedding(_) => {
                AppError::new(StatusCode::BAD_GATEWAY, "upstream_unavailable", err.to_string())
            }
            IngestError::Storage(_) => internal(err.to_string()),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /api/items ============

#[derive(Deserialize)]
struct ListParams {
    limit: Option<usize>,
}

#[derive(Serialize)]
struct ListResponse {
    items: Vec<ItemSummary>,
}

async fn handle_list_items(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, AppError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    let items = state
        .store
        .list_items(limit)
        .await
        .map_err(|e| internal(format!("{:#}", e)))?;
    Ok(Json(ListResponse { items }))
}

// ============ POST /api/ingest ============

fn require_image(image: Option<Vec<u8>>) -> Result<Vec<u8>, AppError> {
    image
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| bad_request("No image part"))
}

/// Ingest form: `image` bytes plus optional `tactile_json`.
async fn read_ingest_form(
    multipart: &mut Multipart,
) -> Result<(Vec<u8>, Option<String>), AppError> {
    let mut image: Option<Vec<u8>> = None;
    let mut tactile_json: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "image" => image = Some(field.bytes().await?.to_vec()),
            "tactile_json" => tactile_json = Some(field.text().await?),
            _ => {}
        }
    }

    Ok((require_image(image)?, tactile_json))
}

/// Visual-match form: only the `image` field is read.
async fn read_image_form(multipart: &mut Multipart) -> Result<Vec<u8>, AppError> {
    let mut image: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("image") {
            image = Some(field.bytes().await?.to_vec());
        }
    }

    require_image(image)
}

async fn handle_ingest(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestReceipt>, AppError> {
    if !state.embeddings_enabled {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "embeddings_disabled",
            "ingestion requires an embedding provider",
        ));
    }

    let (image, tactile_json) = read_ingest_form(&mut multipart).await?;
    let tactile: Tactile = match tactile_json.as_deref().map(str::trim) {
        None | Some("") => Tactile::default(),
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| bad_request(format!("invalid tactile_json: {}", e)))?,
    };

    let receipt = ingest_garment(
        state.store.as_ref(),
        state.embedder.as_ref(),
        state.reasoner.as_ref(),
        &image,
        tactile,
    )
    .await?;
    Ok(Json(receipt))
}

// ============ POST /api/agent/stylist ============

#[derive(Deserialize)]
struct StylistRequest {
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    event: Option<EventContext>,
}

async fn handle_stylist(
    State(state): State<AppState>,
    Json(req): Json<StylistRequest>,
) -> Result<Json<StylistOutcome>, AppError> {
    let context = match (req.context, req.event) {
        (Some(c), _) if !c.trim().is_empty() => c,
        (_, Some(event)) => event.render(),
        _ => return Err(bad_request("context must not be empty")),
    };

    Ok(Json(state.agent().run_stylist_flow(&context).await))
}

// ============ POST /api/agent/visual-match ============

async fn handle_visual_match(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<VisualMatchOutcome>, AppError> {
    let image = read_image_form(&mut multipart).await?;
    Ok(Json(state.agent().run_visual_match_flow(&image).await))
}
