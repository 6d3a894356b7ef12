use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock, RwLock};

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use musaed_core::{
    ConversationRecord, EngineConfig, EngineError, LearnedAnswer, PendingQuestion,
    ResolutionEngine, StoreError,
};
use musaed_storage::{Storage, StorageError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{net::TcpListener, task::JoinHandle};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

pub mod audit;

use audit::ContactRequestDetector;

pub const DEFAULT_CONVERSATION_LIMIT: usize = 50;
pub const MAX_CONVERSATION_LIMIT: usize = 1000;

#[derive(Clone)]
struct AppState {
    engine: Arc<ResolutionEngine>,
    storage: Arc<Storage>,
    auth: ApiAuth,
    metrics: PrometheusHandle,
    contact: Arc<ContactRequestDetector>,
    backup_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ApiRole {
    /// Everything, including compaction, backups and metrics.
    Admin,
    /// Pending queue, learned answers, conversations and the cache.
    Operator,
}

impl ApiRole {
    fn allows(&self, required: ApiRole) -> bool {
        matches!(
            (self, required),
            (ApiRole::Admin, _) | (ApiRole::Operator, ApiRole::Operator)
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApiAuth {
    keys: Arc<RwLock<HashMap<String, ApiRole>>>,
    require_keys: bool,
}

impl ApiAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require_keys(mut self) -> Self {
        self.require_keys = true;
        self
    }

    pub fn insert(&self, key: impl Into<String>, role: ApiRole) -> Result<(), ApiError> {
        let mut guard = self
            .keys
            .write()
            .map_err(|_| ApiError::Internal("auth lock poisoned".into()))?;
        guard.insert(key.into(), role);
        Ok(())
    }

    /// Without keys and without `require_keys` every caller is an admin,
    /// which suits local development.
    fn authenticate(&self, headers: &HeaderMap, required: ApiRole) -> Result<ApiRole, ApiError> {
        let guard = self
            .keys
            .read()
            .map_err(|_| ApiError::Internal("auth lock poisoned".into()))?;
        if !self.require_keys && guard.is_empty() {
            return Ok(ApiRole::Admin);
        }

        let api_key = headers
            .get("x-api-key")
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized("missing api key".into()))?;

        let role = guard
            .get(api_key)
            .copied()
            .ok_or_else(|| ApiError::Unauthorized("invalid api key".into()))?;
        if !role.allows(required) {
            return Err(ApiError::Forbidden("insufficient role".into()));
        }
        Ok(role)
    }
}

fn init_metrics_recorder() -> PrometheusHandle {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
    HANDLE
        .get_or_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install metrics recorder")
        })
        .clone()
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Engine(EngineError::Store(StoreError::NotFound(_))) | ApiError::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Engine(EngineError::Store(StoreError::NotAnswered(_))) => StatusCode::CONFLICT,
            ApiError::Engine(EngineError::EmptyQuestion | EngineError::EmptyAnswer)
            | ApiError::Storage(StorageError::InvalidPath(_))
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Engine(
                EngineError::Store(StoreError::Unavailable(_)) | EngineError::Unavailable(_),
            ) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Deserialize)]
pub struct TeachRequest {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub addresses_user: bool,
}

#[derive(Debug, Deserialize)]
pub struct ConversationQuery {
    pub user_id: Option<String>,
    pub limit: Option<usize>,
}

/// Server-level settings that are not part of the engine.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub engine: EngineConfig,
    pub backup_dir: PathBuf,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            backup_dir: PathBuf::from("./backups"),
        }
    }
}

pub fn build_router(storage: Storage) -> Result<Router, ApiError> {
    build_router_with_auth(storage, ApiAuth::new(), ServerOptions::default())
}

pub fn build_router_with_auth(
    storage: Storage,
    auth: ApiAuth,
    options: ServerOptions,
) -> Result<Router, ApiError> {
    let storage = Arc::new(storage);
    let engine = ResolutionEngine::new(options.engine, storage.clone(), storage.clone())?;
    let contact = ContactRequestDetector::new(engine.analyzer().normalizer());
    let state = AppState {
        engine: Arc::new(engine),
        storage,
        auth,
        metrics: init_metrics_recorder(),
        contact: Arc::new(contact),
        backup_dir: options.backup_dir,
    };

    Ok(Router::new()
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .route("/api/chat", post(chat))
        .route("/admin/pending", get(list_pending))
        .route("/admin/pending/answer", post(answer_pending))
        .route("/admin/pending/promote", post(promote_pending))
        .route("/admin/pending/discard", post(discard_pending))
        .route("/admin/learned", get(list_learned).post(teach))
        .route("/admin/conversations", get(list_conversations))
        .route("/admin/cache/refresh", post(refresh_cache))
        .route("/admin/compact", post(compact))
        .route("/admin/backup", post(backup))
        .with_state(state))
}

pub async fn start_server(
    listener: TcpListener,
    storage: Storage,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), std::io::Error>>, ApiError> {
    start_server_with_auth(listener, storage, ApiAuth::new(), ServerOptions::default(), shutdown)
        .await
}

pub async fn start_server_with_auth(
    listener: TcpListener,
    storage: Storage,
    auth: ApiAuth,
    options: ServerOptions,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), std::io::Error>>, ApiError> {
    let app = build_router_with_auth(storage, auth, options)?;
    Ok(tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn render_metrics(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    state.auth.authenticate(&headers, ApiRole::Admin)?;
    let body = state.metrics.render();
    Ok((StatusCode::OK, body).into_response())
}

/// Decoded as UTF-8; `HeaderValue::to_str` would drop Arabic names.
fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| std::str::from_utf8(value.as_bytes()).ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Identity set by the upstream auth layer wins over the body; anonymous
/// callers get the guest name.
fn chat_identity(headers: &HeaderMap, body_user_id: Option<&str>, guest: &str) -> (String, String) {
    match header_value(headers, "x-user-id") {
        Some(user_id) => {
            let name = header_value(headers, "x-user-name").unwrap_or(user_id);
            (user_id.to_string(), name.to_string())
        }
        None => (
            body_user_id.unwrap_or_default().trim().to_string(),
            guest.to_string(),
        ),
    }
}

async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let (user_id, user_name) = chat_identity(
        &headers,
        payload.user_id.as_deref(),
        &state.engine.config().guest_name,
    );

    let normalized = state.engine.analyzer().normalize(&payload.message);
    if state.contact.is_contact_request(&normalized) {
        audit::record_contact_request(&user_id, &user_name, &payload.message);
    }

    let reply = state.engine.respond(&user_id, &user_name, &payload.message);
    let tier = reply.outcome.tier().map_or("none", |tier| tier.as_str());
    counter!("musaed_chat_requests_total", "outcome" => reply.outcome.label(), "tier" => tier)
        .increment(1);
    debug!(outcome = reply.outcome.label(), tier, "chat answered");

    Ok(Json(ChatResponse {
        response: reply.text,
    }))
}

async fn list_pending(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<PendingQuestion>>, ApiError> {
    state.auth.authenticate(&headers, ApiRole::Operator)?;
    Ok(Json(state.engine.pending_questions()?))
}

async fn answer_pending(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AnswerRequest>,
) -> Result<Json<PendingQuestion>, ApiError> {
    state.auth.authenticate(&headers, ApiRole::Operator)?;
    let row = state
        .engine
        .answer_pending(&payload.question, &payload.answer)?;
    Ok(Json(row))
}

async fn promote_pending(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<QuestionRequest>,
) -> Result<(StatusCode, Json<LearnedAnswer>), ApiError> {
    state.auth.authenticate(&headers, ApiRole::Operator)?;
    let learned = state.engine.promote(&payload.question)?;
    Ok((StatusCode::CREATED, Json(learned)))
}

async fn discard_pending(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<QuestionRequest>,
) -> Result<StatusCode, ApiError> {
    state.auth.authenticate(&headers, ApiRole::Operator)?;
    if state.engine.discard(&payload.question)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!(
            "pending question {:?}",
            payload.question
        )))
    }
}

async fn list_learned(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<LearnedAnswer>>, ApiError> {
    state.auth.authenticate(&headers, ApiRole::Operator)?;
    let mut learned = state.engine.learned_answers()?;
    learned.sort_by(|a, b| b.learned_at.cmp(&a.learned_at));
    Ok(Json(learned))
}

async fn teach(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<TeachRequest>,
) -> Result<(StatusCode, Json<LearnedAnswer>), ApiError> {
    state.auth.authenticate(&headers, ApiRole::Operator)?;
    let learned = state
        .engine
        .teach(&payload.question, &payload.answer, payload.addresses_user)?;
    Ok((StatusCode::CREATED, Json(learned)))
}

async fn list_conversations(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ConversationQuery>,
) -> Result<Json<Vec<ConversationRecord>>, ApiError> {
    state.auth.authenticate(&headers, ApiRole::Operator)?;
    let limit = query.limit.unwrap_or(DEFAULT_CONVERSATION_LIMIT);
    if limit == 0 || limit > MAX_CONVERSATION_LIMIT {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {MAX_CONVERSATION_LIMIT}"
        )));
    }
    let records = match query.user_id.as_deref() {
        Some(user_id) => state.storage.conversations_for_user(user_id, limit)?,
        None => state.storage.recent_conversations(limit)?,
    };
    Ok(Json(records))
}

async fn refresh_cache(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.auth.authenticate(&headers, ApiRole::Operator)?;
    let cached = state.engine.refresh_cache()?;
    Ok(Json(serde_json::json!({ "cached": cached })))
}

async fn compact(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.auth.authenticate(&headers, ApiRole::Admin)?;
    let entries = state.storage.compact()?;
    Ok(Json(serde_json::json!({ "entries": entries })))
}

async fn backup(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    state.auth.authenticate(&headers, ApiRole::Admin)?;
    let path = state.storage.backup(&state.backup_dir)?;
    info!(path = %path.display(), "manual backup requested");
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "path": path.display().to_string() })),
    ))
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
