//! Gateway HTTP server: Axum JSON API for the browser playground

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use showcase_core::{
    ChatSession, FileInput, ImageRef, ImageResult, InferenceRouter, ModelCategory, ModelRegistry,
    Outcome, PlaygroundError, RenderIntent, ShowcaseError,
};

use crate::auth;
use crate::blobs::{self, BlobStore};
use crate::protocol::{
    self, ERR_BUSY, ERR_INVALID_METHOD, ERR_INVALID_PARAMS, ERR_UNAUTHORIZED, GatewayRequest,
    GatewayResponse,
};
use crate::session::{self, Lane, SessionManager};

/// Shared state for all requests
#[derive(Clone)]
pub struct GatewayState {
    pub router: InferenceRouter,
    pub sessions: Arc<SessionManager>,
    pub blobs: Arc<BlobStore>,
    pub auth_token: String,
    pub start_time: std::time::Instant,
}

impl GatewayState {
    pub fn new(router: InferenceRouter, chat_template: ChatSession, auth_token: String) -> Self {
        Self {
            router,
            sessions: Arc::new(SessionManager::new(chat_template)),
            blobs: Arc::new(BlobStore::new()),
            auth_token,
            start_time: std::time::Instant::now(),
        }
    }

    /// Move inline image bytes into the blob store, leaving a URL behind
    async fn publish(&self, intent: RenderIntent) -> RenderIntent {
        match intent {
            RenderIntent::Image(ImageResult {
                image: ImageRef::Inline(blob),
                prompt,
                model,
            }) => {
                let id = self.blobs.insert(blob).await;
                RenderIntent::Image(ImageResult {
                    image: ImageRef::Url(blobs::blob_url(&id)),
                    prompt,
                    model,
                })
            }
            other => other,
        }
    }
}

/// The gateway server
pub struct GatewayServer {
    state: GatewayState,
    bind: SocketAddr,
}

impl GatewayServer {
    pub fn new(
        bind: SocketAddr,
        auth_token: String,
        router: InferenceRouter,
        chat_template: ChatSession,
    ) -> Self {
        Self {
            state: GatewayState::new(router, chat_template, auth_token),
            bind,
        }
    }

    pub fn state(&self) -> &GatewayState {
        &self.state
    }

    /// Build the Axum router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/status", get(status_handler))
            .route("/api/models", get(models_handler))
            .route("/api/rpc", post(rpc_handler))
            .route("/api/blobs/{id}", get(blob_get_handler).delete(blob_delete_handler))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Start the server (blocks until shutdown)
    pub async fn run(self) -> anyhow::Result<()> {
        let router = self.router();
        let listener = tokio::net::TcpListener::bind(self.bind).await?;
        info!("Gateway listening on {}", self.bind);
        axum::serve(listener, router).await?;
        Ok(())
    }

    /// Start the server in the background, returning a handle
    pub fn spawn(self) -> tokio::task::JoinHandle<anyhow::Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}

// ── HTTP Handlers ──

async fn status_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    axum::Json(status_json(&state).await)
}

async fn models_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    axum::Json(models_json(state.router.registry()))
}

async fn rpc_handler(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if !auth::authorize(&state.auth_token, &headers) {
        let resp = GatewayResponse::err(None, ERR_UNAUTHORIZED, "Unauthorized");
        return (StatusCode::UNAUTHORIZED, axum::Json(resp)).into_response();
    }
    axum::Json(handle_request(&state, &body).await).into_response()
}

async fn blob_get_handler(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, StatusCode> {
    if !auth::authorize(&state.auth_token, &headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let blob = state.blobs.get(&id).await.ok_or(StatusCode::NOT_FOUND)?;
    let mime = blob.mime_type().to_string();
    Ok(([(header::CONTENT_TYPE, mime)], blob.into_bytes()).into_response())
}

async fn blob_delete_handler(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> StatusCode {
    if !auth::authorize(&state.auth_token, &headers) {
        return StatusCode::UNAUTHORIZED;
    }
    if state.blobs.release(&id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn status_json(state: &GatewayState) -> Value {
    json!({
        "status": "ok",
        "backend": state.router.backend_name(),
        "models": state.router.registry().len(),
        "sessions": state.sessions.count().await,
        "blobs": state.blobs.count().await,
        "uptime_secs": state.start_time.elapsed().as_secs(),
    })
}

/// Registry grouped by category, in listing order
fn models_json(registry: &ModelRegistry) -> Value {
    let groups: Vec<Value> = ModelCategory::LISTING_ORDER
        .iter()
        .map(|category| {
            json!({
                "category": category,
                "models": registry.by_category(*category),
            })
        })
        .collect();
    json!({ "categories": groups })
}

// ── RPC ──

/// What a playground request should run once the session has been marked busy
enum Job {
    Text(String),
    File(FileInput),
    Image {
        model_id: Option<String>,
        prompt: String,
    },
}

async fn handle_request(state: &GatewayState, raw: &str) -> GatewayResponse {
    let req: GatewayRequest = match serde_json::from_str(raw) {
        Ok(r) => r,
        Err(e) => {
            return GatewayResponse::err(None, ERR_INVALID_PARAMS, format!("Invalid JSON: {}", e));
        }
    };

    let id = req.id.clone();
    let params = &req.params;
    let session_id = str_param(params, "session_id").unwrap_or("main");

    debug!("RPC {} (session {})", req.method, session_id);

    match req.method.as_str() {
        protocol::methods::STATUS_GET => GatewayResponse::ok(id, status_json(state).await),

        protocol::methods::MODELS_LIST => {
            GatewayResponse::ok(id, models_json(state.router.registry()))
        }

        protocol::methods::SESSION_LIST => {
            let sessions = state.sessions.list().await;
            GatewayResponse::ok(id, serde_json::to_value(&sessions).unwrap_or_default())
        }

        protocol::methods::SESSION_NEW => {
            let name = str_param(params, "name").unwrap_or("Untitled");
            let session = state.sessions.create(name).await;
            GatewayResponse::ok(id, serde_json::to_value(&session).unwrap_or_default())
        }

        protocol::methods::MODEL_SELECT => {
            let Some(model_id) = str_param(params, "model_id") else {
                return missing_param(id, "model_id");
            };
            select_model(state, id, session_id, model_id).await
        }

        protocol::methods::MODEL_STATUS => {
            let Some(model_id) = str_param(params, "model_id") else {
                return missing_param(id, "model_id");
            };
            let available = state.router.check_model_status(model_id).await;
            GatewayResponse::ok(id, json!({ "model_id": model_id, "available": available }))
        }

        protocol::methods::QUERY_TEXT => {
            let Some(text) = str_param(params, "text").filter(|t| !t.trim().is_empty()) else {
                return missing_param(id, "text");
            };
            if let Some(model_id) = str_param(params, "model_id") {
                let selected = select_model(state, id.clone(), session_id, model_id).await;
                if selected.error.is_some() {
                    return selected;
                }
            }
            run_playground(state, id, session_id, Job::Text(text.to_string())).await
        }

        protocol::methods::QUERY_FILE => {
            let file = match file_param(params) {
                Ok(file) => file,
                Err(message) => return GatewayResponse::err(id, ERR_INVALID_PARAMS, message),
            };
            if let Some(model_id) = str_param(params, "model_id") {
                let selected = select_model(state, id.clone(), session_id, model_id).await;
                if selected.error.is_some() {
                    return selected;
                }
            }
            run_playground(state, id, session_id, Job::File(file)).await
        }

        protocol::methods::IMAGE_GENERATE => {
            let Some(prompt) = str_param(params, "prompt").filter(|p| !p.trim().is_empty()) else {
                return missing_param(id, "prompt");
            };
            let job = Job::Image {
                model_id: str_param(params, "model_id").map(str::to_string),
                prompt: prompt.to_string(),
            };
            run_playground(state, id, session_id, job).await
        }

        protocol::methods::CHAT_SEND => {
            let Some(text) = str_param(params, "text").filter(|t| !t.trim().is_empty()) else {
                return missing_param(id, "text");
            };
            send_chat(state, id, session_id, text).await
        }

        protocol::methods::CHAT_HISTORY => {
            let history = state
                .sessions
                .with_session(session_id, |s| {
                    json!({
                        "session_id": s.info.id,
                        "model": s.chat.model_id(),
                        "entries": s.chat.transcript().entries(),
                    })
                })
                .await;
            match history {
                Some(history) => GatewayResponse::ok(id, history),
                None => session_not_found(id, session_id),
            }
        }

        protocol::methods::CHAT_RESET => {
            let model_id = str_param(params, "model_id");
            let reset = state
                .sessions
                .with_session(session_id, |s| {
                    if s.chat_in_flight {
                        return Err(PlaygroundError::RequestInFlight);
                    }
                    match model_id {
                        Some(model_id) => s.chat.set_model(model_id),
                        None => s.chat.reset(),
                    }
                    Ok(json!({
                        "session_id": s.info.id,
                        "model": s.chat.model_id(),
                        "entries": s.chat.transcript().entries(),
                    }))
                })
                .await;
            match reset {
                Some(Ok(value)) => GatewayResponse::ok(id, value),
                Some(Err(e)) => playground_err(id, e),
                None => session_not_found(id, session_id),
            }
        }

        _ => GatewayResponse::err(id, ERR_INVALID_METHOD, format!("Unknown method: {}", req.method)),
    }
}

async fn select_model(
    state: &GatewayState,
    id: Option<String>,
    session_id: &str,
    model_id: &str,
) -> GatewayResponse {
    let Some(model) = state.router.registry().lookup(model_id).cloned() else {
        return GatewayResponse::inference_err(id, &ShowcaseError::unknown_model(model_id));
    };
    let selected = state
        .sessions
        .with_session(session_id, |s| {
            s.playground
                .select(model)
                .map(|cleared| (cleared, s.playground.snapshot()))
        })
        .await;
    match selected {
        Some(Ok((cleared, snapshot))) => {
            release_displayed(state, cleared.as_ref()).await;
            GatewayResponse::ok(id, serde_json::to_value(&snapshot).unwrap_or_default())
        }
        Some(Err(e)) => playground_err(id, e),
        None => session_not_found(id, session_id),
    }
}

/// Run one playground request: mark the session busy, call upstream without
/// holding the lock, then record the outcome and release the image it replaces
async fn run_playground(
    state: &GatewayState,
    id: Option<String>,
    session_id: &str,
    job: Job,
) -> GatewayResponse {
    let direct = matches!(job, Job::Image { model_id: Some(_), .. });
    let started = state
        .sessions
        .with_session(session_id, |s| {
            if direct {
                s.playground.begin_direct().map(|_| None)
            } else {
                s.playground.begin().map(Some)
            }
        })
        .await;
    let selected = match started {
        Some(Ok(selected)) => selected,
        Some(Err(e)) => return playground_err(id, e),
        None => return session_not_found(id, session_id),
    };
    let guard = state.sessions.guard(session_id, Lane::Playground);
    let selected_id = selected.as_ref().map(|m| m.id.clone()).unwrap_or_default();

    let result = match job {
        Job::Text(text) => state.router.query_text(&selected_id, &text).await,
        Job::File(file) => state.router.query_file(&selected_id, file).await,
        Job::Image { model_id: Some(model_id), prompt } => state
            .router
            .generate_image(&model_id, &prompt)
            .await
            .map(RenderIntent::Image),
        Job::Image { model_id: None, prompt } => {
            match selected.filter(|m| m.category == ModelCategory::Image) {
                Some(model) => state
                    .router
                    .generate_image(&model.id, &prompt)
                    .await
                    .map(RenderIntent::Image),
                None => Err(ShowcaseError::UnsupportedInput(format!(
                    "{} does not generate images",
                    selected_id
                ))),
            }
        }
    };
    let result = match result {
        Ok(intent) => Ok(state.publish(intent).await),
        Err(e) => Err(e),
    };

    let superseded = state
        .sessions
        .with_session(session_id, |s| {
            s.touch();
            s.playground.finish(Outcome::from(result.clone()))
        })
        .await
        .flatten();
    guard.disarm();
    release_displayed(state, superseded.as_ref()).await;

    match result {
        Ok(intent) => GatewayResponse::ok(
            id,
            json!({
                "session_id": session_id,
                "title": intent.title(),
                "result": intent,
            }),
        ),
        Err(e) => GatewayResponse::inference_err(id, &e),
    }
}

/// Send one chat turn on a copy of the session's chat, then write it back
async fn send_chat(
    state: &GatewayState,
    id: Option<String>,
    session_id: &str,
    text: &str,
) -> GatewayResponse {
    let taken = state
        .sessions
        .with_session(session_id, |s| {
            if s.chat_in_flight {
                return Err(PlaygroundError::RequestInFlight);
            }
            s.chat_in_flight = true;
            Ok(s.chat.clone())
        })
        .await;
    let mut chat = match taken {
        Some(Ok(chat)) => chat,
        Some(Err(e)) => return playground_err(id, e),
        None => return session_not_found(id, session_id),
    };
    let guard = state.sessions.guard(session_id, Lane::Chat);

    let result = chat.send(&state.router, text).await;
    let entries = chat.transcript().len();
    state
        .sessions
        .with_session(session_id, move |s| {
            s.chat = chat;
            s.chat_in_flight = false;
            s.touch();
        })
        .await;
    guard.disarm();

    match result {
        Ok(reply) => GatewayResponse::ok(
            id,
            json!({
                "session_id": session_id,
                "reply": reply,
                "entries": entries,
            }),
        ),
        Err(e) => GatewayResponse::inference_err(id, &e),
    }
}

async fn release_displayed(state: &GatewayState, outcome: Option<&Outcome>) {
    if let Some(blob_id) = outcome.and_then(session::displayed_blob) {
        state.blobs.release(blob_id).await;
    }
}

fn str_param<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(Value::as_str)
}

/// `{data: base64, mime?, filename?}`; the MIME type is guessed from the
/// filename when not given
fn file_param(params: &Value) -> Result<FileInput, String> {
    let data = str_param(params, "data").ok_or("Missing 'data' parameter")?;
    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|e| format!("Invalid base64 in 'data': {}", e))?;
    let mime = str_param(params, "mime").map(str::to_string).or_else(|| {
        str_param(params, "filename")
            .and_then(|name| mime_guess::from_path(name).first_raw())
            .map(str::to_string)
    });
    Ok(FileInput::new(bytes, mime))
}

fn missing_param(id: Option<String>, name: &str) -> GatewayResponse {
    GatewayResponse::err(
        id,
        ERR_INVALID_PARAMS,
        format!("Missing or empty '{}' parameter", name),
    )
}

fn session_not_found(id: Option<String>, session_id: &str) -> GatewayResponse {
    GatewayResponse::err(
        id,
        ERR_INVALID_PARAMS,
        format!("Session '{}' not found", session_id),
    )
}

fn playground_err(id: Option<String>, err: PlaygroundError) -> GatewayResponse {
    let code = match err {
        PlaygroundError::RequestInFlight => ERR_BUSY,
        PlaygroundError::NoModelSelected => ERR_INVALID_PARAMS,
    };
    warn!("Rejected request: {}", err);
    GatewayResponse::err(id, code, err.to_string())
}
