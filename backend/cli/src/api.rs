use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use sightline_core::{AnalysisConfig, AnalysisError, ImageFormat, ImageInput};
use sightline_understanding::{AnalysisView, OrchestrationController, SessionContext, SessionHandle, SessionState};

/// Headroom over the image limit so oversized uploads reach our own check.
const BODY_LIMIT_SLACK: usize = 64 * 1024;

/// Sessions untouched for this long are reaped.
pub const DEFAULT_SESSION_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

/// How often the reaper looks for idle sessions.
pub const SESSION_REAP_INTERVAL: Duration = Duration::from_secs(60);

pub struct SessionEntry {
    handle: SessionHandle,
    /// Milliseconds since `AppState::started_at` of the last request.
    last_active_ms: AtomicU64,
}

/// Shared application state for API handlers.
pub struct AppState {
    pub controller: OrchestrationController,
    pub sessions: RwLock<HashMap<Uuid, SessionEntry>>,
    /// Endpoint/credential new sessions start with (may be blank)
    pub default_config: AnalysisConfig,
    pub started_at: Instant,
    pub idle_ttl: Duration,
}

impl AppState {
    pub fn new(controller: OrchestrationController, default_config: AnalysisConfig) -> Self {
        Self {
            controller,
            sessions: RwLock::new(HashMap::new()),
            default_config,
            started_at: Instant::now(),
            idle_ttl: DEFAULT_SESSION_IDLE_TTL,
        }
    }

    pub fn with_idle_ttl(mut self, idle_ttl: Duration) -> Self {
        self.idle_ttl = idle_ttl;
        self
    }

    fn now_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    /// Drop sessions idle for longer than `idle_ttl`. Sessions with a request
    /// in flight are kept. Returns the number reaped.
    pub async fn reap_idle(&self) -> usize {
        self.reap_idle_at(self.now_ms()).await
    }

    async fn reap_idle_at(&self, now_ms: u64) -> usize {
        let ttl_ms = self.idle_ttl.as_millis() as u64;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| {
            let idle_ms = now_ms.saturating_sub(entry.last_active_ms.load(Ordering::Relaxed));
            if idle_ms < ttl_ms {
                return true;
            }
            match entry.handle.try_lock() {
                Ok(ctx) => ctx.state() == SessionState::Pending,
                // Locked means a handler is using it right now.
                Err(_) => true,
            }
        });
        let reaped = before - sessions.len();
        if reaped > 0 {
            tracing::info!(reaped, remaining = sessions.len(), "Reaped idle sessions");
        }
        reaped
    }
}

/// Run [`AppState::reap_idle`] every `every` for the life of the server.
pub fn spawn_reaper(state: Arc<AppState>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(every);
        loop {
            tick.tick().await;
            state.reap_idle().await;
        }
    })
}

type ApiError = (StatusCode, Json<Value>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

fn analysis_error(err: &AnalysisError) -> ApiError {
    let status = match err {
        AnalysisError::InvalidConfig(_) | AnalysisError::InvalidImage(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AnalysisError::Busy | AnalysisError::Superseded => StatusCode::CONFLICT,
        // Not returned by the controller; mapped for completeness.
        AnalysisError::RemoteCall(_) => StatusCode::BAD_GATEWAY,
    };
    (
        status,
        Json(json!({ "error": err.to_string(), "advisory": err.is_advisory() })),
    )
}

/// Build the Axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state.controller.builder().max_image_bytes() + BODY_LIMIT_SLACK;
    Router::new()
        .route("/api/health", get(health))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        .route("/api/sessions/:id/config", put(set_config))
        .route("/api/sessions/:id/image", put(upload_image))
        .route("/api/sessions/:id/analyze", post(analyze))
        .route("/api/sessions/:id/cancel", post(cancel))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ImageSummary {
    pub format: ImageFormat,
    pub bytes: usize,
}

/// What a UI needs to render a session. Never includes the credential.
#[derive(Debug, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub state: SessionState,
    pub can_analyze: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<&'static str>,
    pub endpoint: String,
    pub credential_set: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisView>,
}

impl SessionSnapshot {
    fn of(ctx: &SessionContext) -> Self {
        Self {
            id: ctx.id(),
            state: ctx.state(),
            can_analyze: ctx.can_trigger(),
            advisory: ctx.advisory(),
            endpoint: ctx.config().endpoint.clone(),
            credential_set: !ctx.config().credential.trim().is_empty(),
            image: ctx.image().map(|i| ImageSummary {
                format: i.format(),
                bytes: i.len(),
            }),
            result: ctx.outcome().map(AnalysisView::from_outcome),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub state: SessionState,
    pub result: AnalysisView,
}

#[derive(Debug, Deserialize)]
pub struct ConfigPayload {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub credential: String,
}

#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    pub filename: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Look up a session and mark it active.
async fn session(state: &AppState, id: Uuid) -> Result<SessionHandle, ApiError> {
    let sessions = state.sessions.read().await;
    let entry = sessions
        .get(&id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("session {id} not found")))?;
    entry.last_active_ms.store(state.now_ms(), Ordering::Relaxed);
    Ok(Arc::clone(&entry.handle))
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "sightline",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.sessions.read().await.len(),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    }))
}

async fn create_session(State(state): State<Arc<AppState>>) -> (StatusCode, Json<SessionSnapshot>) {
    let ctx = SessionContext::new().with_config(state.default_config.clone());
    let snapshot = SessionSnapshot::of(&ctx);
    let entry = SessionEntry {
        handle: ctx.into_handle(),
        last_active_ms: AtomicU64::new(state.now_ms()),
    };
    state.sessions.write().await.insert(snapshot.id, entry);
    tracing::info!(session = %snapshot.id, "Session created");
    (StatusCode::CREATED, Json(snapshot))
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<SessionSnapshot> {
    let handle = session(&state, id).await?;
    let ctx = handle.lock().await;
    Ok(Json(SessionSnapshot::of(&ctx)))
}

async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let removed = state.sessions.write().await.remove(&id);
    match removed {
        Some(entry) => {
            // Drop any in-flight result along with the session.
            entry.handle.lock().await.cancel();
            tracing::info!(session = %id, "Session deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(api_error(StatusCode::NOT_FOUND, format!("session {id} not found"))),
    }
}

async fn set_config(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConfigPayload>,
) -> ApiResult<SessionSnapshot> {
    let handle = session(&state, id).await?;
    let mut ctx = handle.lock().await;
    ctx.set_config(AnalysisConfig::new(payload.endpoint, payload.credential));
    Ok(Json(SessionSnapshot::of(&ctx)))
}

async fn upload_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<ImageQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<SessionSnapshot> {
    let handle = session(&state, id).await?;

    let image = match &query.filename {
        Some(filename) => ImageInput::from_upload(filename, body.to_vec()),
        None => headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(ImageFormat::from_mime)
            .map(|format| ImageInput::new(body.to_vec(), format))
            .ok_or_else(|| {
                AnalysisError::InvalidImage(
                    "declare the image type with Content-Type image/jpeg or image/png, or ?filename=".into(),
                )
            }),
    }
    .and_then(|image| {
        state.controller.builder().validate_image(&image)?;
        Ok(image)
    })
    .map_err(|e| analysis_error(&e))?;

    let mut ctx = handle.lock().await;
    if ctx.set_image(image) {
        tracing::info!(session = %id, "New image discarded the in-flight analysis");
    }
    Ok(Json(SessionSnapshot::of(&ctx)))
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<AnalyzeResponse> {
    let handle = session(&state, id).await?;
    let outcome = state
        .controller
        .analyze(&handle)
        .await
        .map_err(|e| analysis_error(&e))?;

    let session_state = handle.lock().await.state();
    Ok(Json(AnalyzeResponse {
        state: session_state,
        result: AnalysisView::from_outcome(&outcome),
    }))
}

async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<SessionSnapshot> {
    let handle = session(&state, id).await?;
    let mut ctx = handle.lock().await;
    ctx.cancel();
    Ok(Json(SessionSnapshot::of(&ctx)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use sightline_core::RemoteCallError;
    use sightline_understanding::MockVisionClient;
    use tower::ServiceExt;

    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];

    fn app_state(client: MockVisionClient, default_config: AnalysisConfig) -> Arc<AppState> {
        let controller = OrchestrationController::new(Arc::new(client));
        Arc::new(AppState::new(controller, default_config))
    }

    fn app(client: MockVisionClient, default_config: AnalysisConfig) -> Router {
        build_router(app_state(client, default_config))
    }

    fn slow_dog_client(delay: Duration) -> MockVisionClient {
        dog_client().with_delay(delay)
    }

    /// Start an analyze request in the background and wait until it is pending.
    async fn start_pending(app: &Router, id: &str) -> tokio::task::JoinHandle<(StatusCode, Value)> {
        let task = {
            let app = app.clone();
            let req = post_analyze(id);
            tokio::spawn(async move { send(&app, req).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let (_, body) = send(app, fetch_session(id)).await;
        assert_eq!(body["state"], "pending");
        task
    }

    fn fetch_session(id: &str) -> Request<Body> {
        Request::get(format!("/api/sessions/{id}")).body(Body::empty()).unwrap()
    }

    fn dog_client() -> MockVisionClient {
        MockVisionClient::from_json(json!({
            "captionResult": { "text": "a dog", "confidence": 0.92 },
            "tagsResult": { "values": [
                { "name": "dog", "confidence": 0.95 },
                { "name": "animal", "confidence": 0.80 }
            ]},
            "objectsResult": { "values": [ { "tags": [ { "name": "dog", "confidence": 0.90 } ] } ] }
        }))
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create(app: &Router) -> String {
        let (status, body) = send(
            app,
            Request::post("/api/sessions").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    fn put_image(id: &str) -> Request<Body> {
        Request::put(format!("/api/sessions/{id}/image"))
            .header(CONTENT_TYPE, "image/jpeg")
            .body(Body::from(JPEG.to_vec()))
            .unwrap()
    }

    fn put_config(id: &str, endpoint: &str, credential: &str) -> Request<Body> {
        Request::put(format!("/api/sessions/{id}/config"))
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "endpoint": endpoint, "credential": credential }).to_string(),
            ))
            .unwrap()
    }

    fn post_analyze(id: &str) -> Request<Body> {
        Request::post(format!("/api/sessions/{id}/analyze"))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = app(dog_client(), AnalysisConfig::default());
        let (status, body) = send(&app, Request::get("/api/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_full_session_flow() {
        let app = app(dog_client(), AnalysisConfig::default());
        let id = create(&app).await;

        let (_, body) = send(&app, put_image(&id)).await;
        assert_eq!(body["state"], "idle");
        assert_eq!(body["advisory"], "Please enter your Azure credentials");

        let (_, body) = send(&app, put_config(&id, "https://x", "k")).await;
        assert_eq!(body["state"], "ready");
        assert_eq!(body["can_analyze"], true);
        assert_eq!(body["credential_set"], true);
        assert!(!body.to_string().contains("\"k\""));

        let (status, body) = send(&app, post_analyze(&id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "resolved");
        assert_eq!(body["result"]["banner"]["kind"], "success");
        assert_eq!(body["result"]["caption"]["confidence"], "92.0%");
        assert_eq!(body["result"]["tags"], "dog (95%), animal (80%)");
        assert_eq!(body["result"]["objects"][0], "dog - 90%");

        let (_, body) = send(
            &app,
            Request::get(format!("/api/sessions/{id}")).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(body["result"]["caption"]["text"], "a dog");
    }

    #[tokio::test]
    async fn test_analyze_without_credentials_is_advisory() {
        let app = app(dog_client(), AnalysisConfig::default());
        let id = create(&app).await;
        send(&app, put_image(&id)).await;

        let (status, body) = send(&app, post_analyze(&id)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["advisory"], true);
    }

    #[tokio::test]
    async fn test_remote_failure_is_error_banner() {
        let client = MockVisionClient::failing(RemoteCallError::from_status(401, "Access denied"));
        let app = app(client, AnalysisConfig::new("https://x", "k"));
        let id = create(&app).await;
        send(&app, put_image(&id)).await;

        let (status, body) = send(&app, post_analyze(&id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["banner"]["kind"], "error");
        assert!(body["result"]["banner"]["text"]
            .as_str()
            .unwrap()
            .contains("authentication"));
    }

    #[tokio::test]
    async fn test_rejects_unrecognized_upload() {
        let app = app(dog_client(), AnalysisConfig::default());
        let id = create(&app).await;
        let req = Request::put(format!("/api/sessions/{id}/image?filename=doc.pdf"))
            .body(Body::from(b"%PDF-1.4".to_vec()))
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("unsupported file type"));
    }

    #[tokio::test]
    async fn test_unknown_and_deleted_session() {
        let app = app(dog_client(), AnalysisConfig::default());
        let (status, _) = send(
            &app,
            Request::get(format!("/api/sessions/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let id = create(&app).await;
        let (status, _) = send(
            &app,
            Request::delete(format!("/api/sessions/{id}")).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, post_analyze(&id)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_second_analyze_while_pending_conflicts() {
        let app = app(
            slow_dog_client(Duration::from_millis(300)),
            AnalysisConfig::new("https://x", "k"),
        );
        let id = create(&app).await;
        send(&app, put_image(&id)).await;

        let first = start_pending(&app, &id).await;
        let (status, body) = send(&app, post_analyze(&id)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["advisory"], false);

        let (status, body) = first.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "resolved");
    }

    #[tokio::test]
    async fn test_new_image_while_pending_supersedes() {
        let app = app(
            slow_dog_client(Duration::from_secs(5)),
            AnalysisConfig::new("https://x", "k"),
        );
        let id = create(&app).await;
        send(&app, put_image(&id)).await;

        let first = start_pending(&app, &id).await;
        let (status, body) = send(&app, put_image(&id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "ready");

        let (status, body) = first.await.unwrap();
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("superseded"));

        let (_, body) = send(&app, fetch_session(&id)).await;
        assert_eq!(body["state"], "ready");
        assert!(body.get("result").is_none());
    }

    #[tokio::test]
    async fn test_cancel_returns_session_to_ready() {
        let app = app(
            slow_dog_client(Duration::from_secs(5)),
            AnalysisConfig::new("https://x", "k"),
        );
        let id = create(&app).await;
        send(&app, put_image(&id)).await;

        let first = start_pending(&app, &id).await;
        let (status, body) = send(
            &app,
            Request::post(format!("/api/sessions/{id}/cancel"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "ready");
        assert_eq!(body["can_analyze"], true);

        let (status, _) = first.await.unwrap();
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_reaper_drops_idle_sessions_but_keeps_pending() {
        let state = app_state(
            slow_dog_client(Duration::from_millis(500)),
            AnalysisConfig::new("https://x", "k"),
        );
        let app = build_router(Arc::clone(&state));
        let idle = create(&app).await;
        let busy = create(&app).await;
        send(&app, put_image(&busy)).await;
        let pending = start_pending(&app, &busy).await;

        assert_eq!(state.reap_idle().await, 0);
        let later = state.now_ms() + state.idle_ttl.as_millis() as u64 + 1;
        assert_eq!(state.reap_idle_at(later).await, 1);

        let (status, _) = send(&app, fetch_session(&idle)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = pending.await.unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    #[test]
    fn test_error_status_mapping() {
        let status = |err: AnalysisError| analysis_error(&err).0;
        assert_eq!(status(AnalysisError::InvalidConfig("x".into())), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status(AnalysisError::InvalidImage("x".into())), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status(AnalysisError::Busy), StatusCode::CONFLICT);
        assert_eq!(status(AnalysisError::Superseded), StatusCode::CONFLICT);
        assert_eq!(status(RemoteCallError::Timeout.into()), StatusCode::BAD_GATEWAY);
    }
}
