//! # API REST
//!
//! HTTP front end for the MDSolo portal.
//!
//! Handles:
//! - full-page requests (`GET /?page=..&data=..`)
//! - asynchronous page calls returning the `{status, content}` envelope (`POST /rpc`)
//! - health and OpenAPI documentation
//!
//! Page handling itself lives in `mdsolo-core`; this crate only maps it onto HTTP.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use mdsolo_core::{
    default_registry, CoreConfig, Dispatcher, Envelope, LocalBackend, PortalError, Services,
    StaticIdentity, SystemClock, TeraRenderer,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{IntoParams, OpenApi, ToSchema};

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }
}

/// Startup settings, read from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub addr: String,
    pub base_url: String,
    pub master_sheet_id: String,
    pub calendar_id: String,
    pub root_folder: Option<String>,
    pub time_zone: String,
    pub user_email: String,
    pub data_file: Option<PathBuf>,
    pub template_dir: PathBuf,
}

impl Settings {
    /// Reads `MDSOLO_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let addr = get("MDSOLO_REST_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into());
        let user_email = get("MDSOLO_USER_EMAIL").unwrap_or_else(|| "md@localhost".into());
        Self {
            base_url: get("MDSOLO_BASE_URL").unwrap_or_else(|| "http://localhost:3000/".into()),
            master_sheet_id: get("MDSOLO_MASTER_SHEET_ID")
                .unwrap_or_else(|| "master-index".into()),
            // The practice calendar defaults to the signed-in user's own calendar.
            calendar_id: get("MDSOLO_CALENDAR_ID").unwrap_or_else(|| user_email.clone()),
            root_folder: get("MDSOLO_ROOT_FOLDER"),
            time_zone: get("MDSOLO_TIME_ZONE").unwrap_or_else(|| "UTC".into()),
            data_file: get("MDSOLO_DATA_FILE").map(PathBuf::from),
            template_dir: get("MDSOLO_TEMPLATE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("templates")),
            user_email,
            addr,
        }
    }
}

/// Builds the dispatcher over a local backend, provisioning the master index document.
pub fn build_state(settings: &Settings) -> anyhow::Result<AppState> {
    let backend = match &settings.data_file {
        Some(path) => LocalBackend::open(path)?,
        None => {
            tracing::warn!("MDSOLO_DATA_FILE not set, records are kept in memory only");
            LocalBackend::new()
        }
    };
    backend.ensure_document(&settings.master_sheet_id, "Master Index")?;

    let mut cfg = CoreConfig::new(
        &settings.base_url,
        &settings.master_sheet_id,
        &settings.calendar_id,
        &settings.time_zone,
    )?;
    if let Some(root) = &settings.root_folder {
        cfg = cfg.with_root_folder_name(root)?;
    }

    let services = Services::from_backend(
        Arc::new(backend),
        Arc::new(StaticIdentity(settings.user_email.clone())),
        Arc::new(SystemClock),
    );
    let renderer = TeraRenderer::from_dir(&settings.template_dir)?;
    let dispatcher = Dispatcher::new(
        Arc::new(cfg),
        services,
        default_registry(),
        Arc::new(renderer),
    );
    Ok(AppState::new(dispatcher))
}

#[derive(Serialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Page name. Defaults to `home`.
    pub page: Option<String>,
    /// URL-encoded JSON object.
    pub data: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RpcReq {
    pub page: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub data: Map<String, Value>,
    /// Renders this view instead of the one the page chose.
    pub view: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EnvelopeRes {
    pub status: u16,
    pub content: String,
}

impl From<Envelope> for EnvelopeRes {
    fn from(envelope: Envelope) -> Self {
        Self {
            status: envelope.status,
            content: envelope.content,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(health, page, rpc),
    components(schemas(HealthRes, RpcReq, EnvelopeRes))
)]
pub struct ApiDoc;

/// The portal's HTTP routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(page))
        .route("/rpc", post(rpc))
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(openapi))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn error_response(e: &PortalError) -> (StatusCode, &'static str) {
    match e {
        PortalError::HandlerNotFound { .. } => {
            tracing::warn!("{e}");
            (StatusCode::NOT_FOUND, "Page not found")
        }
        PortalError::InvalidInput(_) | PortalError::Payload(_) => {
            tracing::warn!("rejected request: {e}");
            (StatusCode::BAD_REQUEST, "Invalid request")
        }
        _ => {
            tracing::error!("page error: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "MDSolo REST API is alive".into(),
    })
}

#[utoipa::path(
    get,
    path = "/",
    params(PageQuery),
    responses(
        (status = 200, description = "Rendered page", content_type = "text/html"),
        (status = 302, description = "Page redirected"),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Unknown page"),
        (status = 500, description = "Internal server error")
    )
)]
/// Renders a full page.
#[axum::debug_handler]
async fn page(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Response, (StatusCode, &'static str)> {
    let dispatcher = state.dispatcher.clone();
    let document = tokio::task::spawn_blocking(move || {
        dispatcher.render_document(query.page.as_deref(), query.data.as_deref())
    })
    .await
    .map_err(|e| {
        tracing::error!("page task failed: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
    })?
    .map_err(|e| error_response(&e))?;

    let status = StatusCode::from_u16(document.status).unwrap_or(StatusCode::OK);
    if status == StatusCode::FOUND {
        return Ok((status, [(header::LOCATION, document.content)]).into_response());
    }

    // No X-Frame-Options header: documents allow embedding.
    Ok((status, Html(document.content)).into_response())
}

#[utoipa::path(
    post,
    path = "/rpc",
    request_body = RpcReq,
    responses(
        (status = 200, description = "Envelope carrying the page's own status", body = EnvelopeRes),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Unknown page"),
        (status = 500, description = "Internal server error")
    )
)]
/// Runs a page for an asynchronous caller.
#[axum::debug_handler]
async fn rpc(
    State(state): State<AppState>,
    Json(req): Json<RpcReq>,
) -> Result<Json<EnvelopeRes>, (StatusCode, &'static str)> {
    let dispatcher = state.dispatcher.clone();
    let envelope = tokio::task::spawn_blocking(move || {
        dispatcher.dispatch_async(req.page.as_deref(), req.data, req.view.as_deref())
    })
    .await
    .map_err(|e| {
        tracing::error!("rpc task failed: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
    })?
    .map_err(|e| error_response(&e))?;

    Ok(Json(envelope.into()))
}

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
