use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, State},
    http::{HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::{
    api_types::{ErrorBody, HealthResponse},
    error::{ErrorKind, RegistryError},
    observe::MetricsSnapshot,
    state::AppState,
};

pub mod models;

/// Failure of a REST handler, rendered as `{"error": ...}` with the mapped status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        let (status, message) = match err.kind() {
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, err.to_string()),
            ErrorKind::InvalidInput => (StatusCode::BAD_REQUEST, err.to_string()),
            // Duplicates fall through with the other failures.
            ErrorKind::Duplicate | ErrorKind::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_owned(),
            ),
        };
        Self { status, message }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

/// Fresh UUID for every request that arrives without an `x-request-id`.
#[derive(Clone, Copy, Default)]
struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "model-registry".to_string(),
    })
}

async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.telemetry.metrics().snapshot())
}

/// Main router for the application, with all API and health endpoints attached
pub fn app_router(state: &AppState) -> Router<AppState> {
    let span = state.telemetry.span().clone();

    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        //
        // CRUD operations on models
        //
        .route("/v1/models", get(models::list_models).post(models::create_model))
        .route(
            "/v1/models/:id",
            get(models::get_model)
                .put(models::update_model)
                .delete(models::delete_model),
        )
        .route("/v1/models/:id/status", patch(models::update_model_status))
        .route("/v1/lookup/:name/:version", get(models::lookup_model))
        //
        // Tags, metadata and version history
        //
        .route(
            "/v1/models/:id/tags",
            post(models::add_model_tags).delete(models::remove_model_tags),
        )
        .route(
            "/v1/models/:id/metadata",
            get(models::get_model_metadata).put(models::set_model_metadata),
        )
        .route(
            "/v1/models/:id/versions",
            post(models::record_model_version).get(models::list_model_versions),
        )
        //
        // Enable all of the CORS flags
        //
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http().make_span_with(move |request: &Request<axum::body::Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                tracing::info_span!(
                    parent: &span,
                    "http",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
