//! HTTP API: status, health, prediction and Prometheus metrics

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use price_lib::{
    schema::SCHEMA_FIELDS, ErrorResponse, FeatureRecord, HealthResponse, PredictionResponse,
    PredictionService, ServiceError, StatusResponse,
};
use prometheus::{Encoder, TextEncoder};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Shared application state
pub struct AppState {
    pub service: PredictionService,
}

impl AppState {
    pub fn new(service: PredictionService) -> Self {
        Self { service }
    }
}

/// Service error rendered as `{"detail": ...}`
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            ServiceError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorResponse {
            detail: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Status summary, always 200
async fn root(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(state.service.status())
}

/// 200 when the model is loaded, 503 with the load error otherwise
async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, ApiError> {
    Ok(Json(state.service.health()?))
}

async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FeatureRecord>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let service = &state.service;

    // Readiness wins over payload validation
    service.ensure_ready()?;

    let Json(record) = payload.map_err(|rejection| {
        let err = ServiceError::BadRequest(format!("invalid_request: {}", rejection.body_text()));
        service.record_rejection(&err);
        err
    })?;

    Ok(Json(service.predict(&record)?))
}

/// Machine-readable endpoint listing
async fn docs() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "endpoints": [
            { "method": "GET", "path": "/", "description": "Service status summary" },
            { "method": "GET", "path": "/health", "description": "200 when the model is loaded, 503 otherwise" },
            { "method": "POST", "path": "/predict", "description": "Predict the monthly rent in CHF" },
            { "method": "GET", "path": "/metrics", "description": "Prometheus metrics" }
        ],
        "predict_request": {
            "fields": SCHEMA_FIELDS,
            "example": {
                "surface_m2": 45.0,
                "num_rooms": 2.0,
                "is_furnished": true,
                "wifi_incl": false,
                "charges_incl": true,
                "car_park": false
            }
        },
        "predict_response": { "price_chf_pred": "number" }
    }))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    // Wide open; restrict origins in production deployments.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/docs", get(docs))
        .route("/metrics", get(metrics))
        .layer(cors)
        .with_state(state)
}

/// Start the API server and run until `shutdown` resolves
pub async fn serve(
    addr: &str,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
