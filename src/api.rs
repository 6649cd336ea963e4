//! REST API Server for the bank support agent
//!
//! POST /support runs the failover chain; GET /health reports the chain.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::agent::Orchestrator;
use crate::error::SupportError;
use crate::models::{HealthReport, SupportQuery};

/// Response header naming the evaluator that produced the assessment
pub const SERVED_BY_HEADER: &str = "x-served-by";

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health(State(state): State<ApiState>) -> Json<HealthReport> {
    let chain = state.orchestrator.describe();

    Json(HealthReport {
        status: "ok".to_string(),
        ai_enabled: chain.ai_enabled,
        primary_llm: chain.primary_llm,
        fallback_llm: chain.fallback_llm,
        timestamp: chrono::Utc::now(),
    })
}

/// =============================
/// Support Endpoint
/// =============================

async fn support(
    State(state): State<ApiState>,
    payload: Result<Json<SupportQuery>, JsonRejection>,
) -> Response {
    let query = match payload {
        Ok(Json(query)) => query,
        Err(rejection) => return reject(rejection),
    };

    info!(
        customer_id = query.customer_id,
        question_len = query.question.len(),
        "Received support request"
    );
    debug!(question = %query.question, "Support question");

    let outcome = state.orchestrator.assess(&query).await;

    let served_by = HeaderValue::from_str(&outcome.served_by)
        .unwrap_or_else(|_| HeaderValue::from_static("unknown"));

    (
        StatusCode::OK,
        [(HeaderName::from_static(SERVED_BY_HEADER), served_by)],
        Json(outcome.assessment),
    )
        .into_response()
}

/// Body problems never reach an evaluator. Missing or mistyped fields are a
/// validation error; malformed JSON and wrong content types keep axum's status.
fn reject(rejection: JsonRejection) -> Response {
    let response = match rejection {
        JsonRejection::JsonDataError(e) => SupportError::ValidationError(e.body_text()).into_response(),
        other => error_body(other.status(), other.body_text()),
    };

    warn!(status = response.status().as_u16(), "Rejected support request");
    response
}

/// =============================
/// Error Responses
/// =============================

impl SupportError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SupportError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SupportError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = match self {
            SupportError::ValidationError(detail) => detail,
            other => other.to_string(),
        };
        error_body(status, detail)
    }
}

fn error_body(status: StatusCode, detail: String) -> Response {
    (status, Json(serde_json::json!({ "detail": detail }))).into_response()
}

/// =============================
/// Router
/// =============================

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn create_router(orchestrator: Arc<Orchestrator>, cors_origins: &[String]) -> Router {
    let state = ApiState { orchestrator };

    Router::new()
        .route("/health", get(health))
        .route("/support", post(support))
        .with_state(state)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    orchestrator: Arc<Orchestrator>,
    port: u16,
    cors_origins: &[String],
) -> crate::Result<()> {
    let router = create_router(orchestrator, cors_origins);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
