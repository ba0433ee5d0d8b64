//! HTTP surface: the execute endpoint plus health probes.

use crate::error::{ErrorCode, ErrorResponse};
use crate::execute::{self, ExecuteOutcome, SERVICE_OVERLOADED_MESSAGE};
use crate::health;
use crate::model::ExecuteRequest;
use crate::state::AppState;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;

pub const EMPTY_REQUEST_MESSAGE: &str = "Empty template and data model";

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/execute", post(execute_handler))
        .route("/health", get(health::liveness_handler))
        .route("/ready", get(health::readiness_handler))
        .with_state(state)
}

async fn execute_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExecuteRequest>,
) -> Response {
    match execute::execute(&state.engine, &request).await {
        ExecuteOutcome::EmptyRequest => {
            (StatusCode::BAD_REQUEST, EMPTY_REQUEST_MESSAGE).into_response()
        }
        ExecuteOutcome::Completed(response) => (StatusCode::OK, Json(response)).into_response(),
        ExecuteOutcome::Overloaded => {
            tracing::warn!(
                category = ErrorCode::EngineOverloaded.category(),
                "render refused: engine at capacity"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    ErrorCode::EngineOverloaded,
                    SERVICE_OVERLOADED_MESSAGE,
                )),
            )
                .into_response()
        }
        ExecuteOutcome::Internal(detail) => {
            tracing::error!(
                category = ErrorCode::InternalError.category(),
                detail = %detail,
                "execute pipeline failed internally"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    ErrorCode::InternalError,
                    "Internal error while handling the request.",
                )),
            )
                .into_response()
        }
    }
}
