//! System-level error surface for the HTTP boundary.
//!
//! Field-scoped validation and content errors travel as
//! [`crate::model::Problem`] lists inside a 200 response; the types here
//! cover the one class of failure that is reported as a server error.

use serde::{Deserialize, Serialize};

/// Stable machine-readable codes for system-error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The rendering engine refused the work because its admission
    /// control is saturated.
    EngineOverloaded,
    /// Unexpected internal failure (a render worker died).
    InternalError,
}

impl ErrorCode {
    /// Error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            ErrorCode::EngineOverloaded => "capacity",
            ErrorCode::InternalError => "server_error",
        }
    }
}

/// Body of a system-error (HTTP 500) response: `{errorCode, message}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error_code: ErrorCode,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error_code,
            message: message.into(),
        }
    }
}
