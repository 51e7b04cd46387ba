//! Unified error types for the service.

use std::net::SocketAddr;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Process-level errors. Any of these terminates the service.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address we tried to bind.
        addr: SocketAddr,
        /// Underlying socket error.
        source: std::io::Error,
    },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Request-level errors, recovered into a 500 response.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request body declared as JSON did not parse.
    #[error("{0}")]
    MalformedJson(#[from] serde_json::Error),

    /// Request body could not be read (too large or aborted).
    #[error("failed to read request body: {0}")]
    Body(String),

    /// A handler panicked.
    #[error("{0}")]
    Panic(String),

    /// Any other handler failure.
    #[error("{0}")]
    Internal(String),
}

/// JSON body shared by every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Short error class.
    pub error: &'static str,
    /// Human-readable detail.
    pub message: String,
}

impl ErrorBody {
    /// Body for an unmatched route.
    pub fn not_found(path: &str) -> Self {
        Self {
            error: "Not Found",
            message: format!("The requested resource {} was not found", path),
        }
    }

    /// Body for a failed request.
    pub fn internal(message: String) -> Self {
        Self {
            error: "Internal server error",
            message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        error!("Error: {}", message);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody::internal(message)),
        )
            .into_response()
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, ServiceError>;
