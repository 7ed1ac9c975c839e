//! Replay pipeline errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::http::response::SinkError;

#[derive(Debug, Error)]
pub enum ReplayError {
    /// The inbound body could not be read (or exceeded the buffer limit).
    #[error("failed to read request body: {0}")]
    Body(#[source] axum::Error),

    /// An upstream (authority or backend) could not be reached.
    #[error("request to {address} failed: {reason}")]
    Upstream { address: String, reason: String },

    /// A configured address is not a usable network location.
    #[error("invalid target address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// The authority response could not be captured.
    #[error("failed to capture response: {0}")]
    Sink(#[from] SinkError),
}

impl ReplayError {
    pub fn status(&self) -> StatusCode {
        match self {
            ReplayError::Body(_) => StatusCode::BAD_REQUEST,
            ReplayError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            ReplayError::InvalidAddress { .. } | ReplayError::Sink(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ReplayError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!(status = %status, error = %self, "Replay request failed");
        (status, self.to_string()).into_response()
    }
}
