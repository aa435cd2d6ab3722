//! Error taxonomy for the validation service.
//!
//! Four categories map onto HTTP responses: malformed input is a client
//! error, explicit lookups that miss are 404, a registry with no capable
//! strategy is a server-side configuration fault, and everything else is
//! internal. A similarity search that simply finds nothing is *not* an
//! error; it surfaces as [`crate::model::MatchResult::None`].

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::model::DocumentKind;

#[derive(Debug, Error)]
pub enum ValidatorError {
    /// Malformed or unparsable document/schema, or an unsupported payload.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An explicit lookup (id or name+version) found nothing.
    #[error("{0}")]
    NotFound(String),

    /// No validator or resource manager is registered for a document kind.
    #[error("no {role} registered for document kind {kind}")]
    Configuration {
        role: &'static str,
        kind: DocumentKind,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ValidatorError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Error category used as a metrics label.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "client_error",
            Self::NotFound(_) => "not_found",
            Self::Configuration { .. } => "configuration_error",
            Self::Internal(_) => "server_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Configuration { .. } | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    category: &'static str,
}

impl IntoResponse for ValidatorError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(category = self.category(), error = %self, "request failed");
        } else {
            tracing::debug!(category = self.category(), error = %self, "request rejected");
        }
        let body = ErrorBody {
            error: self.to_string(),
            category: self.category(),
        };
        (status, Json(body)).into_response()
    }
}

pub type Result<T, E = ValidatorError> = std::result::Result<T, E>;
