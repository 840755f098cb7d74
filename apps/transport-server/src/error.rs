//! HTTP error mapping

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use crypto_session::CryptoError;
use serde_json::json;
use shared_protocol::ProtocolError;
use thiserror::Error;
use tracing::error;

/// Request-level error, rendered as `{ "error": <kind>, "detail": <message> }`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("Not authenticated")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),
}

impl From<ProtocolError> for ApiError {
    fn from(e: ProtocolError) -> Self {
        Self::Crypto(e.into())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Crypto(e) if e.is_fatal() => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Crypto(e) => match e {
                CryptoError::Decapsulation(_)
                | CryptoError::Authentication
                | CryptoError::InvalidNonceLength { .. }
                | CryptoError::InvalidKeyLength { .. }
                | CryptoError::InvalidPublicKey
                | CryptoError::Encapsulation(_) => StatusCode::BAD_REQUEST,
                CryptoError::Protocol(_) => StatusCode::UNPROCESSABLE_ENTITY,
                CryptoError::MissingSessionKey => StatusCode::PRECONDITION_REQUIRED,
                CryptoError::PlaintextRejected(_) => StatusCode::FORBIDDEN,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::BadRequest(_) => "bad_request",
            Self::Crypto(e) => e.kind(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Internal error: {}", self);
        }
        let body = Json(json!({
            "error": self.kind(),
            "detail": self.to_string(),
        }));
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
