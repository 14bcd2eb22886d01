//! Error taxonomy shared by the handlers and the auth layer.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::db::StoreError;

/// Errors surfaced to API callers
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad input shape or length, or rejected credentials
    #[error("{0}")]
    Validation(String),

    /// Missing, invalid or expired token, or a token for a user that no longer exists
    #[error("{0}")]
    Auth(String),

    /// Resource absent or not owned by the caller
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Auth(_) => StatusCode::UNAUTHORIZED,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Store(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the caller. Server-side failures are not described.
    pub fn detail(&self) -> String {
        match self {
            Error::Store(_) | Error::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({ "detail": self.detail() }));

        match &self {
            Error::Store(err) => tracing::error!(error = %err, "store failure"),
            Error::Internal(msg) => tracing::error!(error = %msg, "internal failure"),
            Error::Auth(msg) => tracing::debug!(reason = %msg, "request rejected"),
            _ => {}
        }

        if matches!(self, Error::Auth(_)) {
            return (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response();
        }

        (status, body).into_response()
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_status_codes() {
        assert_eq!(Error::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::auth("x").status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            Error::Store(StoreError::Unavailable("down".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn store_failures_are_not_described_to_callers() {
        let err = Error::Store(StoreError::Unavailable("connection refused".into()));
        assert_eq!(err.detail(), "Internal server error");
        assert_eq!(Error::not_found("Client not found").detail(), "Client not found");
    }

    #[test]
    fn auth_errors_ask_for_a_bearer_token() {
        let response = Error::auth("Invalid token").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }
}
