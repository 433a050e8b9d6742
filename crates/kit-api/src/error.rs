use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use kit_types::api::ActionResponse;

const INTERNAL_ERROR: &str = "Internal Server Error.";

/// Outcome of authenticating or authorizing a request.
///
/// `AuthenticationFailed` deliberately covers both "no account holds this
/// token" and "the token belongs to a different account" so callers cannot
/// tell the two apart.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No token provided.")]
    MissingToken,

    #[error("User ID is required.")]
    MissingAccountId,

    #[error("Failed to authenticate token and user ID.")]
    AuthenticationFailed,

    #[error("You do not have permission to modify this resource.")]
    Forbidden,

    #[error("Credential store unavailable: {0}")]
    StoreUnavailable(#[source] anyhow::Error),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingToken => StatusCode::FORBIDDEN,
            Self::MissingAccountId => StatusCode::BAD_REQUEST,
            Self::AuthenticationFailed => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::StoreUnavailable(e) => {
                error!("Credential store failure: {:#}", e);
                INTERNAL_ERROR.to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ActionResponse::with_message(false, message))).into_response()
    }
}

/// Error type for every handler in this crate.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// The write matched no row, e.g. the target vanished after the
    /// ownership check. Reported as a plain `{ "success": false }`.
    #[error("Request had no effect")]
    Unsuccessful,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Auth(e) => e.into_response(),
            Self::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(ActionResponse::with_message(false, message)),
            )
                .into_response(),
            Self::NotFound(message) => (
                StatusCode::NOT_FOUND,
                Json(ActionResponse::with_message(false, message)),
            )
                .into_response(),
            Self::Unsuccessful => {
                (StatusCode::BAD_REQUEST, Json(ActionResponse::failed())).into_response()
            }
            Self::Internal(e) => {
                error!("Internal error: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ActionResponse::with_message(false, INTERNAL_ERROR)),
                )
                    .into_response()
            }
        }
    }
}
