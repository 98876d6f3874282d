use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use sqlx::migrate::MigrateError;
use thiserror::Error as ThisError;

use crate::security::token::TokenError;

#[derive(Debug, ThisError)]
pub enum ExplError {
    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("Migration error: {0}")]
    MigrateError(#[from] MigrateError),

    /// The connection borrowed for migration could not be released. `primary`
    /// holds the error that ended the migration, if there was one.
    #[error("{}failed to release migration connection: {source}", fmt_primary(.primary))]
    Release {
        primary: Option<Box<ExplError>>,
        #[source]
        source: Box<ExplError>,
    },

    #[error("signing key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("unauthorized")]
    Unauthorized,

    #[error("request timed out")]
    Timeout,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found")]
    NotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn fmt_primary(primary: &Option<Box<ExplError>>) -> String {
    primary
        .as_ref()
        .map(|e| format!("{e}; additionally "))
        .unwrap_or_default()
}

impl From<figment::Error> for ExplError {
    fn from(e: figment::Error) -> Self {
        ExplError::Config(Box::new(e))
    }
}

impl ExplError {
    /// Fold a release result into the outcome of the work done while the
    /// resource was held, so neither failure is dropped.
    pub fn aggregate<T>(
        result: Result<T, ExplError>,
        released: Result<(), ExplError>,
    ) -> Result<T, ExplError> {
        match (result, released) {
            (result, Ok(())) => result,
            (Ok(_), Err(e)) => Err(ExplError::Release {
                primary: None,
                source: Box::new(e),
            }),
            (Err(primary), Err(e)) => Err(ExplError::Release {
                primary: Some(Box::new(primary)),
                source: Box::new(e),
            }),
        }
    }
}

impl IntoResponse for ExplError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match self {
            ExplError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "invalid or missing token".to_string(),
            ),
            ExplError::Timeout => (
                StatusCode::SERVICE_UNAVAILABLE,
                "TIMEOUT",
                "the request did not complete in time".to_string(),
            ),
            ExplError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "INVALID_INPUT", msg),
            // Bad and expired tokens look the same as a miss.
            ExplError::NotFound | ExplError::Token(_) => {
                return (StatusCode::NOT_FOUND, "not found").into_response();
            }
            ExplError::Config(_)
            | ExplError::InvalidConfig(_)
            | ExplError::DatabaseError(_)
            | ExplError::MigrateError(_)
            | ExplError::Release { .. }
            | ExplError::KeyGeneration(_)
            | ExplError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal server error occurred.".to_string(),
            ),
        };
        let body = ApiErrorBody {
            code: code.to_string(),
            message,
        };
        (status, Json(ApiErrorResponse { error: body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
