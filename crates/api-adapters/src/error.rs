//! Response envelope and the mapping from domain errors to HTTP statuses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use domains::DomainError;
use serde::Serialize;
use tracing::error;

pub const SUCCESS: &str = "Success";
const INTERNAL_MESSAGE: &str = "internal server error";

/// Every response body, success or failure.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: u16,
    pub message: String,
    pub data: T,
}

pub type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

pub fn success<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        status: StatusCode::OK.as_u16(),
        message: SUCCESS.to_string(),
        data,
    })
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub DomainError);

pub fn status_of(err: &DomainError) -> StatusCode {
    match err {
        DomainError::BadRequest(_) => StatusCode::BAD_REQUEST,
        DomainError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::AlreadyExists(_) | DomainError::AlreadyMember => StatusCode::CONFLICT,
        DomainError::NotMember
        | DomainError::NotModerator
        | DomainError::NotCreator(_)
        | DomainError::RoleNotAuthorized => StatusCode::FORBIDDEN,
        DomainError::Unauthorized | DomainError::FailedLogin => StatusCode::UNAUTHORIZED,
        DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_of(&self.0);
        let message = match &self.0 {
            DomainError::Internal(detail) => {
                error!(detail = %detail, "request failed");
                INTERNAL_MESSAGE.to_string()
            }
            other => other.to_string(),
        };
        let body = Envelope {
            status: status.as_u16(),
            message,
            data: (),
        };
        (status, Json(body)).into_response()
    }
}
