//! Request extractors that reject with the JSON envelope.

use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::Json;
use domains::{Actor, DomainError};
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::AppState;

/// The authenticated caller. Accepts `Authorization: Bearer <token>` or a
/// bare token in the same header.
pub struct AuthActor(pub Actor);

impl FromRequestParts<AppState> for AuthActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(|header| header.strip_prefix("Bearer ").unwrap_or(header).trim())
            .filter(|token| !token.is_empty());
        let result = match token {
            Some(token) => state.services.users.authenticate(token),
            None => Err(DomainError::Unauthorized),
        };
        if let Err(err) = &result {
            state.metrics.observe("authenticate", Some(err));
        }
        Ok(AuthActor(result?))
    }
}

/// `Json` whose rejection is a `BadRequest` envelope.
pub struct ApiJson<T>(pub T);

impl<T> FromRequest<AppState> for ApiJson<T>
where
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(reject(state, "decode_body", rejection.body_text())),
        }
    }
}

/// `Query` whose rejection is a `BadRequest` envelope.
pub struct ApiQuery<T>(pub T);

impl<T> FromRequestParts<AppState> for ApiQuery<T>
where
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ApiQuery(value)),
            Err(rejection) => Err(reject(state, "decode_query", rejection.body_text())),
        }
    }
}

fn reject(state: &AppState, operation: &str, detail: String) -> ApiError {
    let err = DomainError::BadRequest(detail);
    state.metrics.observe(operation, Some(&err));
    err.into()
}
