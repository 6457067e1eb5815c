//! Route handlers. Each one validates its input, calls a single service
//! operation and records the outcome.

pub mod forum;
pub mod thread;
pub mod user;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use domains::Result;
use serde::Serialize;

use crate::error::{success, ApiResult};
use crate::AppState;

/// Counts the outcome under `operation` and wraps it in the envelope.
pub(crate) fn respond<T: Serialize>(state: &AppState, operation: &str, result: Result<T>) -> ApiResult<T> {
    state.metrics.observe(operation, result.as_ref().err());
    Ok(success(result?))
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                "application/openmetrics-text; version=1.0.0; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}
