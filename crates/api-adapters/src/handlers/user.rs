use axum::extract::State;
use domains::{IssuedToken, User};

use crate::dto::{LoginRequest, RegisterRequest};
use crate::error::{success, ApiResult};
use crate::extract::ApiJson;
use crate::handlers::respond;
use crate::AppState;

pub async fn ping() -> ApiResult<&'static str> {
    Ok(success("pong"))
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<User> {
    let result = match req.validate() {
        Ok(registration) => state.services.users.register(registration).await,
        Err(err) => Err(err),
    };
    respond(&state, "register", result)
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<IssuedToken> {
    let result = match req.validate() {
        Ok(()) => state.services.users.login(&req.user, &req.password).await,
        Err(err) => Err(err),
    };
    respond(&state, "login", result)
}
