mod support;

use std::sync::Arc;

use api_adapters::{router, AppState};
use auth_adapters::Argon2Hasher;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use services::Services;
use storage_adapters::MemoryStore;
use support::token_service;
use tower::ServiceExt;

fn app() -> Router {
    let services = Services::new(
        Arc::new(MemoryStore::new()),
        Arc::new(Argon2Hasher::new()),
        Arc::new(token_service()),
    );
    router(AppState::new(services))
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn signed_up(app: &Router, email: &str, nim: &str) -> String {
    let (status, _) = call(
        app,
        Method::POST,
        "/api/register",
        None,
        Some(json!({ "email": email, "nim": nim, "password": "hunter2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({ "user": nim, "password": "hunter2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["token"].as_str().unwrap().to_string()
}

async fn metrics_text(app: &Router) -> String {
    let request = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn ping_answers_pong_in_the_envelope() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api/ping", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": 200, "message": "Success", "data": "pong" }));
}

#[tokio::test]
async fn actor_routes_require_a_valid_token() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api/forum/list", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "unauthorized");
    assert_eq!(body["data"], Value::Null);

    let (status, _) = call(&app, Method::GET, "/api/forum/list", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bad_credentials_are_a_failed_login() {
    let app = app();
    signed_up(&app, "ana@example.com", "2101234567").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({ "user": "ana@example.com", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body["message"],
        "failed to login because of wrong email or password"
    );
}

#[tokio::test]
async fn structural_problems_are_rejected_before_the_services() {
    let app = app();
    let token = signed_up(&app, "ana@example.com", "2101234567").await;

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/register",
        None,
        Some(json!({ "email": "not-an-email", "password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/forum/create",
        Some(&token),
        Some(json!({ "forum_name": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/thread/vote",
        Some(&token),
        Some(json!({ "thread_id": "abc", "vote": true })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/forum/join")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn forum_and_thread_flow_over_http() {
    let app = app();
    let ana = signed_up(&app, "ana@example.com", "2101234567").await;
    let bo = signed_up(&app, "bo@example.com", "2107654321").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/forum/create",
        Some(&ana),
        Some(json!({ "forum_name": "Chess Club", "introduction_text": "64 squares", "category": "games" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let forum_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/forum/create",
        Some(&bo),
        Some(json!({ "forum_name": "Chess Club" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "forum name already exists");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/thread/create",
        Some(&bo),
        Some(json!({ "forum_id": forum_id.to_string(), "title": "hi", "text": "there" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "user is not a member of the forum");

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/forum/join",
        Some(&bo),
        Some(json!({ "forum_id": forum_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/thread/create",
        Some(&bo),
        Some(json!({ "forum_id": forum_id.to_string(), "title": "Sicilian", "text": "c5" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let thread_id = body["data"]["id"].as_i64().unwrap();

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/thread/vote",
        Some(&ana),
        Some(json!({ "thread_id": thread_id.to_string(), "vote": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/api/thread/detail?thread_id={thread_id}"),
        Some(&bo),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_upvotes"], 1);
    assert_eq!(body["data"]["total_downvotes"], 0);
    assert_eq!(body["data"]["thread"]["title"], "Sicilian");

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/api/forum/check-moderator?forum_id={forum_id}"),
        Some(&bo),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "user is not a moderator of the forum");

    let (status, _) = call(
        &app,
        Method::DELETE,
        "/api/forum/delete",
        Some(&ana),
        Some(json!({ "forum_id": forum_id.to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/api/forum/detail?forum_id={forum_id}"),
        Some(&ana),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "forum not found");
}

#[tokio::test]
async fn metrics_count_rule_outcomes() {
    let app = app();
    let token = signed_up(&app, "ana@example.com", "2101234567").await;
    call(
        &app,
        Method::POST,
        "/api/forum/join",
        Some(&token),
        Some(json!({ "forum_id": 999 })),
    )
    .await;

    let text = metrics_text(&app).await;
    assert!(text.contains("talkboard_rule_outcomes_total"));
    assert!(text.contains("operation=\"join_forum\""));
    assert!(text.contains("outcome=\"not_found\""));
}

#[tokio::test]
async fn rejected_input_is_counted_as_an_outcome() {
    let app = app();
    let token = signed_up(&app, "ana@example.com", "2101234567").await;

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/forum/create",
        Some(&token),
        Some(json!({ "forum_name": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/thread/vote",
        Some(&token),
        Some(json!({ "thread_id": "abc", "vote": true })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/forum/join")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, Method::GET, "/api/forum/list", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let text = metrics_text(&app).await;
    let counted = |operation: &str, outcome: &str| {
        text.lines().any(|line| {
            line.starts_with("talkboard_rule_outcomes_total{")
                && line.contains(&format!("operation=\"{operation}\""))
                && line.contains(&format!("outcome=\"{outcome}\""))
                && line.ends_with(" 1")
        })
    };
    assert!(counted("create_forum", "validation_failed"), "{text}");
    assert!(counted("vote_thread", "validation_failed"), "{text}");
    assert!(counted("decode_body", "bad_request"), "{text}");
    assert!(counted("authenticate", "unauthorized"), "{text}");
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = app();
    let request = Request::builder().uri("/api/ping").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}
