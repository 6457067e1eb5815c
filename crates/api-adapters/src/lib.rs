//! # api-adapters
//!
//! The HTTP surface of talkboard. Request validation and metrics are plain
//! Rust; the axum router, extractors and handlers sit behind `web-axum`.

pub mod dto;
pub mod metrics;

#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod extract;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
pub mod middleware;

use std::sync::Arc;

use services::Services;

pub use metrics::Metrics;

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<Services>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        Self {
            services: Arc::new(services),
            metrics: Arc::new(Metrics::new()),
        }
    }
}

#[cfg(feature = "web-axum")]
pub use router::router;

#[cfg(feature = "web-axum")]
mod router {
    use axum::routing::{delete, get, post, put};
    use axum::Router;

    use crate::handlers::{forum, thread, user};
    use crate::{middleware, AppState};

    /// Every route, with the standard middleware applied.
    pub fn router(state: AppState) -> Router {
        let forum_routes = Router::new()
            .route("/create", post(forum::create))
            .route("/join", post(forum::join))
            .route("/edit", put(forum::edit))
            .route("/delete", delete(forum::delete))
            .route("/list", get(forum::list_mine))
            .route("/discover", get(forum::discover))
            .route("/detail", get(forum::detail))
            .route("/list-thread", get(forum::home_threads))
            .route("/check-moderator", get(forum::check_moderator))
            .route("/remove", put(forum::remove_member))
            .route("/search", get(forum::search));

        let reply_routes = Router::new()
            .route("/create", post(thread::create_reply))
            .route("/vote", post(thread::vote_reply))
            .route("/edit", put(thread::edit_reply))
            .route("/list", get(thread::list_my_replies))
            .route("/delete", delete(thread::delete_reply));

        let thread_routes = Router::new()
            .route("/create", post(thread::create))
            .route("/vote", post(thread::vote))
            .route("/edit", put(thread::edit))
            .route("/detail", get(thread::detail))
            .route("/list", get(thread::list_mine))
            .route("/delete", delete(thread::delete))
            .nest("/reply", reply_routes);

        let api = Router::new()
            .route("/ping", get(user::ping))
            .route("/register", post(user::register))
            .route("/login", post(user::login))
            .nest("/forum", forum_routes)
            .nest("/thread", thread_routes);

        let app = Router::new()
            .nest("/api", api)
            .route("/metrics", get(crate::handlers::metrics))
            .layer(middleware::cors_policy())
            .with_state(state);

        middleware::standard_middleware(app)
    }
}
