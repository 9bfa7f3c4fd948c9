//! Application setup: router, shared state, middleware layers.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use engine_core::Engine;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::routes;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

pub fn build_app(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route(
            "/requests",
            post(routes::create_request).get(routes::list_requests),
        )
        .route("/requests/:id", get(routes::get_request))
        .route("/requests/:id/advance", post(routes::advance_request))
        .route("/requests/:id/cancel", post(routes::cancel_request))
        .route("/requests/:id/matches", get(routes::match_history))
        .route("/requests/:id/status-log", get(routes::status_history))
        .route("/matches/:id/respond", post(routes::respond_to_match))
        .route("/volunteers", post(routes::register_volunteer))
        .route(
            "/volunteers/:id/availability",
            post(routes::set_availability),
        )
        .route("/users/:id/volunteer", get(routes::volunteer_for_user))
        .route("/users/:id/notifications", get(routes::notifications))
        .route("/notifications/:id/read", post(routes::mark_read))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { engine })
}
