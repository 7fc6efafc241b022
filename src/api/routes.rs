use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;
use crate::middleware::{make_span_with_request_id, request_id_middleware};

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Bandit
        .route("/recommendations/select", post(handlers::select))
        .route("/recommendations/feedback", post(handlers::feedback))
        .route("/users/:user_id/onboarding", post(handlers::onboarding))
        .route("/bandit/stats", get(handlers::stats))
        // Nostalgia
        .route("/nostalgia/score", post(handlers::nostalgia))
        .route("/nostalgia/rank", post(handlers::nostalgia_rank))
}
