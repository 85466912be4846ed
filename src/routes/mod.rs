use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::Config,
    middleware::{make_span_with_request_id, request_id_middleware},
    services::RecommendationEngine,
};

pub mod geo;
pub mod recommendations;
pub mod users;
pub mod venues;

/// Largest `limit` any endpoint accepts
pub const MAX_LIMIT: usize = 100;

/// Shared application state handed to every handler
pub struct AppState {
    pub engine: RecommendationEngine,
    pub config: Config,
}

impl AppState {
    pub fn new(engine: RecommendationEngine, config: Config) -> Self {
        Self { engine, config }
    }

    /// Requested limit, or the configured default, clamped to `1..=MAX_LIMIT`
    pub fn limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.config.default_limit)
            .clamp(1, MAX_LIMIT)
    }
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
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
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/recommendations", get(recommendations::recommend))
        .route("/users/:id/preferences", get(users::preferences))
        .route("/venues/:id/similar", get(venues::similar))
        .route("/geo/distance", get(geo::distance))
        .route("/geo/bounds", get(geo::bounds))
        .route("/geo/meeting-point", post(geo::meeting_point))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::InMemoryRepository;

    fn state(default_limit: usize) -> AppState {
        let repo = Arc::new(InMemoryRepository::new());
        let config = Config {
            default_limit,
            ..Config::default()
        };
        AppState::new(RecommendationEngine::new(repo.clone(), repo), config)
    }

    #[test]
    fn test_limit_defaults_and_clamps() {
        let state = state(20);
        assert_eq!(state.limit(None), 20);
        assert_eq!(state.limit(Some(0)), 1);
        assert_eq!(state.limit(Some(5)), 5);
        assert_eq!(state.limit(Some(1000)), MAX_LIMIT);
    }
}
