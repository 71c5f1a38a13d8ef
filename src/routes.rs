use crate::handlers::{self, AppState};
use crate::services::{PredictionEngine, WeatherLookup};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Request bodies are a handful of soil readings; anything larger is refused.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Recommendation endpoints, still awaiting state. Rate limiting is layered on
/// top of these in `main`.
pub fn api_routes<W, P>() -> Router<Arc<AppState<W, P>>>
where
    W: WeatherLookup + 'static,
    P: PredictionEngine + 'static,
{
    Router::new()
        .route("/recommend", post(handlers::recommend::<W, P>))
        .route("/recommend/report", post(handlers::recommend_report::<W, P>))
        // Path the web client posts to
        .route("/recommend/pdf", post(handlers::recommend_report::<W, P>))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
}

/// Full application: health check (outside any rate limit) merged with the
/// given API routes, tracing and CORS.
pub fn build_router<W, P>(
    state: Arc<AppState<W, P>>,
    api: Router<Arc<AppState<W, P>>>,
) -> Router
where
    W: WeatherLookup + 'static,
    P: PredictionEngine + 'static,
{
    Router::new()
        .route("/health", get(handlers::health))
        .merge(api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
