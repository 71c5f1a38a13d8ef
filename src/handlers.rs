use crate::aggregator::RecommendationAggregator;
use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::models::*;
use crate::report;
use crate::services::{PredictionEngine, WeatherLookup};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderName, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// Marks a report built from the fallback crop set.
pub const FALLBACK_HEADER: &str = "x-recommendation-fallback";

/// Shared application state injected into handlers.
///
/// Nothing here is mutated per request; each request builds and owns its own
/// `RecommendationResult`.
pub struct AppState<W, P> {
    /// Application configuration.
    pub config: Config,
    /// Weather + prediction orchestration.
    pub aggregator: RecommendationAggregator<W, P>,
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "mitti-mitra-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /recommend
///
/// Validates soil input, fetches weather and returns ranked crops with
/// fertilizer advice. A failing prediction engine still yields 200 with the
/// fallback set and `is_fallback: true`.
pub async fn recommend<W, P>(
    State(state): State<Arc<AppState<W, P>>>,
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> Result<Json<RecommendationResult>, AppError>
where
    W: WeatherLookup + 'static,
    P: PredictionEngine + 'static,
{
    let Json(request) = payload?;
    tracing::info!("POST /recommend - city: {:?}", request.city);

    let result = state.aggregator.recommend(&request).await?;

    tracing::info!(
        "Recommendation {} ready: {} crop(s), fallback: {}",
        result.request_id,
        result.recommendations.len(),
        result.is_fallback
    );

    Ok(Json(result))
}

/// POST /recommend/report
///
/// Re-runs the whole recommendation (fresh weather, fresh prediction) and
/// returns it as a PDF attachment. The document is fully rendered before the
/// response starts, so a render failure is a 500, never a truncated file.
pub async fn recommend_report<W, P>(
    State(state): State<Arc<AppState<W, P>>>,
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError>
where
    W: WeatherLookup + 'static,
    P: PredictionEngine + 'static,
{
    let Json(request) = payload?;
    tracing::info!("POST /recommend/report - city: {:?}", request.city);

    let result = state.aggregator.recommend_for_report(&request).await?;
    let request_id = result.request_id;
    let is_fallback = result.is_fallback;

    let bytes = tokio::task::spawn_blocking(move || {
        let document = report::render(&result);
        report::write_pdf(&document)
    })
    .await
    .map_err(AppError::from)
    .and_then(|rendered| rendered)
    .with_context(|| format!("Rendering report {}", request_id))?;

    tracing::info!(
        "Report {} rendered ({} bytes, fallback: {})",
        request_id,
        bytes.len(),
        is_fallback
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", report::REPORT_FILENAME),
            ),
            (
                HeaderName::from_static(FALLBACK_HEADER),
                is_fallback.to_string(),
            ),
        ],
        bytes,
    ))
}
