use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mitti_mitra_api::api::{handlers::AppState, routes};
use mitti_mitra_api::config::Config;
use mitti_mitra_api::core::aggregator::RecommendationAggregator;
use mitti_mitra_api::integrations::services::{OpenWeatherService, ScriptPredictionEngine};

/// Main entry point for the application.
///
/// Initializes tracing, loads configuration, wires the weather client and the
/// prediction engine into the aggregator, and serves the HTTP routes with
/// rate limiting, CORS and request tracing.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mitti_mitra_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    let weather = OpenWeatherService::new(&config)?;
    tracing::info!("✓ Weather client initialized: {}", config.weather_base_url);

    let engine = ScriptPredictionEngine::new(&config);
    tracing::info!(
        "✓ Prediction engine configured: {} (timeout {}s)",
        config.predict_command,
        config.predict_timeout_secs
    );

    let app_state = Arc::new(AppState {
        config: config.clone(),
        aggregator: RecommendationAggregator::new(weather, engine),
    });

    // Configure per-IP rate limiter
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(config.rate_limit_per_second)
            .burst_size(config.rate_limit_burst)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limit configuration"))?,
    );

    let api = routes::api_routes::<OpenWeatherService, ScriptPredictionEngine>().layer(
        ServiceBuilder::new().layer(GovernorLayer {
            config: governor_conf,
        }),
    );

    // Health check stays outside the rate limiter
    let app = routes::build_router(app_state, api);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
