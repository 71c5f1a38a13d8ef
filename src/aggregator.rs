/// Recommendation aggregation shared by the JSON and report endpoints
///
/// The pipeline for every request:
/// 1. Validate the raw request into a `SoilInput` (no external call on failure)
/// 2. Fetch weather for the location (failure is fatal to the request)
/// 3. Merge soil and weather into the engine input
/// 4. Run the prediction engine (failure is absorbed by the fallback set)
/// 5. Attach fertilizer advice and assemble the `RecommendationResult`
use crate::errors::{AppError, ResultExt};
use crate::fertilizer;
use crate::models::*;
use crate::services::{EngineError, PredictionEngine, WeatherLookup};
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

/// Crops returned when the prediction engine is unavailable or misbehaves.
pub const FALLBACK_CROPS: [&str; 3] = ["rice", "maize", "jute"];

/// The fixed fallback set: unscored, no reasoning.
pub fn fallback_recommendations() -> Vec<CropRecommendation> {
    FALLBACK_CROPS
        .iter()
        .map(|crop| CropRecommendation::unscored(*crop))
        .collect()
}

pub struct RecommendationAggregator<W, P> {
    weather: W,
    engine: P,
}

impl<W, P> RecommendationAggregator<W, P>
where
    W: WeatherLookup,
    P: PredictionEngine,
{
    pub fn new(weather: W, engine: P) -> Self {
        Self { weather, engine }
    }

    pub fn weather(&self) -> &W {
        &self.weather
    }

    pub fn engine(&self) -> &P {
        &self.engine
    }

    /// Validates the request and builds a fresh recommendation.
    pub async fn recommend(
        &self,
        request: &RecommendRequest,
    ) -> Result<RecommendationResult, AppError> {
        let soil = validate_request(request)?;
        self.aggregate(soil).await
    }

    /// Same contract as [`recommend`](Self::recommend). Always re-fetches
    /// weather and re-runs the engine so a report never reflects stale data.
    pub async fn recommend_for_report(
        &self,
        request: &RecommendRequest,
    ) -> Result<RecommendationResult, AppError> {
        let soil = validate_request(request)?;
        tracing::debug!("Building fresh recommendation for report: {}", soil.location);
        self.aggregate(soil).await
    }

    async fn aggregate(&self, soil: SoilInput) -> Result<RecommendationResult, AppError> {
        let weather = self
            .weather
            .fetch(&soil.location)
            .await
            .with_context(|| format!("Weather lookup for '{}'", soil.location))?;

        let engine_input = EngineInput::merge(&soil, &weather);

        let prediction = self
            .engine
            .predict(&engine_input)
            .await
            .and_then(|output| {
                if output.recommendations.is_empty() {
                    Err(EngineError::Empty)
                } else {
                    Ok(output)
                }
            });

        let (recommendations, engine_tips, is_fallback) = match prediction {
            Ok(output) => {
                tracing::info!(
                    "Prediction engine returned {} crop(s), top: {}",
                    output.recommendations.len(),
                    output.recommendations[0].crop
                );
                (output.recommendations, output.fertilizer_tips, false)
            }
            Err(e) => {
                tracing::warn!(
                    fallback = true,
                    location = %soil.location,
                    "Degraded service, using fallback crops: {}",
                    e
                );
                (fallback_recommendations(), Vec::new(), true)
            }
        };

        let fertilizer_tips = if engine_tips.is_empty() {
            fertilizer::recommend(&soil)
        } else {
            engine_tips
        };

        Ok(RecommendationResult {
            request_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            input: soil,
            weather,
            recommendations,
            fertilizer_tips,
            is_fallback,
        })
    }
}

/// Checks that `n`, `p`, `k`, `ph` and the location are all present, that
/// the readings are finite numbers and that the text fields are strings.
///
/// A numeric `0` is falsy and counts as missing; the string `"0"` is accepted.
pub fn validate_request(request: &RecommendRequest) -> Result<SoilInput, AppError> {
    let mut missing = Vec::new();
    let mut invalid = Vec::new();
    let mut not_text = Vec::new();

    let mut reading = |name: &'static str, value: &Option<Value>| -> f64 {
        match parse_reading(value) {
            Reading::Present(v) => v,
            Reading::Missing => {
                missing.push(name);
                f64::NAN
            }
            Reading::Invalid => {
                invalid.push(name);
                f64::NAN
            }
        }
    };

    let n = reading("n", &request.n);
    let p = reading("p", &request.p);
    let k = reading("k", &request.k);
    let ph = reading("ph", &request.ph);

    let mut text = |name: &'static str, value: &Option<Value>| -> Option<String> {
        match parse_text(value) {
            Ok(text) => text,
            Err(()) => {
                not_text.push(name);
                None
            }
        }
    };

    let location = text("city", &request.city);
    let state = text("state", &request.state);
    let season = text("season", &request.season);
    let crop_type = text("crop_type", &request.crop_type);

    if location.is_none() && !not_text.contains(&"city") {
        missing.push("city");
    }

    if !missing.is_empty() || !invalid.is_empty() || !not_text.is_empty() {
        let mut problems = Vec::new();
        if !missing.is_empty() {
            problems.push(format!("Missing required fields: {}", missing.join(", ")));
        }
        if !invalid.is_empty() {
            problems.push(format!("Fields must be numeric: {}", invalid.join(", ")));
        }
        if !not_text.is_empty() {
            problems.push(format!("Fields must be text: {}", not_text.join(", ")));
        }
        return Err(AppError::Validation(problems.join("; ")));
    }

    if !(0.0..=14.0).contains(&ph) {
        tracing::warn!("pH {} is outside the 0-14 scale", ph);
    }

    Ok(SoilInput {
        n,
        p,
        k,
        ph,
        location: location.unwrap_or_default(),
        state,
        season,
        crop_type,
    })
}

enum Reading {
    Present(f64),
    Missing,
    Invalid,
}

fn parse_reading(value: &Option<Value>) -> Reading {
    match value {
        None | Some(Value::Null) => Reading::Missing,
        Some(Value::Number(num)) => match num.as_f64() {
            Some(v) if v == 0.0 => Reading::Missing,
            Some(v) if v.is_finite() => Reading::Present(v),
            _ => Reading::Invalid,
        },
        Some(Value::String(s)) if s.trim().is_empty() => Reading::Missing,
        Some(Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Reading::Present(v),
            _ => Reading::Invalid,
        },
        Some(_) => Reading::Invalid,
    }
}

/// Trimmed text, `None` when absent or blank, `Err` for any non-string value.
fn parse_text(value: &Option<Value>) -> Result<Option<String>, ()> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let s = s.trim();
            Ok((!s.is_empty()).then(|| s.to_string()))
        }
        Some(_) => Err(()),
    }
}
