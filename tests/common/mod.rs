//! Stand-in collaborators shared by the integration tests.
#![allow(dead_code)]

use chrono::Utc;
use mitti_mitra_api::config::Config;
use mitti_mitra_api::errors::AppError;
use mitti_mitra_api::models::*;
use mitti_mitra_api::services::{EngineError, PredictionEngine, WeatherLookup};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Weather lookup replaying canned readings in order; the last one repeats.
pub struct MockWeather {
    readings: Vec<(f64, f64, f64)>,
    fail_with: Option<String>,
    calls: AtomicUsize,
}

impl MockWeather {
    pub fn returning(temp: f64, humidity: f64, rainfall: f64) -> Self {
        Self::sequence(vec![(temp, humidity, rainfall)])
    }

    pub fn sequence(readings: Vec<(f64, f64, f64)>) -> Self {
        Self {
            readings,
            fail_with: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            readings: Vec::new(),
            fail_with: Some(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl WeatherLookup for MockWeather {
    async fn fetch(&self, location: &str) -> Result<WeatherReading, AppError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(msg) = &self.fail_with {
            return Err(AppError::WeatherLookup(msg.clone()));
        }
        let (temp, humidity, rainfall) = self.readings[call.min(self.readings.len() - 1)];
        Ok(WeatherReading {
            location: location.to_string(),
            temp,
            humidity,
            rainfall,
            fetched_at: Utc::now(),
        })
    }
}

/// Prediction engine with a fixed outcome that records what it was asked.
pub struct MockEngine {
    outcome: Result<EngineOutput, EngineError>,
    calls: AtomicUsize,
    last_input: Mutex<Option<EngineInput>>,
}

impl MockEngine {
    pub fn returning(output: EngineOutput) -> Self {
        Self::with_outcome(Ok(output))
    }

    pub fn failing(err: EngineError) -> Self {
        Self::with_outcome(Err(err))
    }

    fn with_outcome(outcome: Result<EngineOutput, EngineError>) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
            last_input: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_input(&self) -> Option<EngineInput> {
        self.last_input.lock().unwrap().clone()
    }
}

impl PredictionEngine for MockEngine {
    async fn predict(&self, input: &EngineInput) -> Result<EngineOutput, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_input.lock().unwrap() = Some(input.clone());
        self.outcome.clone()
    }
}

pub fn rec(crop: &str, confidence: f64, reasoning: &[&str]) -> CropRecommendation {
    CropRecommendation {
        crop: crop.to_string(),
        confidence: Some(confidence),
        reasoning: reasoning.iter().map(|r| r.to_string()).collect(),
        predicted_yield: None,
    }
}

/// Engine output of the end-to-end example: rice (92) then maize (75).
pub fn rice_and_maize() -> EngineOutput {
    EngineOutput {
        recommendations: vec![
            rec("rice", 92.0, &["high humidity favors rice"]),
            rec("maize", 75.0, &[]),
        ],
        fertilizer_tips: Vec::new(),
    }
}

pub fn hyderabad_request() -> RecommendRequest {
    serde_json::from_value(json!({
        "n": 50, "p": 40, "k": 30, "ph": 6.5, "city": "Hyderabad"
    }))
    .unwrap()
}

pub fn result_with(
    recommendations: Vec<CropRecommendation>,
    is_fallback: bool,
) -> RecommendationResult {
    RecommendationResult {
        request_id: uuid::Uuid::new_v4(),
        generated_at: Utc::now(),
        input: SoilInput {
            n: 50.0,
            p: 40.0,
            k: 30.0,
            ph: 6.5,
            location: "Hyderabad".to_string(),
            state: None,
            season: None,
            crop_type: None,
        },
        weather: WeatherReading {
            location: "Hyderabad".to_string(),
            temp: 28.0,
            humidity: 65.0,
            rainfall: 120.0,
            fetched_at: Utc::now(),
        },
        recommendations,
        fertilizer_tips: Vec::new(),
        is_fallback,
    }
}

pub fn test_config(weather_base_url: String) -> Config {
    Config {
        port: 5000,
        weather_api_key: "test_key".to_string(),
        weather_base_url,
        weather_timeout_secs: 5,
        predict_command: "python3".to_string(),
        predict_script: Some("ml/predict.py".to_string()),
        predict_timeout_secs: 5,
        rate_limit_per_second: 10,
        rate_limit_burst: 20,
    }
}
