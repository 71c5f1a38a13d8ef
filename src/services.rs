use crate::config::Config;
use crate::errors::AppError;
use crate::models::*;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::fmt;
use std::future::Future;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

// ============ Collaborator seams ============

/// Resolves a location name to current ambient conditions.
pub trait WeatherLookup: Send + Sync {
    fn fetch(
        &self,
        location: &str,
    ) -> impl Future<Output = Result<WeatherReading, AppError>> + Send;
}

/// Produces ranked crop recommendations from merged soil and weather data.
///
/// The aggregator depends only on this trait; a subprocess, an RPC client or
/// an in-process model can all satisfy it.
pub trait PredictionEngine: Send + Sync {
    fn predict(
        &self,
        input: &EngineInput,
    ) -> impl Future<Output = Result<EngineOutput, EngineError>> + Send;
}

/// Prediction engine failures. These never leave the aggregator: every variant
/// triggers the fallback set instead.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The process could not be started.
    Spawn(String),
    /// The process exited unsuccessfully.
    Exit { code: Option<i32>, stderr: String },
    /// The process outlived the configured bound and was killed.
    Timeout(Duration),
    /// stdout was not in any accepted shape.
    Malformed(String),
    /// Parsed fine but contained no crops.
    Empty,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Spawn(msg) => write!(f, "failed to start prediction engine: {}", msg),
            EngineError::Exit { code, stderr } => match code {
                Some(code) => write!(f, "prediction engine exited with {}: {}", code, stderr),
                None => write!(f, "prediction engine killed by signal: {}", stderr),
            },
            EngineError::Timeout(limit) => {
                write!(f, "prediction engine timed out after {:?}", limit)
            }
            EngineError::Malformed(msg) => write!(f, "unparseable engine output: {}", msg),
            EngineError::Empty => write!(f, "prediction engine returned no crops"),
        }
    }
}

impl std::error::Error for EngineError {}

// ============ Weather ============

#[derive(Debug, Deserialize)]
struct OpenWeatherResponse {
    #[serde(default)]
    name: Option<String>,
    main: OpenWeatherMain,
    #[serde(default)]
    rain: Option<OpenWeatherRain>,
}

#[derive(Debug, Deserialize)]
struct OpenWeatherMain {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OpenWeatherRain {
    #[serde(rename = "1h", default)]
    one_hour: Option<f64>,
    #[serde(rename = "3h", default)]
    three_hours: Option<f64>,
}

/// Current-conditions client for the OpenWeather API.
#[derive(Clone)]
pub struct OpenWeatherService {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenWeatherService {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.weather_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create weather client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.weather_base_url.clone(),
            api_key: config.weather_api_key.clone(),
        })
    }
}

impl WeatherLookup for OpenWeatherService {
    async fn fetch(&self, location: &str) -> Result<WeatherReading, AppError> {
        // Location is user input; let the URL builder encode it
        let url = reqwest::Url::parse_with_params(
            &format!("{}/data/2.5/weather", self.base_url),
            &[
                ("q", location),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ],
        )
        .map_err(|e| AppError::WeatherLookup(format!("Failed to build URL: {}", e)))?;

        tracing::info!("Fetching weather for location: {}", location);
        // Redact key from logs
        tracing::debug!(
            "Weather URL: {}/data/2.5/weather?q={}&appid=[REDACTED]&units=metric",
            self.base_url,
            location
        );

        let response = self.client.get(url).send().await.map_err(|e| {
            AppError::WeatherLookup(format!("Weather request failed: {}", e))
        })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::WeatherLookup(format!(
                "Unknown location: {}",
                location
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Weather API returned error {}: {}", status, error_text);
            return Err(AppError::WeatherLookup(format!(
                "Weather API returned status {}: {}",
                status, error_text
            )));
        }

        let body: OpenWeatherResponse = response.json().await.map_err(|e| {
            AppError::WeatherLookup(format!("Failed to parse weather response: {}", e))
        })?;

        let rainfall = body
            .rain
            .and_then(|r| r.one_hour.or(r.three_hours))
            .unwrap_or(0.0);

        let reading = WeatherReading {
            location: body.name.unwrap_or_else(|| location.to_string()),
            temp: body.main.temp,
            humidity: body.main.humidity,
            rainfall,
            fetched_at: Utc::now(),
        };

        tracing::debug!(
            "Weather for {}: {}°C, {}%, {}mm",
            reading.location,
            reading.temp,
            reading.humidity,
            reading.rainfall
        );
        Ok(reading)
    }
}

// ============ Prediction engine ============

/// Runs an external prediction script per request.
///
/// The readings are passed as arguments (see [`EngineInput::to_args`]) and the
/// result is read as JSON from stdout. The child is killed when the timeout
/// fires or the request future is dropped.
///
/// Only the direct child is killed. A launcher script that forks the real
/// engine leaves it running after a timeout, so wrappers must `exec` the
/// engine rather than spawn it.
#[derive(Debug, Clone)]
pub struct ScriptPredictionEngine {
    program: String,
    leading_args: Vec<String>,
    timeout: Duration,
}

impl ScriptPredictionEngine {
    pub fn new(config: &Config) -> Self {
        Self {
            program: config.predict_command.clone(),
            leading_args: config.predict_script.iter().cloned().collect(),
            timeout: Duration::from_secs(config.predict_timeout_secs),
        }
    }

    /// Builds an engine from an explicit command line.
    pub fn with_command(
        program: impl Into<String>,
        leading_args: Vec<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            leading_args,
            timeout,
        }
    }
}

impl PredictionEngine for ScriptPredictionEngine {
    async fn predict(&self, input: &EngineInput) -> Result<EngineOutput, EngineError> {
        let args = input.to_args();
        tracing::info!("Running prediction engine {} with args: {:?}", self.program, args);

        let child = Command::new(&self.program)
            .args(&self.leading_args)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::Spawn(e.to_string()))?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| EngineError::Timeout(self.timeout))?
            .map_err(|e| EngineError::Spawn(e.to_string()))?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !stderr.is_empty() {
            tracing::debug!("Prediction engine stderr: {}", stderr);
        }

        if !output.status.success() {
            return Err(EngineError::Exit {
                code: output.status.code(),
                stderr,
            });
        }

        parse_engine_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parses engine stdout. The whole text is tried first, then its last
/// non-empty line.
pub fn parse_engine_output(stdout: &str) -> Result<EngineOutput, EngineError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Malformed("empty output".to_string()));
    }

    let payload = match serde_json::from_str::<EnginePayload>(trimmed) {
        Ok(payload) => payload,
        Err(whole_err) => {
            let last_line = trimmed
                .lines()
                .rev()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .unwrap_or_default();
            serde_json::from_str::<EnginePayload>(last_line)
                .map_err(|_| EngineError::Malformed(whole_err.to_string()))?
        }
    };

    let output = EngineOutput::from(payload);
    if output.recommendations.is_empty() {
        return Err(EngineError::Empty);
    }
    if let Some(rank) = output
        .recommendations
        .iter()
        .position(|rec| rec.crop.trim().is_empty())
    {
        return Err(EngineError::Malformed(format!(
            "blank crop name at rank {}",
            rank + 1
        )));
    }
    Ok(output)
}
