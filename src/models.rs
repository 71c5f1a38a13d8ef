use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ============ Request Models ============

/// Raw body of `POST /recommend` and `POST /recommend/report`.
///
/// Every field is optional at this layer so that a missing value surfaces as a
/// validation error naming the field instead of a deserialization rejection.
/// Soil readings accept JSON numbers or numeric strings, since HTML forms
/// submit strings. Text fields are checked for their type during validation.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RecommendRequest {
    #[serde(default, alias = "N")]
    pub n: Option<Value>,
    #[serde(default, alias = "P")]
    pub p: Option<Value>,
    #[serde(default, alias = "K")]
    pub k: Option<Value>,
    #[serde(default)]
    pub ph: Option<Value>,
    /// City or state name used for the weather lookup.
    #[serde(default, alias = "location")]
    pub city: Option<Value>,
    #[serde(default)]
    pub state: Option<Value>,
    #[serde(default)]
    pub season: Option<Value>,
    #[serde(default)]
    pub crop_type: Option<Value>,
}

// ============ Domain Models ============

/// Validated soil chemistry plus location, echoed in every result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilInput {
    pub n: f64,
    pub p: f64,
    pub k: f64,
    pub ph: f64,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop_type: Option<String>,
}

/// Ambient conditions for a location, fetched fresh for every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub location: String,
    /// Degrees Celsius.
    pub temp: f64,
    /// Relative humidity, percent.
    pub humidity: f64,
    /// Millimetres.
    pub rainfall: f64,
    pub fetched_at: DateTime<Utc>,
}

/// One ranked crop suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropRecommendation {
    pub crop: String,
    /// Suitability as a percentage in `[0, 100]`. `None` for unscored
    /// (fallback) entries.
    pub confidence: Option<f64>,
    #[serde(default)]
    pub reasoning: Vec<String>,
    #[serde(default)]
    pub predicted_yield: Option<f64>,
}

impl CropRecommendation {
    /// An entry with no score or rationale, as used by the fallback set.
    pub fn unscored(crop: impl Into<String>) -> Self {
        Self {
            crop: crop.into(),
            confidence: None,
            reasoning: Vec::new(),
            predicted_yield: None,
        }
    }
}

/// Fertilizer advice, either structured or a single advisory sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FertilizerTip {
    Structured {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        nutrient: Option<String>,
        fertilizer: String,
        #[serde(default)]
        reason: String,
    },
    Plain(String),
}

impl FertilizerTip {
    pub fn structured(
        nutrient: Option<&str>,
        fertilizer: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        FertilizerTip::Structured {
            nutrient: nutrient.map(str::to_string),
            fertilizer: fertilizer.into(),
            reason: reason.into(),
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        FertilizerTip::Plain(text.into())
    }
}

/// The per-request aggregate handed from the aggregator to both the JSON
/// response path and the report renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub request_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub input: SoilInput,
    pub weather: WeatherReading,
    /// Best first. Index 0 is the top recommendation regardless of score.
    pub recommendations: Vec<CropRecommendation>,
    pub fertilizer_tips: Vec<FertilizerTip>,
    /// `true` when the prediction engine failed and the fixed fallback set was
    /// substituted.
    pub is_fallback: bool,
}

impl RecommendationResult {
    pub fn top(&self) -> Option<&CropRecommendation> {
        self.recommendations.first()
    }
}

// ============ Prediction Engine Models ============

/// Merged soil + weather record handed to the prediction engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineInput {
    pub n: f64,
    pub p: f64,
    pub k: f64,
    pub ph: f64,
    pub temp: f64,
    pub humidity: f64,
    pub rainfall: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop_type: Option<String>,
}

impl EngineInput {
    pub fn merge(soil: &SoilInput, weather: &WeatherReading) -> Self {
        Self {
            n: soil.n,
            p: soil.p,
            k: soil.k,
            ph: soil.ph,
            temp: weather.temp,
            humidity: weather.humidity,
            rainfall: weather.rainfall,
            state: soil.state.clone(),
            season: soil.season.clone(),
            crop_type: soil.crop_type.clone(),
        }
    }

    /// Positional readings followed by `--flag value` pairs for the optional
    /// categorical context.
    pub fn to_args(&self) -> Vec<String> {
        let mut args: Vec<String> = [
            self.n,
            self.p,
            self.k,
            self.ph,
            self.temp,
            self.humidity,
            self.rainfall,
        ]
        .iter()
        .map(|v| v.to_string())
        .collect();

        for (flag, value) in [
            ("--state", &self.state),
            ("--season", &self.season),
            ("--crop-type", &self.crop_type),
        ] {
            if let Some(v) = value {
                args.push(flag.to_string());
                args.push(v.clone());
            }
        }

        args
    }
}

/// What a successful engine run yields after parsing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineOutput {
    pub recommendations: Vec<CropRecommendation>,
    pub fertilizer_tips: Vec<FertilizerTip>,
}

/// Top-level shapes the engine may print on stdout.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EnginePayload {
    List(Vec<EngineEntry>),
    Object {
        #[serde(alias = "recommendations")]
        crops: Vec<EngineEntry>,
        #[serde(default, alias = "fertilizer_tips")]
        fertilizer_recommendations: Vec<FertilizerTip>,
    },
}

/// A single crop entry as printed by the engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EngineEntry {
    Name(String),
    Detailed {
        crop: String,
        #[serde(default, alias = "probability")]
        confidence: Option<f64>,
        #[serde(default, alias = "reasons")]
        reasoning: Vec<String>,
        #[serde(default)]
        predicted_yield: Option<f64>,
    },
}

/// Canonicalises a score to percent: fractions (`<= 1.0`) are scaled by 100
/// and the result is clamped to `[0, 100]`.
///
/// The scale is inferred from the value alone, so an engine that reports
/// percentages and emits `1` (meaning 1%) is read as the fraction `1.0` and
/// shown as 100%.
pub fn to_percent(score: f64) -> f64 {
    let pct = if score <= 1.0 { score * 100.0 } else { score };
    pct.clamp(0.0, 100.0)
}

impl From<EngineEntry> for CropRecommendation {
    fn from(entry: EngineEntry) -> Self {
        match entry {
            EngineEntry::Name(crop) => CropRecommendation::unscored(crop),
            EngineEntry::Detailed {
                crop,
                confidence,
                reasoning,
                predicted_yield,
            } => CropRecommendation {
                crop,
                confidence: confidence.filter(|c| c.is_finite()).map(to_percent),
                reasoning,
                predicted_yield,
            },
        }
    }
}

impl From<EnginePayload> for EngineOutput {
    fn from(payload: EnginePayload) -> Self {
        let (entries, tips) = match payload {
            EnginePayload::List(entries) => (entries, Vec::new()),
            EnginePayload::Object {
                crops,
                fertilizer_recommendations,
            } => (crops, fertilizer_recommendations),
        };

        EngineOutput {
            recommendations: entries.into_iter().map(CropRecommendation::from).collect(),
            fertilizer_tips: tips,
        }
    }
}
