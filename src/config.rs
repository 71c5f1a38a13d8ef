use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub weather_api_key: String,
    pub weather_base_url: String,
    pub weather_timeout_secs: u64,
    pub predict_command: String,
    /// Script handed to `predict_command` as its first argument. `None` runs the
    /// command directly.
    pub predict_script: Option<String>,
    pub predict_timeout_secs: u64,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            weather_api_key: std::env::var("WEATHER_API_KEY")
                .or_else(|_| std::env::var("OPENWEATHER_API_KEY"))
                .map_err(|_| {
                    anyhow::anyhow!(
                        "WEATHER_API_KEY or OPENWEATHER_API_KEY environment variable required"
                    )
                })
                .and_then(|key| {
                    if key.trim().is_empty() {
                        anyhow::bail!("WEATHER_API_KEY cannot be empty");
                    }
                    Ok(key)
                })?,
            weather_base_url: std::env::var("WEATHER_BASE_URL")
                .unwrap_or_else(|_| "https://api.openweathermap.org".to_string())
                .trim_end_matches('/')
                .to_string(),
            weather_timeout_secs: positive_int("WEATHER_TIMEOUT_SECS", 10)?,
            predict_command: std::env::var("PREDICT_COMMAND")
                .unwrap_or_else(|_| "python3".to_string())
                .trim()
                .to_string(),
            predict_script: match std::env::var("PREDICT_SCRIPT") {
                Ok(script) if script.trim().is_empty() => None,
                Ok(script) => Some(script),
                Err(_) => Some("ml/predict.py".to_string()),
            },
            predict_timeout_secs: positive_int("PREDICT_TIMEOUT_SECS", 30)?,
            rate_limit_per_second: positive_int("RATE_LIMIT_PER_SECOND", 10)?,
            rate_limit_burst: positive_u32("RATE_LIMIT_BURST", 20)?,
        };

        config.validate()?;

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Weather Base URL: {}", config.weather_base_url);
        tracing::debug!(
            "Prediction engine: {} {:?} (timeout {}s)",
            config.predict_command,
            config.predict_script,
            config.predict_timeout_secs
        );
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    /// Checks the invariants `from_env` cannot express through parsing alone.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.weather_base_url.starts_with("http://")
            && !self.weather_base_url.starts_with("https://")
        {
            anyhow::bail!("WEATHER_BASE_URL must start with http:// or https://");
        }
        if self.predict_command.is_empty() {
            anyhow::bail!("PREDICT_COMMAND cannot be empty");
        }
        if self.rate_limit_burst == 0 {
            anyhow::bail!("RATE_LIMIT_BURST must be a positive integer");
        }
        Ok(())
    }
}

fn positive_int(name: &str, default: u64) -> anyhow::Result<u64> {
    let value = match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| anyhow::anyhow!("{} must be a positive integer", name))?,
        Err(_) => default,
    };
    if value == 0 {
        anyhow::bail!("{} must be a positive integer", name);
    }
    Ok(value)
}

fn positive_u32(name: &str, default: u32) -> anyhow::Result<u32> {
    u32::try_from(positive_int(name, u64::from(default))?)
        .map_err(|_| anyhow::anyhow!("{} must not exceed {}", name, u32::MAX))
}
