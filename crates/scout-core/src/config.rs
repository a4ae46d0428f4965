use std::path::PathBuf;
use std::time::Duration;

use crate::circuit_breaker::BreakerConfig;
use crate::driver::{DriverConfig, DriverTimeouts};
use crate::error::AppError;

pub const DEFAULT_AI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_AI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Settings for the AI generation client.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub model: String,
    pub base_url: String,
    /// Required to actually call the service; validated by the binary.
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_AI_MODEL.to_string(),
            base_url: DEFAULT_AI_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(90),
        }
    }
}

/// Complete configuration of the enrichment pipeline.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentConfig {
    pub driver: DriverConfig,
    pub breaker: BreakerConfig,
    pub ai: AiConfig,
}

impl EnrichmentConfig {
    /// Read configuration from environment variables.
    ///
    /// - `SCOUT_WEBDRIVER_ENABLED` (optional, defaults to true)
    /// - `SCOUT_WEBDRIVER_TIMEOUT_SECS` (optional, defaults to 30)
    /// - `SCOUT_CHROME_PATH`, `SCOUT_CHROMIUM_PATH` (optional binary overrides)
    /// - `SCOUT_USER_AGENT` (optional)
    /// - `SCOUT_AI_FAILURE_THRESHOLD` (optional, defaults to 1; 0 disables AI)
    /// - `SCOUT_AI_TIMEOUT_SECS` (optional, defaults to 90)
    /// - `SCOUT_AI_MODEL`, `SCOUT_AI_BASE_URL`, `SCOUT_AI_API_KEY`
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut driver = DriverConfig::default();
        if let Some(raw) = get("SCOUT_WEBDRIVER_ENABLED") {
            driver.enabled = parse_bool("SCOUT_WEBDRIVER_ENABLED", &raw)?;
        }
        if let Some(raw) = get("SCOUT_WEBDRIVER_TIMEOUT_SECS") {
            let secs = parse_positive("SCOUT_WEBDRIVER_TIMEOUT_SECS", &raw)?;
            driver.timeouts = DriverTimeouts::with_page_load(Duration::from_secs(secs));
        }
        driver.chrome_path = get("SCOUT_CHROME_PATH").map(PathBuf::from);
        driver.chromium_path = get("SCOUT_CHROMIUM_PATH").map(PathBuf::from);
        if let Some(ua) = get("SCOUT_USER_AGENT") {
            driver.user_agent = ua;
        }

        let mut breaker = BreakerConfig::default();
        if let Some(raw) = get("SCOUT_AI_FAILURE_THRESHOLD") {
            breaker.ai_failure_threshold = raw.parse().map_err(|_| {
                AppError::ConfigError(format!(
                    "Invalid SCOUT_AI_FAILURE_THRESHOLD '{raw}': must be a non-negative integer"
                ))
            })?;
        }

        let mut ai = AiConfig::default();
        if let Some(raw) = get("SCOUT_AI_TIMEOUT_SECS") {
            ai.timeout = Duration::from_secs(parse_positive("SCOUT_AI_TIMEOUT_SECS", &raw)?);
        }
        if let Some(model) = get("SCOUT_AI_MODEL") {
            ai.model = model;
        }
        if let Some(base_url) = get("SCOUT_AI_BASE_URL") {
            ai.base_url = base_url.trim_end_matches('/').to_string();
        }
        ai.api_key = get("SCOUT_AI_API_KEY");

        Ok(Self { driver, breaker, ai })
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, AppError> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(AppError::ConfigError(format!(
            "Invalid {key} '{raw}': expected true/false, 1/0 or yes/no"
        ))),
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<u64, AppError> {
    let parsed: u64 = raw.parse().map_err(|_| {
        AppError::ConfigError(format!("Invalid {key} '{raw}': must be a positive integer"))
    })?;
    if parsed == 0 {
        return Err(AppError::ConfigError(format!("{key} must be at least 1")));
    }
    Ok(parsed)
}
