use std::net::SocketAddr;
use std::path::Path;

use error_stack::{Report, ResultExt};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::model::{Symbol, Timespan};

pub const API_KEY_ENV: &str = "POLYGON_API_KEY";

/// Upper bound the aggregates endpoint accepts for `limit`.
const MAX_RESULT_LIMIT: u32 = 50_000;

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}

fn default_error_log() -> String {
    "app_errors.log".into()
}

fn default_bind() -> String {
    "0.0.0.0:8080".into()
}

fn default_base_url() -> String {
    "https://api.polygon.io".into()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_requests_per_minute() -> u32 {
    5
}

fn default_result_limit() -> u32 {
    5000
}

fn default_rate_limit_wait_secs() -> u64 {
    10
}

fn default_ticker() -> String {
    "SPY".into()
}

fn default_period() -> usize {
    45
}

fn default_lookback_days() -> u32 {
    730
}

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub playground: PlaygroundConfig,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Accepted values: `"text"` | `"json"`
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// Append-only file receiving full reports of failed requests.
    #[serde(default = "default_error_log")]
    pub error_log: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            error_log: default_error_log(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Client-side request quota; the free Polygon plan allows 5/min.
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    /// Result cap sent with every aggregates request.
    #[serde(default = "default_result_limit")]
    pub result_limit: u32,
    /// How long a request may queue for the client-side quota before it
    /// fails with a rate-limit error. `0` fails immediately.
    #[serde(default = "default_rate_limit_wait_secs")]
    pub rate_limit_wait_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            requests_per_minute: default_requests_per_minute(),
            result_limit: default_result_limit(),
            rate_limit_wait_secs: default_rate_limit_wait_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaygroundConfig {
    /// Ticker served by `GET /v1/api/playground`.
    #[serde(default = "default_ticker")]
    pub ticker: String,
    #[serde(default = "default_period")]
    pub period: usize,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            ticker: default_ticker(),
            period: default_period(),
            lookback_days: default_lookback_days(),
        }
    }
}

/// Load and validate an `AppConfig` from a TOML file at `path`.
pub fn load(path: &Path) -> Result<AppConfig, Report<ConfigError>> {
    let content = std::fs::read_to_string(path)
        .change_context(ConfigError::ReadFile)
        .attach_with(|| format!("path: {}", path.display()))?;

    let config: AppConfig = toml::from_str(&content).change_context(ConfigError::Parse {
        reason: "invalid TOML syntax or schema mismatch".into(),
    })?;

    validate(&config)?;

    Ok(config)
}

/// Load from `path` when given, otherwise validate the built-in defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<AppConfig, Report<ConfigError>> {
    match path {
        Some(path) => load(path),
        None => {
            let config = AppConfig::default();
            validate(&config)?;
            Ok(config)
        }
    }
}

/// Read the provider API key from the process environment.
pub fn api_key_from_env() -> Result<String, Report<ConfigError>> {
    match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_owned()),
        _ => Err(Report::new(ConfigError::MissingEnv {
            name: API_KEY_ENV.into(),
        })),
    }
}

const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

fn validate(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    validate_general(config)?;
    validate_server(config)?;
    validate_provider(config)?;
    validate_playground(config)?;
    Ok(())
}

fn invalid(field: String) -> Report<ConfigError> {
    Report::new(ConfigError::Validation { field })
}

fn validate_general(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let general = &config.general;
    if !VALID_LOG_FORMATS.contains(&general.log_format.as_str()) {
        return Err(invalid(format!(
            "general.log_format \"{}\" is not valid",
            general.log_format
        )));
    }
    if general.error_log.trim().is_empty() {
        return Err(invalid("general.error_log must not be empty".into()));
    }
    Ok(())
}

fn validate_server(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    config
        .server
        .bind
        .parse::<SocketAddr>()
        .change_context_lazy(|| ConfigError::Validation {
            field: format!(
                "server.bind \"{}\" is not a socket address",
                config.server.bind
            ),
        })?;
    Ok(())
}

fn validate_provider(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let provider = &config.provider;
    if !(provider.base_url.starts_with("http://") || provider.base_url.starts_with("https://")) {
        return Err(invalid(format!(
            "provider.base_url \"{}\" must be an http(s) URL",
            provider.base_url
        )));
    }
    if provider.timeout_secs == 0 {
        return Err(invalid("provider.timeout_secs must be > 0".into()));
    }
    if provider.requests_per_minute == 0 {
        return Err(invalid("provider.requests_per_minute must be > 0".into()));
    }
    if provider.result_limit == 0 || provider.result_limit > MAX_RESULT_LIMIT {
        return Err(invalid(format!(
            "provider.result_limit must be within 1..={MAX_RESULT_LIMIT}"
        )));
    }
    Ok(())
}

fn validate_playground(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let playground = &config.playground;
    Symbol::parse(&playground.ticker).change_context_lazy(|| ConfigError::Validation {
        field: format!("playground.ticker \"{}\" is not valid", playground.ticker),
    })?;
    if playground.period == 0 {
        return Err(invalid("playground.period must be > 0".into()));
    }
    if playground.lookback_days == 0 {
        return Err(invalid("playground.lookback_days must be > 0".into()));
    }
    let max_days = Timespan::Day.max_lookback_days(config.provider.result_limit);
    if playground.lookback_days > max_days {
        return Err(invalid(format!(
            "playground.lookback_days {} exceeds {max_days} (provider.result_limit)",
            playground.lookback_days
        )));
    }
    Ok(())
}
