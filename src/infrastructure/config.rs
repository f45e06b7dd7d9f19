use crate::domain::models::CalendarDate;
use crate::infrastructure::error::InfraError;
use chrono::Utc;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const APP_JSON: &str = "app.json";
const SUPPORTED_SCHEMA: u64 = 1;
const MAX_EDIT_WINDOW_MONTHS: u32 = 12;

pub const DEFAULT_API_BASE_URL: &str = "http://10.0.2.2:8000/";
pub const DEFAULT_TIMEZONE: &str = "UTC";
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_EDIT_WINDOW_MONTHS: u32 = 1;

const API_BASE_URL_KEYS: &[&str] = &["MOONLY_API_BASE_URL", "API_BASE_URL"];
const TIMEZONE_KEYS: &[&str] = &["MOONLY_TIMEZONE"];
const REQUEST_TIMEOUT_KEYS: &[&str] = &["MOONLY_REQUEST_TIMEOUT_SECONDS"];

/// Source of "today" for everything that rejects or flags future dates.
pub type TodayProvider = Arc<dyn Fn() -> CalendarDate + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub schema: u8,
    pub api_base_url: String,
    pub timezone: String,
    pub request_timeout_seconds: u64,
    pub edit_window_months: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema: SUPPORTED_SCHEMA as u8,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
            edit_window_months: DEFAULT_EDIT_WINDOW_MONTHS,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), InfraError> {
        url::Url::parse(self.api_base_url.trim()).map_err(|error| {
            InfraError::InvalidConfig(format!("apiBaseUrl is not a valid url: {error}"))
        })?;
        parse_timezone(&self.timezone)?;
        if self.request_timeout_seconds == 0 {
            return Err(InfraError::InvalidConfig(
                "requestTimeoutSeconds must be greater than zero".to_string(),
            ));
        }
        if self.edit_window_months > MAX_EDIT_WINDOW_MONTHS {
            return Err(InfraError::InvalidConfig(format!(
                "editWindowMonths must be at most {MAX_EDIT_WINDOW_MONTHS}"
            )));
        }
        Ok(())
    }

    pub fn time_zone(&self) -> Result<Tz, InfraError> {
        parse_timezone(&self.timezone)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn today_provider(&self) -> Result<TodayProvider, InfraError> {
        let tz = self.time_zone()?;
        Ok(Arc::new(move || today_in(tz)))
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz, InfraError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| InfraError::InvalidConfig(format!("unknown timezone: {name}")))
}

/// Calendar date in `tz` right now. The only place the crate reads the clock.
pub fn today_in(tz: Tz) -> CalendarDate {
    Utc::now().with_timezone(&tz).date_naive().into()
}

pub fn ensure_default_config(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&AppConfig::default())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != SUPPORTED_SCHEMA {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_app_config(config_dir: &Path) -> Result<AppConfig, InfraError> {
    let path = config_dir.join(APP_JSON);
    let value = read_config(&path)?;
    let config: AppConfig = serde_json::from_value(value).map_err(|error| {
        InfraError::InvalidConfig(format!("invalid {}: {error}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Applies environment overrides on top of `config`. Blank values are
/// ignored; values that do not parse are rejected with the keys consulted.
pub fn load_api_config_from_lookup<F>(config: AppConfig, lookup: F) -> Result<AppConfig, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = config;

    if let Some(base_url) = optional_lookup_value(&lookup, API_BASE_URL_KEYS) {
        url::Url::parse(&base_url).map_err(|error| {
            InfraError::InvalidConfig(format!(
                "invalid api base url {base_url:?} (from one of: {}): {error}",
                API_BASE_URL_KEYS.join(", ")
            ))
        })?;
        config.api_base_url = base_url;
    }

    if let Some(timezone) = optional_lookup_value(&lookup, TIMEZONE_KEYS) {
        parse_timezone(&timezone).map_err(|_| {
            InfraError::InvalidConfig(format!(
                "unknown timezone {timezone:?} (from one of: {})",
                TIMEZONE_KEYS.join(", ")
            ))
        })?;
        config.timezone = timezone;
    }

    if let Some(raw) = optional_lookup_value(&lookup, REQUEST_TIMEOUT_KEYS) {
        config.request_timeout_seconds = raw
            .parse::<u64>()
            .ok()
            .filter(|seconds| *seconds > 0)
            .ok_or_else(|| {
                InfraError::InvalidConfig(format!(
                    "invalid request timeout {raw:?} (from one of: {})",
                    REQUEST_TIMEOUT_KEYS.join(", ")
                ))
            })?;
    }

    config.validate()?;
    Ok(config)
}

pub fn load_api_config_from_env(config: AppConfig) -> Result<AppConfig, InfraError> {
    load_api_config_from_lookup(config, |key| std::env::var(key).ok())
}

fn optional_lookup_value<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    for key in keys {
        if let Some(value) = lookup(key) {
            let normalized = value.trim();
            if !normalized.is_empty() {
                return Some(normalized.to_string());
            }
        }
    }
    None
}
