use crate::error::{Result, ScoutError};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://tabelog.com/kr/rstLst/";
pub const DEFAULT_LANGUAGE: &str = "ko";
pub const DEFAULT_MAP_PATH: &str = "restaurant_map.html";
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(1000);

/// Runtime configuration, read from the process environment (and `.env`)
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub geocoding_api_key: Option<String>,
    pub base_url: String,
    pub request_delay: Duration,
    pub geocode_language: String,
    pub map_output_path: PathBuf,
}

impl AppConfig {
    /// Load `.env` if present, then read the environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup so tests don't have to
    /// touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let db_path = get("DB_PATH")
            .map(PathBuf::from)
            .ok_or_else(|| ScoutError::Config("DB_PATH must be set".to_string()))?;

        let request_delay = match get("SCOUT_REQUEST_DELAY_MS") {
            Some(raw) => raw.parse::<u64>().map(Duration::from_millis).map_err(|_| {
                ScoutError::Config(format!(
                    "SCOUT_REQUEST_DELAY_MS must be a whole number of milliseconds, got `{}`",
                    raw
                ))
            })?,
            None => DEFAULT_REQUEST_DELAY,
        };

        Ok(Self {
            db_path,
            geocoding_api_key: get("GOOGLE_MAPS_API_KEY"),
            base_url: get("SCOUT_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            request_delay,
            geocode_language: get("GEOCODE_LANGUAGE")
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            map_output_path: get("MAP_OUTPUT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MAP_PATH)),
        })
    }

    /// The geocoding key is only mandatory for runs that geocode
    pub fn require_geocoding_key(&self) -> Result<&str> {
        self.geocoding_api_key.as_deref().ok_or_else(|| {
            ScoutError::Config(
                "GOOGLE_MAPS_API_KEY must be set unless geocoding is disabled".to_string(),
            )
        })
    }
}
