//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;
use voicebook_core::DEFAULT_PAGE_BUDGET;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// `None` selects the in-memory store.
    pub database_url: Option<String>,
    /// An `EnvFilter` directive string, e.g. `info` or `api_lib=debug,sqlx=warn`.
    pub log_filter: String,
    pub page_budget: usize,
    pub max_upload_bytes: usize,
    pub cors_allowed_origin: String,
    pub session_ttl_days: i64,
    pub openai_api_key: Option<String>,
    pub tts_model: String,
    pub tts_voice: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server and Database Settings ---
        let bind_address = parse_or(&lookup, "BIND_ADDRESS", "0.0.0.0:3000".parse().ok())?;
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let log_filter = lookup("RUST_LOG")
            .filter(|filter| !filter.trim().is_empty())
            .unwrap_or_else(|| "info".to_string());
        EnvFilter::try_new(&log_filter)
            .map_err(|e| ConfigError::InvalidValue("RUST_LOG".to_string(), e.to_string()))?;

        // --- Reading Settings ---
        let page_budget = parse_or(&lookup, "PAGE_BUDGET", Some(DEFAULT_PAGE_BUDGET))?;
        if page_budget == 0 {
            return Err(ConfigError::InvalidValue(
                "PAGE_BUDGET".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let max_upload_bytes = parse_or(&lookup, "MAX_UPLOAD_BYTES", Some(10 * 1024 * 1024))?;
        let cors_allowed_origin = lookup("CORS_ALLOWED_ORIGIN")
            .unwrap_or_else(|| "http://localhost:5173".to_string());
        let session_ttl_days = parse_or(&lookup, "SESSION_TTL_DAYS", Some(30))?;

        // --- Speech Synthesis ---
        let openai_api_key = lookup("OPENAI_API_KEY").filter(|key| !key.is_empty());
        let tts_model = lookup("TTS_MODEL").unwrap_or_else(|| "tts-1".to_string());
        let tts_voice = lookup("TTS_VOICE").unwrap_or_else(|| "alloy".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_filter,
            page_budget,
            max_upload_bytes,
            cors_allowed_origin,
            session_ttl_days,
            openai_api_key,
            tts_model,
            tts_voice,
        })
    }
}

/// Parses `key` when present, otherwise falls back to `default`.
/// A `None` default makes the variable required.
fn parse_or<F, T>(lookup: &F, key: &str, default: Option<T>) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => default.ok_or_else(|| ConfigError::MissingVar(key.to_string())),
    }
}
