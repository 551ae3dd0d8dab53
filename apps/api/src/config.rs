use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

const MAX_GENERATION_ATTEMPTS: u32 = 10;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub generation_timeout: Duration,
    pub generation_max_attempts: u32,
    pub extraction_timeout: Duration,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = Config {
            anthropic_api_key: require_env(&lookup, "ANTHROPIC_API_KEY")?,
            port: env_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            chunk_size: env_or(&lookup, "CHUNK_SIZE", 1500)?,
            chunk_overlap: env_or(&lookup, "CHUNK_OVERLAP", 200)?,
            generation_timeout: Duration::from_secs(env_or(
                &lookup,
                "GENERATION_TIMEOUT_SECS",
                120,
            )?),
            generation_max_attempts: env_or(&lookup, "GENERATION_MAX_ATTEMPTS", 2)?,
            extraction_timeout: Duration::from_secs(env_or(
                &lookup,
                "EXTRACTION_TIMEOUT_SECS",
                30,
            )?),
            max_upload_bytes: env_or(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
        };

        if !(1..=MAX_GENERATION_ATTEMPTS).contains(&config.generation_max_attempts) {
            bail!(
                "GENERATION_MAX_ATTEMPTS must be between 1 and {MAX_GENERATION_ATTEMPTS}, got {}",
                config.generation_max_attempts
            );
        }

        Ok(config)
    }
}

fn require_env(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}
