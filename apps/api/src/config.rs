use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment variables.
/// Every admission limit has a default; only malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Absent key is not a startup error: requests fail with MISSING_API_KEY instead.
    pub gemini_api_key: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub rate_limit: RateLimitConfig,
    pub limits: ValidationLimits,
    pub cache: CacheConfig,
}

/// Per-tier request caps and window lengths.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub per_minute: u32,
    pub minute_window: Duration,
    pub per_day: u32,
    pub daily_window: Duration,
    /// Chance that a single `check` call also sweeps expired entries.
    pub sweep_probability: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_minute: 60,
            minute_window: Duration::from_secs(60),
            per_day: 14_400,
            daily_window: Duration::from_secs(24 * 60 * 60),
            sweep_probability: 0.1,
        }
    }
}

/// Size and shape ceilings enforced by the request validator.
#[derive(Debug, Clone, Copy)]
pub struct ValidationLimits {
    pub max_payload_bytes: usize,
    pub max_file_bytes: usize,
    pub max_jd_chars: usize,
    pub max_chat_messages: usize,
    pub max_message_chars: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_payload_bytes: 15 * 1024 * 1024,
            max_file_bytes: 10 * 1024 * 1024,
            max_jd_chars: 50_000,
            max_chat_messages: 50,
            max_message_chars: 5_000,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    pub capacity: usize,
    /// Normalized text shorter than this is treated as a scanned document.
    pub min_extracted_chars: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 50,
            min_extracted_chars: 50,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let rate_defaults = RateLimitConfig::default();
        let limit_defaults = ValidationLimits::default();
        let cache_defaults = CacheConfig::default();

        let config = Config {
            gemini_api_key: std::env::var("GEMINI_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            port: env_or("PORT", 8080u16)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            rate_limit: RateLimitConfig {
                per_minute: env_or("RATE_LIMIT_PER_MINUTE", rate_defaults.per_minute)?,
                minute_window: Duration::from_secs(env_or(
                    "RATE_LIMIT_MINUTE_WINDOW_SECS",
                    rate_defaults.minute_window.as_secs(),
                )?),
                per_day: env_or("RATE_LIMIT_PER_DAY", rate_defaults.per_day)?,
                daily_window: Duration::from_secs(env_or(
                    "RATE_LIMIT_DAILY_WINDOW_SECS",
                    rate_defaults.daily_window.as_secs(),
                )?),
                sweep_probability: env_or(
                    "RATE_LIMIT_SWEEP_PROBABILITY",
                    rate_defaults.sweep_probability,
                )?,
            },
            limits: ValidationLimits {
                max_payload_bytes: env_or("MAX_PAYLOAD_BYTES", limit_defaults.max_payload_bytes)?,
                max_file_bytes: env_or("MAX_FILE_BYTES", limit_defaults.max_file_bytes)?,
                max_jd_chars: env_or("MAX_JD_CHARS", limit_defaults.max_jd_chars)?,
                max_chat_messages: env_or("MAX_CHAT_MESSAGES", limit_defaults.max_chat_messages)?,
                max_message_chars: env_or("MAX_MESSAGE_CHARS", limit_defaults.max_message_chars)?,
            },
            cache: CacheConfig {
                capacity: env_or("EXTRACTION_CACHE_CAPACITY", cache_defaults.capacity)?,
                min_extracted_chars: env_or(
                    "MIN_EXTRACTED_CHARS",
                    cache_defaults.min_extracted_chars,
                )?,
            },
        };

        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        let rl = &self.rate_limit;
        if rl.per_minute == 0 || rl.per_day == 0 {
            bail!("Rate limit caps must be greater than zero");
        }
        if rl.minute_window.is_zero() || rl.daily_window.is_zero() {
            bail!("Rate limit windows must be greater than zero");
        }
        if !(0.0..=1.0).contains(&rl.sweep_probability) {
            bail!("RATE_LIMIT_SWEEP_PROBABILITY must be between 0 and 1");
        }
        if self.cache.capacity == 0 {
            bail!("EXTRACTION_CACHE_CAPACITY must be greater than zero");
        }
        if self.limits.max_file_bytes > self.limits.max_payload_bytes {
            bail!("MAX_FILE_BYTES cannot exceed MAX_PAYLOAD_BYTES");
        }
        Ok(())
    }
}

/// Reads `key` and parses it, falling back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    /// Defaults with a dummy API key, for router tests.
    pub fn for_tests() -> Self {
        Config {
            gemini_api_key: Some("test-key".to_string()),
            port: 0,
            rust_log: "debug".to_string(),
            rate_limit: RateLimitConfig::default(),
            limits: ValidationLimits::default(),
            cache: CacheConfig::default(),
        }
    }
}
