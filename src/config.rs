use std::{fmt::Display, str::FromStr};

use anyhow::{Context, anyhow};
use tracing::info;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_snippets: i64,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests: u32,
    pub period_secs: u64,
}

impl Config {
    /// Reads every setting from the environment (and `.env`, if present).
    pub fn load() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        Ok(Self {
            host: try_load("HOST", "0.0.0.0")?,
            port: try_load("PORT", "8080")?,
            database_url: try_load("DATABASE_URL", "sqlite://snippets.db")?,
            max_snippets: try_load("MAX_SNIPPETS", "5")?,
            rate_limit: RateLimitConfig {
                enabled: try_load("RATE_LIMIT_ENABLED", "true")?,
                requests: try_load("RATE_LIMIT_REQUESTS", "60")?,
                period_secs: try_load("RATE_LIMIT_PERIOD_SECS", "60")?,
            },
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 8080,
            database_url: "sqlite::memory:".to_owned(),
            max_snippets: 5,
            rate_limit: RateLimitConfig {
                enabled: false,
                requests: 60,
                period_secs: 60,
            },
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = dotenv::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_owned()
    });

    raw.trim()
        .parse()
        .map_err(|e| anyhow!("{e}"))
        .with_context(|| format!("invalid {key} value {raw:?}"))
}
