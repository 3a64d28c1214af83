//! Configuration loading and validation for the secret service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any variable is invalid.

use anyhow::{Context, Result};
use serde::Deserialize;

/// `DATABASE_URL` value that selects the in-process store instead of SQLite.
pub const MEMORY_DATABASE_URL: &str = "memory";

/// Validated service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Port the HTTP server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Externally visible base URL used to build retrieval links.
    #[serde(default = "default_public_url")]
    pub public_url: String,

    /// SQLite connection string, or `memory` for a non-durable store.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// How often (seconds) the reaper purges expired secrets.
    #[serde(default = "default_reaper_interval")]
    pub reaper_interval_secs: u64,

    /// Requests allowed per client IP per minute.
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,

    /// Optional OTLP endpoint; spans are only exported when set.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen_port() -> u16 {
    8080
}
fn default_public_url() -> String {
    "http://localhost:8080".into()
}
fn default_database_url() -> String {
    "sqlite:secrets.db".into()
}
fn default_reaper_interval() -> u64 {
    300
}
fn default_rate_limit_per_minute() -> u32 {
    60
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Whether `DATABASE_URL` selects the in-process store.
    pub fn uses_memory_store(&self) -> bool {
        self.database_url == MEMORY_DATABASE_URL
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.public_url, "PUBLIC_URL")?;
        ensure_non_empty(&self.database_url, "DATABASE_URL")?;

        if !(self.public_url.starts_with("http://") || self.public_url.starts_with("https://")) {
            anyhow::bail!("PUBLIC_URL must start with http:// or https://");
        }
        if self.reaper_interval_secs == 0 {
            anyhow::bail!("REAPER_INTERVAL_SECS must be > 0");
        }
        if self.rate_limit_per_minute == 0 {
            anyhow::bail!("RATE_LIMIT_PER_MINUTE must be > 0");
        }
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
