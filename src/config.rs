use crate::error::{FastCliError, Result};
use crate::estimator::TerminationPolicy;
use crate::transfer::FALLBACK_EXPECTED_BYTES;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Config file looked up when none is given on the command line
pub const DEFAULT_CONFIG_FILE: &str = "fast-cli.toml";

/// Prefix for environment variable overrides, e.g. `FAST_CLI_STREAM_COUNT`
const ENV_PREFIX: &str = "FAST_CLI";

/// Configuration for a bandwidth measurement run
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Number of concurrent streams
    pub stream_count: usize,

    /// Use HTTPS for the fallback endpoint
    pub use_https: bool,

    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Progress refresh interval in milliseconds
    pub tick_interval_ms: u64,

    /// Expected primary size when the server does not declare one
    pub fallback_size: u64,

    /// When the run is considered complete
    pub policy: TerminationPolicy,

    /// Pre-resolved download sources
    pub urls: Vec<String>,

    /// Default log filter, overridden by RUST_LOG
    pub log_level: String,
}

impl EstimatorConfig {
    /// Load defaults, then the config file (if present), then environment overrides
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let file = match config_path {
            // An explicitly named file must exist
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let builder = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        Self::from_builder(builder)
    }

    /// Deserialize and validate whatever sources the builder holds
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config: EstimatorConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.stream_count == 0 {
            return Err(FastCliError::InvalidConfigValue(
                "Stream count must be at least 1".to_string(),
            ));
        }

        if self.tick_interval_ms == 0 {
            return Err(FastCliError::InvalidConfigValue(
                "Tick interval cannot be 0".to_string(),
            ));
        }

        if self.fallback_size == 0 {
            return Err(FastCliError::InvalidConfigValue(
                "Fallback size cannot be 0".to_string(),
            ));
        }

        if self.user_agent.trim().is_empty() {
            return Err(FastCliError::InvalidConfigValue(
                "User agent cannot be empty".to_string(),
            ));
        }

        for url in &self.urls {
            reqwest::Url::parse(url).map_err(|e| {
                FastCliError::InvalidConfigValue(format!("Invalid URL '{}': {}", url, e))
            })?;
        }

        Ok(())
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            stream_count: 3,
            use_https: true,
            user_agent: format!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            tick_interval_ms: 100,
            fallback_size: FALLBACK_EXPECTED_BYTES,
            policy: TerminationPolicy::default(),
            urls: Vec::new(),
            log_level: "warn".to_string(),
        }
    }
}

impl std::fmt::Display for EstimatorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "fast-cli config - Streams: {}, HTTPS: {}, Tick: {}ms, Fallback: {} bytes, Policy: {}, Sources: {}",
            self.stream_count,
            self.use_https,
            self.tick_interval_ms,
            self.fallback_size,
            self.policy,
            self.urls.len()
        )
    }
}
