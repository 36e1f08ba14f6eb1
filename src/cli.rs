//! Command-line arguments

use clap::Parser;
use std::path::PathBuf;

use crate::config::EstimatorConfig;
use crate::estimator::TerminationPolicy;

/// Estimates your current internet download speed.
///
/// The estimate comes from several concurrent downloads; their combined
/// throughput is reported while the run is in progress.
#[derive(Debug, Parser)]
#[command(name = "fast-cli", version, about, long_about = None)]
pub struct Cli {
    /// Config file to read (defaults to ./fast-cli.toml when present)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Download source; repeat to give several
    #[arg(short, long = "url", value_name = "URL")]
    pub urls: Vec<String>,

    /// Number of concurrent streams
    #[arg(short = 'n', long = "streams", value_name = "COUNT")]
    pub stream_count: Option<usize>,

    /// When to stop measuring
    #[arg(long, value_enum)]
    pub policy: Option<TerminationPolicy>,

    /// Use plain HTTP for the fallback endpoint
    #[arg(long)]
    pub no_https: bool,

    /// User-Agent header to send
    #[arg(long, value_name = "UA")]
    pub user_agent: Option<String>,

    /// Log debug messages to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded configuration
    pub fn apply(&self, config: &mut EstimatorConfig) {
        if !self.urls.is_empty() {
            config.urls = self.urls.clone();
        }

        if let Some(count) = self.stream_count {
            config.stream_count = count;
        }

        if let Some(policy) = self.policy {
            config.policy = policy;
        }

        if self.no_https {
            config.use_https = false;
        }

        if let Some(user_agent) = &self.user_agent {
            config.user_agent = user_agent.clone();
        }

        if self.verbose {
            config.log_level = "debug".to_string();
        }
    }
}
