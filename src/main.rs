use clap::Parser;
use log::{debug, error, info};
use std::io;
use std::process;

mod cli;
mod config;
mod endpoint;
mod error;
mod estimator;
mod meter;
mod terminal;
mod transfer;

use crate::config::EstimatorConfig;
use cli::Cli;
use error::Result;
use estimator::{BandwidthEstimator, EstimatorSettings, RunReport};
use terminal::{format_bytes, format_percent};
use transfer::HttpTransport;

fn main() {
    let cli = Cli::parse();

    // Config file, then environment, then command line
    let mut config = match EstimatorConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };
    cli.apply(&mut config);
    if let Err(e) = config.validate() {
        eprintln!("Configuration error: {}", e);
        process::exit(1);
    }

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();
    info!("{}", config);

    match run(&config) {
        Ok(report) => print_summary(&report),
        Err(e) => {
            error!("Run failed: {}", e);
            eprintln!("{}", e);
            if e.is_setup_failure() {
                eprintln!("Could not reach the download servers; check your connection");
            }
            process::exit(1);
        }
    }
}

fn run(config: &EstimatorConfig) -> Result<RunReport> {
    println!("Estimating current download speed");

    let urls = endpoint::resolve_urls(config);
    let transport = HttpTransport::new(&config.user_agent)?;
    let estimator = BandwidthEstimator::new(transport, EstimatorSettings::from(config));

    let stdout = io::stdout();
    let mut out = stdout.lock();
    estimator.run(&urls, &mut out)
}

fn print_summary(report: &RunReport) {
    debug!(
        "Run started {} finished with {}/{} outcomes after {:?} at {:.1}%",
        report.started_at.format("%Y-%m-%d %H:%M:%S"),
        report.outcomes_received,
        report.streams,
        report.elapsed(),
        report.percent()
    );
    println!(
        "Downloaded {} across {} streams in {:.1} seconds",
        format_bytes(report.total_bytes).trim_start(),
        report.streams,
        report.snapshot.elapsed_secs()
    );
    info!(
        "Primary stream read {} of {} expected bytes ({}), aggregate rate {:?} B/s",
        report.primary_bytes,
        report.expected_total,
        format_percent(report.primary_bytes, report.expected_total).trim_start(),
        report.bytes_per_sec()
    );
}
