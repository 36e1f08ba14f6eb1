//! Concurrent multi-stream bandwidth estimation
//!
//! The estimator opens every source, starts one runner thread per source and
//! then waits on whichever comes first: a transfer outcome or the next
//! display tick. Stream 0 is the primary; its declared length is the
//! progress denominator.

use chrono::{DateTime, Local};
use log::{debug, error, info, warn};
use serde::Deserialize;
use std::io::Write;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crate::config::EstimatorConfig;
use crate::error::{FastCliError, Result};
use crate::meter::{ByteMeter, TransferTap};
use crate::terminal::Snapshot;
use crate::terminal::progress::{display_progress, finish_progress, render};
use crate::transfer::{
    OpenedStream, StreamRunner, TransferOutcome, Transport, resolve_expected_total,
};

/// Decides when enough outcomes have arrived to finish a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TerminationPolicy {
    /// Finish on the first outcome from any stream
    #[default]
    FirstOutcome,
    /// Finish once every started stream has reported
    WaitForAll,
    /// Finish once the primary stream has reported
    WaitForPrimary,
}

impl TerminationPolicy {
    /// Whether a successful outcome from stream `index` completes the run
    pub fn is_complete(&self, index: usize, received: usize, started: usize) -> bool {
        match self {
            Self::FirstOutcome => true,
            Self::WaitForAll => received >= started,
            Self::WaitForPrimary => index == 0,
        }
    }
}

impl std::fmt::Display for TerminationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FirstOutcome => write!(f, "first-outcome"),
            Self::WaitForAll => write!(f, "wait-for-all"),
            Self::WaitForPrimary => write!(f, "wait-for-primary"),
        }
    }
}

/// Run lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Starting,
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunPhase::Starting => write!(f, "starting"),
            RunPhase::Running => write!(f, "running"),
            RunPhase::Completed => write!(f, "completed"),
            RunPhase::Failed => write!(f, "failed"),
        }
    }
}

/// Tunables taken from the configuration
#[derive(Debug, Clone, Copy)]
pub struct EstimatorSettings {
    pub tick: Duration,
    pub fallback_size: u64,
    pub policy: TerminationPolicy,
}

impl From<&EstimatorConfig> for EstimatorSettings {
    fn from(config: &EstimatorConfig) -> Self {
        Self {
            tick: config.tick_interval(),
            fallback_size: config.fallback_size,
            policy: config.policy,
        }
    }
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Local>,
    pub streams: usize,
    pub outcomes_received: usize,
    pub total_bytes: u64,
    pub primary_bytes: u64,
    pub expected_total: u64,
    pub snapshot: Snapshot,
}

impl RunReport {
    /// Aggregate bytes per second, `None` if nothing was measured
    pub fn bytes_per_sec(&self) -> Option<f64> {
        self.snapshot.bytes_per_sec
    }

    pub fn percent(&self) -> f64 {
        self.snapshot.percent
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.snapshot.elapsed
    }
}

/// Coordinator-held state of one run
struct RunState {
    phase: RunPhase,
    aggregate: Arc<ByteMeter>,
    primary: Arc<ByteMeter>,
    expected_total: u64,
    received: usize,
    started: usize,
}

impl RunState {
    fn new(fallback_size: u64) -> Self {
        Self {
            phase: RunPhase::Starting,
            aggregate: Arc::new(ByteMeter::new()),
            primary: Arc::new(ByteMeter::new()),
            expected_total: fallback_size,
            received: 0,
            started: 0,
        }
    }

    fn transition(&mut self, to: RunPhase) {
        info!("Run {} -> {}", self.phase, to);
        self.phase = to;
    }

    fn snapshot(&self) -> Snapshot {
        render(
            self.aggregate.throughput(),
            self.primary.bytes_read(),
            self.expected_total,
            self.aggregate.elapsed(),
        )
    }
}

/// Estimates download bandwidth from concurrent transfers
pub struct BandwidthEstimator<T: Transport> {
    transport: T,
    settings: EstimatorSettings,
}

impl<T: Transport> BandwidthEstimator<T> {
    pub fn new(transport: T, settings: EstimatorSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    /// Measure bandwidth across `urls`, writing progress lines to `out`.
    ///
    /// Any request or transfer failure fails the whole run. Streams still in
    /// flight when the run ends are left to finish on their own.
    pub fn run(&self, urls: &[String], out: &mut dyn Write) -> Result<RunReport> {
        if urls.is_empty() {
            return Err(FastCliError::Other("No download sources given".to_string()));
        }

        let started_at = Local::now();
        info!(
            "Starting {} streams at {} with policy {}",
            urls.len(),
            started_at.to_rfc3339(),
            self.settings.policy
        );

        let mut state = RunState::new(self.settings.fallback_size);
        let outcomes = match self.launch(urls, &mut state) {
            Ok(outcomes) => outcomes,
            Err(e) => {
                state.transition(RunPhase::Failed);
                return Err(e);
            }
        };
        state.transition(RunPhase::Running);

        let snapshot = self.monitor(&mut state, &outcomes, out)?;

        Ok(RunReport {
            started_at,
            streams: state.started,
            outcomes_received: state.received,
            total_bytes: state.aggregate.bytes_read(),
            primary_bytes: state.primary.bytes_read(),
            expected_total: state.expected_total,
            snapshot,
        })
    }

    /// Open every source, then start one runner per source
    fn launch(&self, urls: &[String], state: &mut RunState) -> Result<Receiver<TransferOutcome>> {
        let opened = urls
            .iter()
            .enumerate()
            .map(|(index, url)| {
                self.transport.open(index, url).inspect_err(|e| {
                    error!("Cannot open stream {}: {}", index, e);
                })
            })
            .collect::<Result<Vec<OpenedStream>>>()?;

        let (tx, rx) = mpsc::channel();
        for (index, stream) in opened.into_iter().enumerate() {
            let tap = if index == 0 {
                state.expected_total = resolve_expected_total(
                    stream.content_length.as_deref(),
                    self.settings.fallback_size,
                );
                debug!("Primary stream expects {} bytes", state.expected_total);
                TransferTap::new(vec![Arc::clone(&state.primary), Arc::clone(&state.aggregate)])
            } else {
                TransferTap::new(vec![Arc::clone(&state.aggregate)])
            };

            // Runner threads are detached; their outcome is the only thing we keep
            StreamRunner::new(index, stream.body, tap).spawn(tx.clone())?;
            state.started += 1;
        }

        Ok(rx)
    }

    /// Wait for outcomes, redrawing progress on every tick
    fn monitor(
        &self,
        state: &mut RunState,
        outcomes: &Receiver<TransferOutcome>,
        out: &mut dyn Write,
    ) -> Result<Snapshot> {
        let tick = self.settings.tick;
        let mut next_tick = Instant::now() + tick;

        loop {
            let wait = next_tick.saturating_duration_since(Instant::now());
            match outcomes.recv_timeout(wait) {
                Ok(outcome) => {
                    let index = outcome.index;
                    let bytes = match outcome.into_result() {
                        Ok(bytes) => bytes,
                        Err(e) => {
                            state.transition(RunPhase::Failed);
                            if let Err(io_err) = writeln!(out) {
                                warn!("Failed to end progress line: {}", io_err);
                            }
                            return Err(e);
                        }
                    };

                    state.received += 1;
                    debug!(
                        "Stream {} reported {} bytes ({}/{} outcomes)",
                        index, bytes, state.received, state.started
                    );

                    if self
                        .settings
                        .policy
                        .is_complete(index, state.received, state.started)
                    {
                        let snapshot = state.snapshot();
                        if let Err(e) = display_progress(out, &snapshot)
                            .and_then(|_| finish_progress(out, snapshot.elapsed))
                        {
                            warn!("Failed to write final progress: {}", e);
                        }
                        state.transition(RunPhase::Completed);
                        return Ok(snapshot);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if let Err(e) = display_progress(out, &state.snapshot()) {
                        warn!("Failed to write progress: {}", e);
                    }
                    // Skip ticks missed while rendering
                    while next_tick <= Instant::now() {
                        next_tick += tick;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    state.transition(RunPhase::Failed);
                    return Err(FastCliError::OutcomeChannelClosed);
                }
            }
        }
    }
}
