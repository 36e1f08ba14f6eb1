//! Driving a single transfer on its own thread

use log::{debug, error, info};
use std::io::{self, Read, Write};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use crate::error::{FastCliError, Result};
use crate::meter::TransferTap;

/// Terminal report of one transfer, sent exactly once per started runner
#[derive(Debug)]
pub struct TransferOutcome {
    /// Index of the stream in the source list
    pub index: usize,

    /// Bytes copied before the transfer ended
    pub bytes_transferred: u64,

    /// Error that ended the transfer, if any
    pub error: Option<io::Error>,
}

impl TransferOutcome {
    /// Turn the outcome into a result, the error tagged with the stream index
    pub fn into_result(self) -> Result<u64> {
        match self.error {
            None => Ok(self.bytes_transferred),
            Some(source) => Err(FastCliError::TransferFailed {
                index: self.index,
                source,
            }),
        }
    }
}

/// Copies one response body into its tap until the body ends
pub struct StreamRunner {
    index: usize,
    body: Box<dyn Read + Send>,
    tap: TransferTap,
}

impl StreamRunner {
    pub fn new(index: usize, body: Box<dyn Read + Send>, tap: TransferTap) -> Self {
        Self { index, body, tap }
    }

    /// Start the copy on a dedicated thread.
    ///
    /// The outcome is sent on `outcomes` when the copy ends. A closed channel
    /// is ignored, so an abandoned runner finishes quietly.
    pub fn spawn(self, outcomes: Sender<TransferOutcome>) -> Result<JoinHandle<()>> {
        let index = self.index;
        thread::Builder::new()
            .name(format!("stream-{index}"))
            .spawn(move || {
                let outcome = self.run();
                if outcomes.send(outcome).is_err() {
                    debug!("Stream {index} finished after the run ended");
                }
            })
            .map_err(|source| FastCliError::RunnerSpawnFailed { index, source })
    }

    /// Copy the body to completion and report how it went
    pub fn run(mut self) -> TransferOutcome {
        debug!("Stream {} started copying", self.index);

        let mut buffer = [0u8; 8192]; // 8KB buffer
        let mut bytes_transferred = 0u64;

        let error = loop {
            match self.body.read(&mut buffer) {
                Ok(0) => break None,
                Ok(bytes_read) => {
                    if let Err(e) = self.tap.write_all(&buffer[..bytes_read]) {
                        break Some(e);
                    }
                    bytes_transferred += bytes_read as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => break Some(e),
            }
        };

        match &error {
            None => info!(
                "Stream {} completed: {} bytes",
                self.index, bytes_transferred
            ),
            Some(e) => error!(
                "Stream {} failed after {} bytes: {}",
                self.index, bytes_transferred, e
            ),
        }

        TransferOutcome {
            index: self.index,
            bytes_transferred,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meter::ByteMeter;
    use std::sync::Arc;
    use std::sync::mpsc;

    /// Reader that yields some bytes and then fails
    struct BrokenReader {
        remaining: usize,
    }

    impl Read for BrokenReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.remaining == 0 {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
            }
            let n = buf.len().min(self.remaining);
            self.remaining -= n;
            Ok(n)
        }
    }

    #[test]
    fn test_run_success() {
        let meter = Arc::new(ByteMeter::new());
        let body = Box::new(io::repeat(0).take(50_000));
        let runner = StreamRunner::new(3, body, TransferTap::new(vec![meter.clone()]));

        let outcome = runner.run();
        assert_eq!(outcome.index, 3);
        assert!(outcome.error.is_none());
        assert_eq!(outcome.bytes_transferred, 50_000);
        assert_eq!(meter.bytes_read(), 50_000);
        assert_eq!(outcome.into_result().unwrap(), 50_000);
    }

    #[test]
    fn test_run_failure_keeps_metered_bytes() {
        let meter = Arc::new(ByteMeter::new());
        let body = Box::new(BrokenReader { remaining: 10_000 });
        let runner = StreamRunner::new(1, body, TransferTap::new(vec![meter.clone()]));

        let outcome = runner.run();
        assert!(outcome.error.is_some());
        assert_eq!(meter.bytes_read(), 10_000);
        assert_eq!(outcome.bytes_transferred, 10_000);

        match outcome.into_result() {
            Err(FastCliError::TransferFailed { index, source }) => {
                assert_eq!(index, 1);
                assert_eq!(source.kind(), io::ErrorKind::ConnectionReset);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    /// Reader that is interrupted once before yielding its bytes
    struct InterruptedReader {
        interrupted: bool,
        remaining: usize,
    }

    impl Read for InterruptedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
            let n = buf.len().min(self.remaining);
            self.remaining -= n;
            Ok(n)
        }
    }

    #[test]
    fn test_run_retries_interrupted_reads() {
        let meter = Arc::new(ByteMeter::new());
        let body = Box::new(InterruptedReader {
            interrupted: false,
            remaining: 20_000,
        });
        let outcome = StreamRunner::new(0, body, TransferTap::new(vec![meter.clone()])).run();

        assert!(outcome.error.is_none());
        assert_eq!(outcome.bytes_transferred, 20_000);
        assert_eq!(meter.bytes_read(), 20_000);
    }

    #[test]
    fn test_spawn_sends_exactly_one_outcome() {
        let (tx, rx) = mpsc::channel();
        let body = Box::new(io::repeat(1).take(1024));
        let handle = StreamRunner::new(0, body, TransferTap::default())
            .spawn(tx)
            .unwrap();
        handle.join().unwrap();

        let outcome = rx.recv().unwrap();
        assert_eq!(outcome.index, 0);
        assert_eq!(outcome.bytes_transferred, 1024);
        // sender dropped with the thread
        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_spawn_tolerates_closed_channel() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let body = Box::new(io::repeat(1).take(1024));
        let handle = StreamRunner::new(2, body, TransferTap::default())
            .spawn(tx)
            .unwrap();
        assert!(handle.join().is_ok());
    }
}
