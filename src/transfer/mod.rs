//! Transfer module for fast-cli
//!
//! Opens download sources and drives each one on its own thread.

pub mod runner;
pub mod source;

// Re-export main types
pub use runner::{StreamRunner, TransferOutcome};
pub use source::{
    FALLBACK_EXPECTED_BYTES, HttpTransport, OpenedStream, Transport, resolve_expected_total,
};
