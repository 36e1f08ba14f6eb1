//! Terminal output for fast-cli
//!
//! Renders the live progress line and the completion summary.

pub mod progress;

// Re-export commonly used items
pub use progress::{Snapshot, format_bytes, format_percent};
