//! Byte metering for concurrent transfers
//!
//! Meters are shared between the transfer threads that write to them and
//! the coordinator that samples them on every tick.

pub mod byte_meter;
pub mod tap;

// Re-export main types
pub use byte_meter::ByteMeter;
pub use tap::TransferTap;
