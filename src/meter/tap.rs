//! Pass-through sink that fans bytes into meters

use std::io::{self, Write};
use std::sync::Arc;

use crate::meter::ByteMeter;

/// Sink that records every chunk written to it into each attached meter.
///
/// The tap never fails: writes always report the full length.
#[derive(Debug, Clone, Default)]
pub struct TransferTap {
    meters: Vec<Arc<ByteMeter>>,
}

impl TransferTap {
    /// Create a tap feeding the given meters, in order
    pub fn new(meters: Vec<Arc<ByteMeter>>) -> Self {
        Self { meters }
    }
}

impl Write for TransferTap {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = buf.len();
        for meter in &self.meters {
            meter.record(n as u64);
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_feeds_every_meter() {
        let first = Arc::new(ByteMeter::new());
        let second = Arc::new(ByteMeter::new());
        let third = Arc::new(ByteMeter::new());
        let mut tap = TransferTap::new(vec![first.clone(), second.clone(), third.clone()]);

        let written = tap.write(&[7u8; 4096]).unwrap();
        assert_eq!(written, 4096);
        for meter in [&first, &second, &third] {
            assert_eq!(meter.bytes_read(), 4096);
        }
    }

    #[test]
    fn test_tap_without_meters() {
        let mut tap = TransferTap::default();
        assert_eq!(tap.write(b"hello").unwrap(), 5);
        assert!(tap.flush().is_ok());
    }

    #[test]
    fn test_io_copy_through_tap() {
        let meter = Arc::new(ByteMeter::new());
        let mut tap = TransferTap::new(vec![meter.clone()]);
        let body = vec![1u8; 100_000];

        let copied = io::copy(&mut body.as_slice(), &mut tap).unwrap();
        assert_eq!(copied, 100_000);
        assert_eq!(meter.bytes_read(), 100_000);
    }
}
