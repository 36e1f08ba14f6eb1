//! Thread-safe byte accumulator

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Time window covered by recorded writes
#[derive(Debug, Clone, Copy)]
struct Window {
    start: Instant,
    last_write: Instant,
}

/// Counts the bytes written to it over time.
///
/// The count is atomic so concurrent writers never lose updates. The timing
/// window sits behind a mutex and is only loosely coherent with the count.
#[derive(Debug, Default)]
pub struct ByteMeter {
    bytes_read: AtomicU64,
    window: Mutex<Option<Window>>,
}

impl ByteMeter {
    /// Create an empty meter
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `bytes` observed now
    pub fn record(&self, bytes: u64) {
        let now = Instant::now();
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);

        // A writer cannot panic mid-update, so a poisoned window is still valid
        let mut window = self.window.lock().unwrap_or_else(|e| e.into_inner());
        match window.as_mut() {
            Some(w) => {
                if now > w.last_write {
                    w.last_write = now;
                }
            }
            None => {
                *window = Some(Window {
                    start: now,
                    last_write: now,
                })
            }
        }
    }

    /// Total bytes recorded so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    /// Time between the first and the latest write, `None` before the first write
    pub fn elapsed(&self) -> Option<Duration> {
        let window = self.window.lock().unwrap_or_else(|e| e.into_inner());
        window.map(|w| w.last_write.duration_since(w.start))
    }

    /// Bytes per second over the recorded window.
    ///
    /// Returns `None` until the window has a non-zero length.
    pub fn throughput(&self) -> Option<f64> {
        let elapsed = self.elapsed()?;
        let secs = elapsed.as_secs_f64();
        if secs > 0.0 {
            Some(self.bytes_read() as f64 / secs)
        } else {
            None
        }
    }
}
