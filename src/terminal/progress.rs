//! Progress rendering for bandwidth runs

use std::fmt;
use std::io::{self, Write};
use std::time::Duration;

const SI_PREFIXES: &[&str] = &["", "K", "M", "G", "T", "P", "E"];

/// One rendered view of a running measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    /// Aggregate throughput, `None` while there is no data yet
    pub bytes_per_sec: Option<f64>,

    /// Primary stream progress, may exceed 100
    pub percent: f64,

    /// Time covered by the aggregate meter
    pub elapsed: Option<Duration>,
}

impl Snapshot {
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.map(|d| d.as_secs_f64()).unwrap_or(0.0)
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            format_bits_per_sec(self.bytes_per_sec),
            format_percent_value(self.percent)
        )
    }
}

/// Build a snapshot from sampled meter values
pub fn render(
    bytes_per_sec: Option<f64>,
    bytes_read: u64,
    expected_total: u64,
    elapsed: Option<Duration>,
) -> Snapshot {
    Snapshot {
        bytes_per_sec: bytes_per_sec.filter(|rate| rate.is_finite()),
        percent: percent(bytes_read, expected_total),
        elapsed,
    }
}

/// `current` as a percentage of `total`; 0 when `total` is 0
pub fn percent(current: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        current as f64 / total as f64 * 100.0
    }
}

fn compute_si(value: f64) -> (f64, &'static str) {
    let mut scaled = value;
    let mut prefix = 0;
    while scaled.abs() >= 1000.0 && prefix < SI_PREFIXES.len() - 1 {
        scaled /= 1000.0;
        prefix += 1;
    }
    (scaled, SI_PREFIXES[prefix])
}

/// Format a byte rate as bits per second with an SI prefix
pub fn format_bits_per_sec(bytes_per_sec: Option<f64>) -> String {
    match bytes_per_sec {
        Some(rate) if rate.is_finite() => {
            let (size, prefix) = compute_si(rate * 8.0);
            format!("{:7.2} {}bps", size, prefix)
        }
        _ => "    --- bps".to_string(),
    }
}

/// Format `current` out of `total` as a fixed-width percentage
pub fn format_percent(current: u64, total: u64) -> String {
    format_percent_value(percent(current, total))
}

fn format_percent_value(percent: f64) -> String {
    format!("{:5.1}%", percent)
}

/// Format a byte count with an SI prefix
pub fn format_bytes(bytes: u64) -> String {
    let (size, prefix) = compute_si(bytes as f64);
    format!("{:3.0} {}B", size, prefix)
}

/// Redraw the progress line in place
pub fn display_progress(out: &mut dyn Write, snapshot: &Snapshot) -> io::Result<()> {
    write!(out, "\r{}", snapshot)?;
    out.flush()
}

/// End the progress line and print the run duration
pub fn finish_progress(out: &mut dyn Write, elapsed: Option<Duration>) -> io::Result<()> {
    let secs = elapsed.map(|d| d.as_secs_f64()).unwrap_or(0.0);
    writeln!(out, "  ")?;
    writeln!(out, "Completed in {:.1} seconds", secs)?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_guards_zero_total() {
        let snapshot = render(None, 0, 0, None);
        assert_eq!(snapshot.percent, 0.0);
        assert_eq!(snapshot.to_string(), "    --- bps -   0.0%");
        assert_eq!(percent(10, 0), 0.0);
    }

    #[test]
    fn test_percent_complete() {
        let snapshot = render(Some(1.0), 26_214_400, 26_214_400, None);
        assert_eq!(snapshot.percent, 100.0);
        assert!(snapshot.to_string().ends_with(" - 100.0%"));
    }

    #[test]
    fn test_percent_unbounded_above() {
        assert_eq!(percent(1_200_000, 1_000_000), 120.0);
        let snapshot = render(None, 1_200_000, 1_000_000, None);
        assert!(snapshot.to_string().ends_with(" - 120.0%"));
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0, 0), "  0.0%");
        assert_eq!(format_percent(26_214_400, 26_214_400), "100.0%");
        assert_eq!(format_percent(1_200_000, 1_000_000), "120.0%");
        assert_eq!(format_percent(1, 3), " 33.3%");
    }

    #[test]
    fn test_format_bits_per_sec() {
        assert_eq!(format_bits_per_sec(Some(0.0)), "   0.00 bps");
        assert_eq!(format_bits_per_sec(Some(100.0)), " 800.00 bps");
        assert_eq!(format_bits_per_sec(Some(125.0)), "   1.00 Kbps");
        assert_eq!(format_bits_per_sec(Some(1_000_000.0)), "   8.00 Mbps");
        assert_eq!(format_bits_per_sec(Some(12_500_000_000.0)), " 100.00 Gbps");
    }

    #[test]
    fn test_format_bits_per_sec_without_data() {
        assert_eq!(format_bits_per_sec(None), "    --- bps");
        assert_eq!(format_bits_per_sec(Some(f64::NAN)), "    --- bps");
        assert_eq!(format_bits_per_sec(Some(f64::INFINITY)), "    --- bps");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "  0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(26_214_400), " 26 MB");
        assert_eq!(format_bytes(3_000_000_000), "  3 GB");
    }

    #[test]
    fn test_render_drops_non_finite_rate() {
        let snapshot = render(Some(f64::NAN), 5, 10, Some(Duration::from_millis(1500)));
        assert!(snapshot.bytes_per_sec.is_none());
        assert_eq!(snapshot.percent, 50.0);
        assert_eq!(snapshot.elapsed_secs(), 1.5);
    }

    #[test]
    fn test_snapshot_line() {
        let snapshot = render(Some(1_000_000.0), 500_000, 1_000_000, None);
        assert_eq!(snapshot.to_string(), "   8.00 Mbps -  50.0%");

        let mut out = Vec::new();
        display_progress(&mut out, &snapshot).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "\r   8.00 Mbps -  50.0%");
    }

    #[test]
    fn test_finish_progress() {
        let mut out = Vec::new();
        finish_progress(&mut out, Some(Duration::from_millis(2340))).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "  \nCompleted in 2.3 seconds\n"
        );
    }
}
