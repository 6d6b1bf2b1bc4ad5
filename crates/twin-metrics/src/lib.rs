//! Per-record processing latency with HdrHistogram.
//!
//! The matcher times each purge-and-score pass with a [`Stopwatch`] and
//! records the result in a [`LatencyHistogram`]; the driver logs the
//! summary at shutdown.

use hdrhistogram::Histogram;

/// Significant figures kept by [`LatencyHistogram::new`].
pub const DEFAULT_SIGFIG: u8 = 3;

/// Nanosecond latency histogram.
#[derive(Clone, Debug)]
pub struct LatencyHistogram {
    histogram: Histogram<u64>,
}

impl LatencyHistogram {
    /// Auto-resizing histogram with 3 significant digits.
    pub fn new() -> Self {
        match Histogram::new(DEFAULT_SIGFIG) {
            Ok(histogram) => Self { histogram },
            // 3 is always inside hdrhistogram's accepted 0..=5 range.
            Err(_) => unreachable!("3 significant figures is a valid precision"),
        }
    }

    /// Record one latency in nanoseconds.
    ///
    /// The histogram grows to fit the value. Only a value past the largest
    /// trackable one fails to resize, and that is clamped instead.
    #[inline(always)]
    pub fn record(&mut self, nanos: u64) {
        if self.histogram.record(nanos).is_err() {
            self.histogram.saturating_record(nanos);
        }
    }

    /// Value at `percentile` (0.0 - 100.0).
    pub fn value_at_percentile(&self, percentile: f64) -> u64 {
        self.histogram.value_at_quantile(percentile / 100.0)
    }

    pub fn count(&self) -> u64 {
        self.histogram.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histogram.is_empty()
    }

    /// Snapshot of the usual percentiles.
    pub fn summary(&self) -> LatencySummary {
        LatencySummary {
            count: self.count(),
            min: self.histogram.min(),
            p50: self.value_at_percentile(50.0),
            p90: self.value_at_percentile(90.0),
            p99: self.value_at_percentile(99.0),
            p999: self.value_at_percentile(99.9),
            max: self.histogram.max(),
            mean: self.histogram.mean(),
        }
    }

    /// Emit the summary as one structured `info` event.
    pub fn log_summary(&self, label: &str) {
        if self.is_empty() {
            tracing::info!(target: "twin::metrics", label, "no samples recorded");
            return;
        }
        let s = self.summary();
        tracing::info!(
            target: "twin::metrics",
            label,
            count = s.count,
            p50 = %format_latency(s.p50),
            p90 = %format_latency(s.p90),
            p99 = %format_latency(s.p99),
            p999 = %format_latency(s.p999),
            max = %format_latency(s.max),
            "latency distribution"
        );
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Percentile snapshot, in nanoseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LatencySummary {
    pub count: u64,
    pub min: u64,
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    pub p999: u64,
    pub max: u64,
    pub mean: f64,
}

/// Format nanoseconds with a readable unit.
pub fn format_latency(nanos: u64) -> String {
    if nanos < 1_000 {
        format!("{} ns", nanos)
    } else if nanos < 1_000_000 {
        format!("{:.2} μs", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.2} ms", nanos as f64 / 1_000_000.0)
    } else {
        format!("{:.2} s", nanos as f64 / 1_000_000_000.0)
    }
}

/// Low-overhead interval timer over `quanta`'s TSC clock.
#[derive(Clone, Debug)]
pub struct Stopwatch {
    clock: quanta::Clock,
    start: u64,
}

impl Stopwatch {
    /// Start timing on an existing clock (share one per thread).
    #[inline(always)]
    pub fn start_on(clock: &quanta::Clock) -> Self {
        Self {
            clock: clock.clone(),
            start: clock.raw(),
        }
    }

    /// Nanoseconds since the stopwatch started.
    #[inline(always)]
    pub fn elapsed_nanos(&self) -> u64 {
        self.clock.delta_as_nanos(self.start, self.clock.raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_histogram_basic() {
        let mut h = LatencyHistogram::new();

        for i in 1..=100 {
            h.record(i * 100);
        }

        let s = h.summary();
        assert_eq!(s.count, 100);
        assert!(s.p50 >= 4900 && s.p50 <= 5100);
        assert_eq!(s.min, 100);
        // HdrHistogram may round max value slightly
        assert!(s.max >= 10000 && s.max <= 10100);
    }

    #[test]
    fn test_records_beyond_initial_range() {
        let mut h = LatencyHistogram::new();
        h.record(5_000);

        let s = h.summary();
        assert_eq!(s.count, 1);
        assert!(s.max >= 5_000 && s.max <= 5_010, "max = {}", s.max);
        assert!(s.p50 >= 4_990 && s.p50 <= 5_010, "p50 = {}", s.p50);
    }

    #[test]
    fn test_records_large_latencies() {
        let mut h = LatencyHistogram::new();
        h.record(3_000_000_000);
        h.record(40);

        let s = h.summary();
        assert_eq!(s.min, 40);
        assert!(s.max >= 3_000_000_000 && s.max <= 3_010_000_000);
    }

    #[test]
    fn test_format_latency() {
        assert_eq!(format_latency(500), "500 ns");
        assert_eq!(format_latency(5000), "5.00 μs");
        assert_eq!(format_latency(5_000_000), "5.00 ms");
        assert_eq!(format_latency(5_000_000_000), "5.00 s");
    }

    #[test]
    fn test_stopwatch_mock() {
        let (clock, mock) = quanta::Clock::mock();
        let watch = Stopwatch::start_on(&clock);

        mock.increment(Duration::from_micros(7));
        assert_eq!(watch.elapsed_nanos(), 7_000);
    }
}
