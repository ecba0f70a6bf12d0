//! Per-parser running counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Default)]
struct LatencyWindow {
    last: Duration,
    avg_us: f64,
    samples: u64,
}

/// Running counters shared by all calls into one parser instance.
///
/// Counts are plain atomics; latency keeps the last observation and an
/// incrementally maintained running average behind a small mutex.
#[derive(Debug, Default)]
pub struct ParserMetrics {
    parse_count: AtomicU64,
    error_count: AtomicU64,
    latency: Mutex<LatencyWindow>,
}

/// Point-in-time copy of a parser's counters.
#[derive(Debug, Clone, PartialEq)]
pub struct ParserMetricsSnapshot {
    pub parse_count: u64,
    pub error_count: u64,
    pub last_latency: Duration,
    pub avg_latency: Duration,
}

impl ParserMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one parse attempt and its outcome.
    pub fn record(&self, elapsed: Duration, success: bool) {
        self.parse_count.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
        let mut window = self.latency.lock().unwrap_or_else(|e| e.into_inner());
        window.samples += 1;
        window.last = elapsed;
        let sample_us = elapsed.as_secs_f64() * 1_000_000.0;
        window.avg_us += (sample_us - window.avg_us) / window.samples as f64;
    }

    pub fn snapshot(&self) -> ParserMetricsSnapshot {
        let window = self.latency.lock().unwrap_or_else(|e| e.into_inner());
        ParserMetricsSnapshot {
            parse_count: self.parse_count.load(Ordering::Relaxed),
            error_count: self.error_count.load(Ordering::Relaxed),
            last_latency: window.last,
            avg_latency: Duration::from_secs_f64(window.avg_us / 1_000_000.0),
        }
    }
}
