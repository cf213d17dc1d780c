//! Reconfigure timing telemetry.
//!
//! Collects reconfigure durations in a fixed-size ring buffer so the worker
//! can report how long transforms take to rebuild without growing memory.

use std::time::Duration;

/// Ring buffer size for duration samples.
const SAMPLE_BUFFER_SIZE: usize = 64;

/// Summary of recent reconfigure timings, in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TelemetrySummary {
    pub avg_us: u64,
    pub max_us: u64,
    pub p95_us: u64,
    /// Total reconfigure calls since the scheduler was created.
    pub runs: u64,
    /// Total failed (or panicked) reconfigure calls.
    pub failures: u64,
    /// Requests that were overwritten in the pending slot before running.
    pub coalesced: u64,
}

pub struct ReconfigureTelemetry {
    /// Ring buffer of durations in microseconds
    durations_us: [u64; SAMPLE_BUFFER_SIZE],
    /// Current write index in the ring buffer
    idx: usize,
    /// Number of samples collected (saturates at SAMPLE_BUFFER_SIZE)
    sample_count: usize,
    max_us: u64,
    runs: u64,
    failures: u64,
    coalesced: u64,
}

impl Default for ReconfigureTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconfigureTelemetry {
    pub fn new() -> Self {
        Self {
            durations_us: [0; SAMPLE_BUFFER_SIZE],
            idx: 0,
            sample_count: 0,
            max_us: 0,
            runs: 0,
            failures: 0,
            coalesced: 0,
        }
    }

    /// Record one reconfigure call.
    pub fn record(&mut self, duration: Duration, ok: bool) {
        let us = duration.as_micros().min(u64::MAX as u128) as u64;

        self.durations_us[self.idx] = us;
        self.idx = (self.idx + 1) % SAMPLE_BUFFER_SIZE;
        if self.sample_count < SAMPLE_BUFFER_SIZE {
            self.sample_count += 1;
        }
        self.max_us = self.max_us.max(us);
        self.runs += 1;
        if !ok {
            self.failures += 1;
        }
    }

    /// Count a pending request that was replaced before it ran.
    pub fn record_coalesced(&mut self) {
        self.coalesced += 1;
    }

    pub fn summary(&self) -> TelemetrySummary {
        let mut summary = TelemetrySummary {
            runs: self.runs,
            failures: self.failures,
            coalesced: self.coalesced,
            max_us: self.max_us,
            ..TelemetrySummary::default()
        };
        if self.sample_count == 0 {
            return summary;
        }

        let window = &self.durations_us[..self.sample_count];
        summary.avg_us = window.iter().sum::<u64>() / self.sample_count as u64;

        let mut sorted = self.durations_us;
        sorted[..self.sample_count].sort_unstable();
        let p95_idx = (self.sample_count * 95 / 100).max(1) - 1;
        summary.p95_us = sorted[p95_idx.min(self.sample_count - 1)];

        summary
    }
}
