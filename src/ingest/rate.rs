//! # Arrival Rate Sampling
//!
//! Packets-per-second from the delta of a monotonic packet counter.
//!
//! The rate is `(count - last_count) / elapsed`, with `elapsed` measured from
//! the previous sample rather than assumed to be the nominal period.

use std::time::{Duration, Instant};

/// Nominal sampling period of the rate monitor
pub const RATE_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Rate sampler for one link
#[derive(Debug, Clone)]
pub struct RateSampler {
    last_count: u64,
    last_sample: Instant,
    rate_hz: f64,
}

impl RateSampler {
    pub fn new(now: Instant) -> Self {
        Self {
            last_count: 0,
            last_sample: now,
            rate_hz: 0.0,
        }
    }

    /// Starts a fresh measurement window at `count`
    pub fn reset(&mut self, now: Instant, count: u64) {
        self.last_count = count;
        self.last_sample = now;
        self.rate_hz = 0.0;
    }

    /// Takes one sample and returns the current rate in Hz
    ///
    /// A disconnected link reads 0.0 and leaves the baseline untouched. A
    /// non-positive elapsed time skips the update and keeps the previous rate.
    pub fn sample(&mut self, now: Instant, count: u64, connected: bool) -> f64 {
        if !connected {
            self.rate_hz = 0.0;
            return self.rate_hz;
        }

        let elapsed = now.saturating_duration_since(self.last_sample).as_secs_f64();
        if elapsed <= 0.0 {
            return self.rate_hz;
        }

        let delta = count.saturating_sub(self.last_count);
        self.rate_hz = delta as f64 / elapsed;
        self.last_count = count;
        self.last_sample = now;
        self.rate_hz
    }

    /// Rate from the most recent sample
    pub fn rate_hz(&self) -> f64 {
        self.rate_hz
    }
}
