//! Monotonic microsecond clock and session-relative millisecond timestamps.
//!
//! `monotonic_us` never goes on the wire; only `ts_ms` (relative to the
//! moment a `TimeSource` is created) is marshaled into protocol messages.

use std::time::Instant;

#[derive(Debug, Clone)]
pub struct TimeSource {
    epoch: Instant,
}

impl TimeSource {
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }

    /// Local monotonic microsecond clock, for timeouts and telemetry only.
    pub fn monotonic_us(&self) -> u64 {
        self.epoch.elapsed().as_micros() as u64
    }

    /// Session-relative milliseconds since this `TimeSource` was created.
    pub fn ts_ms(&self) -> u32 {
        self.epoch.elapsed().as_millis() as u32
    }
}

impl Default for TimeSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ts_ms_starts_near_zero() {
        let ts = TimeSource::new();
        assert!(ts.ts_ms() < 50);
    }

    #[test]
    fn monotonic_us_is_non_decreasing() {
        let ts = TimeSource::new();
        let a = ts.monotonic_us();
        let b = ts.monotonic_us();
        assert!(b >= a);
    }
}
