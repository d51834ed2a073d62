//! Exponential moving averages and drop counters, snapshot under a short
//! lock at a bounded cadence (spec targets >= 1 s between prints).

use std::sync::Mutex;

use crate::assembler::AssemblerStats;

const EMA_ALPHA: f64 = 0.2;

#[derive(Debug, Clone, Copy, Default)]
pub struct Ema {
    value: Option<f64>,
}

impl Ema {
    pub fn observe(&mut self, sample: f64) {
        self.value = Some(match self.value {
            Some(prev) => EMA_ALPHA * sample + (1.0 - EMA_ALPHA) * prev,
            None => sample,
        });
    }

    pub fn get(&self) -> Option<f64> {
        self.value
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Counters {
    pub packets_received: u64,
    pub fragments_received: u64,
    pub frames_completed: u64,
    pub duplicate_fragments: u64,
    pub dropped_superseded: u64,
    pub dropped_overflow: u64,
    pub dropped_timeout: u64,
    pub dropped_stale: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Latencies {
    pub assembly_us: Ema,
    pub decode_us: Ema,
    pub upload_us: Ema,
    pub total_us: Ema,
    pub frame_interval_us: Ema,
    pub jitter_us: Ema,
}

/// Mutable telemetry state, shared behind one short-lived lock.
#[derive(Default)]
pub struct Telemetry {
    inner: Mutex<TelemetryInner>,
}

#[derive(Default)]
struct TelemetryInner {
    counters: Counters,
    latencies: Latencies,
    last_frame_ts_us: Option<u64>,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_packet(&self) {
        self.inner.lock().unwrap().counters.packets_received += 1;
    }

    pub fn record_stale(&self) {
        self.inner.lock().unwrap().counters.dropped_stale += 1;
    }

    /// Copies the assembler's running fragment/duplicate/drop totals into
    /// the telemetry snapshot. The assembler already tracks these as
    /// cumulative counts, so this overwrites rather than accumulates.
    pub fn sync_assembler_stats(&self, stats: AssemblerStats) {
        let mut inner = self.inner.lock().unwrap();
        inner.counters.fragments_received = stats.fragments_received;
        inner.counters.duplicate_fragments = stats.duplicate_fragments;
        inner.counters.dropped_superseded = stats.dropped_superseded;
        inner.counters.dropped_overflow = stats.dropped_overflow;
        inner.counters.dropped_timeout = stats.dropped_timeout;
    }

    /// Records a completed access unit's timing telemetry, updating the
    /// assembly EMA, the frame-interval EMA, and its jitter relative to
    /// `target_fps`.
    pub fn record_frame_completed(&self, first_packet_us: u64, assembly_complete_us: u64, target_fps: u32) {
        let mut inner = self.inner.lock().unwrap();
        inner.counters.frames_completed += 1;
        let assembly_us = assembly_complete_us.saturating_sub(first_packet_us) as f64;
        inner.latencies.assembly_us.observe(assembly_us);

        if let Some(last) = inner.last_frame_ts_us {
            let interval_us = assembly_complete_us.saturating_sub(last) as f64;
            inner.latencies.frame_interval_us.observe(interval_us);
            if target_fps > 0 {
                let target_interval_us = 1_000_000.0 / target_fps as f64;
                inner.latencies.jitter_us.observe((interval_us - target_interval_us).abs());
            }
        }
        inner.last_frame_ts_us = Some(assembly_complete_us);
    }

    pub fn record_decode(&self, decode_us: f64) {
        self.inner.lock().unwrap().latencies.decode_us.observe(decode_us);
    }

    pub fn record_upload(&self, upload_us: f64) {
        self.inner.lock().unwrap().latencies.upload_us.observe(upload_us);
    }

    pub fn record_total(&self, total_us: f64) {
        self.inner.lock().unwrap().latencies.total_us.observe(total_us);
    }

    pub fn snapshot(&self) -> (Counters, Latencies) {
        let inner = self.inner.lock().unwrap();
        (inner.counters, inner.latencies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_weights_new_samples_at_alpha() {
        let mut ema = Ema::default();
        ema.observe(10.0);
        assert_eq!(ema.get(), Some(10.0));
        ema.observe(20.0);
        assert!((ema.get().unwrap() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn counters_accumulate() {
        let t = Telemetry::new();
        t.record_packet();
        t.record_packet();
        t.record_stale();
        let (counters, _) = t.snapshot();
        assert_eq!(counters.packets_received, 2);
        assert_eq!(counters.dropped_stale, 1);
    }

    #[test]
    fn sync_assembler_stats_reflects_running_totals() {
        let t = Telemetry::new();
        let stats = AssemblerStats {
            fragments_received: 10,
            duplicate_fragments: 2,
            frames_completed: 3,
            dropped_superseded: 1,
            dropped_overflow: 1,
            dropped_timeout: 2,
        };
        t.sync_assembler_stats(stats);
        let (counters, _) = t.snapshot();
        assert_eq!(counters.fragments_received, 10);
        assert_eq!(counters.duplicate_fragments, 2);
        assert_eq!(counters.dropped_superseded, 1);
        assert_eq!(counters.dropped_overflow, 1);
        assert_eq!(counters.dropped_timeout, 2);
    }

    #[test]
    fn frame_completion_updates_interval_and_jitter() {
        let t = Telemetry::new();
        t.record_frame_completed(1_000, 1_200, 60);
        t.record_frame_completed(17_000, 17_300, 60);
        let (counters, latencies) = t.snapshot();
        assert_eq!(counters.frames_completed, 2);
        assert!(latencies.frame_interval_us.get().is_some());
        assert!(latencies.jitter_us.get().is_some());
    }
}
