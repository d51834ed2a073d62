//! Software stand-in for the camera the core treats as an opaque
//! collaborator. Produces a small, deterministic payload
//! per frame instead of real pixel data — `fpv-sender`'s encoder and
//! downstream transport never inspect frame contents, only their size and
//! cadence, so this is enough to exercise the pipeline end to end without
//! V4L2 or a real sensor.

use bytes::Bytes;
use fpv_core::boundary::{Camera, CapturedFrame};
use fpv_core::errors::FpvError;
use fpv_core::TimeSource;

pub struct SyntheticCamera {
    width: u32,
    height: u32,
    time: TimeSource,
    seq: u64,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, time: TimeSource::new(), seq: 0 }
    }
}

impl Camera for SyntheticCamera {
    fn capture(&mut self) -> Result<CapturedFrame, FpvError> {
        self.seq = self.seq.wrapping_add(1);
        // A few hundred bytes is enough for the encoder stand-in to chew on
        // without the workspace paying for megabyte-sized raw frames.
        let payload_len = ((self.width as usize * self.height as usize) / 4096).max(64);
        let pattern = (self.seq % 256) as u8;
        let data = Bytes::from(vec![pattern; payload_len]);
        Ok(CapturedFrame { data, width: self.width, height: self.height, timestamp_us: self.time.monotonic_us() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_frames_at_configured_resolution() {
        let mut cam = SyntheticCamera::new(640, 480);
        let frame = cam.capture().unwrap();
        assert_eq!(frame.width, 640);
        assert_eq!(frame.height, 480);
        assert!(!frame.data.is_empty());
    }

    #[test]
    fn successive_captures_vary_payload() {
        let mut cam = SyntheticCamera::new(640, 480);
        let a = cam.capture().unwrap();
        let b = cam.capture().unwrap();
        assert_ne!(a.data, b.data);
    }
}
