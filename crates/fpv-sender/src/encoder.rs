//! Software stand-in for the hardware H.264 encoder the core treats as an
//! opaque collaborator. Emits Annex-B-shaped byte streams
//! (start codes + NAL type bytes) without ever implementing actual video
//! compression, so the frames it produces exercise fragmentation, FEC, and
//! reassembly exactly as real encoded access units would.

use bytes::BytesMut;
use fpv_core::boundary::{CapturedFrame, Encoder};
use fpv_core::errors::FpvError;
use fpv_core::types::EncodedAccessUnit;

const NAL_SPS: u8 = 0x67;
const NAL_PPS: u8 = 0x68;
const NAL_IDR_SLICE: u8 = 0x65;
const NAL_NONIDR_SLICE: u8 = 0x61;
const START_CODE: [u8; 4] = [0, 0, 0, 1];

pub struct PassthroughEncoder {
    frame_id: u32,
    idr_interval_frames: u32,
}

impl PassthroughEncoder {
    pub fn new(idr_interval_frames: u32) -> Self {
        Self { frame_id: 0, idr_interval_frames: idr_interval_frames.max(1) }
    }
}

impl Encoder for PassthroughEncoder {
    fn encode(&mut self, frame: &CapturedFrame, force_idr: bool) -> Result<EncodedAccessUnit, FpvError> {
        let frame_id = self.frame_id;
        let is_keyframe = force_idr || frame_id % self.idr_interval_frames == 0;

        let mut data = BytesMut::with_capacity(frame.data.len() + 16);
        if is_keyframe {
            data.extend_from_slice(&START_CODE);
            data.extend_from_slice(&[NAL_SPS]);
            data.extend_from_slice(&START_CODE);
            data.extend_from_slice(&[NAL_PPS]);
        }
        data.extend_from_slice(&START_CODE);
        data.extend_from_slice(&[if is_keyframe { NAL_IDR_SLICE } else { NAL_NONIDR_SLICE }]);
        data.extend_from_slice(&frame.data);

        self.frame_id = self.frame_id.wrapping_add(1);

        Ok(EncodedAccessUnit {
            frame_id,
            ts_us: frame.timestamp_us,
            is_keyframe,
            has_spspps: is_keyframe,
            data: data.freeze(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn frame() -> CapturedFrame {
        CapturedFrame { data: Bytes::from_static(&[0xAA; 32]), width: 640, height: 480, timestamp_us: 0 }
    }

    #[test]
    fn first_frame_is_always_a_keyframe() {
        let mut enc = PassthroughEncoder::new(10);
        let au = enc.encode(&frame(), false).unwrap();
        assert!(au.is_keyframe);
        assert!(au.has_spspps);
        assert_eq!(au.frame_id, 0);
    }

    #[test]
    fn honors_idr_interval_and_force_flag() {
        let mut enc = PassthroughEncoder::new(3);
        let first = enc.encode(&frame(), false).unwrap();
        let second = enc.encode(&frame(), false).unwrap();
        let third = enc.encode(&frame(), false).unwrap();
        let forced = enc.encode(&frame(), true).unwrap();

        assert!(first.is_keyframe);
        assert!(!second.is_keyframe);
        assert!(third.is_keyframe);
        assert!(forced.is_keyframe);
    }

    #[test]
    fn frame_ids_increment_monotonically() {
        let mut enc = PassthroughEncoder::new(5);
        let a = enc.encode(&frame(), false).unwrap();
        let b = enc.encode(&frame(), false).unwrap();
        assert_eq!(b.frame_id, a.frame_id + 1);
    }
}
