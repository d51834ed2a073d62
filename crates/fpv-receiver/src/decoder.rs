//! Software stand-in for the hardware H.264 decoder the core treats as an
//! opaque collaborator. Does not decode H.264 — it tracks
//! reference-state validity the way a real decoder would (no output until
//! an IDR is seen) and hands back the Annex-B bytes as if they were a
//! decoded picture, so the transport pipeline is exercisable end to end
//! without real codec hardware.

use fpv_core::boundary::Decoder;
use fpv_core::errors::FpvError;
use fpv_core::types::{AccessUnit, DecodedFrame, PixelFormat};

pub struct PassthroughDecoder {
    width: u32,
    height: u32,
    seen_keyframe: bool,
}

impl PassthroughDecoder {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, seen_keyframe: false }
    }
}

impl Decoder for PassthroughDecoder {
    fn decode(&mut self, au: &AccessUnit) -> Result<DecodedFrame, FpvError> {
        if au.is_keyframe {
            self.seen_keyframe = true;
        }
        if !self.seen_keyframe {
            return Err(FpvError::NoKeyframeYet);
        }
        Ok(DecodedFrame {
            data: au.data.clone(),
            width: self.width,
            height: self.height,
            timestamp_us: au.assembly_complete_us,
            format: PixelFormat::Nv12,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn au(is_keyframe: bool) -> AccessUnit {
        AccessUnit {
            frame_id: 1,
            ts_ms: 0,
            is_keyframe,
            has_spspps: is_keyframe,
            data: Bytes::from_static(&[0, 0, 0, 1]),
            first_packet_time_us: 0,
            assembly_complete_us: 10,
        }
    }

    #[test]
    fn suppresses_output_until_first_keyframe() {
        let mut dec = PassthroughDecoder::new(1280, 720);
        assert!(matches!(dec.decode(&au(false)), Err(FpvError::NoKeyframeYet)));
        assert!(dec.decode(&au(true)).is_ok());
        assert!(dec.decode(&au(false)).is_ok());
    }
}
