use crate::types::VideoCodec;
use serde::{Deserialize, Serialize};

/// Stream parameters, as advertised by an optional HELLO message and used
/// to size the encoder on the sender side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub width: u16,
    pub height: u16,
    pub target_fps: u32,
    pub max_bitrate_bps: u64,
    pub codec: VideoCodec,
    pub idr_interval_frames: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            target_fps: 60,
            max_bitrate_bps: 8_000_000,
            codec: VideoCodec::H264,
            idr_interval_frames: 120,
        }
    }
}

impl StreamConfig {
    pub fn frame_interval_us(&self) -> u64 {
        1_000_000 / self.target_fps.max(1) as u64
    }

    pub fn fps_x10(&self) -> u16 {
        (self.target_fps * 10).min(u16::MAX as u32) as u16
    }
}

/// Sender-side runtime configuration, built from CLI flags in `fpv-sender`.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    pub stream: StreamConfig,
    pub session_id: u32,
    pub fec: Option<(u8, u8)>,
    pub emit_hello: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_defaults() {
        let cfg = StreamConfig::default();
        assert_eq!(cfg.codec, VideoCodec::H264);
        assert_eq!(cfg.frame_interval_us(), 1_000_000 / 60);
    }

    #[test]
    fn round_trips_through_json() {
        let cfg = StreamConfig { target_fps: 30, ..StreamConfig::default() };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: StreamConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
