//! Wire-format constants, ported byte-for-byte from the original `fpv_protocol.h`.

pub const PROTOCOL_VERSION: u8 = 1;

pub const MSG_VIDEO_FRAGMENT: u8 = 0x01;
pub const MSG_KEEPALIVE: u8 = 0x02;
pub const MSG_IDR_REQUEST: u8 = 0x03;
pub const MSG_PROBE: u8 = 0x04;
pub const MSG_HELLO: u8 = 0x05;

pub const FLAG_KEYFRAME: u8 = 0x01;
pub const FLAG_SPSPPS: u8 = 0x02;

pub const CODEC_H264: u8 = 1;

pub const ROLE_SENDER: u8 = 1;
pub const ROLE_RECEIVER: u8 = 2;

pub const COMMON_HEADER_SIZE: usize = 8;
pub const VIDEO_FRAGMENT_HEADER_SIZE: usize = 28;
pub const KEEPALIVE_HEADER_SIZE: usize = 20;
pub const IDR_REQUEST_HEADER_SIZE: usize = 20;
pub const PROBE_HEADER_SIZE: usize = 28;
pub const HELLO_HEADER_SIZE: usize = 32;

pub const MAX_PAYLOAD_SIZE: usize = 1200;
pub const MAX_FRAGMENTS: usize = 64;
pub const MAX_AU_SIZE: usize = 128 * 1024;
pub const FRAME_TIMEOUT_MS: u32 = 80;
pub const MAX_INFLIGHT_FRAMES: usize = 12;
pub const PROBE_INTERVAL_MS: u64 = 20;
pub const PUNCH_WINDOW_MS: u64 = 3000;
pub const KEEPALIVE_INTERVAL_MS: u64 = 1000;
pub const SESSION_IDLE_TIMEOUT_MS: u64 = 3000;
