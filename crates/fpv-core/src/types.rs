use bytes::Bytes;
use std::net::SocketAddr;

// ── Codec / pixel format ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    H264,
}

impl VideoCodec {
    pub fn wire_value(self) -> u8 {
        match self {
            VideoCodec::H264 => 1,
        }
    }

    pub fn from_wire_value(v: u8) -> Option<Self> {
        match v {
            1 => Some(VideoCodec::H264),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Nv12,
    Rgba,
}

// ── IDR request reasons ─────────────────────────────────────────────────────

/// Four-value IDR-request reason scheme. A competing three-value scheme
/// found in one reference implementation is treated as a bug there, not an
/// alternative worth supporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdrReason {
    Startup = 1,
    DecodeError = 2,
    Loss = 3,
    User = 4,
}

impl IdrReason {
    pub fn wire_value(self) -> u8 {
        self as u8
    }

    pub fn from_wire_value(v: u8) -> Option<Self> {
        match v {
            1 => Some(IdrReason::Startup),
            2 => Some(IdrReason::DecodeError),
            3 => Some(IdrReason::Loss),
            4 => Some(IdrReason::User),
            _ => None,
        }
    }
}

// ── Access units ────────────────────────────────────────────────────────────

/// Produced by the sender's `Encoder`; consumed immediately by the sender
/// pacer. Never stored beyond that handoff.
#[derive(Debug, Clone)]
pub struct EncodedAccessUnit {
    pub frame_id: u32,
    pub ts_us: u64,
    pub is_keyframe: bool,
    pub has_spspps: bool,
    pub data: Bytes,
}

/// Assembled on the receiver from fragments of a single `frame_id`.
#[derive(Debug, Clone)]
pub struct AccessUnit {
    pub frame_id: u32,
    pub ts_ms: u32,
    pub is_keyframe: bool,
    pub has_spspps: bool,
    pub data: Bytes,
    pub first_packet_time_us: u64,
    pub assembly_complete_us: u64,
}

/// A decoded picture ready for presentation. Pixel format is not prescribed
/// by the core; implementers of `Decoder`/`Presenter` agree on one.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    pub timestamp_us: u64,
    pub format: PixelFormat,
}

// ── Peer ─────────────────────────────────────────────────────────────────────

/// The remote endpoint of a session. `known` becomes `true` exactly once,
/// on the first legal keepalive/probe (receiver) or CLI/signaling input
/// (sender).
#[derive(Debug, Clone, Copy)]
pub struct Peer {
    pub addr: SocketAddr,
    pub known: bool,
}

impl Peer {
    pub fn unknown() -> Self {
        Self { addr: "0.0.0.0:0".parse().unwrap(), known: false }
    }

    pub fn adopt(&mut self, addr: SocketAddr) {
        self.addr = addr;
        self.known = true;
    }
}

impl Default for Peer {
    fn default() -> Self {
        Self::unknown()
    }
}

// ── Session state machine ───────────────────────────────────────────────────

/// Receiver connection lifecycle: STUN discovery, NAT punching, then
/// steady-state streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    StunGather,
    WaitSender,
    Punching,
    Streaming,
    Error,
}

impl SessionState {
    pub fn name(self) -> &'static str {
        match self {
            SessionState::Init => "INIT",
            SessionState::StunGather => "STUN_GATHER",
            SessionState::WaitSender => "WAIT_SENDER",
            SessionState::Punching => "PUNCHING",
            SessionState::Streaming => "STREAMING",
            SessionState::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
