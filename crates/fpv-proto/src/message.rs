//! Message structs and their `parse`/`marshal` pairs.
//!
//! All multi-byte integers are big-endian; structures are packed with no
//! implicit padding on the wire.

use crate::constants::*;
use crate::error::ProtoError;
use bytes::{Bytes, BytesMut};

fn read_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_be_bytes(buf[at..at + 2].try_into().unwrap())
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_be_bytes(buf[at..at + 4].try_into().unwrap())
}

fn read_u64(buf: &[u8], at: usize) -> u64 {
    u64::from_be_bytes(buf[at..at + 8].try_into().unwrap())
}

fn write_common_header(buf: &mut BytesMut, msg_type: u8, header_len: u16, session_id: u32) {
    buf.extend_from_slice(&[msg_type, PROTOCOL_VERSION]);
    buf.extend_from_slice(&header_len.to_be_bytes());
    buf.extend_from_slice(&session_id.to_be_bytes());
}

/// The 8-byte prefix common to every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonHeader {
    pub msg_type: u8,
    pub version: u8,
    pub header_len: u16,
    pub session_id: u32,
}

impl CommonHeader {
    pub fn parse(buf: &[u8]) -> Result<Self, ProtoError> {
        if buf.len() < COMMON_HEADER_SIZE {
            return Err(ProtoError::TooShort);
        }
        let hdr = CommonHeader {
            msg_type: buf[0],
            version: buf[1],
            header_len: read_u16(buf, 2),
            session_id: read_u32(buf, 4),
        };
        if hdr.version != PROTOCOL_VERSION {
            return Err(ProtoError::BadVersion);
        }
        Ok(hdr)
    }
}

// ── VIDEO_FRAGMENT ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFragment {
    pub session_id: u32,
    pub stream_id: u32,
    pub frame_id: u32,
    pub frag_index: u16,
    pub frag_count: u16,
    pub ts_ms: u32,
    pub flags: u8,
    pub codec: u8,
    pub payload: Bytes,
}

impl VideoFragment {
    pub fn is_keyframe(&self) -> bool {
        self.flags & FLAG_KEYFRAME != 0
    }

    pub fn has_spspps(&self) -> bool {
        self.flags & FLAG_SPSPPS != 0
    }

    pub fn parse(buf: &[u8]) -> Result<Self, ProtoError> {
        if buf.len() < VIDEO_FRAGMENT_HEADER_SIZE {
            return Err(ProtoError::TooShort);
        }
        if buf[0] != MSG_VIDEO_FRAGMENT {
            return Err(ProtoError::BadType { expected: MSG_VIDEO_FRAGMENT, got: buf[0] });
        }
        if buf[1] != PROTOCOL_VERSION {
            return Err(ProtoError::BadVersion);
        }

        let session_id = read_u32(buf, 4);
        let stream_id = read_u32(buf, 8);
        let frame_id = read_u32(buf, 12);
        let frag_index = read_u16(buf, 16);
        let frag_count = read_u16(buf, 18);
        let ts_ms = read_u32(buf, 20);
        let flags = buf[24];
        let codec = buf[25];
        let payload_len = read_u16(buf, 26) as usize;

        if codec != CODEC_H264 {
            return Err(ProtoError::BadCodec(codec));
        }
        if frag_count == 0 || frag_index >= frag_count || frag_count as usize > MAX_FRAGMENTS {
            return Err(ProtoError::BadFragmentIndex { index: frag_index, count: frag_count });
        }
        if buf.len() < VIDEO_FRAGMENT_HEADER_SIZE + payload_len {
            return Err(ProtoError::TruncatedPayload);
        }

        let payload = Bytes::copy_from_slice(
            &buf[VIDEO_FRAGMENT_HEADER_SIZE..VIDEO_FRAGMENT_HEADER_SIZE + payload_len],
        );

        Ok(Self { session_id, stream_id, frame_id, frag_index, frag_count, ts_ms, flags, codec, payload })
    }

    pub fn marshal(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(VIDEO_FRAGMENT_HEADER_SIZE + self.payload.len());
        write_common_header(&mut buf, MSG_VIDEO_FRAGMENT, VIDEO_FRAGMENT_HEADER_SIZE as u16, self.session_id);
        buf.extend_from_slice(&self.stream_id.to_be_bytes());
        buf.extend_from_slice(&self.frame_id.to_be_bytes());
        buf.extend_from_slice(&self.frag_index.to_be_bytes());
        buf.extend_from_slice(&self.frag_count.to_be_bytes());
        buf.extend_from_slice(&self.ts_ms.to_be_bytes());
        buf.extend_from_slice(&[self.flags, self.codec]);
        buf.extend_from_slice(&(self.payload.len() as u16).to_be_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }
}

// ── KEEPALIVE ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keepalive {
    pub session_id: u32,
    pub ts_ms: u32,
    pub seq: u32,
    pub echo_ts_ms: u32,
}

impl Keepalive {
    pub fn parse(buf: &[u8]) -> Result<Self, ProtoError> {
        if buf.len() < KEEPALIVE_HEADER_SIZE {
            return Err(ProtoError::TooShort);
        }
        if buf[0] != MSG_KEEPALIVE {
            return Err(ProtoError::BadType { expected: MSG_KEEPALIVE, got: buf[0] });
        }
        if buf[1] != PROTOCOL_VERSION {
            return Err(ProtoError::BadVersion);
        }
        Ok(Self {
            session_id: read_u32(buf, 4),
            ts_ms: read_u32(buf, 8),
            seq: read_u32(buf, 12),
            echo_ts_ms: read_u32(buf, 16),
        })
    }

    pub fn marshal(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(KEEPALIVE_HEADER_SIZE);
        write_common_header(&mut buf, MSG_KEEPALIVE, KEEPALIVE_HEADER_SIZE as u16, self.session_id);
        buf.extend_from_slice(&self.ts_ms.to_be_bytes());
        buf.extend_from_slice(&self.seq.to_be_bytes());
        buf.extend_from_slice(&self.echo_ts_ms.to_be_bytes());
        buf
    }
}

// ── IDR_REQUEST ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdrRequest {
    pub session_id: u32,
    pub seq: u32,
    pub ts_ms: u32,
    pub reason: u8,
}

impl IdrRequest {
    pub fn parse(buf: &[u8]) -> Result<Self, ProtoError> {
        if buf.len() < IDR_REQUEST_HEADER_SIZE {
            return Err(ProtoError::TooShort);
        }
        if buf[0] != MSG_IDR_REQUEST {
            return Err(ProtoError::BadType { expected: MSG_IDR_REQUEST, got: buf[0] });
        }
        if buf[1] != PROTOCOL_VERSION {
            return Err(ProtoError::BadVersion);
        }
        Ok(Self {
            session_id: read_u32(buf, 4),
            seq: read_u32(buf, 8),
            ts_ms: read_u32(buf, 12),
            reason: buf[16],
        })
    }

    pub fn marshal(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(IDR_REQUEST_HEADER_SIZE);
        write_common_header(&mut buf, MSG_IDR_REQUEST, IDR_REQUEST_HEADER_SIZE as u16, self.session_id);
        buf.extend_from_slice(&self.seq.to_be_bytes());
        buf.extend_from_slice(&self.ts_ms.to_be_bytes());
        buf.extend_from_slice(&[self.reason, 0, 0, 0]);
        buf
    }
}

// ── PROBE ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub session_id: u32,
    pub ts_ms: u32,
    pub probe_seq: u32,
    pub nonce: u64,
    pub role: u8,
    pub flags: u8,
}

impl Probe {
    pub fn parse(buf: &[u8]) -> Result<Self, ProtoError> {
        if buf.len() < PROBE_HEADER_SIZE {
            return Err(ProtoError::TooShort);
        }
        if buf[0] != MSG_PROBE {
            return Err(ProtoError::BadType { expected: MSG_PROBE, got: buf[0] });
        }
        if buf[1] != PROTOCOL_VERSION {
            return Err(ProtoError::BadVersion);
        }
        Ok(Self {
            session_id: read_u32(buf, 4),
            ts_ms: read_u32(buf, 8),
            probe_seq: read_u32(buf, 12),
            nonce: read_u64(buf, 16),
            role: buf[24],
            flags: buf[25],
        })
    }

    pub fn marshal(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(PROBE_HEADER_SIZE);
        write_common_header(&mut buf, MSG_PROBE, PROBE_HEADER_SIZE as u16, self.session_id);
        buf.extend_from_slice(&self.ts_ms.to_be_bytes());
        buf.extend_from_slice(&self.probe_seq.to_be_bytes());
        buf.extend_from_slice(&self.nonce.to_be_bytes());
        buf.extend_from_slice(&[self.role, self.flags, 0, 0]);
        buf
    }
}

// ── HELLO ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hello {
    pub session_id: u32,
    pub width: u16,
    pub height: u16,
    pub fps_x10: u16,
    pub bitrate_bps: u32,
    pub avc_profile: u8,
    pub avc_level: u8,
    pub idr_interval_frames: u32,
}

impl Hello {
    pub fn parse(buf: &[u8]) -> Result<Self, ProtoError> {
        if buf.len() < HELLO_HEADER_SIZE {
            return Err(ProtoError::TooShort);
        }
        if buf[0] != MSG_HELLO {
            return Err(ProtoError::BadType { expected: MSG_HELLO, got: buf[0] });
        }
        if buf[1] != PROTOCOL_VERSION {
            return Err(ProtoError::BadVersion);
        }
        Ok(Self {
            session_id: read_u32(buf, 4),
            width: read_u16(buf, 8),
            height: read_u16(buf, 10),
            fps_x10: read_u16(buf, 12),
            bitrate_bps: read_u32(buf, 14),
            avc_profile: buf[18],
            avc_level: buf[19],
            idr_interval_frames: read_u32(buf, 20),
        })
    }

    pub fn marshal(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(HELLO_HEADER_SIZE);
        write_common_header(&mut buf, MSG_HELLO, HELLO_HEADER_SIZE as u16, self.session_id);
        buf.extend_from_slice(&self.width.to_be_bytes());
        buf.extend_from_slice(&self.height.to_be_bytes());
        buf.extend_from_slice(&self.fps_x10.to_be_bytes());
        buf.extend_from_slice(&self.bitrate_bps.to_be_bytes());
        buf.extend_from_slice(&[self.avc_profile, self.avc_level]);
        buf.extend_from_slice(&self.idr_interval_frames.to_be_bytes());
        buf.extend_from_slice(&[0u8; 8]);
        buf
    }
}

// ── Dispatch enum ────────────────────────────────────────────────────────────

/// Any parsed message, tagged by wire type — what the receiver dispatcher
/// demuxes on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    VideoFragment(VideoFragment),
    Keepalive(Keepalive),
    IdrRequest(IdrRequest),
    Probe(Probe),
    Hello(Hello),
}

impl Message {
    /// Parse a datagram by dispatching on its first byte.
    pub fn parse(buf: &[u8]) -> Result<Self, ProtoError> {
        if buf.len() < COMMON_HEADER_SIZE {
            return Err(ProtoError::TooShort);
        }
        match buf[0] {
            MSG_VIDEO_FRAGMENT => VideoFragment::parse(buf).map(Message::VideoFragment),
            MSG_KEEPALIVE => Keepalive::parse(buf).map(Message::Keepalive),
            MSG_IDR_REQUEST => IdrRequest::parse(buf).map(Message::IdrRequest),
            MSG_PROBE => Probe::parse(buf).map(Message::Probe),
            MSG_HELLO => Hello::parse(buf).map(Message::Hello),
            other => Err(ProtoError::BadType { expected: MSG_VIDEO_FRAGMENT, got: other }),
        }
    }

    pub fn marshal(&self) -> BytesMut {
        match self {
            Message::VideoFragment(m) => m.marshal(),
            Message::Keepalive(m) => m.marshal(),
            Message::IdrRequest(m) => m.marshal(),
            Message::Probe(m) => m.marshal(),
            Message::Hello(m) => m.marshal(),
        }
    }

    pub fn session_id(&self) -> u32 {
        match self {
            Message::VideoFragment(m) => m.session_id,
            Message::Keepalive(m) => m.session_id,
            Message::IdrRequest(m) => m.session_id,
            Message::Probe(m) => m.session_id,
            Message::Hello(m) => m.session_id,
        }
    }
}
