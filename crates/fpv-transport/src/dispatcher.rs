//! Receiver-side demultiplexer: one task loops on the UDP socket, feeds
//! video fragments to the assembler, and echoes keepalive/probe traffic
//! used for NAT keep-open and punch detection.

use std::net::SocketAddr;

use fpv_core::types::Peer;
use fpv_proto::{Keepalive, Message, Probe, ROLE_RECEIVER};
use tracing::{debug, trace};

use crate::assembler::Assembler;

pub struct DispatcherState {
    pub assembler: Assembler,
    pub peer: Peer,
    pub last_video_time_us: Option<u64>,
    pub last_any_packet_us: Option<u64>,
    pub last_peer_ts_ms: u32,
    /// `session_id` carried by the most recently received datagram of any
    /// type, echoed back on all outgoing traffic.
    pub last_session_id: Option<u32>,
}

impl DispatcherState {
    pub fn new() -> Self {
        Self {
            assembler: Assembler::new(),
            peer: Peer::unknown(),
            last_video_time_us: None,
            last_any_packet_us: None,
            last_peer_ts_ms: 0,
            last_session_id: None,
        }
    }
}

impl Default for DispatcherState {
    fn default() -> Self {
        Self::new()
    }
}

/// What the dispatcher learned from one datagram; the caller (session
/// driver) decides what, if anything, to send back.
#[derive(Debug)]
pub enum DispatchEvent {
    Dropped,
    VideoFragment,
    Keepalive { echo: Keepalive },
    Probe { echo: Probe, first_from_punching: bool },
}

/// Parses and demultiplexes one datagram. Pure and synchronous so it can
/// be exercised without a real socket.
pub fn handle_datagram(
    state: &mut DispatcherState,
    buf: &[u8],
    from: SocketAddr,
    now_us: u64,
    now_ms: u32,
    currently_punching: bool,
) -> DispatchEvent {
    state.last_any_packet_us = Some(now_us);

    if buf.len() < fpv_proto::COMMON_HEADER_SIZE {
        return DispatchEvent::Dropped;
    }

    match Message::parse(buf) {
        Ok(Message::VideoFragment(frag)) => {
            if !state.peer.known {
                state.peer.adopt(from);
            }
            if let Err(err) = state.assembler.add_fragment(&frag, now_us) {
                debug!(%err, frame_id = frag.frame_id, "dropped video fragment");
            }
            state.last_video_time_us = Some(now_us);
            state.last_peer_ts_ms = frag.ts_ms;
            state.last_session_id = Some(frag.session_id);
            DispatchEvent::VideoFragment
        }
        Ok(Message::Keepalive(ka)) => {
            if !state.peer.known {
                state.peer.adopt(from);
            }
            state.last_peer_ts_ms = ka.ts_ms;
            state.last_session_id = Some(ka.session_id);
            let echo = Keepalive { session_id: ka.session_id, ts_ms: now_ms, seq: ka.seq, echo_ts_ms: ka.ts_ms };
            DispatchEvent::Keepalive { echo }
        }
        Ok(Message::Probe(probe)) => {
            let first_from_punching = currently_punching && !state.peer.known;
            if first_from_punching {
                state.peer.adopt(from);
            }
            state.last_session_id = Some(probe.session_id);
            let echo = Probe {
                session_id: probe.session_id,
                ts_ms: now_ms,
                probe_seq: probe.probe_seq,
                nonce: probe.nonce,
                role: ROLE_RECEIVER,
                flags: probe.flags,
            };
            DispatchEvent::Probe { echo, first_from_punching }
        }
        Ok(Message::IdrRequest(_)) | Ok(Message::Hello(_)) => {
            trace!("ignoring control message not handled by the dispatcher");
            DispatchEvent::Dropped
        }
        Err(_) => DispatchEvent::Dropped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fpv_proto::VideoFragment;

    #[test]
    fn adopts_peer_on_first_keepalive() {
        let mut state = DispatcherState::new();
        let from: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let ka = Keepalive { session_id: 1, ts_ms: 5, seq: 1, echo_ts_ms: 0 };
        let bytes = ka.marshal();

        let event = handle_datagram(&mut state, &bytes, from, 0, 0, false);
        assert!(matches!(event, DispatchEvent::Keepalive { .. }));
        assert!(state.peer.known);
        assert_eq!(state.peer.addr, from);
    }

    #[test]
    fn second_keepalive_from_new_address_does_not_override_peer() {
        let mut state = DispatcherState::new();
        let first: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let second: SocketAddr = "127.0.0.1:9001".parse().unwrap();
        let ka = Keepalive { session_id: 1, ts_ms: 5, seq: 1, echo_ts_ms: 0 };
        let bytes = ka.marshal();

        handle_datagram(&mut state, &bytes, first, 0, 0, false);
        handle_datagram(&mut state, &bytes, second, 0, 0, false);
        assert_eq!(state.peer.addr, first);
    }

    #[test]
    fn video_fragment_feeds_assembler() {
        let mut state = DispatcherState::new();
        let from: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let frag = VideoFragment {
            session_id: 1, stream_id: 1, frame_id: 1, frag_index: 0, frag_count: 1,
            ts_ms: 10, flags: 0, codec: fpv_proto::CODEC_H264, payload: bytes::Bytes::from_static(&[1, 2, 3]),
        };
        let bytes = frag.marshal();

        let event = handle_datagram(&mut state, &bytes, from, 100, 0, false);
        assert!(matches!(event, DispatchEvent::VideoFragment));
        assert!(state.assembler.take_latest_au().is_some());
        assert_eq!(state.last_video_time_us, Some(100));
    }

    #[test]
    fn short_datagram_is_dropped() {
        let mut state = DispatcherState::new();
        let from: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let event = handle_datagram(&mut state, &[1, 2], from, 0, 0, false);
        assert!(matches!(event, DispatchEvent::Dropped));
    }

    #[test]
    fn first_probe_while_punching_adopts_peer() {
        let mut state = DispatcherState::new();
        let from: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let probe = Probe { session_id: 1, ts_ms: 1, probe_seq: 1, nonce: 42, role: fpv_proto::ROLE_SENDER, flags: 0 };
        let bytes = probe.marshal();

        let event = handle_datagram(&mut state, &bytes, from, 0, 0, true);
        match event {
            DispatchEvent::Probe { first_from_punching, .. } => assert!(first_from_punching),
            _ => panic!("expected Probe event"),
        }
        assert!(state.peer.known);
    }
}
