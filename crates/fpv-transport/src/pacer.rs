//! Sender-side pacing: fragmentation of access units, keepalive/probe/IDR
//! emission, all over a caller-owned `UdpSocket`.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use fpv_core::types::{EncodedAccessUnit, IdrReason};
use fpv_proto::{
    Hello, IdrRequest, Keepalive, Probe, VideoFragment, CODEC_H264, MAX_FRAGMENTS, MAX_PAYLOAD_SIZE, ROLE_SENDER,
    VIDEO_FRAGMENT_HEADER_SIZE,
};
use tokio::net::UdpSocket;
use tracing::warn;

const INTER_FRAGMENT_DELAY: Duration = Duration::from_micros(200);

pub struct Pacer {
    session_id: u32,
    stream_id: u32,
    keepalive_seq: u32,
    probe_seq: u32,
    idr_seq: u32,
    last_peer_ts_ms: u32,
}

impl Pacer {
    pub fn new(session_id: u32, stream_id: u32) -> Self {
        Self { session_id, stream_id, keepalive_seq: 0, probe_seq: 0, idr_seq: 0, last_peer_ts_ms: 0 }
    }

    /// Adopts a session id learned from the peer (the receiver echoes the
    /// sender-chosen `session_id` on all outgoing messages after its first
    /// observation).
    pub fn set_session_id(&mut self, session_id: u32) {
        self.session_id = session_id;
    }

    pub fn note_peer_ts_ms(&mut self, ts_ms: u32) {
        self.last_peer_ts_ms = ts_ms;
    }

    /// Splits `au` into its `VideoFragment` datagrams without sending them.
    /// Shared by `send_access_unit` and by callers (e.g. the sender's
    /// optional FEC wrapper) that need the marshaled fragments themselves.
    pub fn build_fragments(&self, au: &EncodedAccessUnit) -> Vec<BytesMut> {
        let chunk_size = MAX_PAYLOAD_SIZE - VIDEO_FRAGMENT_HEADER_SIZE;
        let n_frag = au.data.len().div_ceil(chunk_size).max(1).min(MAX_FRAGMENTS);
        let flags = (au.is_keyframe as u8) | ((au.has_spspps as u8) << 1);
        let ts_ms = (au.ts_us / 1_000) as u32;

        (0..n_frag)
            .map(|i| {
                let start = i * chunk_size;
                let end = (start + chunk_size).min(au.data.len());
                let payload = if start < au.data.len() { au.data.slice(start..end) } else { Bytes::new() };

                VideoFragment {
                    session_id: self.session_id,
                    stream_id: self.stream_id,
                    frame_id: au.frame_id,
                    frag_index: i as u16,
                    frag_count: n_frag as u16,
                    ts_ms,
                    flags,
                    codec: CODEC_H264,
                    payload,
                }
                .marshal()
            })
            .collect()
    }

    /// Fragments and sends `au`, pacing ~200 us between fragments. Returns
    /// the number of fragments actually sent; on a send failure the
    /// remainder of the frame is abandoned (not retried).
    pub async fn send_access_unit(&self, socket: &UdpSocket, peer: SocketAddr, au: &EncodedAccessUnit) -> usize {
        let fragments = self.build_fragments(au);
        let n_frag = fragments.len();

        for (i, frag) in fragments.iter().enumerate() {
            if let Err(err) = socket.send_to(frag, peer).await {
                warn!(%err, frame_id = au.frame_id, fragment = i, "fragment send failed, abandoning frame");
                return i;
            }

            if i + 1 < n_frag {
                tokio::time::sleep(INTER_FRAGMENT_DELAY).await;
            }
        }
        n_frag
    }

    /// Sends `au`'s fragments wrapped in FEC groups via `fec`, pacing ~200 us
    /// between outgoing datagrams (same cadence as the unprotected path).
    pub async fn send_access_unit_fec(
        &self,
        socket: &UdpSocket,
        peer: SocketAddr,
        au: &EncodedAccessUnit,
        fec: &mut crate::fec_bridge::FecGroupEncoder,
    ) -> usize {
        let mut sent = 0;
        for frag in self.build_fragments(au) {
            if let Some(packets) = fec.push(frag.to_vec()) {
                for packet in packets {
                    if socket.send_to(&packet, peer).await.is_err() {
                        return sent;
                    }
                    sent += 1;
                    tokio::time::sleep(INTER_FRAGMENT_DELAY).await;
                }
            }
        }
        sent
    }

    pub async fn send_keepalive(&mut self, socket: &UdpSocket, peer: SocketAddr, ts_ms: u32) -> std::io::Result<()> {
        self.keepalive_seq += 1;
        let msg = Keepalive {
            session_id: self.session_id,
            ts_ms,
            seq: self.keepalive_seq,
            echo_ts_ms: self.last_peer_ts_ms,
        };
        socket.send_to(&msg.marshal(), peer).await.map(|_| ())
    }

    pub async fn send_probe(&mut self, socket: &UdpSocket, peer: SocketAddr, ts_ms: u32, nonce: u64) -> std::io::Result<()> {
        self.probe_seq += 1;
        let msg = Probe {
            session_id: self.session_id,
            ts_ms,
            probe_seq: self.probe_seq,
            nonce,
            role: ROLE_SENDER,
            flags: 0,
        };
        socket.send_to(&msg.marshal(), peer).await.map(|_| ())
    }

    pub async fn send_idr_request(&mut self, socket: &UdpSocket, peer: SocketAddr, ts_ms: u32, reason: IdrReason) -> std::io::Result<()> {
        self.idr_seq += 1;
        let msg = IdrRequest { session_id: self.session_id, seq: self.idr_seq, ts_ms, reason: reason.wire_value() };
        socket.send_to(&msg.marshal(), peer).await.map(|_| ())
    }

    pub async fn send_hello(&self, socket: &UdpSocket, peer: SocketAddr, hello: Hello) -> std::io::Result<()> {
        socket.send_to(&hello.marshal(), peer).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::UdpSocket;

    async fn socket_pair() -> (UdpSocket, UdpSocket) {
        let a = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let b = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        (a, b)
    }

    #[tokio::test]
    async fn fragments_access_unit_across_multiple_datagrams() {
        let (tx, rx) = socket_pair().await;
        let peer = rx.local_addr().unwrap();
        let pacer = Pacer::new(1, 1);

        let data = vec![0xABu8; MAX_PAYLOAD_SIZE * 2 + 10];
        let au = EncodedAccessUnit { frame_id: 7, ts_us: 5000, is_keyframe: true, has_spspps: true, data: Bytes::from(data) };

        let sent = pacer.send_access_unit(&tx, peer, &au).await;
        assert_eq!(sent, 3);

        let mut buf = [0u8; 2048];
        let mut received = 0;
        for _ in 0..sent {
            let (n, _) = rx.recv_from(&mut buf).await.unwrap();
            let frag = VideoFragment::parse(&buf[..n]).unwrap();
            assert_eq!(frag.frame_id, 7);
            assert_eq!(frag.frag_count, 3);
            assert!(frag.is_keyframe());
            received += 1;
        }
        assert_eq!(received, 3);
    }

    #[tokio::test]
    async fn keepalive_round_trips_over_loopback() {
        let (tx, rx) = socket_pair().await;
        let peer = rx.local_addr().unwrap();
        let mut pacer = Pacer::new(99, 1);

        pacer.send_keepalive(&tx, peer, 1234).await.unwrap();

        let mut buf = [0u8; 64];
        let (n, _) = rx.recv_from(&mut buf).await.unwrap();
        let ka = Keepalive::parse(&buf[..n]).unwrap();
        assert_eq!(ka.session_id, 99);
        assert_eq!(ka.seq, 1);
        assert_eq!(ka.ts_ms, 1234);
    }
}
