//! Sender main loop: capture/encode/pace on a fixed cadence, keepalive and
//! NAT-punch probe emission, and reaction to IDR requests and STUN
//! discovery — the sender-side counterpart to `fpv-receiver`'s session
//! state machine, simpler because the sender always knows its peer address
//! up front (no INIT/STUN_GATHER/WAIT_SENDER states to drive).

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use fpv_core::boundary::{Camera, Encoder};
use fpv_core::config::StreamConfig;
use fpv_core::types::VideoCodec;
use fpv_core::TimeSource;
use fpv_proto::{Hello, Message, PROBE_INTERVAL_MS, PUNCH_WINDOW_MS};
use fpv_transport::{FecGroupEncoder, Pacer, Telemetry};
use rand::RngCore;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::camera::SyntheticCamera;
use crate::cli::Cli;
use crate::encoder::PassthroughEncoder;

const TELEMETRY_INTERVAL: Duration = Duration::from_secs(1);

pub async fn run(cli: Cli) -> Result<()> {
    let stream = StreamConfig {
        width: cli.width,
        height: cli.height,
        target_fps: cli.fps,
        max_bitrate_bps: cli.bitrate_bps,
        codec: VideoCodec::H264,
        idr_interval_frames: cli.idr_interval_frames,
    };

    let session_id = cli.session_id.unwrap_or_else(|| rand::thread_rng().next_u32());
    let peer: SocketAddr = cli.peer;

    let socket = UdpSocket::bind(("0.0.0.0", cli.local_port)).await.context("binding local UDP socket")?;
    info!(local_addr = %socket.local_addr()?, %peer, session_id, "sender starting");

    if !cli.stun_servers.is_empty() {
        match fpv_stun::discover_with_servers(&socket, &cli.stun_servers).await {
            Ok(result) => info!(public_addr = %result.public_addr, server = %result.server, "stun discovery complete"),
            Err(err) => warn!(%err, "stun discovery failed; continuing with configured peer address"),
        }
    }

    let time = TimeSource::new();
    let mut pacer = Pacer::new(session_id, 1);
    let mut camera = SyntheticCamera::new(stream.width as u32, stream.height as u32);
    let mut encoder = PassthroughEncoder::new(stream.idr_interval_frames);
    let mut fec = cli.fec.map(|(k, n)| FecGroupEncoder::new(k, n));
    let telemetry = Telemetry::new();
    let force_idr = AtomicBool::new(false);

    if cli.emit_hello {
        let hello = Hello {
            session_id,
            width: stream.width,
            height: stream.height,
            fps_x10: stream.fps_x10(),
            bitrate_bps: stream.max_bitrate_bps as u32,
            avc_profile: 66,
            avc_level: 31,
            idr_interval_frames: stream.idr_interval_frames,
        };
        if let Err(err) = pacer.send_hello(&socket, peer, hello).await {
            warn!(%err, "failed to send hello");
        }
    }

    let mut encode_tick = tokio::time::interval(Duration::from_micros(stream.frame_interval_us()));
    let mut keepalive_tick = tokio::time::interval(Duration::from_millis(fpv_proto::KEEPALIVE_INTERVAL_MS));
    let mut probe_tick = tokio::time::interval(Duration::from_millis(PROBE_INTERVAL_MS));
    let mut telemetry_tick = tokio::time::interval(TELEMETRY_INTERVAL);
    let punch_deadline_us = time.monotonic_us() + PUNCH_WINDOW_MS * 1_000;

    let mut recv_buf = [0u8; 2048];
    let mut probe_nonce = 0u64;

    loop {
        tokio::select! {
            _ = encode_tick.tick() => {
                let frame = match camera.capture() {
                    Ok(frame) => frame,
                    Err(err) => {
                        warn!(%err, "capture failed, skipping frame");
                        continue;
                    }
                };
                let do_force = force_idr.swap(false, Ordering::Relaxed);
                let au = match encoder.encode(&frame, do_force) {
                    Ok(au) => au,
                    Err(err) => {
                        warn!(%err, "encode failed, skipping frame");
                        continue;
                    }
                };

                let sent = match &mut fec {
                    Some(fe) => pacer.send_access_unit_fec(&socket, peer, &au, fe).await,
                    None => pacer.send_access_unit(&socket, peer, &au).await,
                };
                telemetry.record_frame_completed(au.ts_us, au.ts_us, stream.target_fps);
                debug!(frame_id = au.frame_id, fragments = sent, keyframe = au.is_keyframe, "frame sent");
            }

            _ = keepalive_tick.tick() => {
                if let Err(err) = pacer.send_keepalive(&socket, peer, time.ts_ms()).await {
                    warn!(%err, "keepalive send failed");
                }
            }

            _ = probe_tick.tick(), if time.monotonic_us() < punch_deadline_us => {
                probe_nonce = probe_nonce.wrapping_add(1);
                let _ = pacer.send_probe(&socket, peer, time.ts_ms(), probe_nonce).await;
            }

            recv = socket.recv_from(&mut recv_buf) => {
                let (n, from) = recv.context("recv_from failed")?;
                telemetry.record_packet();
                if from != peer {
                    continue;
                }
                match Message::parse(&recv_buf[..n]) {
                    Ok(Message::IdrRequest(req)) => {
                        force_idr.store(true, Ordering::Relaxed);
                        pacer.note_peer_ts_ms(req.ts_ms);
                        info!(reason = req.reason, seq = req.seq, "idr requested by peer");
                    }
                    Ok(Message::Keepalive(ka)) => {
                        pacer.note_peer_ts_ms(ka.ts_ms);
                    }
                    Ok(Message::Probe(probe)) => {
                        pacer.note_peer_ts_ms(probe.ts_ms);
                    }
                    Ok(_) => {}
                    Err(err) => debug!(%err, "dropped malformed datagram"),
                }
            }

            _ = telemetry_tick.tick() => {
                let (counters, latencies) = telemetry.snapshot();
                info!(
                    ?counters,
                    frame_interval_us = ?latencies.frame_interval_us.get(),
                    jitter_us = ?latencies.jitter_us.get(),
                    "telemetry"
                );
            }

            _ = tokio::signal::ctrl_c() => {
                info!("ctrl-c received, shutting down");
                break;
            }
        }
    }

    Ok(())
}
