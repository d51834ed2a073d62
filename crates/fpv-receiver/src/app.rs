//! Receiver main loop: session state machine driving STUN discovery,
//! NAT punching, and streaming, wired to the dispatcher, assembler, and
//! (stand-in) decode/present pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use fpv_core::boundary::{Decoder, Presenter};
use fpv_core::types::IdrReason;
use fpv_core::TimeSource;
use fpv_proto::{Keepalive, Probe};
use fpv_transport::dispatcher::{handle_datagram, DispatchEvent, DispatcherState};
use fpv_transport::session::idr_reason_for;
use fpv_transport::{FecGroupDecoder, Pacer, SessionDriver, Telemetry};
use fpv_core::types::SessionState;
use rand::RngCore;
use tokio::net::UdpSocket;
use tracing::{error, info, warn};

use crate::cli::Cli;
use crate::decoder::PassthroughDecoder;
use crate::presenter::LoggingPresenter;

const STUN_GATHER_TIMEOUT_MS: u64 = 10_000;
const WAIT_SENDER_TIMEOUT_MS: u64 = 60_000;
const TICK_INTERVAL: Duration = Duration::from_millis(10);
const TELEMETRY_INTERVAL: Duration = Duration::from_secs(1);

pub async fn run(cli: Cli) -> Result<()> {
    let socket = UdpSocket::bind(cli.local_addr).await.context("binding local UDP socket")?;
    info!(local_addr = %socket.local_addr()?, "receiver bound");

    let time = TimeSource::new();
    let mut session = SessionDriver::new(time.monotonic_us());
    let mut dispatcher = DispatcherState::new();
    let telemetry = Telemetry::new();
    let mut pacer = Pacer::new(0, 1);
    let mut decoder = PassthroughDecoder::new(1280, 720);
    let mut presenter = LoggingPresenter::new();
    let mut fec_decoder = cli.fec.then(FecGroupDecoder::new);
    let shutdown = AtomicBool::new(false);

    let mut stun_gather_started_us = None;
    let mut wait_sender_started_us = None;
    let mut punch_started_us = None;
    let mut decode_failed = false;

    if cli.remote {
        session.start_stun_gather(time.monotonic_us());
        stun_gather_started_us = Some(time.monotonic_us());
        match run_stun_discovery(&socket, &cli).await {
            Ok(result) => info!(public_addr = %result.public_addr, server = %result.server, "stun discovery complete"),
            Err(err) => warn!(%err, "stun discovery failed; continuing to wait for sender"),
        }
        session.stun_done(time.monotonic_us());
        wait_sender_started_us = Some(time.monotonic_us());
        if let Some(peer_addr) = cli.sender {
            dispatcher.peer.adopt(peer_addr);
            session.peer_discovered(time.monotonic_us());
            punch_started_us = Some(time.monotonic_us());
        }
    } else {
        let peer_addr = cli.sender.context("--sender is required in local mode")?;
        dispatcher.peer.adopt(peer_addr);
        session.peer_discovered(time.monotonic_us());
        session.video_received(time.monotonic_us());
        pacer
            .send_idr_request(&socket, peer_addr, time.ts_ms(), IdrReason::Startup)
            .await
            .ok();
        session.record_idr_request(time.monotonic_us());
    }

    let mut tick = tokio::time::interval(TICK_INTERVAL);
    let mut telemetry_tick = tokio::time::interval(TELEMETRY_INTERVAL);
    let mut recv_buf = [0u8; 65_536];
    let mut nonce = 0u64;

    loop {
        tokio::select! {
            recv = socket.recv_from(&mut recv_buf) => {
                let (n, from) = recv.context("recv_from failed")?;
                telemetry.record_packet();
                let now_us = time.monotonic_us();
                let now_ms = time.ts_ms();
                let currently_punching = session.state() == SessionState::Punching;

                let inner_datagrams: Vec<Vec<u8>> = match &mut fec_decoder {
                    Some(fd) => match fd.push(&recv_buf[..n]) {
                        Ok(Some(blocks)) => blocks,
                        Ok(None) => Vec::new(),
                        Err(err) => {
                            warn!(%err, "dropped malformed fec packet");
                            Vec::new()
                        }
                    },
                    None => vec![recv_buf[..n].to_vec()],
                };

                for datagram in inner_datagrams {
                    let event = handle_datagram(&mut dispatcher, &datagram, from, now_us, now_ms, currently_punching);
                    if matches!(event, DispatchEvent::Dropped) {
                        telemetry.record_stale();
                    }
                    handle_event(&socket, event, from, &mut session, &now_us).await;
                }
            }

            _ = tick.tick() => {
                let now_us = time.monotonic_us();
                let now_ms = time.ts_ms();

                dispatcher.assembler.check_timeouts(now_us, fpv_proto::FRAME_TIMEOUT_MS as u64 * 1_000);
                telemetry.sync_assembler_stats(dispatcher.assembler.stats());

                if let Some(session_id) = dispatcher.last_session_id {
                    pacer.set_session_id(session_id);
                }

                if let Some(au) = dispatcher.assembler.take_latest_au() {
                    match decoder.decode(&au) {
                        Ok(frame) => {
                            decode_failed = false;
                            telemetry.record_frame_completed(au.first_packet_time_us, au.assembly_complete_us, 60);
                            if let Err(err) = presenter.submit(frame) {
                                warn!(%err, "presenter rejected frame");
                            }
                        }
                        Err(err) => {
                            decode_failed = true;
                            warn!(%err, frame_id = au.frame_id, "decode failed");
                        }
                    }
                }

                match session.state() {
                    SessionState::StunGather => {
                        if let Some(started) = stun_gather_started_us {
                            if now_us.saturating_sub(started) > STUN_GATHER_TIMEOUT_MS * 1_000 {
                                error!("stun gather timed out");
                                session.enter_error(now_us);
                            }
                        }
                    }
                    SessionState::WaitSender => {
                        if let Some(started) = wait_sender_started_us {
                            if now_us.saturating_sub(started) > WAIT_SENDER_TIMEOUT_MS * 1_000 {
                                error!("timed out waiting for sender");
                                session.enter_error(now_us);
                            }
                        }
                    }
                    SessionState::Punching => {
                        if let Some(started) = punch_started_us {
                            if now_us.saturating_sub(started) > fpv_proto::PUNCH_WINDOW_MS * 1_000 {
                                error!("nat punch window elapsed with no response");
                                session.enter_error(now_us);
                            } else if let Some(peer_addr) = cli.sender {
                                nonce = nonce.wrapping_add(1).max(1);
                                let _ = pacer.send_probe(&socket, peer_addr, now_ms, rand_nonce(nonce)).await;
                            }
                        }
                    }
                    SessionState::Streaming => {
                        if session.is_idle(now_us, dispatcher.last_any_packet_us) {
                            warn!("session idle timeout; shutting down");
                            session.enter_error(now_us);
                            shutdown.store(true, Ordering::Relaxed);
                        } else if dispatcher.peer.known {
                            if session.should_send_keepalive(now_us) {
                                let _ = pacer.send_keepalive(&socket, dispatcher.peer.addr, now_ms).await;
                                session.record_keepalive_sent(now_us);
                            }
                            let video_stale = dispatcher
                                .last_video_time_us
                                .map(|t| now_us.saturating_sub(t) > 1_000_000)
                                .unwrap_or(true);
                            if let Some(reason) = idr_reason_for(&mut session, now_us, dispatcher.assembler.needs_idr() || video_stale, decode_failed) {
                                let _ = pacer.send_idr_request(&socket, dispatcher.peer.addr, now_ms, reason).await;
                                dispatcher.assembler.clear_idr_request();
                            }
                        }
                    }
                    SessionState::Error => {
                        shutdown.store(true, Ordering::Relaxed);
                    }
                    SessionState::Init => {}
                }

                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
            }

            _ = telemetry_tick.tick() => {
                let (counters, latencies) = telemetry.snapshot();
                info!(
                    ?counters,
                    assembly_us = ?latencies.assembly_us.get(),
                    decode_us = ?latencies.decode_us.get(),
                    jitter_us = ?latencies.jitter_us.get(),
                    state = %session.state(),
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

async fn handle_event(
    socket: &UdpSocket,
    event: DispatchEvent,
    from: std::net::SocketAddr,
    session: &mut SessionDriver,
    now_us: &u64,
) {
    match event {
        DispatchEvent::Dropped => {}
        DispatchEvent::VideoFragment => {
            session.video_received(*now_us);
        }
        DispatchEvent::Keepalive { echo } => {
            let _ = send_keepalive_echo(socket, from, echo).await;
        }
        DispatchEvent::Probe { echo, first_from_punching } => {
            if first_from_punching {
                session.video_received(*now_us);
            }
            let _ = send_probe_echo(socket, from, echo).await;
        }
    }
}

async fn send_keepalive_echo(socket: &UdpSocket, to: std::net::SocketAddr, echo: Keepalive) -> std::io::Result<()> {
    socket.send_to(&echo.marshal(), to).await.map(|_| ())
}

async fn send_probe_echo(socket: &UdpSocket, to: std::net::SocketAddr, echo: Probe) -> std::io::Result<()> {
    socket.send_to(&echo.marshal(), to).await.map(|_| ())
}

fn rand_nonce(salt: u64) -> u64 {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    u64::from_le_bytes(bytes) ^ salt
}

async fn run_stun_discovery(socket: &UdpSocket, cli: &Cli) -> Result<fpv_stun::StunResult, fpv_stun::StunError> {
    if cli.stun_servers.is_empty() {
        fpv_stun::discover(socket).await
    } else {
        fpv_stun::discover_with_servers(socket, &cli.stun_servers).await
    }
}
