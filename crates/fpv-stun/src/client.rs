use std::net::SocketAddr;
use std::time::Duration;

use rand::RngCore;
use tokio::net::{lookup_host, UdpSocket};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::StunError;
use crate::message::{build_binding_request, parse_binding_response, TransactionId};

/// Ordered fallback list of public STUN servers, tried in order until one
/// answers.
pub const STUN_SERVERS: &[&str] = &["stun.cloudflare.com", "stun.l.google.com", "stun1.l.google.com"];

const STUN_PORT: u16 = 3478;
const ATTEMPTS_PER_SERVER: u32 = 3;
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(1);

/// Outcome of a successful binding discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StunResult {
    pub local_addr: SocketAddr,
    pub public_addr: SocketAddr,
    pub server: String,
}

/// Performs a one-shot STUN binding discovery on an existing, already-bound
/// UDP socket, trying each of [`STUN_SERVERS`] in order.
pub async fn discover(socket: &UdpSocket) -> Result<StunResult, StunError> {
    discover_with_servers(socket, STUN_SERVERS).await
}

/// As [`discover`], but against a caller-supplied ordered server list (the
/// receiver CLI's `--stun-server` override). Tries each server up to
/// `ATTEMPTS_PER_SERVER` times with a one-second receive timeout, returning
/// the first successful binding.
pub async fn discover_with_servers<S: AsRef<str>>(socket: &UdpSocket, servers: &[S]) -> Result<StunResult, StunError> {
    let local_addr = socket.local_addr()?;

    let mut txn_id: TransactionId = [0u8; 12];
    rand::thread_rng().fill_bytes(&mut txn_id);
    let request = build_binding_request(&txn_id);

    for server in servers {
        let server = server.as_ref();
        let server_addr = match resolve(server).await {
            Ok(addr) => addr,
            Err(err) => {
                warn!(%server, %err, "stun server resolution failed");
                continue;
            }
        };

        for attempt in 0..ATTEMPTS_PER_SERVER {
            if let Err(err) = socket.send_to(&request, server_addr).await {
                debug!(%server, attempt, %err, "stun send failed");
                continue;
            }

            let mut buf = [0u8; 1024];
            let recv = timeout(ATTEMPT_TIMEOUT, socket.recv_from(&mut buf)).await;
            let (n, _from) = match recv {
                Ok(Ok(pair)) => pair,
                Ok(Err(err)) => {
                    debug!(%server, attempt, %err, "stun recv failed");
                    continue;
                }
                Err(_) => {
                    debug!(%server, attempt, "stun attempt timed out");
                    continue;
                }
            };

            if let Some(public_addr) = parse_binding_response(&buf[..n], &txn_id) {
                return Ok(StunResult { local_addr, public_addr, server: server.to_string() });
            }
        }
    }

    Err(StunError::Unreachable)
}

async fn resolve(host: &str) -> Result<SocketAddr, StunError> {
    lookup_host((host, STUN_PORT))
        .await
        .map_err(StunError::Io)?
        .next()
        .ok_or_else(|| StunError::ResolveFailed(host.to_string()))
}
