use std::net::SocketAddr;

use clap::Parser;

/// FPV transport sender: captures, encodes, fragments, and paces an
/// outgoing video stream toward a peer.
#[derive(Parser, Debug, Clone)]
#[command(name = "fpv-sender", version, about)]
pub struct Cli {
    /// Peer address to stream toward.
    #[arg(long)]
    pub peer: SocketAddr,

    /// Local UDP port to bind. 0 picks an ephemeral port.
    #[arg(long, default_value_t = 0)]
    pub local_port: u16,

    /// Captured/encoded frame width.
    #[arg(long, default_value_t = 1280)]
    pub width: u16,

    /// Captured/encoded frame height.
    #[arg(long, default_value_t = 720)]
    pub height: u16,

    /// Target capture/encode frame rate.
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Target encoder bitrate, in bits per second.
    #[arg(long = "bitrate-bps", default_value_t = 8_000_000)]
    pub bitrate_bps: u64,

    /// Force an IDR frame every N encoded frames.
    #[arg(long = "idr-interval-frames", default_value_t = 120)]
    pub idr_interval_frames: u32,

    /// Session id to advertise. Random if omitted.
    #[arg(long = "session-id")]
    pub session_id: Option<u32>,

    /// STUN servers to try, in order, for public-address discovery before
    /// punching. If empty, STUN discovery is skipped (suitable for a peer
    /// already reachable directly, e.g. same LAN).
    #[arg(long = "stun-server")]
    pub stun_servers: Vec<String>,

    /// Enables FEC-wrapped transmission with the given `k:n` group shape
    /// (k data blocks, n total blocks per group).
    #[arg(long = "fec", value_parser = parse_fec)]
    pub fec: Option<(u8, u8)>,

    /// Emits one HELLO message at startup advertising stream parameters.
    #[arg(long = "hello")]
    pub emit_hello: bool,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_fec(s: &str) -> Result<(u8, u8), String> {
    let (k, n) = s.split_once(':').ok_or_else(|| format!("expected k:n, got {s:?}"))?;
    let k: u8 = k.parse().map_err(|_| format!("invalid k in {s:?}"))?;
    let n: u8 = n.parse().map_err(|_| format!("invalid n in {s:?}"))?;
    if k == 0 || n < k {
        return Err(format!("FEC group needs 0 < k <= n, got k={k} n={n}"));
    }
    Ok((k, n))
}
