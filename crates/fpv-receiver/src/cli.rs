use std::net::SocketAddr;

use clap::Parser;

/// FPV transport receiver: reassembles fragments into access units,
/// decodes, and presents them.
#[derive(Parser, Debug, Clone)]
#[command(name = "fpv-receiver", version, about)]
pub struct Cli {
    /// Local UDP address to bind. Port 0 picks an ephemeral port.
    #[arg(long, default_value = "0.0.0.0:0")]
    pub local_addr: SocketAddr,

    /// Operate in remote (NAT-traversal) mode: run STUN discovery and wait
    /// for the sender to punch in, instead of the local direct-peer mode.
    #[arg(long)]
    pub remote: bool,

    /// Known sender address. Required for local mode; in remote mode it is
    /// the address to punch toward once supplied by signaling (out of
    /// scope here, so this flag stands in for that signaling hand-off).
    #[arg(long)]
    pub sender: Option<SocketAddr>,

    /// STUN servers to try, in order, overriding the built-in fallback list.
    #[arg(long = "stun-server")]
    pub stun_servers: Vec<String>,

    /// Expects incoming datagrams to be FEC-wrapped (must match the sender's
    /// `--fec` setting; the two transports are mutually exclusive).
    #[arg(long = "fec")]
    pub fec: bool,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long)]
    pub verbose: bool,
}
