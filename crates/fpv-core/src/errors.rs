use thiserror::Error;

/// Top-level error type shared across the transport core.
///
/// Most variants here are recovered locally by the caller (drop a datagram,
/// bump a counter) rather than propagated to the process boundary; they
/// exist as a typed vocabulary for `tracing` fields and test assertions.
#[derive(Error, Debug)]
pub enum FpvError {
    #[error("protocol error: {0}")]
    Proto(String),

    #[error("FEC error: {0}")]
    Fec(String),

    #[error("STUN error: {0}")]
    Stun(String),

    #[error("assembler overflow: evicted oldest in-flight frame")]
    AssemblerOverflow,

    #[error("assembler timeout: frame {frame_id} abandoned after {elapsed_ms}ms")]
    AssemblerTimeout { frame_id: u32, elapsed_ms: u32 },

    #[error("access unit exceeds MAX_AU_SIZE")]
    AccessUnitTooLarge,

    #[error("send failed: {reason}")]
    SendFailed { reason: String },

    #[error("receive failed: {reason}")]
    ReceiveFailed { reason: String },

    #[error("decode error: {reason}")]
    Decode { reason: String },

    #[error("no keyframe decoded yet")]
    NoKeyframeYet,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
