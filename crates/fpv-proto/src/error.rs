use thiserror::Error;

/// Wire-parsing errors, each recovered by the caller dropping the datagram
/// and incrementing a counter.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtoError {
    #[error("datagram too short for declared message type")]
    TooShort,

    #[error("unsupported protocol version")]
    BadVersion,

    #[error("message type mismatch: expected {expected:#04x}, got {got:#04x}")]
    BadType { expected: u8, got: u8 },

    #[error("unsupported codec {0:#04x}")]
    BadCodec(u8),

    #[error("fragment index {index} out of range for frag_count {count}")]
    BadFragmentIndex { index: u16, count: u16 },

    #[error("declared payload length exceeds remaining datagram bytes")]
    TruncatedPayload,
}
