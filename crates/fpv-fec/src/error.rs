use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FecError {
    #[error("k must be >= 1, n must be <= 256, and k <= n")]
    InvalidParameters,

    #[error("data blocks passed to encode must all share one length")]
    MismatchedBlockSize,

    #[error("fewer than k distinct blocks available to reconstruct the group")]
    NotEnoughBlocks,

    #[error("wire packet too short for the FEC header")]
    TooShort,
}
