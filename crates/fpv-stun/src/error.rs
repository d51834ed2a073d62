use thiserror::Error;

#[derive(Error, Debug)]
pub enum StunError {
    #[error("no STUN server responded after exhausting the fallback list")]
    Unreachable,

    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DNS resolution failed for STUN server {0}")]
    ResolveFailed(String),
}
