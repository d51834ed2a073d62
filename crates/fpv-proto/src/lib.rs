pub mod constants;
pub mod error;
pub mod message;

pub use constants::*;
pub use error::ProtoError;
pub use message::{CommonHeader, Hello, IdrRequest, Keepalive, Message, Probe, VideoFragment};
