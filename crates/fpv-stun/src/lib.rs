pub mod client;
pub mod error;
pub mod message;

pub use client::{discover, discover_with_servers, StunResult, STUN_SERVERS};
pub use error::StunError;
