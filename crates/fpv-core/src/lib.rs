pub mod boundary;
pub mod config;
pub mod errors;
pub mod serial;
pub mod time;
pub mod types;

pub use boundary::{Camera, CapturedFrame, Decoder, Encoder, Presenter};
pub use config::{SenderConfig, StreamConfig};
pub use errors::FpvError;
pub use time::TimeSource;
pub use types::*;
