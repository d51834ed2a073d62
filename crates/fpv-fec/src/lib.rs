mod codec;
mod error;
mod gf;
mod matrix;
mod packet;

pub use codec::FecCodec;
pub use error::FecError;
pub use gf::tables as gf_tables;
pub use packet::{FecPacket, FEC_HEADER_SIZE};
