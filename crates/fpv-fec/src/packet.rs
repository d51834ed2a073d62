//! Wire framing that wraps an inner transport datagram with FEC group
//! metadata: `{group_id u16, index u8, k u8, n u8, inner_packet}`.

use crate::error::FecError;

pub const FEC_HEADER_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FecPacket<'a> {
    pub group_id: u16,
    pub index: u8,
    pub k: u8,
    pub n: u8,
    pub inner: &'a [u8],
}

impl<'a> FecPacket<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<Self, FecError> {
        if buf.len() < FEC_HEADER_SIZE {
            return Err(FecError::TooShort);
        }
        Ok(Self {
            group_id: u16::from_be_bytes([buf[0], buf[1]]),
            index: buf[2],
            k: buf[3],
            n: buf[4],
            inner: &buf[FEC_HEADER_SIZE..],
        })
    }

    pub fn marshal(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FEC_HEADER_SIZE + self.inner.len());
        out.extend_from_slice(&self.group_id.to_be_bytes());
        out.extend_from_slice(&[self.index, self.k, self.n]);
        out.extend_from_slice(self.inner);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let pkt = FecPacket { group_id: 42, index: 3, k: 4, n: 7, inner: b"payload" };
        let bytes = pkt.marshal();
        assert_eq!(FecPacket::parse(&bytes).unwrap(), pkt);
    }

    #[test]
    fn rejects_short_buffer() {
        assert_eq!(FecPacket::parse(&[1, 2, 3]), Err(FecError::TooShort));
    }
}
