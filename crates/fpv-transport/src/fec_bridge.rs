//! Optional FEC transport wrapper: batches outgoing datagrams into k-of-n
//! groups on the sender side and reconstructs them on the receiver side.
//! Mutually exclusive in a deployment with plain fragment framing, but
//! shares the same `fpv-proto` wire messages as the inner payload — the FEC
//! layer only ever sees opaque bytes.

use std::collections::HashMap;

use fpv_fec::{FecCodec, FecError, FecPacket};

/// Batches inner datagrams into groups of `k`, producing `n` outgoing
/// packets per full group (or a parity-less short group at flush).
pub struct FecGroupEncoder {
    k: u8,
    n: u8,
    next_group_id: u16,
    pending: Vec<Vec<u8>>,
}

impl FecGroupEncoder {
    pub fn new(k: u8, n: u8) -> Self {
        Self { k, n, next_group_id: 0, pending: Vec::with_capacity(k as usize) }
    }

    /// Adds one inner datagram to the in-progress group. Returns the
    /// marshaled FEC packets to send once the group reaches `k` members.
    pub fn push(&mut self, inner: Vec<u8>) -> Option<Vec<Vec<u8>>> {
        self.pending.push(inner);
        if self.pending.len() == self.k as usize {
            Some(self.flush())
        } else {
            None
        }
    }

    /// Flushes whatever is pending as its own group. If short of `k`
    /// members (stream end), emits `k' = n' = count` with no parity.
    pub fn flush(&mut self) -> Vec<Vec<u8>> {
        if self.pending.is_empty() {
            return Vec::new();
        }

        let group_id = self.next_group_id;
        self.next_group_id = self.next_group_id.wrapping_add(1);
        let count = self.pending.len();
        let block_size = self.pending.iter().map(Vec::len).max().unwrap_or(0);
        let padded: Vec<Vec<u8>> = self
            .pending
            .drain(..)
            .map(|mut b| {
                b.resize(block_size, 0);
                b
            })
            .collect();

        let mut out = Vec::with_capacity(self.n as usize);

        if count == self.k as usize && self.n > self.k {
            let codec = FecCodec::new(self.k, self.n).expect("encoder built with valid k/n");
            let refs: Vec<&[u8]> = padded.iter().map(Vec::as_slice).collect();
            let parity = codec.encode(&refs).expect("group blocks share a common padded length");

            for (i, data) in padded.iter().enumerate() {
                out.push(FecPacket { group_id, index: i as u8, k: self.k, n: self.n, inner: data }.marshal());
            }
            for (j, block) in parity.iter().enumerate() {
                out.push(FecPacket { group_id, index: self.k + j as u8, k: self.k, n: self.n, inner: block }.marshal());
            }
        } else {
            for (i, data) in padded.iter().enumerate() {
                out.push(FecPacket { group_id, index: i as u8, k: count as u8, n: count as u8, inner: data }.marshal());
            }
        }

        out
    }
}

struct PendingGroup {
    k: u8,
    n: u8,
    blocks: Vec<(u8, Vec<u8>)>,
}

/// Receiver-side counterpart: buffers FEC packets by `group_id` and
/// reconstructs the original `k` data blocks once `k` distinct indices of
/// a group have arrived. Padding left over from a variable-length group is
/// harmless — the inner bytes are themselves a self-delimiting protocol
/// message whose own `parse` ignores the trailing zeros.
pub struct FecGroupDecoder {
    groups: HashMap<u16, PendingGroup>,
    max_groups: usize,
}

impl FecGroupDecoder {
    pub fn new() -> Self {
        Self { groups: HashMap::new(), max_groups: 64 }
    }

    /// Feeds one received FEC-wrapped datagram. Returns the group's
    /// reconstructed data blocks (in index order) once enough arrived.
    pub fn push(&mut self, buf: &[u8]) -> Result<Option<Vec<Vec<u8>>>, FecError> {
        let pkt = FecPacket::parse(buf)?;
        let group_id = pkt.group_id;

        let group = self
            .groups
            .entry(group_id)
            .or_insert_with(|| PendingGroup { k: pkt.k, n: pkt.n, blocks: Vec::new() });

        if !group.blocks.iter().any(|(idx, _)| *idx == pkt.index) {
            group.blocks.push((pkt.index, pkt.inner.to_vec()));
        }

        if group.blocks.len() >= group.k as usize {
            let (k, n) = (group.k, group.n.max(group.k));
            let received: Vec<(u8, &[u8])> = group.blocks.iter().map(|(i, d)| (*i, d.as_slice())).collect();
            let codec = FecCodec::new(k, n)?;
            let data_blocks = codec.decode(&received)?;
            self.groups.remove(&group_id);
            return Ok(Some(data_blocks));
        }

        if self.groups.len() > self.max_groups {
            if let Some(&oldest) = self.groups.keys().min() {
                self.groups.remove(&oldest);
            }
        }

        Ok(None)
    }
}

impl Default for FecGroupDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_group_round_trips_through_encoder_and_decoder() {
        let mut enc = FecGroupEncoder::new(4, 7);
        let mut decoded_groups = Vec::new();

        for i in 0..4u8 {
            let inner = vec![i; 10 + i as usize];
            if let Some(packets) = enc.push(inner) {
                decoded_groups.push(packets);
            }
        }
        assert_eq!(decoded_groups.len(), 1);
        let packets = &decoded_groups[0];
        assert_eq!(packets.len(), 7);

        let mut dec = FecGroupDecoder::new();
        let mut recovered = None;
        // Drop two packets (simulate loss), keep 5 of 7 (>= k=4).
        for packet in packets.iter().take(5) {
            if let Some(blocks) = dec.push(packet).unwrap() {
                recovered = Some(blocks);
            }
        }
        let recovered = recovered.expect("group should reconstruct with k of n blocks");
        assert_eq!(recovered.len(), 4);
        for (i, block) in recovered.iter().enumerate() {
            assert!(block.iter().take(10 + i).all(|&b| b == i as u8));
        }
    }

    #[test]
    fn short_flush_emits_no_parity_and_decodes_directly() {
        let mut enc = FecGroupEncoder::new(4, 7);
        enc.push(vec![1, 2, 3]);
        enc.push(vec![4, 5, 6]);
        let packets = enc.flush();
        assert_eq!(packets.len(), 2);

        let mut dec = FecGroupDecoder::new();
        let mut recovered = None;
        for packet in &packets {
            if let Some(blocks) = dec.push(packet).unwrap() {
                recovered = Some(blocks);
            }
        }
        let recovered = recovered.unwrap();
        assert_eq!(recovered.len(), 2);
        assert_eq!(&recovered[0][..3], &[1, 2, 3]);
        assert_eq!(&recovered[1][..3], &[4, 5, 6]);
    }
}
