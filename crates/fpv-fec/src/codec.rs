use crate::error::FecError;
use crate::gf::{modnn_u8, tables};
use crate::matrix::{invert_mat, invert_vdm, matmul};

/// A systematic k-of-n Reed-Solomon code: any `k` of the `n` encoded blocks
/// (the `k` data blocks plus `n - k` parity blocks) suffice to recover all
/// `k` data blocks.
pub struct FecCodec {
    k: usize,
    n: usize,
    enc_matrix: Vec<u8>,
}

impl FecCodec {
    /// Builds the encoding matrix for parameters `(k, n)`. Top `k` rows are
    /// the identity; the remaining `n - k` rows come from an inverted
    /// Vandermonde matrix, so every size-`k` subset of rows is invertible.
    pub fn new(k: u8, n: u8) -> Result<Self, FecError> {
        let (k, n) = (k as usize, n as usize);
        if k == 0 || n == 0 || n > 256 || k > n {
            return Err(FecError::InvalidParameters);
        }
        let gf = tables();

        let mut tmp_m = vec![0u8; n * k];
        tmp_m[0] = 1;
        let mut row = 0usize;
        while row + 1 < n {
            let p_offset = (row + 1) * k;
            for col in 0..k {
                tmp_m[p_offset + col] = gf.exp(modnn_u8((row as u32) * (col as u32)) as usize);
            }
            row += 1;
        }

        invert_vdm(&mut tmp_m, k, gf);

        let mut enc_matrix = vec![0u8; n * k];
        if n > k {
            matmul(&tmp_m[k * k..], &tmp_m, &mut enc_matrix[k * k..], n - k, k, k, gf);
        }
        for col in 0..k {
            enc_matrix[col * k + col] = 1;
        }

        Ok(Self { k, n, enc_matrix })
    }

    pub fn k(&self) -> u8 {
        self.k as u8
    }

    pub fn n(&self) -> u8 {
        self.n as u8
    }

    /// Produces the `n - k` parity blocks for the given `k` equal-length
    /// data blocks.
    pub fn encode(&self, data_blocks: &[&[u8]]) -> Result<Vec<Vec<u8>>, FecError> {
        if data_blocks.len() != self.k {
            return Err(FecError::InvalidParameters);
        }
        let block_size = data_blocks[0].len();
        if data_blocks.iter().any(|b| b.len() != block_size) {
            return Err(FecError::MismatchedBlockSize);
        }

        let gf = tables();
        let mut parity = Vec::with_capacity(self.n - self.k);
        for fec_row in self.k..self.n {
            let mut out = vec![0u8; block_size];
            let coeffs = &self.enc_matrix[fec_row * self.k..fec_row * self.k + self.k];
            for (j, block) in data_blocks.iter().enumerate() {
                let c = coeffs[j];
                if c == 0 {
                    continue;
                }
                for (dst, &src) in out.iter_mut().zip(block.iter()) {
                    *dst ^= gf.mul(c, src);
                }
            }
            parity.push(out);
        }
        Ok(parity)
    }

    /// Reconstructs all `k` data blocks from any `k` distinct
    /// `(block_index, block)` pairs, where indices `0..k` are data blocks
    /// and `k..n` are parity blocks.
    pub fn decode(&self, received: &[(u8, &[u8])]) -> Result<Vec<Vec<u8>>, FecError> {
        let mut primary: Vec<Option<&[u8]>> = vec![None; self.k];
        let mut spare: Vec<(u8, &[u8])> = Vec::new();
        let mut block_size = None;

        for &(idx, data) in received {
            match block_size {
                None => block_size = Some(data.len()),
                Some(sz) if sz != data.len() => return Err(FecError::MismatchedBlockSize),
                _ => {}
            }
            if (idx as usize) < self.k {
                primary[idx as usize].get_or_insert(data);
            } else if (idx as usize) < self.n {
                spare.push((idx, data));
            }
        }
        let block_size = block_size.unwrap_or(0);

        let mut slot_index = vec![0usize; self.k];
        let mut slot_data: Vec<&[u8]> = vec![&[]; self.k];
        for i in 0..self.k {
            if let Some(data) = primary[i] {
                slot_index[i] = i;
                slot_data[i] = data;
            } else {
                let (idx, data) = spare.pop().ok_or(FecError::NotEnoughBlocks)?;
                slot_index[i] = idx as usize;
                slot_data[i] = data;
            }
        }

        let gf = tables();
        let mut dec_matrix = self.build_decode_matrix(&slot_index);
        invert_mat(&mut dec_matrix, self.k, gf);

        let mut result = Vec::with_capacity(self.k);
        for i in 0..self.k {
            if primary[i].is_some() {
                result.push(slot_data[i].to_vec());
                continue;
            }
            let mut out = vec![0u8; block_size];
            for col in 0..self.k {
                let coeff = dec_matrix[i * self.k + col];
                if coeff == 0 {
                    continue;
                }
                for (dst, &src) in out.iter_mut().zip(slot_data[col].iter()) {
                    *dst ^= gf.mul(coeff, src);
                }
            }
            result.push(out);
        }
        Ok(result)
    }

    fn build_decode_matrix(&self, slot_index: &[usize]) -> Vec<u8> {
        let k = self.k;
        let mut matrix = vec![0u8; k * k];
        for (i, &idx) in slot_index.iter().enumerate() {
            if idx < k {
                matrix[i * k + i] = 1;
            } else {
                let src = &self.enc_matrix[idx * k..idx * k + k];
                matrix[i * k..i * k + k].copy_from_slice(src);
            }
        }
        matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_blocks(k: usize, block_size: usize) -> Vec<Vec<u8>> {
        (0..k).map(|i| (0..block_size).map(|b| ((i * 7 + b * 3) % 256) as u8).collect()).collect()
    }

    /// A 4-of-7 code recovers all data blocks from three block losses.
    #[test]
    fn scenario_four_of_seven_recovers_from_three_losses() {
        let codec = FecCodec::new(4, 7).unwrap();
        let data = sample_blocks(4, 64);
        let data_refs: Vec<&[u8]> = data.iter().map(Vec::as_slice).collect();
        let parity = codec.encode(&data_refs).unwrap();

        // Keep data blocks 0,2 and parity blocks 4,5; drop 1,3,6.
        let received: Vec<(u8, &[u8])> =
            vec![(0, data[0].as_slice()), (2, data[2].as_slice()), (4, parity[0].as_slice()), (5, parity[1].as_slice())];

        let recovered = codec.decode(&received).unwrap();
        assert_eq!(recovered, data);
    }

    #[test]
    fn recovers_using_all_parity_blocks_and_one_data_block() {
        let codec = FecCodec::new(4, 7).unwrap();
        let data = sample_blocks(4, 32);
        let data_refs: Vec<&[u8]> = data.iter().map(Vec::as_slice).collect();
        let parity = codec.encode(&data_refs).unwrap();

        let received: Vec<(u8, &[u8])> = vec![
            (0, data[0].as_slice()),
            (4, parity[0].as_slice()),
            (5, parity[1].as_slice()),
            (6, parity[2].as_slice()),
        ];
        let recovered = codec.decode(&received).unwrap();
        assert_eq!(recovered, data);
    }

    #[test]
    fn no_loss_round_trip_returns_original_blocks() {
        let codec = FecCodec::new(8, 10).unwrap();
        let data = sample_blocks(8, 128);
        let received: Vec<(u8, &[u8])> =
            data.iter().enumerate().map(|(i, d)| (i as u8, d.as_slice())).collect();
        let recovered = codec.decode(&received).unwrap();
        assert_eq!(recovered, data);
    }

    #[test]
    fn rejects_too_few_blocks() {
        let codec = FecCodec::new(4, 7).unwrap();
        let data = sample_blocks(4, 16);
        let received: Vec<(u8, &[u8])> = vec![(0, data[0].as_slice()), (1, data[1].as_slice())];
        assert_eq!(codec.decode(&received), Err(FecError::NotEnoughBlocks));
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert_eq!(FecCodec::new(0, 5).err(), Some(FecError::InvalidParameters));
        assert_eq!(FecCodec::new(5, 4).err(), Some(FecError::InvalidParameters));
    }

    use proptest::prelude::*;

    proptest! {
        /// Testable property 8: round-trip for arbitrary (k, n) and arbitrary
        /// surviving subset of k blocks.
        #[test]
        fn round_trip_any_k_of_n(
            k in 1u8..=8,
            extra in 0u8..=4,
            block_size in 1usize..64,
            seed in any::<u64>(),
        ) {
            let n = k + extra;
            let codec = FecCodec::new(k, n).unwrap();
            let data = sample_blocks(k as usize, block_size);
            let data_refs: Vec<&[u8]> = data.iter().map(Vec::as_slice).collect();
            let parity = codec.encode(&data_refs).unwrap();

            let mut all: Vec<(u8, &[u8])> = (0..k).map(|i| (i, data[i as usize].as_slice())).collect();
            all.extend((0..extra).map(|i| (k + i, parity[i as usize].as_slice())));

            // Deterministic pseudo-shuffle from the seed, then keep the first k.
            let mut indices: Vec<usize> = (0..all.len()).collect();
            let mut state = seed.max(1);
            for i in (1..indices.len()).rev() {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                let j = (state >> 33) as usize % (i + 1);
                indices.swap(i, j);
            }
            indices.truncate(k as usize);
            let received: Vec<(u8, &[u8])> = indices.iter().map(|&i| all[i]).collect();

            let recovered = codec.decode(&received).unwrap();
            prop_assert_eq!(recovered, data);
        }

        /// Testable property 9: fewer than k blocks always fails.
        #[test]
        fn decode_fails_with_fewer_than_k_blocks(k in 2u8..=8, extra in 1u8..=4) {
            let n = k + extra;
            let codec = FecCodec::new(k, n).unwrap();
            let data = sample_blocks(k as usize, 16);
            let received: Vec<(u8, &[u8])> =
                data.iter().take((k - 1) as usize).enumerate().map(|(i, d)| (i as u8, d.as_slice())).collect();
            prop_assert_eq!(codec.decode(&received), Err(FecError::NotEnoughBlocks));
        }
    }
}
