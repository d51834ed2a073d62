//! Matrix operations over GF(256): Vandermonde inversion (closed form) and
//! Gauss-Jordan inversion with full pivoting, both lifted from the classic
//! zfec construction.

use crate::gf::GfTables;

/// Inverts the k x k Vandermonde matrix occupying the top-left corner of
/// `src` (stride `k`), in place. `src` must be at least `k * k` long.
pub fn invert_vdm(src: &mut [u8], k: usize, gf: &GfTables) {
    if k == 1 {
        return;
    }

    let mut c = vec![0u8; k];
    let mut b = vec![0u8; k];
    let mut p = vec![0u8; k];

    for i in 0..k {
        p[i] = src[i * k + 1];
    }
    c[k - 1] = p[0];
    for i in 1..k {
        let p_i = p[i];
        let lo = k - 1 - (i - 1);
        for j in lo..(k - 1) {
            c[j] ^= gf.mul(p_i, c[j + 1]);
        }
        c[k - 1] ^= p_i;
    }

    for row in 0..k {
        let xx = p[row];
        let mut t: u8 = 1;
        b[k - 1] = 1;
        for i in (1..k).rev() {
            b[i - 1] = c[i] ^ gf.mul(xx, b[i]);
            t = gf.mul(xx, t) ^ b[i - 1];
        }
        let t_inv = gf.inverse(t);
        for col in 0..k {
            src[col * k + row] = gf.mul(t_inv, b[col]);
        }
    }
}

/// Inverts the k x k matrix `src` (row-major, stride k) in place via
/// Gauss-Jordan elimination with full pivoting.
pub fn invert_mat(src: &mut [u8], k: usize, gf: &GfTables) {
    let mut indxc = vec![0usize; k];
    let mut indxr = vec![0usize; k];
    let mut ipiv = vec![0u32; k];

    for col in 0..k {
        let (irow, icol) = if ipiv[col] != 1 && src[col * k + col] != 0 {
            (col, col)
        } else {
            let mut found = None;
            'search: for row in 0..k {
                if ipiv[row] != 1 {
                    for ix in 0..k {
                        if ipiv[ix] == 0 && src[row * k + ix] != 0 {
                            found = Some((row, ix));
                            break 'search;
                        }
                    }
                }
            }
            found.expect("FEC decode matrix is singular for the given index set")
        };

        ipiv[icol] += 1;
        if irow != icol {
            for ix in 0..k {
                src.swap(irow * k + ix, icol * k + ix);
            }
        }
        indxr[col] = irow;
        indxc[col] = icol;

        let pivot = src[icol * k + icol];
        debug_assert_ne!(pivot, 0, "pivot element must be nonzero after full pivoting");
        if pivot != 1 {
            let inv = gf.inverse(pivot);
            src[icol * k + icol] = 1;
            for ix in 0..k {
                src[icol * k + ix] = gf.mul(inv, src[icol * k + ix]);
            }
        }

        let pivot_row: Vec<u8> = src[icol * k..icol * k + k].to_vec();
        let is_identity_row = pivot_row.iter().enumerate().all(|(i, &v)| v == u8::from(i == icol));
        if !is_identity_row {
            for ix in 0..k {
                if ix != icol {
                    let c = src[ix * k + icol];
                    src[ix * k + icol] = 0;
                    if c != 0 {
                        for col2 in 0..k {
                            src[ix * k + col2] ^= gf.mul(c, pivot_row[col2]);
                        }
                    }
                }
            }
        }
    }

    for col in (1..=k).rev() {
        let c = col - 1;
        if indxr[c] != indxc[c] {
            for row in 0..k {
                src.swap(row * k + indxr[c], row * k + indxc[c]);
            }
        }
    }
}

/// `c[n x m] = a[n x k] * b[k x m]` over GF(256), addition is XOR.
pub fn matmul(a: &[u8], b: &[u8], c: &mut [u8], n: usize, k: usize, m: usize, gf: &GfTables) {
    for row in 0..n {
        for col in 0..m {
            let mut acc = 0u8;
            for i in 0..k {
                acc ^= gf.mul(a[row * k + i], b[i * m + col]);
            }
            c[row * m + col] = acc;
        }
    }
}
