use tracing::trace;

use super::{
    galois::{eval_poly, G},
    Block,
};
use crate::common::error::{DecodeError, DecodeResult};

// Rectifier
//------------------------------------------------------------------------------

// Polynomials below are stored lowest power first. Codeword i of a block of
// length n is the coefficient of x^(n - 1 - i).
impl Block {
    pub fn rectify(&mut self) -> DecodeResult<&[u8]> {
        // Compute syndromes
        let synd = match self.syndromes() {
            Ok(()) => return Ok(self.data()),
            Err(s) => s,
        };

        // Error locator polynomial
        let (sig, deg) = Self::berlekamp_massey(&synd);
        if 2 * deg > self.ec_len() {
            trace!(errors = deg, capacity = self.ec_len() / 2, "Locator exceeds capacity");
            return Err(DecodeError::UncorrectableBlock);
        }

        let err_pos = self.chien_search(&sig[..=deg]);
        if err_pos.len() != deg {
            trace!(roots = err_pos.len(), degree = deg, "Locator root count mismatch");
            return Err(DecodeError::UncorrectableBlock);
        }

        // Error evaluator
        let omg = Self::omega(&synd, &sig[..=deg]);

        // Sigma derivative, only odd powers survive in characteristic 2
        let dsig = sig[..=deg]
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, &s)| if i & 1 == 1 { s } else { G(0) })
            .collect::<Vec<_>>();

        // Error magnitude, rectify errors by XORing data with magnitude
        for &p in err_pos.iter() {
            let x = G::gen_pow(p);
            let xinv = x.inv();
            let den = eval_poly(dsig.iter(), xinv);
            if den.is_zero() {
                return Err(DecodeError::UncorrectableBlock);
            }
            let mag = x * eval_poly(omg.iter(), xinv) / den;
            let idx = self.len - 1 - p;
            self.data[idx] = (G(self.data[idx]) + mag).into();
        }

        match self.syndromes() {
            Ok(()) => Ok(self.data()),
            Err(_) => Err(DecodeError::UncorrectableBlock),
        }
    }

    fn syndromes(&self) -> Result<(), Vec<G>> {
        let gdata = self.full().iter().rev().map(|&b| G(b)).collect::<Vec<_>>();
        let synd =
            (0..self.ec_len()).map(|i| eval_poly(gdata.iter(), G::gen_pow(i))).collect::<Vec<_>>();

        if synd.iter().all(|s| s.is_zero()) {
            Ok(())
        } else {
            Err(synd)
        }
    }

    // Sigma polynomial and its degree
    fn berlekamp_massey(synd: &[G]) -> (Vec<G>, usize) {
        let n_synd = synd.len();
        let mut l = 0usize;
        let mut m = 1usize;
        let mut b = G(1);
        let mut cx = vec![G(0); n_synd + 1];
        let mut bx = vec![G(0); n_synd + 1];
        cx[0] = G(1);
        bx[0] = G(1);

        for n in 0..n_synd {
            // Calculate discrepancy
            let mut d = synd[n];
            for i in 1..=l {
                d += cx[i] * synd[n - i];
            }

            if d.is_zero() {
                m += 1;
                continue;
            }

            let scale = d / b;
            let tx = cx.clone();
            for i in 0..=n_synd - m {
                cx[i + m] += scale * bx[i];
            }

            if 2 * l <= n {
                l = n + 1 - l;
                bx = tx;
                b = d;
                m = 1;
            } else {
                m += 1;
            }
        }

        (cx, l)
    }

    // Powers p such that sigma(α^-p) is zero
    fn chien_search(&self, sig: &[G]) -> Vec<usize> {
        (0..self.len).filter(|&p| eval_poly(sig.iter(), G::gen_pow(p).inv()).is_zero()).collect()
    }

    // Error evaluator polynomial: S(x) * sigma(x) mod x^(ec len)
    fn omega(synd: &[G], sig: &[G]) -> Vec<G> {
        let n = synd.len();
        let mut omg = vec![G(0); n];
        for (i, &s) in synd.iter().enumerate() {
            for (j, &c) in sig.iter().enumerate() {
                if i + j < n {
                    omg[i + j] += s * c;
                }
            }
        }
        omg
    }
}

/// Picks the valid info value closest to either of the two copies read from a
/// symbol, ties broken by the combined distance. Returns its index in
/// `valid_numbers`.
pub fn rectify_info(copies: [u32; 2], valid_numbers: &[u32], err_capacity: u32) -> DecodeResult<usize> {
    let (idx, dist) = valid_numbers
        .iter()
        .enumerate()
        .map(|(i, &n)| {
            let d1 = (copies[0] ^ n).count_ones();
            let d2 = (copies[1] ^ n).count_ones();
            (i, (d1.min(d2), d1 + d2))
        })
        .min_by_key(|&(_, d)| d)
        .ok_or(DecodeError::FormatInfoCorrupt)?;

    if dist.0 <= err_capacity {
        Ok(idx)
    } else {
        Err(DecodeError::FormatInfoCorrupt)
    }
}

#[cfg(test)]
mod ec_rectifier_tests {
    use test_case::test_case;

    use super::{rectify_info, Block};
    use crate::common::error::DecodeError;
    use crate::common::metadata::{FORMAT_INFOS, VERSION_INFOS};

    static DATA: [u8; 11] = [32, 91, 11, 45, 89, 123, 77, 44, 56, 99, 202];

    #[test]
    fn test_clean_block() {
        let mut blk = Block::new(&DATA, 4);
        assert_eq!(blk.rectify().unwrap(), &DATA);
    }

    #[test_case(&[(5, 46)])]
    #[test_case(&[(5, 46), (10, 249)])]
    #[test_case(&[(0, 0), (14, 1)])]
    #[test_case(&[(12, 7), (13, 255)])]
    fn test_rectifier(errors: &[(usize, u8)]) {
        let mut blk = Block::new(&DATA, 4);
        for &(i, v) in errors {
            blk.full_mut()[i] = v;
        }
        let rect = blk.rectify().unwrap();
        assert_eq!(rect, &DATA, "Rectified data and original data don't match");
    }

    #[test]
    fn test_rectifier_fail() {
        let mut blk = Block::new(&DATA, 4);
        let bad = [138, 91, 161, 45, 243, 46, 231, 44, 146, 99, 202];
        blk.full_mut()[..11].copy_from_slice(&bad);
        assert_eq!(blk.rectify(), Err(DecodeError::UncorrectableBlock));
    }

    #[test]
    fn test_rectifier_max_capacity() {
        let data = (0..100u8).collect::<Vec<_>>();
        let mut blk = Block::new(&data, 30);
        for i in 0..15 {
            blk.full_mut()[i * 8] ^= 0x5A;
        }
        assert_eq!(blk.rectify().unwrap(), &data[..]);
    }

    #[test]
    fn test_rectify_format_info() {
        let valid = FORMAT_INFOS[13];
        assert_eq!(rectify_info([valid, valid], &FORMAT_INFOS, 3), Ok(13));
        assert_eq!(rectify_info([valid ^ 0b101, valid ^ 0b1111_0000_0000], &FORMAT_INFOS, 3), Ok(13));
        assert_eq!(rectify_info([valid ^ 0b1, valid ^ 0b10], &FORMAT_INFOS, 1), Ok(13));
        assert_eq!(
            rectify_info([valid ^ 0b1, valid ^ 0b10], &FORMAT_INFOS, 0),
            Err(DecodeError::FormatInfoCorrupt)
        );
    }

    #[test]
    fn test_rectify_version_info() {
        let valid = VERSION_INFOS[20];
        assert_eq!(rectify_info([valid ^ 0b1_0000_0001, valid], &VERSION_INFOS, 3), Ok(20));
        assert_eq!(rectify_info([valid ^ 0b111, valid ^ 0b1110_0000], &VERSION_INFOS, 3), Ok(20));
    }
}
