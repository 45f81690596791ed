use std::ops::{Index, IndexMut};

use super::geometry::Point;
use crate::common::error::{DecodeError, DecodeResult};

const EPS: f64 = 1e-9;

// Homographic projection matrix to map logical qr onto image qr.
// Row major 3x3 with the last entry fixed at 1.
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Clone)]
pub struct Homography(pub [f64; 8]);

impl Index<usize> for Homography {
    type Output = f64;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl IndexMut<usize> for Homography {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl Homography {
    pub fn compute(src: [Point; 4], dst: [Point; 4]) -> DecodeResult<Self> {
        let mut a = [[0.0; 8]; 8];
        let mut b = [0.0; 8];

        for (i, (s, d)) in src.iter().zip(dst.iter()).enumerate() {
            let (x, y, xp, yp) = (s.x, s.y, d.x, d.y);
            a[2 * i] = [x, y, 1.0, 0.0, 0.0, 0.0, -xp * x, -xp * y];
            b[2 * i] = xp;
            a[2 * i + 1] = [0.0, 0.0, 0.0, x, y, 1.0, -yp * x, -yp * y];
            b[2 * i + 1] = yp;
        }

        let h = Self(solve_linear_system(a, b)?);
        if h.determinant().abs() < EPS {
            return Err(DecodeError::PerspectiveDegenerate);
        }
        Ok(h)
    }

    fn determinant(&self) -> f64 {
        let h = &self.0;
        h[0] * (h[4] - h[5] * h[7]) - h[1] * (h[3] - h[5] * h[6]) + h[2] * (h[3] * h[7] - h[4] * h[6])
    }

    /// Projects a point. Points mapped onto the line at infinity are rejected.
    pub fn map(&self, x: f64, y: f64) -> DecodeResult<Point> {
        let h = &self.0;
        let den = h[6] * x + h[7] * y + 1.0;
        if den.abs() < EPS {
            return Err(DecodeError::PerspectiveDegenerate);
        }
        let xp = (h[0] * x + h[1] * y + h[2]) / den;
        let yp = (h[3] * x + h[4] * y + h[5]) / den;
        Ok(Point::new(xp, yp))
    }
}

// Gaussian elimination with partial pivoting
fn solve_linear_system(mut a: [[f64; 8]; 8], mut b: [f64; 8]) -> DecodeResult<[f64; 8]> {
    const N: usize = 8;

    for i in 0..N {
        let max_row = (i..N)
            .max_by(|&p, &q| a[p][i].abs().total_cmp(&a[q][i].abs()))
            .ok_or(DecodeError::PerspectiveDegenerate)?;
        if a[max_row][i].abs() < EPS {
            return Err(DecodeError::PerspectiveDegenerate);
        }
        a.swap(i, max_row);
        b.swap(i, max_row);

        for j in i + 1..N {
            let factor = a[j][i] / a[i][i];
            for k in i..N {
                a[j][k] -= factor * a[i][k];
            }
            b[j] -= factor * b[i];
        }
    }

    // Back substitution
    let mut x = [0.0; N];
    for i in (0..N).rev() {
        let sum = (i + 1..N).map(|j| a[i][j] * x[j]).sum::<f64>();
        x[i] = (b[i] - sum) / a[i][i];
    }

    Ok(x)
}
