use super::binarize::BinaryGrid;

pub mod geometry;
pub mod homography;

// Scan direction for run length checks
//------------------------------------------------------------------------------

pub trait Axis {
    fn shift(x: i64, y: i64, by: i64) -> (i64, i64);

    // Position along the axis
    fn along(x: i64, y: i64) -> i64;
}

pub struct X;

pub struct Y;

impl Axis for X {
    #[inline]
    fn shift(x: i64, y: i64, by: i64) -> (i64, i64) {
        (x + by, y)
    }

    #[inline]
    fn along(x: i64, _: i64) -> i64 {
        x
    }
}

impl Axis for Y {
    #[inline]
    fn shift(x: i64, y: i64, by: i64) -> (i64, i64) {
        (x, y + by)
    }

    #[inline]
    fn along(_: i64, y: i64) -> i64 {
        y
    }
}

// Runs of alternating color around a seed pixel. Used in 2 places; by the
// finder locator to cross check the 1:1:3:1:1 pattern and by the alignment
// locator to check the light-dark-light core of the pattern.
//------------------------------------------------------------------------------

/// Collects `N` runs along axis `A` with the seed's run in the middle. The
/// outermost runs may end at the image border, inner ones may not. Returns
/// the runs and the centre of the middle run along the axis, in pixel edge
/// coordinates.
pub fn runs_around<A: Axis, const N: usize>(
    img: &BinaryGrid,
    seed: (u32, u32),
    max_run: u32,
) -> Option<([u32; N], f64)> {
    let mid = N / 2;
    let mut runs = [0u32; N];
    let (sx, sy) = (seed.0 as i64, seed.1 as i64);
    let seed_dark = img.get(sx, sy)?;

    // Count backwards, then forwards from the seed
    let mut start = 0;
    for dir in [-1i64, 1] {
        let mut idx = mid;
        let mut dark = seed_dark;
        let mut step = if dir < 0 { 0 } else { 1 };
        loop {
            let (x, y) = A::shift(sx, sy, dir * step);
            match img.get(x, y) {
                Some(d) if d == dark => runs[idx] += 1,
                Some(d) => {
                    if (dir < 0 && idx == 0) || (dir > 0 && idx == N - 1) {
                        break;
                    }
                    idx = if dir < 0 { idx - 1 } else { idx + 1 };
                    dark = d;
                    runs[idx] += 1;
                }
                None => break,
            }
            if runs[idx] > max_run {
                return None;
            }
            step += 1;
        }
        let finished = if dir < 0 { idx == 0 } else { idx == N - 1 };
        if !finished {
            return None;
        }
        if dir < 0 {
            // First pixel of the middle run relative to the seed
            start = runs[mid] as i64 - 1;
        }
    }

    let lo = A::along(sx, sy) - start;
    Some((runs, lo as f64 + runs[mid] as f64 / 2.0))
}

/// Checks run lengths against a ratio pattern, each run within 3/4 of a unit
pub fn verify_pattern(runs: &[u32], pattern: &[f64]) -> bool {
    let total = runs.iter().sum::<u32>() as f64;
    let unit = total / pattern.iter().sum::<f64>();
    let tol = unit * 3.0 / 4.0;

    runs.iter().zip(pattern.iter()).all(|(&rl, &r)| {
        let rl = rl as f64;
        rl >= r * unit - tol && rl <= r * unit + tol
    })
}
