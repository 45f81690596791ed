use tracing::trace;

use super::binarize::BinaryGrid;
use super::finder::FinderTriple;
use super::utils::{
    geometry::Point,
    homography::Homography,
    runs_around, X, Y,
};
use crate::common::error::{DecodeError, DecodeResult};
use crate::common::metadata::Version;

// Module grid
//------------------------------------------------------------------------------

/// Square grid of sampled modules, true for dark. The side is always that of
/// a valid version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolGrid {
    side: usize,
    modules: Vec<bool>,
}

impl SymbolGrid {
    /// Wraps row major modules. Fails if `side` is not 4 * version + 17 or the
    /// modules don't fill the square.
    pub fn new(side: usize, modules: Vec<bool>) -> DecodeResult<Self> {
        if Version::from_width(side).is_none() || modules.len() != side * side {
            return Err(DecodeError::StructuralMismatch);
        }
        Ok(Self { side, modules })
    }

    pub(crate) fn from_modules(side: usize, modules: Vec<bool>) -> Self {
        debug_assert!(Version::from_width(side).is_some(), "Invalid side {side}");
        debug_assert!(modules.len() == side * side, "Modules don't fill the grid");
        Self { side, modules }
    }

    pub fn side(&self) -> usize {
        self.side
    }

    /// Version implied by the side length
    pub fn version(&self) -> Version {
        Version::new((self.side - 17) / 4)
    }

    fn coord_to_index(&self, r: i16, c: i16) -> usize {
        let w = self.side as i16;
        debug_assert!(-w <= r && r < w, "Row {r} out of bounds");
        debug_assert!(-w <= c && c < w, "Column {c} out of bounds");

        let r = if r < 0 { r + w } else { r };
        let c = if c < 0 { c + w } else { c };
        (r * w + c) as usize
    }

    /// Module at row `r`, column `c`. Negative indices count from the far edge.
    pub fn get(&self, r: i16, c: i16) -> bool {
        self.modules[self.coord_to_index(r, c)]
    }

    pub fn flip(&mut self, r: i16, c: i16) {
        let idx = self.coord_to_index(r, c);
        self.modules[idx] = !self.modules[idx];
    }

    pub fn count_dark_modules(&self) -> usize {
        self.modules.iter().filter(|&&m| m).count()
    }
}

// Sampler
//------------------------------------------------------------------------------

// Refinement passes, each halving the step
const REFINE_PASSES: usize = 6;

// Steps taken in one direction before the next direction is tried
const MAX_STRIDES: usize = 4;

/// Maps module space onto the image through the finders, and the bottom right
/// alignment pattern when one is found, then samples every module centre of a
/// `ver` sized grid. The correspondence is refined against the
/// function patterns first. Centres falling outside the image read as light.
pub fn sample_grid(
    img: &BinaryGrid,
    triple: &FinderTriple,
    ver: Version,
    alignment_search: bool,
) -> DecodeResult<SymbolGrid> {
    let side = ver.width();
    let sz = side as f64;

    let align = if *ver >= 2 && alignment_search { locate_alignment(img, triple, ver) } else { None };
    let (src4, dst4) = match align {
        Some(p) => (Point::new(sz - 6.5, sz - 6.5), p),
        None => {
            let corner = triple.top_right + triple.bottom_left - triple.top_left;
            (Point::new(sz - 3.5, sz - 3.5), corner)
        }
    };
    trace!(version = *ver, alignment = align.is_some(), "Fourth correspondence");

    let src = [Point::new(3.5, 3.5), Point::new(sz - 3.5, 3.5), Point::new(3.5, sz - 3.5), src4];
    let dst = [triple.top_left, triple.top_right, triple.bottom_left, dst4];
    let h = refine_homography(img, src, dst, ver, triple.module_size)?;

    let mut modules = Vec::with_capacity(side * side);
    for r in 0..side {
        for c in 0..side {
            let p = h.map(c as f64 + 0.5, r as f64 + 0.5)?;
            modules.push(img.is_dark(p.x.floor() as i64, p.y.floor() as i64));
        }
    }

    Ok(SymbolGrid::from_modules(side, modules))
}

// Searches within 3 modules of where the finders place the bottom right
// alignment centre, for a dark module ringed by light then dark on both axes.
// Returns the hit closest to the estimate.
fn locate_alignment(img: &BinaryGrid, triple: &FinderTriple, ver: Version) -> Option<Point> {
    let sz = ver.width() as f64;
    let m = triple.module_size;
    // Module size as row and column runs see it
    let run_m = m / (triple.top_right - triple.top_left).axis_cos();

    let span = (sz - 10.0) / (sz - 7.0);
    let est = triple.top_left
        + (triple.top_right - triple.top_left) * span
        + (triple.bottom_left - triple.top_left) * span;

    let radius = (3.0 * m).ceil() as i64;
    let max_run = (img.width().max(img.height())) as u32;
    let (ex, ey) = (est.x.floor() as i64, est.y.floor() as i64);

    let mut best: Option<(f64, Point)> = None;
    for y in ey - radius..=ey + radius {
        for x in ex - radius..=ex + radius {
            if !img.is_dark(x, y) {
                continue;
            }
            let seed = (x as u32, y as u32);
            let Some((h_runs, cx)) = runs_around::<X, 5>(img, seed, max_run) else {
                continue;
            };
            let Some((v_runs, cy)) = runs_around::<Y, 5>(img, seed, max_run) else {
                continue;
            };
            if !is_alignment_core(&h_runs, run_m) || !is_alignment_core(&v_runs, run_m) {
                continue;
            }

            let centre = Point::new(cx, cy);
            let dist = centre.dist(est);
            if best.map_or(true, |(d, _)| dist < d) {
                best = Some((dist, centre));
            }
        }
    }

    best.map(|(_, p)| p)
}

// Inner light-dark-light runs one module each, outer dark ring present
fn is_alignment_core(runs: &[u32; 5], module_size: f64) -> bool {
    let (lo, hi) = (0.5 * module_size, 1.5 * module_size);
    runs[1..4].iter().all(|&r| (lo..=hi).contains(&(r as f64))) && runs[0] as f64 >= lo && runs[4] as f64 >= lo
}

// Refinement
//------------------------------------------------------------------------------

// Nudges each image point of the correspondence along both axes and keeps a
// move only when the function patterns fit strictly better. The finder
// centres start at half a module of step, the fourth point at a whole module.
fn refine_homography(
    img: &BinaryGrid,
    src: [Point; 4],
    mut dst: [Point; 4],
    ver: Version,
    module_size: f64,
) -> DecodeResult<Homography> {
    let mut h = Homography::compute(src, dst)?;
    let initial = symbol_fitness(img, &h, ver);
    let mut best = initial;
    let mut steps = [0.5, 0.5, 0.5, 1.0].map(|s| s * module_size);

    for _ in 0..REFINE_PASSES {
        for (i, &step) in steps.iter().enumerate() {
            let deltas = [Point::new(-step, 0.0), Point::new(step, 0.0), Point::new(0.0, -step), Point::new(0.0, step)];
            for delta in deltas {
                for _ in 0..MAX_STRIDES {
                    let mut trial = dst;
                    trial[i] = trial[i] + delta;
                    let Ok(th) = Homography::compute(src, trial) else {
                        break;
                    };
                    let score = symbol_fitness(img, &th, ver);
                    if score <= best {
                        break;
                    }
                    (best, dst, h) = (score, trial, th);
                }
            }
        }
        steps = steps.map(|s| s * 0.5);
    }

    trace!(initial, refined = best, "Homography refined");
    Ok(h)
}

// Agreement of the sampled image with the timing, finder and alignment
// patterns a `ver` symbol must carry
fn symbol_fitness(img: &BinaryGrid, h: &Homography, ver: Version) -> i32 {
    let side = ver.width() as i16;
    let mut score = 0;

    // Timing patterns, separators included at both ends
    for i in 7..side - 7 {
        let sign = if i & 1 == 0 { 1 } else { -1 };
        score += sign * cell_fitness(img, h, 6, i);
        score += sign * cell_fitness(img, h, i, 6);
    }

    for (r, c) in [(3, 3), (3, side - 4), (side - 4, 3)] {
        score += cell_fitness(img, h, r, c) + ring_fitness(img, h, r, c, 1) - ring_fitness(img, h, r, c, 2)
            + ring_fitness(img, h, r, c, 3);
    }

    let positions = ver.alignment_pattern();
    let last = positions.len().saturating_sub(1);
    for (i, &r) in positions.iter().enumerate() {
        for (j, &c) in positions.iter().enumerate() {
            // Corners held by the finders
            if (i == 0 && (j == 0 || j == last)) || (i == last && j == 0) {
                continue;
            }
            score += cell_fitness(img, h, r, c) - ring_fitness(img, h, r, c, 1) + ring_fitness(img, h, r, c, 2);
        }
    }

    score
}

fn ring_fitness(img: &BinaryGrid, h: &Homography, r: i16, c: i16, radius: i16) -> i32 {
    let mut score = 0;
    for i in 0..radius * 2 {
        score += cell_fitness(img, h, r - radius, c - radius + i);
        score += cell_fitness(img, h, r - radius + i, c + radius);
        score += cell_fitness(img, h, r + radius, c + radius - i);
        score += cell_fitness(img, h, r + radius - i, c - radius);
    }
    score
}

// Dark minus light samples over a 3x3 lattice inside module (r, c). Samples
// off the image count for neither.
fn cell_fitness(img: &BinaryGrid, h: &Homography, r: i16, c: i16) -> i32 {
    const OFFSETS: [f64; 3] = [0.3, 0.5, 0.7];
    let mut score = 0;
    for dy in OFFSETS {
        for dx in OFFSETS {
            let Ok(p) = h.map(c as f64 + dx, r as f64 + dy) else {
                continue;
            };
            match img.get(p.x.floor() as i64, p.y.floor() as i64) {
                Some(true) => score += 1,
                Some(false) => score -= 1,
                None => {}
            }
        }
    }
    score
}
