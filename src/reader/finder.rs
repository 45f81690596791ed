use std::cmp::Reverse;

use tracing::trace;

use super::binarize::BinaryGrid;
use super::utils::{
    geometry::Point,
    runs_around, verify_pattern, X, Y,
};
use crate::common::error::{DecodeError, DecodeResult};
use crate::common::metadata::Version;

static FINDER_PATTERN: [f64; 5] = [1.0, 1.0, 3.0, 1.0, 1.0];

// A finder must be seen on at least this many rows
const MIN_HITS: u32 = 2;

// Hits closer than this many module sizes belong to the same finder
const CLUSTER_RADIUS: f64 = 2.0;

const MAX_SIZE_RATIO: f64 = 1.6;

const MAX_LEG_RATIO: f64 = 1.5;

// Cosine of the corner angle, about 72.5° to 107.5°
const MAX_CORNER_COS: f64 = 0.3;

const TIE_EPSILON: f64 = 1e-6;

// Finder candidate
//------------------------------------------------------------------------------

/// Centre of a 1:1:3:1:1 pattern confirmed along both axes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinderCandidate {
    pub centre: Point,
    pub module_size: f64,
    // Rows the pattern was seen on
    pub hits: u32,
}

// Run of same colored pixels in a row
#[derive(Debug, Clone, Copy)]
struct Run {
    start: u32,
    len: u32,
    dark: bool,
}

fn row_runs(img: &BinaryGrid, y: u32, runs: &mut Vec<Run>) {
    runs.clear();
    for x in 0..img.width() {
        let dark = img.is_dark(x as i64, y as i64);
        match runs.last_mut() {
            Some(run) if run.dark == dark => run.len += 1,
            _ => runs.push(Run { start: x, len: 1, dark }),
        }
    }
}

/// Scans every row for finder lines, confirms each along the column and back
/// along the row through the refined centre, then clusters the hits. Sorted
/// by hit count, strongest first.
pub fn locate_finders(img: &BinaryGrid) -> Vec<FinderCandidate> {
    let mut clusters: Vec<FinderCandidate> = Vec::new();
    let mut runs = Vec::with_capacity(img.width() as usize);

    for y in 0..img.height() {
        row_runs(img, y, &mut runs);
        for win in runs.windows(5) {
            if !win[0].dark {
                continue;
            }
            let lens = [win[0].len, win[1].len, win[2].len, win[3].len, win[4].len];
            if !verify_pattern(&lens, &FINDER_PATTERN) {
                continue;
            }
            let seed_x = win[2].start + win[2].len / 2;
            if let Some(cand) = cross_check(img, seed_x, y, lens.iter().sum()) {
                merge(&mut clusters, cand);
            }
        }
    }

    let found = clusters.len();
    clusters.retain(|c| c.hits >= MIN_HITS);
    clusters.sort_by_key(|c| Reverse(c.hits));
    trace!(found, kept = clusters.len(), "Finder candidates");
    clusters
}

fn cross_check(img: &BinaryGrid, x: u32, y: u32, h_total: u32) -> Option<FinderCandidate> {
    let (v_runs, cy) = runs_around::<Y, 5>(img, (x, y), h_total)?;
    let v_total = v_runs.iter().sum::<u32>();
    if !verify_pattern(&v_runs, &FINDER_PATTERN) || 5 * v_total.abs_diff(h_total) >= 2 * h_total {
        return None;
    }

    // Re-centre along the row through the vertical centre
    let row = cy.floor() as u32;
    if !img.is_dark(x as i64, row as i64) {
        return None;
    }
    let (h_runs, cx) = runs_around::<X, 5>(img, (x, row), h_total)?;
    if !verify_pattern(&h_runs, &FINDER_PATTERN) {
        return None;
    }
    let h_total = h_runs.iter().sum::<u32>();

    Some(FinderCandidate {
        centre: Point::new(cx, cy),
        module_size: (h_total + v_total) as f64 / 14.0,
        hits: 1,
    })
}

fn merge(clusters: &mut Vec<FinderCandidate>, cand: FinderCandidate) {
    let near = clusters.iter_mut().find(|c| {
        c.centre.dist(cand.centre) < CLUSTER_RADIUS * c.module_size.max(cand.module_size)
    });
    match near {
        Some(c) => {
            c.hits += 1;
            let n = c.hits as f64;
            c.centre = c.centre + (cand.centre - c.centre) * (1.0 / n);
            c.module_size += (cand.module_size - c.module_size) / n;
        }
        None => clusters.push(cand),
    }
}

// Finder triple
//------------------------------------------------------------------------------

/// Three finders forming the L of one symbol
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinderTriple {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_left: Point,
    pub module_size: f64,
    /// Angle of the top edge in radians, clockwise on screen from the x axis
    pub angle: f64,
    /// Version estimated from the finder spacing
    pub version: Version,
}

impl FinderTriple {
    // Scores three candidates as an L. Lower residual is a better fit.
    fn fit(cands: [&FinderCandidate; 3]) -> Option<(f64, Self)> {
        let sizes = cands.map(|c| c.module_size);
        let min_size = sizes.iter().copied().fold(f64::INFINITY, f64::min);
        let max_size = sizes.iter().copied().fold(0.0, f64::max);
        if min_size <= 0.0 || max_size / min_size > MAX_SIZE_RATIO {
            return None;
        }

        // Corner is the vertex closest to a right angle
        let (corner, cos) = (0..3)
            .map(|i| {
                let v = cands[i].centre;
                let a = cands[(i + 1) % 3].centre - v;
                let b = cands[(i + 2) % 3].centre - v;
                (i, a.cos_angle(b).abs())
            })
            .min_by(|p, q| p.1.total_cmp(&q.1))?;
        if cos >= MAX_CORNER_COS {
            return None;
        }

        let tl = cands[corner].centre;
        let mut tr = cands[(corner + 1) % 3].centre;
        let mut bl = cands[(corner + 2) % 3].centre;
        if (tr - tl).cross(bl - tl) < 0.0 {
            std::mem::swap(&mut tr, &mut bl);
        }

        let (top, left) = (tl.dist(tr), tl.dist(bl));
        let leg_ratio = top.max(left) / top.min(left);
        if leg_ratio > MAX_LEG_RATIO {
            return None;
        }

        // Row and column runs cut a tilted finder on the slant, so each leg
        // rescales them by its own tilt
        let run_size = sizes.iter().sum::<f64>() / 3.0;
        let top_size = run_size * (tr - tl).axis_cos();
        let left_size = run_size * (bl - tl).axis_cos();
        let module_size = (top_size + left_size) / 2.0;
        let side = (top / top_size + left / left_size) / 2.0 + 7.0;
        let ver = (side - 17.0) / 4.0;
        let rounded = ver.round();
        if !(1.0..=40.0).contains(&rounded) {
            return None;
        }

        let residual = cos + (leg_ratio - 1.0) + (max_size / min_size - 1.0) + 0.5 * (ver - rounded).abs();
        let angle = (tr.y - tl.y).atan2(tr.x - tl.x);
        let triple = Self {
            top_left: tl,
            top_right: tr,
            bottom_left: bl,
            module_size,
            angle,
            version: Version::new(rounded as usize),
        };
        Some((residual, triple))
    }
}

/// Every L shaped triple among the strongest `max_candidates` candidates,
/// lowest residual first. Fails when two distinct triples tie for the best
/// fit, as happens with two symbols of the same size in view.
pub fn rank_triples(cands: &[FinderCandidate], max_candidates: usize) -> DecodeResult<Vec<FinderTriple>> {
    let cands = &cands[..cands.len().min(max_candidates)];
    if cands.len() < 3 {
        return Err(DecodeError::NoFinderPatterns);
    }

    let mut fits = Vec::new();
    for i in 0..cands.len() {
        for j in i + 1..cands.len() {
            for k in j + 1..cands.len() {
                if let Some(fit) = FinderTriple::fit([&cands[i], &cands[j], &cands[k]]) {
                    fits.push(fit);
                }
            }
        }
    }
    fits.sort_by(|a, b| a.0.total_cmp(&b.0));
    trace!(triples = fits.len(), "Finder triples");

    match fits.as_slice() {
        [] => Err(DecodeError::NoFinderPatterns),
        [(best, _), (second, _), ..] if second - best < TIE_EPSILON => {
            Err(DecodeError::AmbiguousFinderPatterns)
        }
        _ => Ok(fits.into_iter().map(|(_, t)| t).collect()),
    }
}

/// Picks the L shaped triple with the lowest residual among the strongest
/// `max_candidates` candidates
pub fn select_triple(cands: &[FinderCandidate], max_candidates: usize) -> DecodeResult<FinderTriple> {
    let ranked = rank_triples(cands, max_candidates)?;
    ranked.first().copied().ok_or(DecodeError::NoFinderPatterns)
}

#[cfg(test)]
mod finder_tests {
    use std::f64::consts::FRAC_PI_2;

    use image::imageops;
    use test_case::test_case;

    use super::{locate_finders, rank_triples, select_triple, FinderCandidate};
    use crate::builder::QRBuilder;
    use crate::common::error::DecodeError;
    use crate::common::mask::MaskPattern;
    use crate::common::metadata::{ECLevel, Version};
    use crate::reader::binarize::BinaryGrid;
    use crate::reader::utils::geometry::Point;
    use crate::reader::Binarizer;

    fn hello_image() -> image::GrayImage {
        QRBuilder::new(b"HELLO WORLD")
            .version(Version::new(1))
            .ec_level(ECLevel::M)
            .mask(MaskPattern::new(0))
            .build()
            .unwrap()
            .to_image(4)
    }

    fn cand(x: f64, y: f64) -> FinderCandidate {
        FinderCandidate { centre: Point::new(x, y), module_size: 1.0, hits: 3 }
    }

    #[test]
    fn test_locate_rendered() {
        let img = BinaryGrid::new(&hello_image(), Binarizer::Otsu, 8).unwrap();
        let cands = locate_finders(&img);
        for exp in [Point::new(30.0, 30.0), Point::new(86.0, 30.0), Point::new(30.0, 86.0)] {
            let found = cands.iter().find(|c| c.centre == exp).expect("finder not located");
            assert_eq!(found.module_size, 4.0);
            assert_eq!(found.hits, 12);
        }

        let triple = select_triple(&cands, 16).unwrap();
        assert_eq!(triple.top_left, Point::new(30.0, 30.0));
        assert_eq!(triple.top_right, Point::new(86.0, 30.0));
        assert_eq!(triple.bottom_left, Point::new(30.0, 86.0));
        assert_eq!(triple.version, Version::new(1));
        assert_eq!(triple.module_size, 4.0);
        assert_eq!(triple.angle, 0.0);
    }

    #[test]
    fn test_locate_rotated() {
        let img = imageops::rotate90(&hello_image());
        let img = BinaryGrid::new(&img, Binarizer::Otsu, 8).unwrap();
        let triple = select_triple(&locate_finders(&img), 16).unwrap();
        assert_eq!(triple.top_left, Point::new(86.0, 30.0));
        assert_eq!(triple.top_right, Point::new(86.0, 86.0));
        assert_eq!(triple.bottom_left, Point::new(30.0, 30.0));
        assert!((triple.angle - FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn test_select_orders_corners() {
        // Listed in scrambled order
        let cands = [cand(10.0, 24.0), cand(24.0, 10.0), cand(10.0, 10.0)];
        let triple = select_triple(&cands, 16).unwrap();
        assert_eq!(triple.top_left, Point::new(10.0, 10.0));
        assert_eq!(triple.top_right, Point::new(24.0, 10.0));
        assert_eq!(triple.bottom_left, Point::new(10.0, 24.0));
        assert_eq!(triple.version, Version::new(1));
    }

    // Version 5 at 4 px per module, its runs lengthened by the tilt
    #[test_case(30.0)]
    #[test_case(45.0)]
    #[test_case(-20.0)]
    #[test_case(120.0)]
    fn test_select_tilted(degrees: f64) {
        let (sin, cos) = degrees.to_radians().sin_cos();
        let tl = Point::new(200.0, 200.0);
        let across = Point::new(cos, sin) * 120.0;
        let down = Point::new(-sin, cos) * 120.0;
        let run_size = 4.0 / across.axis_cos();
        let cands = [tl, tl + across, tl + down].map(|centre| FinderCandidate { centre, module_size: run_size, hits: 5 });

        let triple = select_triple(&cands, 16).unwrap();
        assert_eq!(triple.version, Version::new(5));
        assert!((triple.module_size - 4.0).abs() < 1e-9);
        assert!((triple.angle - degrees.to_radians()).abs() < 1e-9);
    }

    #[test]
    fn test_rank_triples() {
        // A clean L and a sheared one sharing two finders
        let cands = [cand(10.0, 10.0), cand(24.0, 10.0), cand(10.0, 24.0), cand(13.0, 24.0)];
        let ranked = rank_triples(&cands, 16).unwrap();
        assert!(ranked.len() >= 2);
        assert_eq!(ranked[0].bottom_left, Point::new(10.0, 24.0));
        assert_eq!(Ok(ranked[0]), select_triple(&cands, 16));
    }

    #[test]
    fn test_select_too_few() {
        let cands = [cand(10.0, 10.0), cand(24.0, 10.0)];
        assert_eq!(select_triple(&cands, 16), Err(DecodeError::NoFinderPatterns));

        let cands = [cand(10.0, 10.0), cand(24.0, 10.0), cand(10.0, 24.0)];
        assert_eq!(select_triple(&cands, 2), Err(DecodeError::NoFinderPatterns));
    }

    #[test]
    fn test_select_no_l_shape() {
        let collinear = [cand(10.0, 10.0), cand(24.0, 10.0), cand(38.0, 10.0)];
        assert_eq!(select_triple(&collinear, 16), Err(DecodeError::NoFinderPatterns));

        let mut mixed = [cand(10.0, 10.0), cand(24.0, 10.0), cand(10.0, 24.0)];
        mixed[2].module_size = 2.0;
        assert_eq!(select_triple(&mixed, 16), Err(DecodeError::NoFinderPatterns));
    }

    #[test]
    fn test_select_tie() {
        let cands = [
            cand(10.0, 10.0),
            cand(24.0, 10.0),
            cand(10.0, 24.0),
            cand(110.0, 10.0),
            cand(124.0, 10.0),
            cand(110.0, 24.0),
        ];
        assert_eq!(select_triple(&cands, 16), Err(DecodeError::AmbiguousFinderPatterns));
    }
}
