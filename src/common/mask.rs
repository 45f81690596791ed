use std::fmt::{Display, Formatter};
use std::ops::Deref;

use super::error::{QRError, QRResult};
use super::metadata::Color;
use crate::builder::QR;

#[derive(Debug, PartialEq, Eq, Copy, Clone, PartialOrd, Ord, Hash)]
pub struct MaskPattern(u8);

impl MaskPattern {
    pub fn new(pattern: u8) -> Self {
        debug_assert!(pattern < 8, "Invalid masking pattern");
        Self(pattern)
    }
}

impl TryFrom<u8> for MaskPattern {
    type Error = QRError;

    fn try_from(pattern: u8) -> QRResult<Self> {
        if pattern < 8 {
            Ok(Self(pattern))
        } else {
            Err(QRError::InvalidMaskingPattern)
        }
    }
}

impl Display for MaskPattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Deref for MaskPattern {
    type Target = u8;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Every function takes (row, column)
mod mask_functions {
    pub fn checkerboard(r: i16, c: i16) -> bool {
        (r + c) & 1 == 0
    }

    pub fn horizontal_lines(r: i16, _: i16) -> bool {
        r & 1 == 0
    }

    pub fn vertical_lines(_: i16, c: i16) -> bool {
        c % 3 == 0
    }

    pub fn diagonal_lines(r: i16, c: i16) -> bool {
        (r + c) % 3 == 0
    }

    pub fn large_checkerboard(r: i16, c: i16) -> bool {
        ((r >> 1) + (c / 3)) & 1 == 0
    }

    pub fn fields(r: i16, c: i16) -> bool {
        ((r * c) & 1) + ((r * c) % 3) == 0
    }

    pub fn diamonds(r: i16, c: i16) -> bool {
        (((r * c) & 1) + ((r * c) % 3)) & 1 == 0
    }

    pub fn meadow(r: i16, c: i16) -> bool {
        (((r + c) & 1) + ((r * c) % 3)) & 1 == 0
    }
}

impl MaskPattern {
    pub fn mask_functions(self) -> fn(i16, i16) -> bool {
        debug_assert!(*self < 8, "Invalid pattern");

        match *self {
            0b000 => mask_functions::checkerboard,
            0b001 => mask_functions::horizontal_lines,
            0b010 => mask_functions::vertical_lines,
            0b011 => mask_functions::diagonal_lines,
            0b100 => mask_functions::large_checkerboard,
            0b101 => mask_functions::fields,
            0b110 => mask_functions::diamonds,
            _ => mask_functions::meadow,
        }
    }
}


// Mask selection
//------------------------------------------------------------------------------

pub fn apply_best_mask(qr: &mut QR) -> MaskPattern {
    let best_mask = (0..8)
        .map(MaskPattern::new)
        .min_by_key(|&m| {
            let mut qr = qr.clone();
            qr.apply_mask(m);
            compute_total_penalty(&qr)
        })
        .unwrap_or(MaskPattern(0));
    qr.apply_mask(best_mask);
    best_mask
}

pub fn compute_total_penalty(qr: &QR) -> u32 {
    let w = qr.width() as i16;
    let get = |r: i16, c: i16| *qr.get(r, c);
    let adj_pen = compute_adjacent_penalty(w, &get);
    let blk_pen = compute_block_penalty(w, &get);
    let fp_pen_h = compute_finder_pattern_penalty(w, &get, true);
    let fp_pen_v = compute_finder_pattern_penalty(w, &get, false);
    let bal_pen = compute_balance_penalty(w, &get);
    adj_pen + blk_pen + fp_pen_h + fp_pen_v + bal_pen
}

// 3 points for a run of 5 same colored modules, 1 more per extra module
fn compute_adjacent_penalty(w: i16, get: &impl Fn(i16, i16) -> Color) -> u32 {
    let mut pen = 0;
    for i in 0..w {
        for is_hor in [true, false] {
            let at = |j: i16| if is_hor { get(i, j) } else { get(j, i) };
            let mut run = 1;
            for j in 1..w {
                if at(j) == at(j - 1) {
                    run += 1;
                    continue;
                }
                if run >= 5 {
                    pen += run - 2;
                }
                run = 1;
            }
            if run >= 5 {
                pen += run - 2;
            }
        }
    }
    pen
}

fn compute_block_penalty(w: i16, get: &impl Fn(i16, i16) -> Color) -> u32 {
    let mut pen = 0;
    for r in 0..w - 1 {
        for c in 0..w - 1 {
            let clr = get(r, c);
            if clr == get(r + 1, c) && clr == get(r, c + 1) && clr == get(r + 1, c + 1) {
                pen += 3;
            }
        }
    }
    pen
}

// 1:1:3:1:1 dark run with 4 light modules on either side. Modules beyond
// the symbol count as light.
fn compute_finder_pattern_penalty(
    w: i16,
    get: &impl Fn(i16, i16) -> Color,
    is_hor: bool,
) -> u32 {
    static PATTERN: [Color; 7] = [
        Color::Dark,
        Color::Light,
        Color::Dark,
        Color::Dark,
        Color::Dark,
        Color::Light,
        Color::Dark,
    ];

    let mut pen = 0;
    for i in 0..w {
        let at = |j: i16| match j {
            j if j < 0 || j >= w => Color::Light,
            j if is_hor => get(i, j),
            j => get(j, i),
        };
        for j in 0..=w - 7 {
            if (0..7).any(|k| at(j + k) != PATTERN[k as usize]) {
                continue;
            }
            let light_before = (j - 4..j).all(|x| at(x) == Color::Light);
            let light_after = (j + 7..j + 11).all(|x| at(x) == Color::Light);
            if light_before || light_after {
                pen += 40;
            }
        }
    }
    pen
}

// 10 points per 5% the dark ratio strays from half
fn compute_balance_penalty(w: i16, get: &impl Fn(i16, i16) -> Color) -> u32 {
    let dark_cnt = (0..w)
        .flat_map(|r| (0..w).map(move |c| (r, c)))
        .filter(|&(r, c)| get(r, c) == Color::Dark)
        .count();
    let total = (w as usize) * (w as usize);
    let pct = (dark_cnt * 100 / total) as i32;
    ((pct - 50).unsigned_abs() / 5) * 10
}

#[cfg(test)]
mod penalty_tests {
    use super::{
        compute_adjacent_penalty, compute_balance_penalty, compute_block_penalty,
        compute_finder_pattern_penalty,
    };
    use crate::common::metadata::Color;

    fn grid<'a>(rows: &'a [&'a str]) -> impl Fn(i16, i16) -> Color + 'a {
        move |r, c| Color::from(rows[r as usize].as_bytes()[c as usize] == b'#')
    }

    #[test]
    fn test_adjacent_penalty() {
        let rows = ["#######"; 7];
        assert_eq!(compute_adjacent_penalty(7, &grid(&rows)), 14 * 5);

        let rows = ["#####.#", "#.#.#.#", ".#.#.#.", "#.#.#.#", ".#.#.#.", "#.#.#.#", ".#.#.#."];
        assert_eq!(compute_adjacent_penalty(7, &grid(&rows)), 3);
    }

    #[test]
    fn test_block_penalty() {
        let rows = ["######"; 6];
        assert_eq!(compute_block_penalty(6, &grid(&rows)), 25 * 3);

        let rows = ["#.#.#.", ".#.#.#", "#.#.#.", ".#.#.#", "#.#.#.", ".#.#.#"];
        assert_eq!(compute_block_penalty(6, &grid(&rows)), 0);
    }

    #[test]
    fn test_finder_pattern_penalty() {
        let mut rows = vec!["#.###.#...."];
        rows.extend(["..........."; 10]);
        let get = grid(&rows);
        assert_eq!(compute_finder_pattern_penalty(11, &get, true), 40);
        assert_eq!(compute_finder_pattern_penalty(11, &get, false), 0);

        // Dark modules on both sides
        let mut rows = vec!["#.#.###.#.#"];
        rows.extend(["..........."; 10]);
        assert_eq!(compute_finder_pattern_penalty(11, &grid(&rows), true), 0);
    }

    #[test]
    fn test_balance_penalty() {
        let rows = ["####"; 4];
        assert_eq!(compute_balance_penalty(4, &grid(&rows)), 100);
        let rows = ["#.#.", ".#.#", "#.#.", ".#.#"];
        assert_eq!(compute_balance_penalty(4, &grid(&rows)), 0);
        let rows = ["###.", "###.", "###.", "###."];
        assert_eq!(compute_balance_penalty(4, &grid(&rows)), 50);
    }
}
