use super::metadata::Version;

// Function modules
//------------------------------------------------------------------------------

/// True for modules taken by finders, separators, timing, alignment, format
/// and version info, or the dark module
pub fn is_reserved(ver: Version, r: i16, c: i16) -> bool {
    let w = ver.width() as i16;

    // Finders with separators and format info, dark module included
    if (r < 9 && c < 9) || (r < 9 && c >= w - 8) || (r >= w - 8 && c < 9) {
        return true;
    }

    if r == 6 || c == 6 {
        return true;
    }

    if *ver >= 7 {
        let in_band = |near: i16, far: i16| near < 6 && (w - 11..w - 8).contains(&far);
        if in_band(r, c) || in_band(c, r) {
            return true;
        }
    }

    let poses = ver.alignment_pattern();
    let last = w - 7;
    poses.iter().any(|&ar| {
        poses.iter().any(|&ac| {
            let overlaps_finder = (ar == 6 && (ac == 6 || ac == last)) || (ar == last && ac == 6);
            !overlaps_finder && (r - ar).abs() <= 2 && (c - ac).abs() <= 2
        })
    })
}

// Iterator over data modules in placement order
//------------------------------------------------------------------------------

/// Walks column pairs from the right edge, alternating upward and downward,
/// skipping the vertical timing column and every reserved module
pub struct DataRegionIter {
    ver: Version,
    w: i16,
    // Right column of the current pair
    right: i16,
    // Step along the pair, counted from where the pair starts
    vert: i16,
    // 0 for the right column, 1 for the left
    j: i16,
}

impl DataRegionIter {
    pub fn new(ver: Version) -> Self {
        let w = ver.width() as i16;
        Self { ver, w, right: w - 1, vert: 0, j: 0 }
    }

    fn advance(&mut self) {
        self.j += 1;
        if self.j < 2 {
            return;
        }
        self.j = 0;
        self.vert += 1;
        if self.vert < self.w {
            return;
        }
        self.vert = 0;
        self.right -= 2;
        if self.right == 6 {
            self.right = 5;
        }
    }
}

impl Iterator for DataRegionIter {
    type Item = (i16, i16);

    fn next(&mut self) -> Option<Self::Item> {
        while self.right >= 1 {
            let c = self.right - self.j;
            let upward = (self.right + 1) & 2 == 0;
            let r = if upward { self.w - 1 - self.vert } else { self.vert };
            self.advance();
            if !is_reserved(self.ver, r, c) {
                return Some((r, c));
            }
        }
        None
    }
}

#[cfg(test)]
mod iter_tests {
    use super::{is_reserved, DataRegionIter};
    use crate::common::metadata::Version;

    #[test]
    fn test_data_region_size() {
        for v in 1..=40 {
            let ver = Version::new(v);
            let count = DataRegionIter::new(ver).count();
            assert_eq!(count, ver.raw_data_modules(), "Version {v}");
        }
    }

    #[test]
    fn test_data_region_order() {
        let coords = DataRegionIter::new(Version::new(1)).take(6).collect::<Vec<_>>();
        assert_eq!(coords, vec![(20, 20), (20, 19), (19, 20), (19, 19), (18, 20), (18, 19)]);

        // Second pair runs downward from the top of the data area
        let coords = DataRegionIter::new(Version::new(1)).skip(24).take(2).collect::<Vec<_>>();
        assert_eq!(coords, vec![(9, 18), (9, 17)]);
    }

    #[test]
    fn test_data_region_skips_timing_column() {
        let w = Version::new(2).width() as i16;
        assert!(DataRegionIter::new(Version::new(2)).all(|(r, c)| c != 6 && r != 6 && c < w));
    }

    #[test]
    fn test_is_reserved() {
        let ver = Version::new(7);
        let w = ver.width() as i16;
        assert!(is_reserved(ver, 0, 0));
        assert!(is_reserved(ver, 8, w - 1));
        assert!(is_reserved(ver, w - 8, 8));
        assert!(is_reserved(ver, 0, w - 11));
        assert!(is_reserved(ver, w - 11, 5));
        assert!(is_reserved(ver, 22, 22));
        assert!(is_reserved(ver, 20, 38));
        assert!(!is_reserved(ver, 9, 9));
        assert!(!is_reserved(ver, 6 - 1, w - 12));
        assert!(!is_reserved(ver, w - 1, w - 1));
        // Alignment pattern next to the top right finder isn't drawn
        assert!(!is_reserved(ver, 7, w - 9));
    }
}
