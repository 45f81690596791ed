use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;
use tracing::trace;

use super::raster::RasterImage;
use super::Binarizer;
use crate::common::error::{DecodeError, DecodeResult};

// Smallest symbol is 21 modules at 1 pixel each
const MIN_IMAGE_SIDE: u32 = 21;

const BLOCK_SIZE: u32 = 8;

// Blocks with a luminance range at or below this carry no edge
const MIN_BLOCK_RANGE: u8 = 24;

// Binary image, true for dark pixels
//------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryGrid {
    w: u32,
    h: u32,
    data: Vec<bool>,
}

impl BinaryGrid {
    pub fn new<I: RasterImage + ?Sized>(
        img: &I,
        binarizer: Binarizer,
        min_contrast: u8,
    ) -> DecodeResult<Self> {
        let (w, h) = img.size();
        if w < MIN_IMAGE_SIDE || h < MIN_IMAGE_SIDE {
            return Err(DecodeError::ImageTooSmall);
        }

        let gray = GrayImage::from_fn(w, h, |x, y| Luma([img.luma(x, y)]));
        let (min, max) = gray
            .as_raw()
            .iter()
            .fold((u8::MAX, u8::MIN), |(mn, mx), &p| (mn.min(p), mx.max(p)));
        let range = max - min;
        if range == 0 || range < min_contrast {
            trace!(min, max, "Luminance range too narrow");
            return Err(DecodeError::DecodeFailure);
        }

        let data = match binarizer {
            Binarizer::Otsu => {
                let level = otsu_level(&gray);
                trace!(level, "Otsu threshold");
                gray.as_raw().iter().map(|&p| p <= level).collect()
            }
            Binarizer::Adaptive => adaptive_threshold(&gray),
        };

        Ok(Self { w, h, data })
    }

    #[cfg(test)]
    pub(crate) fn from_raw(w: u32, h: u32, data: Vec<bool>) -> Self {
        debug_assert!(data.len() == (w * h) as usize, "Data doesn't fill {w}x{h}");
        Self { w, h, data }
    }

    pub fn width(&self) -> u32 {
        self.w
    }

    pub fn height(&self) -> u32 {
        self.h
    }

    /// Color at (x, y), none outside the image
    #[inline]
    pub fn get(&self, x: i64, y: i64) -> Option<bool> {
        if x < 0 || y < 0 || x >= self.w as i64 || y >= self.h as i64 {
            return None;
        }
        Some(self.data[(y * self.w as i64 + x) as usize])
    }

    /// Color at (x, y), light outside the image
    #[inline]
    pub fn is_dark(&self, x: i64, y: i64) -> bool {
        self.get(x, y).unwrap_or(false)
    }
}

// Local threshold:
// 1. Splits the image into 8x8 blocks, the last row and column of blocks may
//    be smaller
// 2. Averages each block. Flat blocks are assumed light at half their minimum,
//    unless their top and left neighbours say they sit inside a dark area
// 3. Thresholds each block by the mean of the 5x5 blocks around it
// 4. A pixel at or below its threshold is dark
//------------------------------------------------------------------------------

fn adaptive_threshold(gray: &GrayImage) -> Vec<bool> {
    let (w, h) = gray.dimensions();
    let bw = w.div_ceil(BLOCK_SIZE) as usize;
    let bh = h.div_ceil(BLOCK_SIZE) as usize;

    let mut sum = vec![0u32; bw * bh];
    let mut count = vec![0u32; bw * bh];
    let mut min_max = vec![(u8::MAX, u8::MIN); bw * bh];
    for (x, y, Luma([p])) in gray.enumerate_pixels() {
        let idx = (y / BLOCK_SIZE) as usize * bw + (x / BLOCK_SIZE) as usize;
        sum[idx] += *p as u32;
        count[idx] += 1;
        let (mn, mx) = &mut min_max[idx];
        *mn = (*mn).min(*p);
        *mx = (*mx).max(*p);
    }

    let mut avg = vec![0u32; bw * bh];
    for by in 0..bh {
        for bx in 0..bw {
            let i = by * bw + bx;
            let (mn, mx) = min_max[i];
            if mx - mn > MIN_BLOCK_RANGE {
                avg[i] = sum[i] / count[i];
                continue;
            }

            avg[i] = mn as u32 / 2;
            if bx > 0 && by > 0 {
                let ng_avg = (2 * avg[i - 1] + avg[i - bw] + avg[i - bw - 1]) / 4;
                if (mn as u32) < ng_avg {
                    avg[i] = ng_avg;
                }
            }
        }
    }

    let mut thresh = vec![0u8; bw * bh];
    for by in 0..bh {
        let (y0, y1) = (by.saturating_sub(2), (by + 2).min(bh - 1));
        for bx in 0..bw {
            let (x0, x1) = (bx.saturating_sub(2), (bx + 2).min(bw - 1));
            let mut total = 0;
            for ny in y0..=y1 {
                total += avg[ny * bw + x0..=ny * bw + x1].iter().sum::<u32>();
            }
            let n = ((y1 - y0 + 1) * (x1 - x0 + 1)) as u32;
            thresh[by * bw + bx] = (total / n) as u8;
        }
    }

    gray.enumerate_pixels()
        .map(|(x, y, Luma([p]))| {
            let idx = (y / BLOCK_SIZE) as usize * bw + (x / BLOCK_SIZE) as usize;
            *p <= thresh[idx]
        })
        .collect()
}

#[cfg(test)]
mod binarize_tests {
    use image::{GrayImage, Luma};
    use test_case::test_case;

    use super::BinaryGrid;
    use crate::common::error::DecodeError;
    use crate::reader::Binarizer;

    fn stripes(w: u32, h: u32, dark: u8, light: u8) -> GrayImage {
        GrayImage::from_fn(w, h, |x, _| if (x / 4) % 2 == 0 { Luma([dark]) } else { Luma([light]) })
    }

    #[test_case(20, 40)]
    #[test_case(40, 20)]
    #[test_case(0, 0)]
    fn test_too_small(w: u32, h: u32) {
        let img = GrayImage::new(w, h);
        assert_eq!(BinaryGrid::new(&img, Binarizer::Otsu, 8), Err(DecodeError::ImageTooSmall));
    }

    #[test_case(0)]
    #[test_case(255)]
    #[test_case(128)]
    fn test_flat_image(luma: u8) {
        let img = GrayImage::from_pixel(64, 64, Luma([luma]));
        for binarizer in [Binarizer::Otsu, Binarizer::Adaptive] {
            assert_eq!(BinaryGrid::new(&img, binarizer, 8), Err(DecodeError::DecodeFailure));
            assert_eq!(BinaryGrid::new(&img, binarizer, 0), Err(DecodeError::DecodeFailure));
        }
    }

    #[test]
    fn test_min_contrast() {
        let img = stripes(64, 64, 100, 105);
        assert_eq!(BinaryGrid::new(&img, Binarizer::Otsu, 8), Err(DecodeError::DecodeFailure));
        assert!(BinaryGrid::new(&img, Binarizer::Otsu, 5).is_ok());
    }

    #[test_case(Binarizer::Otsu)]
    #[test_case(Binarizer::Adaptive)]
    fn test_binary_stripes(binarizer: Binarizer) {
        let img = stripes(64, 40, 0, 255);
        let grid = BinaryGrid::new(&img, binarizer, 8).unwrap();
        assert_eq!((grid.width(), grid.height()), (64, 40));
        for y in 0..40 {
            for x in 0..64 {
                assert_eq!(grid.get(x, y), Some((x / 4) % 2 == 0), "({x}, {y})");
            }
        }
    }

    #[test]
    fn test_otsu_grey_levels() {
        let img = stripes(48, 48, 60, 190);
        let grid = BinaryGrid::new(&img, Binarizer::Otsu, 8).unwrap();
        assert_eq!(grid.get(0, 0), Some(true));
        assert_eq!(grid.get(4, 0), Some(false));
    }

    #[test]
    fn test_out_of_bounds() {
        let grid = BinaryGrid::new(&stripes(32, 32, 0, 255), Binarizer::Otsu, 8).unwrap();
        assert_eq!(grid.get(-1, 0), None);
        assert_eq!(grid.get(0, 32), None);
        assert!(!grid.is_dark(32, 0));
        assert!(grid.is_dark(0, 0));
    }
}
