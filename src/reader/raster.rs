use image::{DynamicImage, GenericImageView, GrayImage, Pixel, RgbImage, RgbaImage};

/// Read only pixel access the reader needs from an image. Implemented for the
/// `image` crate buffers and for references to any implementor.
pub trait RasterImage {
    /// (width, height) in pixels
    fn size(&self) -> (u32, u32);

    /// Luminance of pixel (x, y), 0 black to 255 white. Callers keep (x, y)
    /// in bounds.
    fn luma(&self, x: u32, y: u32) -> u8;
}

impl RasterImage for GrayImage {
    fn size(&self) -> (u32, u32) {
        self.dimensions()
    }

    #[inline]
    fn luma(&self, x: u32, y: u32) -> u8 {
        self.get_pixel(x, y)[0]
    }
}

impl RasterImage for RgbImage {
    fn size(&self) -> (u32, u32) {
        self.dimensions()
    }

    #[inline]
    fn luma(&self, x: u32, y: u32) -> u8 {
        self.get_pixel(x, y).to_luma()[0]
    }
}

// Transparent pixels read as white paper
impl RasterImage for RgbaImage {
    fn size(&self) -> (u32, u32) {
        self.dimensions()
    }

    #[inline]
    fn luma(&self, x: u32, y: u32) -> u8 {
        over_white(self.get_pixel(x, y).to_luma_alpha().0)
    }
}

impl RasterImage for DynamicImage {
    fn size(&self) -> (u32, u32) {
        GenericImageView::dimensions(self)
    }

    fn luma(&self, x: u32, y: u32) -> u8 {
        match self {
            DynamicImage::ImageLuma8(img) => img.luma(x, y),
            DynamicImage::ImageRgb8(img) => img.luma(x, y),
            DynamicImage::ImageRgba8(img) => img.luma(x, y),
            _ => over_white(GenericImageView::get_pixel(self, x, y).to_luma_alpha().0),
        }
    }
}

impl<T: RasterImage + ?Sized> RasterImage for &T {
    fn size(&self) -> (u32, u32) {
        (**self).size()
    }

    #[inline]
    fn luma(&self, x: u32, y: u32) -> u8 {
        (**self).luma(x, y)
    }
}

fn over_white([l, a]: [u8; 2]) -> u8 {
    let (l, a) = (l as u32, a as u32);
    ((l * a + 255 * (255 - a)) / 255) as u8
}
