//! The read-only binary pixel grid consumed by the tracer.
//!
//! The engine never decodes, thresholds, or thins images -- it only reads
//! a binary occupancy grid of known dimensions, where a pixel is an edge
//! pixel iff its intensity is strictly positive. [`EdgeImage`] is that
//! contract; it is implemented for [`image::GrayImage`] so callers can
//! hand in the output of their own edge detection stage directly.

use image::GrayImage;

use crate::types::PixelPoint;

/// Read-only random access to a binary pixel grid.
///
/// Coordinates follow raster conventions: `x` in `0..cols()` from the
/// left, `y` in `0..rows()` from the top. [`intensity`](Self::intensity)
/// is only defined for in-bounds coordinates; use
/// [`is_edge`](Self::is_edge) for clamped queries -- out-of-bounds
/// positions are background, never an error.
pub trait EdgeImage {
    /// Number of pixel rows.
    fn rows(&self) -> i32;

    /// Number of pixel columns.
    fn cols(&self) -> i32;

    /// Intensity of the pixel at `(x, y)`. Must only be called with
    /// in-bounds coordinates.
    fn intensity(&self, x: i32, y: i32) -> u8;

    /// Returns `true` iff `(x, y)` is inside the image and an edge pixel
    /// (strictly positive intensity).
    fn is_edge(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.cols() && y < self.rows() && self.intensity(x, y) > 0
    }
}

impl EdgeImage for GrayImage {
    #[allow(clippy::cast_possible_wrap)]
    fn rows(&self) -> i32 {
        self.height() as i32
    }

    #[allow(clippy::cast_possible_wrap)]
    fn cols(&self) -> i32 {
        self.width() as i32
    }

    #[allow(clippy::cast_sign_loss)]
    fn intensity(&self, x: i32, y: i32) -> u8 {
        self.get_pixel(x as u32, y as u32)[0]
    }
}

/// Owned binary grid used to union an input image with traced edge pixels.
///
/// Cluster re-detection runs on the input image plus everything the table
/// currently holds (bridges included), which requires a mutable copy; the
/// caller's image type stays read-only.
#[derive(Debug, Clone)]
pub(crate) struct OverlayRaster {
    rows: i32,
    cols: i32,
    data: Vec<u8>,
}

impl OverlayRaster {
    pub(crate) fn from_image<I: EdgeImage + ?Sized>(img: &I) -> Self {
        let rows = img.rows().max(0);
        let cols = img.cols().max(0);
        #[allow(clippy::cast_sign_loss)]
        let mut data = vec![0_u8; (rows as usize) * (cols as usize)];
        for y in 0..rows {
            for x in 0..cols {
                if img.is_edge(x, y) {
                    #[allow(clippy::cast_sign_loss)]
                    let idx = (y * cols + x) as usize;
                    data[idx] = 255;
                }
            }
        }
        Self { rows, cols, data }
    }

    /// Mark a single pixel as an edge pixel. Out-of-bounds points are
    /// ignored.
    pub(crate) fn mark_edge(&mut self, p: PixelPoint) {
        if p.x >= 0 && p.y >= 0 && p.x < self.cols && p.y < self.rows {
            #[allow(clippy::cast_sign_loss)]
            let idx = (p.y * self.cols + p.x) as usize;
            self.data[idx] = 255;
        }
    }
}

impl EdgeImage for OverlayRaster {
    fn rows(&self) -> i32 {
        self.rows
    }

    fn cols(&self) -> i32 {
        self.cols
    }

    #[allow(clippy::cast_sign_loss)]
    fn intensity(&self, x: i32, y: i32) -> u8 {
        self.data[(y * self.cols + x) as usize]
    }
}

/// Build a [`GrayImage`] from ASCII art rows: `#` is an edge pixel,
/// anything else is background.
#[cfg(test)]
pub(crate) fn grid(rows: &[&str]) -> GrayImage {
    let height = u32::try_from(rows.len()).expect("row count fits u32");
    let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let width = u32::try_from(width).expect("row width fits u32");
    let mut img = GrayImage::new(width, height);
    for (y, row) in rows.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            if ch == '#' {
                #[allow(clippy::cast_possible_truncation)]
                img.put_pixel(x as u32, y as u32, image::Luma([255]));
            }
        }
    }
    img
}
