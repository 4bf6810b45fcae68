//! Sub-pixel sampling primitives shared by the boundary tracer and the
//! ruler period estimator.

use image::GrayImage;

use crate::geom::linspace;
use crate::mask::BinaryMask;

/// A scalar raster that can be read at integer pixels with clamp-to-edge
/// semantics.
pub trait ClampedRaster {
    fn raster_dimensions(&self) -> (u32, u32);

    /// Value at `(x, y)` after clamping both coordinates into the raster.
    fn value_clamped(&self, x: i64, y: i64) -> f64;
}

impl ClampedRaster for BinaryMask {
    fn raster_dimensions(&self) -> (u32, u32) {
        self.dimensions()
    }

    #[inline]
    fn value_clamped(&self, x: i64, y: i64) -> f64 {
        BinaryMask::value_clamped(self, x, y)
    }
}

impl ClampedRaster for GrayImage {
    fn raster_dimensions(&self) -> (u32, u32) {
        self.dimensions()
    }

    #[inline]
    fn value_clamped(&self, x: i64, y: i64) -> f64 {
        let (w, h) = self.dimensions();
        let x = x.clamp(0, w as i64 - 1) as usize;
        let y = y.clamp(0, h as i64 - 1) as usize;
        f64::from(self.as_raw()[y * w as usize + x])
    }
}

/// Sample a raster at sub-pixel position using bilinear interpolation.
///
/// Positions outside the raster read the nearest border pixel.
#[inline]
pub fn bilinear_clamped<R: ClampedRaster + ?Sized>(raster: &R, x: f64, y: f64) -> f64 {
    let (w, h) = raster.raster_dimensions();
    if w == 0 || h == 0 || !x.is_finite() || !y.is_finite() {
        return 0.0;
    }
    let x = x.clamp(0.0, (w - 1) as f64);
    let y = y.clamp(0.0, (h - 1) as f64);
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let p00 = raster.value_clamped(x0, y0);
    let p10 = raster.value_clamped(x0 + 1, y0);
    let p01 = raster.value_clamped(x0, y0 + 1);
    let p11 = raster.value_clamped(x0 + 1, y0 + 1);

    let top = p00 + fx * (p10 - p00);
    let bot = p01 + fx * (p11 - p01);
    top + fy * (bot - top)
}

/// Sample `n` evenly spaced points along segment `a → b`.
///
/// Returns `(positions, values)` with matching indices.
pub fn sample_segment<R: ClampedRaster + ?Sized>(
    raster: &R,
    a: [f64; 2],
    b: [f64; 2],
    n: usize,
) -> (Vec<[f64; 2]>, Vec<f64>) {
    let positions = linspace(a, b, n);
    let values = positions
        .iter()
        .map(|&[x, y]| bilinear_clamped(raster, x, y))
        .collect();
    (positions, values)
}

/// Mean over every full window of width `w`.
///
/// Element `j` is `mean(values[j..j + w])`; the output has
/// `values.len() − w + 1` elements, or none when the input is shorter than
/// the window.
pub fn rolling_mean(values: &[f64], w: usize) -> Vec<f64> {
    if w == 0 || values.len() < w {
        return Vec::new();
    }
    let inv = 1.0 / w as f64;
    let mut sum: f64 = values[..w].iter().sum();
    let mut out = Vec::with_capacity(values.len() - w + 1);
    out.push(sum * inv);
    for j in w..values.len() {
        sum += values[j] - values[j - w];
        out.push(sum * inv);
    }
    out
}
