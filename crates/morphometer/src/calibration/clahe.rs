//! Contrast-limited adaptive histogram equalization.
//!
//! Per-tile histograms are clipped at `clip_limit · tile_area / 256`, the
//! clipped excess is spread uniformly over all bins, and each pixel is mapped
//! through a bilinear blend of the four nearest tile lookup tables.

use image::GrayImage;
use serde::{Deserialize, Serialize};

/// CLAHE parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaheConfig {
    /// Number of tiles along x.
    pub tiles_x: u32,
    /// Number of tiles along y.
    pub tiles_y: u32,
    /// Contrast limit relative to a uniform histogram.
    pub clip_limit: f64,
}

impl Default for ClaheConfig {
    fn default() -> Self {
        Self {
            tiles_x: 8,
            tiles_y: 8,
            clip_limit: 2.0,
        }
    }
}

/// Tile index range along one axis: `[start, end)` of tile `i` of `n`.
fn tile_span(len: u32, n: u32, i: u32) -> (u32, u32) {
    let start = (u64::from(len) * u64::from(i) / u64::from(n)) as u32;
    let end = (u64::from(len) * u64::from(i + 1) / u64::from(n)) as u32;
    (start, end)
}

fn tile_lut(img: &GrayImage, xs: (u32, u32), ys: (u32, u32), clip_limit: f64) -> [u8; 256] {
    let mut hist = [0u32; 256];
    for y in ys.0..ys.1 {
        for x in xs.0..xs.1 {
            hist[img.get_pixel(x, y)[0] as usize] += 1;
        }
    }
    let area = (xs.1 - xs.0) * (ys.1 - ys.0);
    let mut lut = [0u8; 256];
    if area == 0 {
        for (i, v) in lut.iter_mut().enumerate() {
            *v = i as u8;
        }
        return lut;
    }

    if clip_limit > 0.0 {
        let clip = ((clip_limit * f64::from(area) / 256.0) as u32).max(1);
        let mut excess = 0u32;
        for h in hist.iter_mut() {
            if *h > clip {
                excess += *h - clip;
                *h = clip;
            }
        }
        let batch = excess / 256;
        let residual = (excess % 256) as usize;
        for h in hist.iter_mut() {
            *h += batch;
        }
        if residual > 0 {
            let step = (256 / residual).max(1);
            for h in hist.iter_mut().step_by(step).take(residual) {
                *h += 1;
            }
        }
    }

    let scale = 255.0 / f64::from(area);
    let mut cdf = 0u32;
    for (v, &h) in lut.iter_mut().zip(hist.iter()) {
        cdf += h;
        *v = (f64::from(cdf) * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Apply CLAHE to a grayscale image.
pub fn clahe(img: &GrayImage, config: &ClaheConfig) -> GrayImage {
    let (w, h) = img.dimensions();
    let nx = config.tiles_x.clamp(1, w.max(1));
    let ny = config.tiles_y.clamp(1, h.max(1));
    if w == 0 || h == 0 {
        return img.clone();
    }

    let mut luts = Vec::with_capacity((nx * ny) as usize);
    for ty in 0..ny {
        for tx in 0..nx {
            luts.push(tile_lut(
                img,
                tile_span(w, nx, tx),
                tile_span(h, ny, ty),
                config.clip_limit,
            ));
        }
    }

    let tile_w = f64::from(w) / f64::from(nx);
    let tile_h = f64::from(h) / f64::from(ny);
    let locate = |p: u32, size: f64, n: u32| -> (usize, usize, f64) {
        let t = (f64::from(p) + 0.5) / size - 0.5;
        let t0 = t.floor();
        let frac = t - t0;
        let lo = t0.clamp(0.0, f64::from(n - 1)) as usize;
        let hi = (t0 + 1.0).clamp(0.0, f64::from(n - 1)) as usize;
        (lo, hi, frac)
    };

    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        let (ty0, ty1, fy) = locate(y, tile_h, ny);
        for x in 0..w {
            let (tx0, tx1, fx) = locate(x, tile_w, nx);
            let v = img.get_pixel(x, y)[0] as usize;
            let lut = |tx: usize, ty: usize| f64::from(luts[ty * nx as usize + tx][v]);
            let top = lut(tx0, ty0) * (1.0 - fx) + lut(tx1, ty0) * fx;
            let bot = lut(tx0, ty1) * (1.0 - fx) + lut(tx1, ty1) * fx;
            let mapped = top * (1.0 - fy) + bot * fy;
            out.put_pixel(x, y, image::Luma([mapped.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn preserves_dimensions_and_ordering_of_far_pixels() {
        let img = GrayImage::from_fn(64, 48, |x, _| Luma([(x * 2) as u8 + 60]));
        let out = clahe(&img, &ClaheConfig::default());
        assert_eq!(out.dimensions(), img.dimensions());
        assert!(out.get_pixel(4, 10)[0] < out.get_pixel(60, 10)[0]);
    }

    #[test]
    fn stretches_low_contrast_pattern() {
        let img = GrayImage::from_fn(128, 128, |x, _| Luma([if x % 8 < 4 { 100 } else { 104 }]));
        let out = clahe(&img, &ClaheConfig::default());
        let a = out.get_pixel(64, 64)[0] as i32;
        let b = out.get_pixel(68, 64)[0] as i32;
        assert!(b - a > 4, "contrast not stretched: {} vs {}", a, b);
    }

    #[test]
    fn clip_limit_bounds_flat_regions() {
        // A flat tile would map everything to 255 without clipping.
        let img = GrayImage::from_pixel(64, 64, Luma([30]));
        let out = clahe(&img, &ClaheConfig::default());
        assert!(out.get_pixel(32, 32)[0] < 255);
    }
}
