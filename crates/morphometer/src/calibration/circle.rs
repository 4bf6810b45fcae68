//! Gradient Hough circle search for the circular microscope aperture.

use image::{GrayImage, ImageBuffer, Luma};
use serde::{Deserialize, Serialize};

use super::lines::canny_thresholds;

/// Aperture circle search parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircleSearchConfig {
    /// Median filter radius applied before edge detection (2 → 5×5).
    pub median_radius: u32,
    /// Canny high threshold; the low threshold is half of it. Both are
    /// floored at 1.0.
    pub canny_high: f32,
    /// Minimum number of edge pixels at the winning radius for a center
    /// to be accepted.
    pub vote_threshold: u32,
    /// Accumulator peaks below this fraction of the strongest peak are
    /// ignored.
    pub min_vote_frac: f32,
    /// Gaussian sigma used to smooth the vote accumulator (px).
    pub accum_sigma: f32,
    /// Smallest aperture radius considered (px).
    pub min_radius: u32,
    /// Largest aperture radius considered (px); 0 uses half the larger
    /// image dimension.
    pub max_radius: u32,
    /// Minimum distance between two reported centers (px).
    pub min_center_distance: f64,
    /// At most this many circles are averaged.
    pub max_circles: usize,
    /// Crop half-size as a fraction of the averaged radius.
    pub crop_radius_factor: f64,
}

impl Default for CircleSearchConfig {
    fn default() -> Self {
        Self {
            median_radius: 2,
            canny_high: 50.0,
            vote_threshold: 50,
            min_vote_frac: 0.5,
            accum_sigma: 2.0,
            min_radius: 300,
            max_radius: 0,
            min_center_distance: 20.0,
            max_circles: 5,
            crop_radius_factor: 0.7,
        }
    }
}

/// Averaged aperture circle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApertureCircle {
    pub center_x: f64,
    pub center_y: f64,
    pub radius: f64,
}

#[inline]
fn bilinear_add_in_bounds(accum: &mut [f32], stride: usize, x: f32, y: f32, weight: f32) {
    let x0 = x as usize;
    let y0 = y as usize;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;
    let base = y0 * stride + x0;
    accum[base] += weight * (1.0 - fx) * (1.0 - fy);
    accum[base + 1] += weight * fx * (1.0 - fy);
    accum[base + stride] += weight * (1.0 - fx) * fy;
    accum[base + stride + 1] += weight * fx * fy;
}

/// Find the aperture circle, averaging every accepted detection.
pub fn find_aperture_circle(img: &GrayImage, config: &CircleSearchConfig) -> Option<ApertureCircle> {
    let (w, h) = img.dimensions();
    let r_max = if config.max_radius == 0 {
        w.max(h) / 2
    } else {
        config.max_radius
    };
    let r_min = config.min_radius.max(1);
    if w < 3 || h < 3 || r_min > r_max {
        return None;
    }

    let smoothed = imageproc::filter::median_filter(img, config.median_radius, config.median_radius);
    let (low, high) = canny_thresholds(0.5, config.canny_high);
    let edges = imageproc::edges::canny(&smoothed, low, high);
    let gx = imageproc::gradients::horizontal_sobel(&smoothed);
    let gy = imageproc::gradients::vertical_sobel(&smoothed);

    // Each edge pixel casts one unit vote per radius along both gradient
    // directions, split bilinearly over the four neighbouring cells.
    let stride = w as usize;
    let x_limit = (w - 1) as f32;
    let y_limit = (h - 1) as f32;
    let mut edge_px: Vec<[f64; 2]> = Vec::new();
    let mut accum = vec![0.0f32; w as usize * h as usize];
    for (x, y, p) in edges.enumerate_pixels() {
        if p[0] == 0 {
            continue;
        }
        let dx = f32::from(gx.get_pixel(x, y)[0]);
        let dy = f32::from(gy.get_pixel(x, y)[0]);
        let mag = dx.hypot(dy);
        if mag < 1e-6 {
            continue;
        }
        edge_px.push([x as f64, y as f64]);
        let (ux, uy) = (dx / mag, dy / mag);
        for sign in [-1.0f32, 1.0] {
            for r in r_min..=r_max {
                let cx = x as f32 + sign * ux * r as f32;
                let cy = y as f32 + sign * uy * r as f32;
                if cx < 0.0 || cy < 0.0 || cx >= x_limit || cy >= y_limit {
                    break;
                }
                bilinear_add_in_bounds(&mut accum, stride, cx, cy, 1.0);
            }
        }
    }

    let accum = ImageBuffer::<Luma<f32>, Vec<f32>>::from_raw(w, h, accum)?;
    let accum = if config.accum_sigma > 0.0 {
        imageproc::filter::gaussian_blur_f32(&accum, config.accum_sigma)
    } else {
        accum
    };
    let max_val = accum.pixels().map(|p| p[0]).fold(0.0f32, f32::max);
    if max_val <= 0.0 {
        return None;
    }
    let peak_threshold = config.min_vote_frac.clamp(0.0, 1.0) * max_val;

    // Local maxima of the smoothed accumulator, strongest first.
    let at = |x: u32, y: u32| accum.get_pixel(x, y)[0];
    let mut peaks: Vec<(f32, u32, u32)> = Vec::new();
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let v = at(x, y);
            if v <= 0.0 || v < peak_threshold {
                continue;
            }
            let is_max = (y - 1..=y + 1)
                .flat_map(|ny| (x - 1..=x + 1).map(move |nx| (nx, ny)))
                .all(|(nx, ny)| at(nx, ny) <= v);
            if is_max {
                peaks.push((v, x, y));
            }
        }
    }
    peaks.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut circles: Vec<ApertureCircle> = Vec::new();
    let min_d2 = config.min_center_distance * config.min_center_distance;
    for (_, x, y) in peaks {
        if circles.len() >= config.max_circles {
            break;
        }
        let (cx, cy) = (x as f64, y as f64);
        if circles
            .iter()
            .any(|c| (c.center_x - cx).powi(2) + (c.center_y - cy).powi(2) < min_d2)
        {
            continue;
        }
        // Radius with the most edge support at this center.
        let mut hist = vec![0u32; (r_max - r_min + 1) as usize];
        for &[ex, ey] in &edge_px {
            let d = (ex - cx).hypot(ey - cy).round();
            if d >= r_min as f64 && d <= r_max as f64 {
                hist[d as usize - r_min as usize] += 1;
            }
        }
        let Some((best, &support)) = hist.iter().enumerate().max_by_key(|(_, &c)| c) else {
            continue;
        };
        if support < config.vote_threshold {
            continue;
        }
        circles.push(ApertureCircle {
            center_x: cx,
            center_y: cy,
            radius: (r_min as usize + best) as f64,
        });
    }

    if circles.is_empty() {
        tracing::debug!(peak = max_val, "no aperture circle");
        return None;
    }
    let n = circles.len() as f64;
    let mean = circles.iter().fold([0.0; 3], |acc, c| {
        [acc[0] + c.center_x, acc[1] + c.center_y, acc[2] + c.radius]
    });
    tracing::debug!(
        circles = circles.len(),
        cx = mean[0] / n,
        cy = mean[1] / n,
        r = mean[2] / n,
        "aperture circle"
    );
    Some(ApertureCircle {
        center_x: mean[0] / n,
        center_y: mean[1] / n,
        radius: mean[2] / n,
    })
}
