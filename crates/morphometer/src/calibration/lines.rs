//! Escalating Canny + Hough search for the ruler's long edges.

use image::GrayImage;
use imageproc::hough::{detect_lines, LineDetectionOptions};
use serde::{Deserialize, Serialize};

use super::period::RulerLine;

/// Line search schedule.
///
/// The Canny threshold is lowered from `edge_threshold_start` in steps of
/// `edge_threshold_step`; for each edge map the Hough vote threshold (the
/// minimum line length) is lowered likewise. The first non-empty line set
/// wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LineSearchConfig {
    pub edge_threshold_start: f32,
    pub edge_threshold_step: f32,
    pub edge_threshold_min: f32,
    /// Canny low threshold as a fraction of the current edge threshold.
    /// Hysteresis with a near-zero low threshold follows every faint
    /// gradient, so the low threshold is floored at 1.0.
    pub edge_low_ratio: f32,
    pub min_line_length_start: u32,
    pub min_line_length_step: u32,
    pub min_line_length_min: u32,
    /// Give up once this fraction of pixels are edges.
    pub max_edge_density: f64,
    /// Hough non-maximum suppression radius in (r, θ) bins.
    pub suppression_radius: u32,
    /// At most this many lines are measured; later lines in Hough output
    /// order are dropped. Use `usize::MAX` to measure every line.
    pub max_lines: usize,
}

impl Default for LineSearchConfig {
    fn default() -> Self {
        Self {
            edge_threshold_start: 175.0,
            edge_threshold_step: 25.0,
            edge_threshold_min: 25.0,
            edge_low_ratio: 0.5,
            min_line_length_start: 200,
            min_line_length_step: 50,
            min_line_length_min: 50,
            max_edge_density: 0.5,
            suppression_radius: 8,
            max_lines: 64,
        }
    }
}

/// Canny `(low, high)` thresholds with the low one at `low_ratio · high`.
///
/// Both are floored at 1.0 and `low <= high`; imageproc's hysteresis walks
/// off the image when the low threshold is zero.
pub(crate) fn canny_thresholds(low_ratio: f32, high: f32) -> (f32, f32) {
    let high = high.max(1.0);
    let low = (low_ratio * high).clamp(1.0, high);
    (low, high)
}

fn edge_density(edges: &GrayImage) -> f64 {
    let total = edges.as_raw().len();
    if total == 0 {
        return 0.0;
    }
    let on = edges.as_raw().iter().filter(|&&v| v > 0).count();
    on as f64 / total as f64
}

/// Find straight lines in an equalized ruler image.
///
/// Returns an empty vector when no schedule step yields a line.
pub fn find_ruler_lines(img: &GrayImage, config: &LineSearchConfig) -> Vec<RulerLine> {
    let step_e = config.edge_threshold_step.max(1.0);
    let step_l = config.min_line_length_step.max(1);

    let mut edge_threshold = config.edge_threshold_start;
    while edge_threshold >= config.edge_threshold_min {
        let (low, high) = canny_thresholds(config.edge_low_ratio, edge_threshold);
        let edges = imageproc::edges::canny(img, low, high);
        let density = edge_density(&edges);
        if density > config.max_edge_density {
            tracing::debug!(edge_threshold, density, "edge map saturated, stopping line search");
            break;
        }

        let mut min_len = config.min_line_length_start;
        while min_len >= config.min_line_length_min {
            let found = detect_lines(
                &edges,
                LineDetectionOptions {
                    vote_threshold: min_len,
                    suppression_radius: config.suppression_radius,
                },
            );
            if !found.is_empty() {
                tracing::debug!(
                    edge_threshold,
                    min_len,
                    lines = found.len(),
                    "ruler lines found"
                );
                return found
                    .into_iter()
                    .take(config.max_lines)
                    .map(|l| RulerLine {
                        r: f64::from(l.r),
                        theta: f64::from(l.angle_in_degrees).to_radians(),
                    })
                    .collect();
            }
            if min_len < step_l {
                break;
            }
            min_len -= step_l;
        }
        edge_threshold -= step_e;
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::draw_ruler;

    #[test]
    fn finds_horizontal_ruler_edges() {
        let img = draw_ruler(800, 400, 10.0, 0.0);
        let lines = find_ruler_lines(&img, &LineSearchConfig::default());
        assert!(!lines.is_empty());
        assert!(lines.len() <= 64);
        let horizontal = lines
            .iter()
            .filter(|l| (l.theta.to_degrees() - 90.0).abs() <= 2.0)
            .count();
        assert!(horizontal > 0, "{:?}", lines);
    }

    #[test]
    fn blank_image_has_no_lines() {
        let img = GrayImage::from_pixel(300, 200, image::Luma([200]));
        assert!(find_ruler_lines(&img, &LineSearchConfig::default()).is_empty());
    }

    #[test]
    fn canny_thresholds_are_floored_and_ordered() {
        assert_eq!(canny_thresholds(0.5, 100.0), (50.0, 100.0));
        assert_eq!(canny_thresholds(0.0, 100.0), (1.0, 100.0));
        assert_eq!(canny_thresholds(0.5, 0.0), (1.0, 1.0));
        assert_eq!(canny_thresholds(2.0, 40.0), (40.0, 40.0));
    }

    #[test]
    fn zero_thresholds_do_not_panic() {
        let img = draw_ruler(800, 400, 10.0, 0.0);
        let cfg = LineSearchConfig {
            edge_low_ratio: 0.0,
            edge_threshold_min: 0.0,
            ..Default::default()
        };
        let lines = find_ruler_lines(&img, &cfg);
        assert!(lines.len() <= cfg.max_lines);
    }

    #[test]
    fn density_counts_nonzero_pixels() {
        let mut img = GrayImage::new(10, 10);
        for x in 0..10 {
            img.put_pixel(x, 3, image::Luma([255]));
        }
        assert!((edge_density(&img) - 0.1).abs() < 1e-12);
    }
}
