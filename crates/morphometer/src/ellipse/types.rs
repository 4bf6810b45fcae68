//! Principal-axis ellipse parameters and geometry.

use serde::{Deserialize, Serialize};

// ── Configuration ──────────────────────────────────────────────────────────

/// Confidence levels for the two-pass ("clean") ellipse fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EllipseFitConfig {
    /// Chi-square quantile for the first pass (≈ 99 % region).
    pub initial_chi_square: f64,
    /// Chi-square quantile for the refit on the retained points (≈ 90 %).
    pub refit_chi_square: f64,
    /// Minimum number of foreground points for a fit.
    pub min_points: usize,
}

impl Default for EllipseFitConfig {
    fn default() -> Self {
        Self {
            initial_chi_square: 9.21,
            refit_chi_square: 4.6,
            min_points: 3,
        }
    }
}

// ── Types ──────────────────────────────────────────────────────────────────

/// Confidence-region ellipse of a point cloud.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EllipseFit {
    /// Center x (image column).
    pub center_x: f64,
    /// Center y (image row).
    pub center_y: f64,
    /// Full length of the major axis, in pixels.
    pub major_axis_length: f64,
    /// Full length of the minor axis, in pixels.
    pub minor_axis_length: f64,
    /// Angle of the minor axis from +x, in radians (−π/2, π/2].
    pub theta: f64,
}

impl EllipseFit {
    pub fn center(&self) -> [f64; 2] {
        [self.center_x, self.center_y]
    }

    /// Unit vector along the minor axis.
    pub fn minor_direction(&self) -> [f64; 2] {
        [self.theta.cos(), self.theta.sin()]
    }

    /// Unit vector along the major axis (minor direction rotated by +90°).
    pub fn major_direction(&self) -> [f64; 2] {
        [-self.theta.sin(), self.theta.cos()]
    }

    /// Both vertices of the major axis, `center ± (major/2)·u_major`.
    pub fn major_vertices(&self) -> [[f64; 2]; 2] {
        self.vertices(self.major_direction(), 0.5 * self.major_axis_length)
    }

    /// Both vertices of the minor axis, `center ± (minor/2)·u_minor`.
    pub fn minor_vertices(&self) -> [[f64; 2]; 2] {
        self.vertices(self.minor_direction(), 0.5 * self.minor_axis_length)
    }

    fn vertices(&self, u: [f64; 2], half: f64) -> [[f64; 2]; 2] {
        let [cx, cy] = self.center();
        [
            [cx + half * u[0], cy + half * u[1]],
            [cx - half * u[0], cy - half * u[1]],
        ]
    }

    /// Normalized elliptical radius of a point: `< 1` inside, `1` on the
    /// boundary, `> 1` outside.
    pub fn normalized_radius(&self, x: f64, y: f64) -> f64 {
        let dx = x - self.center_x;
        let dy = y - self.center_y;
        let [mx, my] = self.major_direction();
        let [nx, ny] = self.minor_direction();
        let along_major = (dx * mx + dy * my) / (0.5 * self.major_axis_length);
        let along_minor = (dx * nx + dy * ny) / (0.5 * self.minor_axis_length);
        (along_major * along_major + along_minor * along_minor).sqrt()
    }

    /// Whether a point lies inside or on the ellipse.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.normalized_radius(x, y) <= 1.0
    }

    /// Check basic validity: positive axes, finite values.
    pub fn is_valid(&self) -> bool {
        self.major_axis_length > 0.0
            && self.minor_axis_length > 0.0
            && self.major_axis_length.is_finite()
            && self.minor_axis_length.is_finite()
            && self.center_x.is_finite()
            && self.center_y.is_finite()
            && self.theta.is_finite()
    }

    /// Sample `n` points on the ellipse boundary.
    pub fn sample_points(&self, n: usize) -> Vec<[f64; 2]> {
        let [mx, my] = self.major_direction();
        let [nx, ny] = self.minor_direction();
        let a = 0.5 * self.major_axis_length;
        let b = 0.5 * self.minor_axis_length;
        (0..n)
            .map(|i| {
                let t = 2.0 * std::f64::consts::PI * (i as f64) / (n as f64);
                let (s, c) = t.sin_cos();
                [
                    self.center_x + a * c * mx + b * s * nx,
                    self.center_y + a * c * my + b * s * ny,
                ]
            })
            .collect()
    }
}

/// Fold an angle into (−π/2, π/2].
pub(crate) fn fold_half_turn(mut angle: f64) -> f64 {
    use std::f64::consts::{FRAC_PI_2, PI};
    while angle > FRAC_PI_2 {
        angle -= PI;
    }
    while angle <= -FRAC_PI_2 {
        angle += PI;
    }
    angle
}
