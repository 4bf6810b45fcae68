//! Principal-axis ellipse fitting for body and eye masks.
//!
//! Implements:
//! - Moment (mean + covariance) ellipse at a chi-square confidence level.
//! - Two-pass "clean" fit that discards outliers of the first pass.
//! - Axis vertices and point containment used by the direction resolver.

mod fit;
mod types;

pub use fit::{fit_ellipse, fit_ellipse_clean};
pub use types::{EllipseFit, EllipseFitConfig};

use crate::error::Outcome;
use crate::mask::BinaryMask;

/// Clean fit over every foreground pixel of `mask`.
pub fn fit_mask(mask: &BinaryMask, config: &EllipseFitConfig) -> Outcome<EllipseFit> {
    fit_ellipse_clean(&mask.foreground_points(), config)
}
