//! Moment-based ellipse fit over a foreground point cloud.

use nalgebra::{Matrix2, SymmetricEigen};

use super::types::{fold_half_turn, EllipseFit, EllipseFitConfig};
use crate::error::{MeasureError, Outcome};

/// Fit a confidence-region ellipse to `points`.
///
/// The center is the point mean. The covariance (population normalization)
/// is eigen-decomposed; each full axis length is
/// `2·sqrt(chi_square · eigenvalue)` and `theta` is the angle of the
/// minor eigenvector.
pub fn fit_ellipse(points: &[[f64; 2]], chi_square: f64) -> Outcome<EllipseFit> {
    let n = points.len();
    if n < 3 {
        return Err(MeasureError::TooFewPoints { needed: 3, got: n });
    }
    let inv_n = 1.0 / n as f64;
    let mean_x = points.iter().map(|p| p[0]).sum::<f64>() * inv_n;
    let mean_y = points.iter().map(|p| p[1]).sum::<f64>() * inv_n;

    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for &[x, y] in points {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    let cov = Matrix2::new(sxx * inv_n, sxy * inv_n, sxy * inv_n, syy * inv_n);
    if !cov.iter().all(|v| v.is_finite()) {
        return Err(MeasureError::DegeneratePointCloud);
    }

    let eig = SymmetricEigen::new(cov);
    let (i_major, i_minor) = if eig.eigenvalues[0] >= eig.eigenvalues[1] {
        (0, 1)
    } else {
        (1, 0)
    };
    let lambda_major = eig.eigenvalues[i_major];
    let lambda_minor = eig.eigenvalues[i_minor];
    if !(lambda_minor > 1e-12) || !lambda_major.is_finite() {
        return Err(MeasureError::DegeneratePointCloud);
    }

    let v_minor = eig.eigenvectors.column(i_minor);
    let theta = fold_half_turn(v_minor[1].atan2(v_minor[0]));

    let fit = EllipseFit {
        center_x: mean_x,
        center_y: mean_y,
        major_axis_length: 2.0 * (chi_square * lambda_major).sqrt(),
        minor_axis_length: 2.0 * (chi_square * lambda_minor).sqrt(),
        theta,
    };
    if !fit.is_valid() {
        return Err(MeasureError::DegeneratePointCloud);
    }
    Ok(fit)
}

/// Two-pass fit: fit at the initial quantile, drop points outside that
/// ellipse, refit the survivors at the refit quantile.
///
/// Removes small pockets of misclassified pixels that would otherwise bias
/// the covariance.
pub fn fit_ellipse_clean(points: &[[f64; 2]], config: &EllipseFitConfig) -> Outcome<EllipseFit> {
    if points.len() < config.min_points.max(3) {
        return Err(MeasureError::TooFewPoints {
            needed: config.min_points.max(3),
            got: points.len(),
        });
    }
    let first = fit_ellipse(points, config.initial_chi_square)?;
    let kept: Vec<[f64; 2]> = points
        .iter()
        .copied()
        .filter(|&[x, y]| first.contains(x, y))
        .collect();
    tracing::trace!(
        total = points.len(),
        kept = kept.len(),
        "clean ellipse fit: retained points"
    );
    fit_ellipse(&kept, config.refit_chi_square)
}
