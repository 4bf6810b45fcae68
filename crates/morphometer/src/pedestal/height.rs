use image::{GrayImage, ImageBuffer, Luma};

use super::snake::{active_contour, EnergyField};
use super::PedestalConfig;
use crate::error::{MeasureError, Outcome};
use crate::geom::{distance, linspace, midpoint};
use crate::mask::{Channel, MaskError, SegmentationMask};

/// Settled pedestal contour and its height.
#[derive(Debug, Clone, PartialEq)]
pub struct PedestalHeight {
    /// Height in millimeters.
    pub height: f64,
    /// Height in pixels.
    pub height_px: f64,
    /// Settled contour from the dorsal point to the head.
    pub contour: Vec<[f64; 2]>,
}

/// Grey photo with background pixels forced to white, Gaussian-blurred.
pub(crate) fn energy_image(
    photo: &GrayImage,
    mask: &SegmentationMask,
    sigma: f32,
) -> Outcome<GrayImage> {
    if photo.dimensions() != mask.dimensions() {
        return Err(MaskError::DimensionMismatch {
            expected: photo.dimensions(),
            got: mask.dimensions(),
        }
        .into());
    }
    let (w, h) = photo.dimensions();
    let f = ImageBuffer::<Luma<f32>, Vec<f32>>::from_fn(w, h, |x, y| {
        if mask.channel_at(x, y) == Channel::Background {
            Luma([1.0])
        } else {
            Luma([f32::from(photo.get_pixel(x, y)[0]) / 255.0])
        }
    });
    let blurred = if sigma > 0.0 {
        imageproc::filter::gaussian_blur_f32(&f, sigma)
    } else {
        f
    };
    Ok(GrayImage::from_fn(w, h, |x, y| {
        let v = blurred.get_pixel(x, y)[0].clamp(0.0, 1.0);
        Luma([(v * 255.0).round() as u8])
    }))
}

/// Semicircle of `n` points from `dorsal_point` to `head` around their
/// midpoint, bulging away from `body_center`.
pub fn initial_contour(
    dorsal_point: [f64; 2],
    head: [f64; 2],
    body_center: [f64; 2],
    n: usize,
) -> Outcome<Vec<[f64; 2]>> {
    let mid = midpoint(dorsal_point, head);
    let r = 0.5 * distance(dorsal_point, head);
    if !(r > 1e-9) {
        return Err(MeasureError::DegenerateGeometry("head coincides with dorsal point"));
    }
    let phi0 = (dorsal_point[1] - mid[1]).atan2(dorsal_point[0] - mid[0]);
    let out = [mid[0] - body_center[0], mid[1] - body_center[1]];
    // Apex direction for a counter-clockwise sweep is phi0 + π/2.
    let ccw_apex = [(phi0 + std::f64::consts::FRAC_PI_2).cos(), (phi0 + std::f64::consts::FRAC_PI_2).sin()];
    let sign = if ccw_apex[0] * out[0] + ccw_apex[1] * out[1] >= 0.0 {
        1.0
    } else {
        -1.0
    };
    let n = n.max(2);
    Ok((0..n)
        .map(|i| {
            let t = phi0 + sign * std::f64::consts::PI * i as f64 / (n - 1) as f64;
            [mid[0] + r * t.cos(), mid[1] + r * t.sin()]
        })
        .collect())
}

/// Pedestal height: the largest distance between matched points of the
/// straight dorsal-point → head chord and the settled contour.
pub fn measure_height(
    photo: &GrayImage,
    mask: &SegmentationMask,
    dorsal_point: [f64; 2],
    head: [f64; 2],
    body_center: [f64; 2],
    pixels_per_mm: f64,
    config: &PedestalConfig,
) -> Outcome<PedestalHeight> {
    let init = initial_contour(dorsal_point, head, body_center, config.contour_points)?;
    let img = energy_image(photo, mask, config.blur_sigma)?;
    let field = EnergyField::from_image(&img, &config.snake);
    let contour = active_contour(&field, &init, &config.snake)?;

    let chord = linspace(dorsal_point, head, contour.len());
    let height_px = chord
        .iter()
        .zip(contour.iter())
        .map(|(&a, &b)| distance(a, b))
        .fold(0.0, f64::max);
    tracing::debug!(height_px, points = contour.len(), "pedestal contour settled");
    Ok(PedestalHeight {
        height: height_px / pixels_per_mm,
        height_px,
        contour,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{draw_specimen_mask, draw_specimen_photo};
    use approx::assert_relative_eq;

    #[test]
    fn semicircle_spans_landmarks_and_bulges_outward() {
        let dp = [100.0, 70.0];
        let head = [160.0, 102.0];
        let c = initial_contour(dp, head, [100.0, 100.0], 400).unwrap();
        assert_eq!(c.len(), 400);
        assert_relative_eq!(c[0][0], dp[0], epsilon = 1e-9);
        assert_relative_eq!(c[0][1], dp[1], epsilon = 1e-9);
        assert_relative_eq!(c[399][0], head[0], epsilon = 1e-9);
        assert_relative_eq!(c[399][1], head[1], epsilon = 1e-9);

        let mid = midpoint(dp, head);
        let apex = c[200];
        let body_to_mid = [mid[0] - 100.0, mid[1] - 100.0];
        let mid_to_apex = [apex[0] - mid[0], apex[1] - mid[1]];
        assert!(body_to_mid[0] * mid_to_apex[0] + body_to_mid[1] * mid_to_apex[1] > 0.0);
        for p in &c {
            assert_relative_eq!(distance(*p, mid), 34.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn mirrored_body_flips_semicircle() {
        let dp = [100.0, 70.0];
        let head = [160.0, 102.0];
        let a = initial_contour(dp, head, [100.0, 100.0], 101).unwrap();
        let b = initial_contour(dp, head, [160.0, 60.0], 101).unwrap();
        let mid = midpoint(dp, head);
        let side = |p: [f64; 2]| (head[0] - dp[0]) * (p[1] - dp[1]) - (head[1] - dp[1]) * (p[0] - dp[0]);
        assert!(side(a[50]) * side(b[50]) < 0.0);
        assert_relative_eq!(distance(a[50], mid), distance(b[50], mid), epsilon = 1e-9);
    }

    #[test]
    fn coincident_landmarks_are_degenerate() {
        assert!(matches!(
            initial_contour([5.0, 5.0], [5.0, 5.0], [0.0, 0.0], 400),
            Err(MeasureError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn background_is_forced_white() {
        let mask = draw_specimen_mask(0.0);
        let photo = GrayImage::from_pixel(200, 200, Luma([10]));
        let img = energy_image(&photo, &mask, 0.0).unwrap();
        assert_eq!(img.get_pixel(5, 5)[0], 255);
        assert_eq!(img.get_pixel(100, 100)[0], 10);
    }

    #[test]
    fn photo_must_match_mask() {
        let mask = draw_specimen_mask(0.0);
        let photo = GrayImage::new(50, 50);
        assert!(matches!(
            energy_image(&photo, &mask, 1.0),
            Err(MeasureError::MalformedMask(MaskError::DimensionMismatch { .. }))
        ));
    }

    #[test]
    fn height_is_positive_on_bumped_specimen() {
        let mask = draw_specimen_mask(10.0);
        let photo = draw_specimen_photo(&mask);
        let dp = [100.0, 70.0];
        let head = [160.0, 102.0];
        let res = measure_height(&photo, &mask, dp, head, [100.0, 100.0], 10.0, &PedestalConfig::default())
            .unwrap();
        assert_eq!(res.contour.len(), 400);
        assert!(res.height_px > 0.0);
        assert!(res.height_px < distance(dp, head), "{}", res.height_px);
        assert_relative_eq!(res.height, res.height_px / 10.0, epsilon = 1e-12);
    }
}
