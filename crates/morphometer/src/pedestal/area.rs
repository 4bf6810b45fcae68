use crate::error::{MeasureError, Outcome};
use crate::geom::segments_intersect;
use crate::mask::BinaryMask;

/// Foreground pixels cut off by the head–dorsal-point chord, as seen from
/// the body center.
///
/// A pixel counts when the segment from `center` to it crosses the chord.
pub fn pedestal_area_pixels(
    animal: &BinaryMask,
    center: [f64; 2],
    head: [f64; 2],
    dorsal_point: [f64; 2],
) -> Outcome<usize> {
    if head == dorsal_point {
        return Err(MeasureError::DegenerateGeometry("head coincides with dorsal point"));
    }
    let (w, h) = animal.dimensions();
    let mut count = 0usize;
    for y in 0..h {
        for x in 0..w {
            if animal.is_foreground(x, y)
                && segments_intersect(center, [x as f64, y as f64], head, dorsal_point)
            {
                count += 1;
            }
        }
    }
    Ok(count)
}

/// [`pedestal_area_pixels`] in mm².
pub fn pedestal_area(
    animal: &BinaryMask,
    center: [f64; 2],
    head: [f64; 2],
    dorsal_point: [f64; 2],
    pixels_per_mm: f64,
) -> Outcome<f64> {
    let px = pedestal_area_pixels(animal, center, head, dorsal_point)?;
    Ok(px as f64 / (pixels_per_mm * pixels_per_mm))
}
