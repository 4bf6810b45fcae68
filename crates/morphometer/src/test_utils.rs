//! Synthetic fixtures shared by the unit tests: specimen masks, matching
//! photographs, and micrometer rulers.

use image::{GrayImage, Luma};

use crate::mask::{Channel, SegmentationMask};

/// Body ellipse of the reference specimen: center (100, 100), semi-axes
/// 60 (x) by 30 (y).
pub(crate) const BODY_CENTER: [f64; 2] = [100.0, 100.0];
pub(crate) const BODY_SEMI_AXES: [f64; 2] = [60.0, 30.0];
/// Eye disc near the anterior (+x) end.
pub(crate) const EYE_CENTER: [f64; 2] = [140.0, 108.0];
pub(crate) const EYE_RADIUS: f64 = 6.0;
/// Center of the pedestal bump on the dorsal-anterior outline.
pub(crate) const PEDESTAL_CENTER: [f64; 2] = [138.0, 76.0];

fn in_body(x: f64, y: f64) -> bool {
    let dx = (x - BODY_CENTER[0]) / BODY_SEMI_AXES[0];
    let dy = (y - BODY_CENTER[1]) / BODY_SEMI_AXES[1];
    dx * dx + dy * dy <= 1.0
}

/// Render the 200×200 reference specimen mask.
///
/// `pedestal_radius` adds a disc of body pixels around [`PEDESTAL_CENTER`];
/// pass `0.0` for a plain ellipse.
pub(crate) fn draw_specimen_mask(pedestal_radius: f64) -> SegmentationMask {
    let (w, h) = (200u32, 200u32);
    let mut labels = Vec::with_capacity((w * h) as usize);
    for y in 0..h {
        for x in 0..w {
            let (fx, fy) = (x as f64, y as f64);
            let eye = (fx - EYE_CENTER[0]).hypot(fy - EYE_CENTER[1]) <= EYE_RADIUS;
            let bump = pedestal_radius > 0.0
                && (fx - PEDESTAL_CENTER[0]).hypot(fy - PEDESTAL_CENTER[1]) <= pedestal_radius;
            labels.push(if eye {
                Channel::Eye
            } else if in_body(fx, fy) || bump {
                Channel::Body
            } else {
                Channel::Background
            });
        }
    }
    match SegmentationMask::from_labels(w, h, labels) {
        Ok(mask) => mask,
        Err(e) => panic!("fixture mask: {}", e),
    }
}

/// Grey photograph matching a segmentation mask: bright background, mid-grey
/// body, dark eye.
pub(crate) fn draw_specimen_photo(mask: &SegmentationMask) -> GrayImage {
    let (w, h) = mask.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        Luma([match mask.channel_at(x, y) {
            Channel::Background => 230,
            Channel::Body | Channel::Antenna => 110,
            Channel::Eye => 25,
        }])
    })
}

/// Render a micrometer ruler.
///
/// Dark 3 px ticks repeat every `period` px along the ruler axis over a
/// 90 px tall band; a darker baseline 20 px tall runs through the middle
/// of the ticks. The whole pattern is rotated by `angle` radians around the
/// image center.
pub(crate) fn draw_ruler(w: u32, h: u32, period: f64, angle: f64) -> GrayImage {
    let (cx, cy) = (f64::from(w) / 2.0, f64::from(h) / 2.0);
    let (s, c) = angle.sin_cos();
    GrayImage::from_fn(w, h, |x, y| {
        let dx = f64::from(x) - cx;
        let dy = f64::from(y) - cy;
        let u = dx * c + dy * s;
        let v = -dx * s + dy * c;
        let pix = if v.abs() <= 45.0 && u.rem_euclid(period) < 3.0 {
            10
        } else if v.abs() <= 10.0 {
            60
        } else {
            220
        };
        Luma([pix])
    })
}
