//! Anatomical directions and boundary landmarks.
//!
//! Directions come from the body ellipse and the eye center: the major-axis
//! vertex nearer the eye is anterior, the minor-axis vertex nearer the eye is
//! ventral. Landmarks (eye-dorsal, tail, head, dorsal point) are then found by
//! tracing rays through the masks with [`find_boundary_crossing`].

use serde::{Deserialize, Serialize};

use crate::ellipse::EllipseFit;
use crate::error::{MeasureError, Outcome};
use crate::geom::{distance, extrapolate, midpoint};
use crate::mask::BinaryMask;
use crate::trace::{find_boundary_crossing, TraceConfig};

/// Distance difference (px) below which two vertices count as equidistant.
const TIE_EPS: f64 = 1e-9;

/// Landmark ray parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LandmarkConfig {
    /// How far past the reference point each landmark ray is extended,
    /// as a multiple of the reference offset.
    pub extrapolation: f64,
}

impl Default for LandmarkConfig {
    fn default() -> Self {
        Self { extrapolation: 1.5 }
    }
}

/// Body ellipse axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyAxis {
    Major,
    Minor,
}

impl std::fmt::Display for BodyAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Major => write!(f, "major"),
            Self::Minor => write!(f, "minor"),
        }
    }
}

/// Major-axis vertices labelled by proximity to the eye.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnteroPosterior {
    pub anterior: [f64; 2],
    pub posterior: [f64; 2],
}

/// Minor-axis vertices labelled by proximity to the eye.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DorsoVentral {
    pub dorsal: [f64; 2],
    pub ventral: [f64; 2],
}

/// Split a vertex pair into `(nearer, farther)` relative to `eye`.
fn order_by_eye(
    [v1, v2]: [[f64; 2]; 2],
    eye: [f64; 2],
    axis: BodyAxis,
) -> Outcome<([f64; 2], [f64; 2])> {
    let d1 = distance(eye, v1);
    let d2 = distance(eye, v2);
    if !(d1.is_finite() && d2.is_finite()) {
        return Err(MeasureError::DegenerateGeometry("non-finite axis vertex"));
    }
    if (d1 - d2).abs() <= TIE_EPS {
        return Err(MeasureError::DirectionTie { axis });
    }
    Ok(if d1 < d2 { (v1, v2) } else { (v2, v1) })
}

/// Anterior is the major-axis vertex nearer the eye center.
pub fn resolve_antero_posterior(body: &EllipseFit, eye_center: [f64; 2]) -> Outcome<AnteroPosterior> {
    let (anterior, posterior) = order_by_eye(body.major_vertices(), eye_center, BodyAxis::Major)?;
    Ok(AnteroPosterior {
        anterior,
        posterior,
    })
}

/// Ventral is the minor-axis vertex nearer the eye center.
pub fn resolve_dorso_ventral(body: &EllipseFit, eye_center: [f64; 2]) -> Outcome<DorsoVentral> {
    let (ventral, dorsal) = order_by_eye(body.minor_vertices(), eye_center, BodyAxis::Minor)?;
    Ok(DorsoVentral { dorsal, ventral })
}

// ── Landmarks ──────────────────────────────────────────────────────────────

/// Where the dorsal axis, translated onto the eye center, leaves the eye.
pub fn find_eye_dorsal(
    eye_mask: &BinaryMask,
    eye: &EllipseFit,
    body: &EllipseFit,
    dorsal: [f64; 2],
    trace: &TraceConfig,
) -> Outcome<[f64; 2]> {
    let start = eye.center();
    let end = [
        start[0] + dorsal[0] - body.center_x,
        start[1] + dorsal[1] - body.center_y,
    ];
    find_boundary_crossing(eye_mask, start, end, trace)
}

/// Posterior body outline along the major axis, traced outward from the
/// body center.
pub fn find_tail(
    animal_mask: &BinaryMask,
    body: &EllipseFit,
    posterior: [f64; 2],
    config: &LandmarkConfig,
    trace: &TraceConfig,
) -> Outcome<[f64; 2]> {
    let start = body.center();
    let end = extrapolate(start, posterior, config.extrapolation);
    find_boundary_crossing(animal_mask, start, end, trace)
}

/// Anterior body outline beyond the eye-dorsal point, away from the tail.
pub fn find_head(
    animal_mask: &BinaryMask,
    eye_dorsal: [f64; 2],
    tail: [f64; 2],
    config: &LandmarkConfig,
    trace: &TraceConfig,
) -> Outcome<[f64; 2]> {
    let end = extrapolate(tail, eye_dorsal, config.extrapolation);
    find_boundary_crossing(animal_mask, eye_dorsal, end, trace)
}

/// Dorsal body outline, traced from the head–tail midpoint toward the
/// dorsal vertex.
pub fn find_dorsal_point(
    animal_mask: &BinaryMask,
    head: [f64; 2],
    tail: [f64; 2],
    dorsal: [f64; 2],
    config: &LandmarkConfig,
    trace: &TraceConfig,
) -> Outcome<[f64; 2]> {
    let start = midpoint(head, tail);
    let end = extrapolate(start, dorsal, config.extrapolation);
    find_boundary_crossing(animal_mask, start, end, trace)
}
