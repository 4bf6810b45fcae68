//! morphometer: morphometric geometry engine for segmented Daphnia
//! microscope images.
//!
//! Given a specimen photograph, its per-pixel segmentation (background,
//! body, eye, antenna) and a scale reference, the engine derives:
//!
//! 1. **Calibration** – pixels-per-mm from a micrometer photograph
//!    (aperture crop → CLAHE → Canny/Hough line search → FFT tick period),
//!    or a manual override.
//! 2. **Ellipses** – principal-axis confidence ellipses of body and eye.
//! 3. **Directions** – anterior/posterior and dorsal/ventral body-axis
//!    vertices, resolved by eye proximity.
//! 4. **Landmarks** – eye-dorsal, tail, head and dorsal point, located by
//!    tracing rays to the mask outline.
//! 5. **Pedestal** – active-contour height, chord-cut area, and scores.
//!
//! # Public API
//! - [`Measurer`] and [`MeasureConfig`] as primary entry points
//! - [`SpecimenRecord`] for lazy, memoized per-field access
//! - [`MeasurementRecord`] as the flat serializable output
//!
//! Every derived quantity is an [`Outcome`]; failures are typed
//! ([`MeasureError`]) and local to the field that produced them.

mod api;
pub mod anatomy;
pub mod calibration;
mod config;
pub mod ellipse;
mod error;
mod geom;
mod mask;
pub mod pedestal;
mod record;
mod sampling;
mod specimen;
pub mod trace;

#[cfg(test)]
pub(crate) mod test_utils;

pub use anatomy::{AnteroPosterior, BodyAxis, DorsoVentral, LandmarkConfig};
pub use api::Measurer;
pub use calibration::{Calibration, CalibrationConfig, CalibrationSource};
pub use config::MeasureConfig;
pub use ellipse::{EllipseFit, EllipseFitConfig};
pub use error::{MeasureError, Outcome};
pub use geom::segments_intersect;
pub use mask::{BinaryMask, Channel, MaskError, SegmentationMask};
pub use pedestal::{PedestalConfig, PedestalHeight, SnakeConfig};
pub use record::MeasurementRecord;
pub use specimen::{SpecimenId, SpecimenInputs, SpecimenRecord};
pub use trace::TraceConfig;
