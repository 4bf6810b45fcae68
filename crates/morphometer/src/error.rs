//! Typed measurement outcomes.
//!
//! Every derived quantity is an [`Outcome`]: a value or the reason it is
//! undefined. Failures stay local to the field that produced them.

use crate::anatomy::BodyAxis;
use crate::mask::MaskError;

/// Result of a single derivation step.
pub type Outcome<T> = Result<T, MeasureError>;

/// Reasons a derived measurement is undefined.
#[derive(Debug, Clone, PartialEq)]
pub enum MeasureError {
    /// An optional input needed for this field was not supplied.
    MissingInput(&'static str),
    /// The segmentation mask failed validation at load time.
    MalformedMask(MaskError),
    /// No calibration source is available (no override, no micrometer).
    MissingCalibration,
    /// A calibration value that is not finite and positive.
    InvalidCalibration(f64),
    /// The line search never produced a candidate ruler line.
    RulerNotDetected,
    /// Ruler lines were found but none carried a plausible tick period.
    NoPeriodicSignal,
    /// Too few foreground points for a fit.
    TooFewPoints {
        /// Required minimum number of points.
        needed: usize,
        /// Provided number of points.
        got: usize,
    },
    /// Covariance of the point cloud is singular or non-finite.
    DegeneratePointCloud,
    /// The traced segment never leaves the foreground.
    NoBoundaryCrossing,
    /// The traced segment is too short to sample.
    DegenerateSegment,
    /// Eye center is equidistant from both vertices of a body axis.
    DirectionTie {
        /// Axis whose vertices could not be told apart.
        axis: BodyAxis,
    },
    /// A prerequisite field is undefined.
    Prerequisite {
        /// Name of the prerequisite field.
        field: &'static str,
        /// Why the prerequisite is undefined.
        source: Box<MeasureError>,
    },
    /// Geometry collapsed (coincident landmarks, zero-length operand).
    DegenerateGeometry(&'static str),
    /// The active contour produced non-finite coordinates.
    ContourDiverged,
}

impl MeasureError {
    /// Wrap `source` as the failure of prerequisite `field`.
    pub fn prerequisite(field: &'static str, source: MeasureError) -> Self {
        Self::Prerequisite {
            field,
            source: Box::new(source),
        }
    }

    /// Innermost cause, following prerequisite links.
    pub fn root_cause(&self) -> &MeasureError {
        match self {
            Self::Prerequisite { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl std::fmt::Display for MeasureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingInput(what) => write!(f, "missing input: {}", what),
            Self::MalformedMask(e) => write!(f, "malformed segmentation mask: {}", e),
            Self::MissingCalibration => write!(f, "no calibration available"),
            Self::InvalidCalibration(v) => {
                write!(f, "invalid calibration: pixels_per_mm = {}", v)
            }
            Self::RulerNotDetected => write!(f, "ruler not detected"),
            Self::NoPeriodicSignal => write!(f, "no plausible tick period on any ruler line"),
            Self::TooFewPoints { needed, got } => {
                write!(f, "too few points: need {}, got {}", needed, got)
            }
            Self::DegeneratePointCloud => write!(f, "degenerate point cloud"),
            Self::NoBoundaryCrossing => write!(f, "no boundary crossing along segment"),
            Self::DegenerateSegment => write!(f, "segment too short to sample"),
            Self::DirectionTie { axis } => {
                write!(f, "eye equidistant from both {} axis vertices", axis)
            }
            Self::Prerequisite { field, source } => {
                write!(f, "{} undefined: {}", field, source)
            }
            Self::DegenerateGeometry(what) => write!(f, "degenerate geometry: {}", what),
            Self::ContourDiverged => write!(f, "active contour diverged"),
        }
    }
}

impl std::error::Error for MeasureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::MalformedMask(e) => Some(e),
            Self::Prerequisite { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<MaskError> for MeasureError {
    fn from(e: MaskError) -> Self {
        Self::MalformedMask(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_cause_unwraps_prerequisite_chain() {
        let err = MeasureError::prerequisite(
            "head",
            MeasureError::prerequisite("tail", MeasureError::NoBoundaryCrossing),
        );
        assert_eq!(err.root_cause(), &MeasureError::NoBoundaryCrossing);
        assert_eq!(
            err.to_string(),
            "head undefined: tail undefined: no boundary crossing along segment"
        );
    }

    #[test]
    fn error_source_follows_chain() {
        use std::error::Error;
        let err = MeasureError::prerequisite("calibration", MeasureError::RulerNotDetected);
        let src = err.source().expect("prerequisite has a source");
        assert_eq!(src.to_string(), "ruler not detected");
    }
}
