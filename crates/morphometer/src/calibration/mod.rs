//! Pixels-per-millimeter calibration from a micrometer photograph.
//!
//! Pipeline: crop dark aperture corners, equalize with CLAHE, find the
//! ruler's long edges by an escalating Canny + Hough search, then measure
//! the tick period along each line with an FFT. The per-line measurements
//! are averaged.

mod circle;
mod clahe;
mod crop;
mod lines;
mod period;

pub use circle::{find_aperture_circle, ApertureCircle, CircleSearchConfig};
pub use clahe::{clahe, ClaheConfig};
pub use crop::{crop_aperture, Corner, CropConfig};
pub use lines::{find_ruler_lines, LineSearchConfig};
pub use period::{dominant_period, measure_line, PeriodConfig, RulerLine};

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::error::{MeasureError, Outcome};

/// Calibration pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub crop: CropConfig,
    pub clahe: ClaheConfig,
    pub lines: LineSearchConfig,
    pub period: PeriodConfig,
}

/// Where a calibration value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationSource {
    /// Caller-supplied pixels-per-mm.
    Manual,
    /// Measured from a micrometer image.
    Micrometer,
}

/// Resolved image scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub pixels_per_mm: f64,
    pub source: CalibrationSource,
    /// Number of ruler lines contributing to the mean (0 for manual values).
    pub lines_used: usize,
}

impl Calibration {
    /// A caller-supplied scale; must be finite and positive.
    pub fn manual(pixels_per_mm: f64) -> Outcome<Self> {
        if !pixels_per_mm.is_finite() || pixels_per_mm <= 0.0 {
            return Err(MeasureError::InvalidCalibration(pixels_per_mm));
        }
        Ok(Self {
            pixels_per_mm,
            source: CalibrationSource::Manual,
            lines_used: 0,
        })
    }

    /// Pick the calibration source: a manual override wins over the
    /// micrometer image.
    pub fn resolve(
        manual: Option<f64>,
        micrometer: Option<&GrayImage>,
        config: &CalibrationConfig,
    ) -> Outcome<Self> {
        match (manual, micrometer) {
            (Some(v), _) => Self::manual(v),
            (None, Some(img)) => calibrate_micrometer(img, config),
            (None, None) => Err(MeasureError::MissingCalibration),
        }
    }
}

/// Measure pixels-per-mm from a micrometer photograph.
pub fn calibrate_micrometer(img: &GrayImage, config: &CalibrationConfig) -> Outcome<Calibration> {
    let cropped = crop_aperture(img, &config.crop);
    if cropped.width() == 0 || cropped.height() == 0 {
        return Err(MeasureError::RulerNotDetected);
    }
    let equalized = clahe(&cropped, &config.clahe);

    let lines = find_ruler_lines(&equalized, &config.lines);
    if lines.is_empty() {
        return Err(MeasureError::RulerNotDetected);
    }

    let measurements: Vec<f64> = lines
        .iter()
        .filter_map(|line| measure_line(&equalized, line, &config.period))
        .collect();
    if measurements.is_empty() {
        tracing::debug!(lines = lines.len(), "no line carried a plausible period");
        return Err(MeasureError::NoPeriodicSignal);
    }

    let pixels_per_mm = measurements.iter().sum::<f64>() / measurements.len() as f64;
    if !pixels_per_mm.is_finite() || pixels_per_mm <= 0.0 {
        return Err(MeasureError::InvalidCalibration(pixels_per_mm));
    }
    tracing::info!(
        pixels_per_mm,
        lines = lines.len(),
        used = measurements.len(),
        width = cropped.width(),
        height = cropped.height(),
        "micrometer calibration"
    );
    Ok(Calibration {
        pixels_per_mm,
        source: CalibrationSource::Micrometer,
        lines_used: measurements.len(),
    })
}
