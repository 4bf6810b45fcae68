//! High-level measurement API.
//!
//! [`Measurer`] is the primary entry point. It wraps a [`MeasureConfig`] and
//! turns specimen inputs into [`SpecimenRecord`]s or flat
//! [`MeasurementRecord`]s.

use image::GrayImage;
use std::path::Path;

use crate::calibration::{calibrate_micrometer, Calibration};
use crate::config::MeasureConfig;
use crate::error::Outcome;
use crate::record::MeasurementRecord;
use crate::specimen::{SpecimenId, SpecimenInputs, SpecimenRecord};

/// Primary measurement interface.
///
/// Create once, measure many specimens. Specimens are independent, so a
/// caller may share one `Measurer` across worker threads.
///
/// # Examples
///
/// ```no_run
/// use morphometer::{Measurer, SegmentationMask, SpecimenId, SpecimenInputs};
///
/// let labels = image::open("mask.png").unwrap().to_luma8();
/// let inputs = SpecimenInputs::new(SegmentationMask::from_label_image(&labels))
///     .with_pixels_per_mm(120.0);
/// let record = Measurer::new().measure(SpecimenId::new("A1"), inputs);
/// println!("{:?}", record.animal_length);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Measurer {
    config: MeasureConfig,
}

impl Measurer {
    /// Create a measurer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with full config control.
    pub fn with_config(config: MeasureConfig) -> Self {
        Self { config }
    }

    /// Load configuration JSON and create a measurer in one step.
    pub fn from_config_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self::with_config(MeasureConfig::from_json_file(path)?))
    }

    /// Access the current configuration.
    pub fn config(&self) -> &MeasureConfig {
        &self.config
    }

    /// Mutable access to configuration for post-construction tuning.
    pub fn config_mut(&mut self) -> &mut MeasureConfig {
        &mut self.config
    }

    /// Wrap inputs in a lazily evaluated record.
    pub fn specimen(&self, id: SpecimenId, inputs: SpecimenInputs) -> SpecimenRecord {
        SpecimenRecord::new(id, inputs, self.config.clone())
    }

    /// Evaluate every field of one specimen.
    pub fn measure(&self, id: SpecimenId, inputs: SpecimenInputs) -> MeasurementRecord {
        let mut rec = self.specimen(id, inputs);
        let out = rec.to_record();
        tracing::info!(
            specimen = %out.specimen_id,
            undefined = out.failures.len(),
            "specimen measured"
        );
        out
    }

    /// Calibrate from a micrometer photograph alone.
    pub fn calibrate(&self, micrometer: &GrayImage) -> Outcome<Calibration> {
        calibrate_micrometer(micrometer, &self.config.calibration)
    }
}
