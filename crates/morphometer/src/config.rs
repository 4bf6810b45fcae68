//! Measurement configuration.
//!
//! Every tunable constant lives in one of the sections below. Missing JSON
//! fields fall back to their defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::anatomy::LandmarkConfig;
use crate::calibration::CalibrationConfig;
use crate::ellipse::EllipseFitConfig;
use crate::pedestal::PedestalConfig;
use crate::trace::TraceConfig;

/// Top-level measurement configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasureConfig {
    pub ellipse: EllipseFitConfig,
    pub trace: TraceConfig,
    pub landmarks: LandmarkConfig,
    pub calibration: CalibrationConfig,
    pub pedestal: PedestalConfig,
}

impl MeasureConfig {
    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
