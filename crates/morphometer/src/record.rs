//! Flat per-specimen output record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::calibration::CalibrationSource;

/// One row of measurement output.
///
/// Undefined values are `None` and serialize as JSON `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub specimen_id: String,
    /// Pass-through identity fields (barcode, treatment, ...).
    #[serde(flatten)]
    pub identity: BTreeMap<String, String>,

    pub pixels_per_mm: Option<f64>,
    pub calibration_source: Option<CalibrationSource>,

    pub total_animal_pixels: Option<usize>,
    pub animal_area: Option<f64>,
    pub animal_length: Option<f64>,

    pub animal_x_center: Option<f64>,
    pub animal_y_center: Option<f64>,
    pub animal_major: Option<f64>,
    pub animal_minor: Option<f64>,
    pub animal_theta: Option<f64>,

    pub eye_x_center: Option<f64>,
    pub eye_y_center: Option<f64>,
    pub eye_major: Option<f64>,
    pub eye_minor: Option<f64>,
    pub eye_theta: Option<f64>,

    pub anterior: Option<[f64; 2]>,
    pub posterior: Option<[f64; 2]>,
    pub dorsal: Option<[f64; 2]>,
    pub ventral: Option<[f64; 2]>,

    pub eye_dorsal: Option<[f64; 2]>,
    pub head: Option<[f64; 2]>,
    pub tail: Option<[f64; 2]>,
    pub dorsal_point: Option<[f64; 2]>,

    pub pedestal_size: Option<f64>,
    pub pedestal_height: Option<f64>,
    pub pedestal_score_height: Option<f64>,
    pub pedestal_score_area: Option<f64>,

    /// Field name → reason, for every undefined field.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub failures: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_fields_serialize_as_null() {
        let rec = MeasurementRecord {
            specimen_id: "A1".into(),
            animal_length: Some(2.5),
            ..Default::default()
        };
        let v: serde_json::Value = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["specimen_id"], "A1");
        assert_eq!(v["animal_length"], 2.5);
        assert!(v["animal_area"].is_null());
        assert!(v["pedestal_height"].is_null());
        assert!(v.get("failures").is_none());
    }

    #[test]
    fn identity_fields_are_flattened() {
        let mut rec = MeasurementRecord {
            specimen_id: "A1".into(),
            ..Default::default()
        };
        rec.identity.insert("barcode".into(), "123".into());
        rec.failures.insert("head".into(), "no boundary crossing along segment".into());
        let v: serde_json::Value = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["barcode"], "123");
        assert_eq!(v["failures"]["head"], "no boundary crossing along segment");
    }
}
