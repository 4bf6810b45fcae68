//! Pedestal measurements: contour height, chord-cut area, and the two
//! size-normalized scores.

mod area;
mod height;
mod snake;

pub use area::{pedestal_area, pedestal_area_pixels};
pub use height::{initial_contour, measure_height, PedestalHeight};
pub use snake::{active_contour, EnergyField, SnakeConfig};

use serde::{Deserialize, Serialize};

use crate::error::{MeasureError, Outcome};

/// Pedestal measurement parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PedestalConfig {
    /// Points on the initial semicircle and on the matched chord.
    pub contour_points: usize,
    /// Gaussian sigma applied to the photo before the contour runs.
    pub blur_sigma: f32,
    pub snake: SnakeConfig,
}

impl Default for PedestalConfig {
    fn default() -> Self {
        Self {
            contour_points: 400,
            blur_sigma: 1.0,
            snake: SnakeConfig::default(),
        }
    }
}

fn ratio(num: f64, den: f64, what: &'static str) -> Outcome<f64> {
    if !(den.is_finite() && den > 0.0) {
        return Err(MeasureError::DegenerateGeometry(what));
    }
    Ok(num / den)
}

/// Pedestal height relative to body length.
pub fn score_height(pedestal_height: f64, animal_length: f64) -> Outcome<f64> {
    ratio(pedestal_height, animal_length, "zero animal length")
}

/// Pedestal height relative to body area.
pub fn score_area(pedestal_height: f64, animal_area: f64) -> Outcome<f64> {
    ratio(pedestal_height, animal_area, "zero animal area")
}
