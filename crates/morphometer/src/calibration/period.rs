//! Tick period along one ruler line.

use image::GrayImage;
use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};

use crate::sampling::{rolling_mean, sample_segment};

/// Per-line period estimation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PeriodConfig {
    /// Start of the sampled span as a fraction of the image width.
    pub span_start: f64,
    /// End of the sampled span as a fraction of the image width.
    pub span_end: f64,
    /// Rolling-mean window subtracted to remove illumination drift.
    pub detrend_window: usize,
    /// Rolling-mean window applied to the detrended profile.
    pub smooth_window: usize,
    /// Physical ruler ticks per millimeter.
    pub ticks_per_mm: f64,
    /// Periods above this (in samples) are treated as noise.
    pub max_period: f64,
    /// Minimum RMS of the smoothed profile (grey levels); flatter profiles
    /// carry no ticks and yield no period instead of the strongest noise
    /// bin. Set to 0.0 to disable the gate.
    pub min_amplitude: f64,
}

impl Default for PeriodConfig {
    fn default() -> Self {
        Self {
            span_start: 0.33,
            span_end: 0.67,
            detrend_window: 4,
            smooth_window: 4,
            ticks_per_mm: 40.0,
            max_period: 50.0,
            min_amplitude: 2.0,
        }
    }
}

/// A detected straight line `x·cos θ + y·sin θ = r`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RulerLine {
    /// Signed distance from the image origin (px).
    pub r: f64,
    /// Normal angle in radians.
    pub theta: f64,
}

impl RulerLine {
    /// Slope/intercept form `y = m·x + b`; `None` for vertical lines.
    pub fn slope_intercept(&self) -> Option<(f64, f64)> {
        let (s, c) = self.theta.sin_cos();
        if s.abs() < 1e-9 {
            return None;
        }
        Some((-c / s, self.r / s))
    }
}

/// Intensity profile along the central horizontal span of `line`.
pub(crate) fn line_profile(img: &GrayImage, line: &RulerLine, config: &PeriodConfig) -> Option<Vec<f64>> {
    let (m, b) = line.slope_intercept()?;
    let w = f64::from(img.width());
    let x1 = (config.span_start * w).floor();
    let x2 = (config.span_end * w).floor();
    let y1 = (m * x1 + b).floor();
    let y2 = (m * x2 + b).floor();
    if !(y1.is_finite() && y2.is_finite()) {
        return None;
    }
    let n = (x2 - x1).abs().max((y2 - y1).abs()) as usize;
    if n < 2 {
        return None;
    }
    let (_, values) = sample_segment(img, [x1, y1], [x2, y2], n);
    Some(values)
}

/// Dominant period (in samples) of a profile.
///
/// The profile is detrended against its trailing rolling mean, smoothed, and
/// transformed; the strongest non-DC bin is refined by parabolic
/// interpolation of the magnitude spectrum, so the period is not quantized
/// to `n / k`.
pub fn dominant_period(profile: &[f64], config: &PeriodConfig) -> Option<f64> {
    let dw = config.detrend_window.max(1);
    let trend = rolling_mean(profile, dw);
    let detrended: Vec<f64> = trend
        .iter()
        .enumerate()
        .map(|(j, t)| profile[j + dw - 1] - t)
        .collect();
    let signal = rolling_mean(&detrended, config.smooth_window.max(1));
    let n = signal.len();
    if n < 4 {
        return None;
    }
    let mean = signal.iter().sum::<f64>() / n as f64;
    let rms = (signal.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64).sqrt();
    if !(rms >= config.min_amplitude) {
        return None;
    }

    let mut buf: Vec<Complex<f64>> = signal.iter().map(|&v| Complex::new(v - mean, 0.0)).collect();
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buf);

    let half = n / 2;
    let mags: Vec<f64> = buf[..=half].iter().map(|c| c.norm()).collect();
    let (k, &peak) = mags
        .iter()
        .enumerate()
        .skip(1)
        .max_by(|a, b| a.1.total_cmp(b.1))?;
    if !(peak > 1e-9) {
        return None;
    }

    let mut k_ref = k as f64;
    if k > 1 && k < half {
        let (a, c) = (mags[k - 1], mags[k + 1]);
        let denom = a - 2.0 * peak + c;
        if denom.abs() > 1e-12 {
            let delta = 0.5 * (a - c) / denom;
            if delta.abs() <= 0.5 {
                k_ref += delta;
            }
        }
    }
    Some(n as f64 / k_ref)
}

/// Pixels-per-mm measured along one line, if its period is plausible.
pub fn measure_line(img: &GrayImage, line: &RulerLine, config: &PeriodConfig) -> Option<f64> {
    let profile = line_profile(img, line, config)?;
    let period = dominant_period(&profile, config)?;
    if !period.is_finite() || period > config.max_period {
        tracing::trace!(period, "discarding implausible ruler period");
        return None;
    }
    Some(period * config.ticks_per_mm)
}
