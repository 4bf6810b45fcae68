//! Per-specimen record with lazily derived, memoized measurements.
//!
//! Each derived field is computed on first request from its prerequisites,
//! which are requested (and cached) in turn. A failed prerequisite makes the
//! dependent field undefined with a [`MeasureError::Prerequisite`] chain;
//! unrelated fields are unaffected. Cached values are never recomputed until
//! [`SpecimenRecord::invalidate`] is called.

use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::anatomy::{
    find_dorsal_point, find_eye_dorsal, find_head, find_tail, resolve_antero_posterior,
    resolve_dorso_ventral, AnteroPosterior, DorsoVentral,
};
use crate::calibration::Calibration;
use crate::config::MeasureConfig;
use crate::ellipse::{fit_mask, EllipseFit};
use crate::error::{MeasureError, Outcome};
use crate::geom::distance;
use crate::mask::{BinaryMask, MaskError, SegmentationMask};
use crate::pedestal::{measure_height, pedestal_area, score_area, score_height, PedestalHeight};
use crate::record::MeasurementRecord;

/// Externally supplied specimen identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecimenId {
    /// Opaque specimen key.
    pub id: String,
    /// Pass-through identity fields copied to the output record.
    #[serde(default)]
    pub identity: BTreeMap<String, String>,
}

impl SpecimenId {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            identity: BTreeMap::new(),
        }
    }

    /// Add a pass-through identity field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.identity.insert(key.into(), value.into());
        self
    }
}

/// Raw inputs of one specimen.
#[derive(Debug, Clone)]
pub struct SpecimenInputs {
    /// Full-body grey photograph (needed for pedestal height only).
    pub photo: Option<GrayImage>,
    /// Decoded segmentation mask, or why decoding failed.
    pub mask: Result<SegmentationMask, MaskError>,
    /// Eye-only mask; overrides the eye channel of `mask`.
    pub eye_mask: Option<BinaryMask>,
    /// Micrometer photograph for automatic calibration.
    pub micrometer: Option<GrayImage>,
    /// Manually curated scale; takes precedence over `micrometer`.
    pub pixels_per_mm: Option<f64>,
}

impl SpecimenInputs {
    pub fn new(mask: Result<SegmentationMask, MaskError>) -> Self {
        Self {
            photo: None,
            mask,
            eye_mask: None,
            micrometer: None,
            pixels_per_mm: None,
        }
    }

    pub fn with_photo(mut self, photo: GrayImage) -> Self {
        self.photo = Some(photo);
        self
    }

    pub fn with_eye_mask(mut self, eye_mask: BinaryMask) -> Self {
        self.eye_mask = Some(eye_mask);
        self
    }

    pub fn with_micrometer(mut self, micrometer: GrayImage) -> Self {
        self.micrometer = Some(micrometer);
        self
    }

    pub fn with_pixels_per_mm(mut self, pixels_per_mm: f64) -> Self {
        self.pixels_per_mm = Some(pixels_per_mm);
        self
    }
}

// ── Cache ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
struct DerivedMasks {
    animal: Option<BinaryMask>,
    eye: Option<BinaryMask>,
}

#[derive(Debug, Clone, Default)]
struct Cache {
    calibration: Option<Outcome<Calibration>>,
    total_animal_pixels: Option<Outcome<usize>>,
    animal_area: Option<Outcome<f64>>,
    animal_length: Option<Outcome<f64>>,
    body_ellipse: Option<Outcome<EllipseFit>>,
    eye_ellipse: Option<Outcome<EllipseFit>>,
    antero_posterior: Option<Outcome<AnteroPosterior>>,
    dorso_ventral: Option<Outcome<DorsoVentral>>,
    eye_dorsal: Option<Outcome<[f64; 2]>>,
    tail: Option<Outcome<[f64; 2]>>,
    head: Option<Outcome<[f64; 2]>>,
    dorsal_point: Option<Outcome<[f64; 2]>>,
    pedestal: Option<Outcome<PedestalHeight>>,
    pedestal_size: Option<Outcome<f64>>,
    pedestal_score_height: Option<Outcome<f64>>,
    pedestal_score_area: Option<Outcome<f64>>,
}

/// Return the cached value of `$slot`, computing and storing it first if
/// needed.
macro_rules! memoized {
    ($self:ident, $slot:ident, $compute:expr) => {{
        if let Some(v) = &$self.cache.$slot {
            return v.clone();
        }
        let v = $compute;
        match &v {
            Ok(_) => tracing::debug!(specimen = %$self.id.id, field = stringify!($slot), "derived"),
            Err(e) => tracing::debug!(specimen = %$self.id.id, field = stringify!($slot), reason = %e, "undefined"),
        }
        $self.cache.$slot = Some(v.clone());
        v
    }};
}

/// Tag a prerequisite failure with the prerequisite's name.
fn need<T>(field: &'static str, v: Outcome<T>) -> Outcome<T> {
    v.map_err(|e| MeasureError::prerequisite(field, e))
}

fn decoded(inputs: &SpecimenInputs) -> Outcome<&SegmentationMask> {
    inputs
        .mask
        .as_ref()
        .map_err(|e| MeasureError::MalformedMask(e.clone()))
}

fn animal_mask<'a>(inputs: &SpecimenInputs, slot: &'a mut Option<BinaryMask>) -> Outcome<&'a BinaryMask> {
    if slot.is_none() {
        *slot = Some(decoded(inputs)?.animal());
    }
    slot.as_ref().ok_or(MeasureError::MissingInput("segmentation mask"))
}

fn eye_mask<'a>(inputs: &'a SpecimenInputs, slot: &'a mut Option<BinaryMask>) -> Outcome<&'a BinaryMask> {
    if let Some(m) = &inputs.eye_mask {
        if let Ok(seg) = &inputs.mask {
            if m.dimensions() != seg.dimensions() {
                return Err(MaskError::DimensionMismatch {
                    expected: seg.dimensions(),
                    got: m.dimensions(),
                }
                .into());
            }
        }
        return Ok(m);
    }
    if slot.is_none() {
        *slot = Some(decoded(inputs)?.eye());
    }
    slot.as_ref().ok_or(MeasureError::MissingInput("eye mask"))
}

// ── Record ─────────────────────────────────────────────────────────────────

/// One specimen: identity, inputs, and every derived measurement.
#[derive(Debug, Clone)]
pub struct SpecimenRecord {
    id: SpecimenId,
    inputs: SpecimenInputs,
    config: MeasureConfig,
    masks: DerivedMasks,
    cache: Cache,
}

impl SpecimenRecord {
    pub fn new(id: SpecimenId, inputs: SpecimenInputs, config: MeasureConfig) -> Self {
        if let Err(e) = &inputs.mask {
            tracing::warn!(specimen = %id.id, error = %e, "segmentation mask rejected");
        }
        Self {
            id,
            inputs,
            config,
            masks: DerivedMasks::default(),
            cache: Cache::default(),
        }
    }

    pub fn id(&self) -> &SpecimenId {
        &self.id
    }

    pub fn inputs(&self) -> &SpecimenInputs {
        &self.inputs
    }

    pub fn config(&self) -> &MeasureConfig {
        &self.config
    }

    /// Drop every cached value; the next request recomputes from inputs.
    pub fn invalidate(&mut self) {
        self.masks = DerivedMasks::default();
        self.cache = Cache::default();
    }

    /// Swap the segmentation mask and invalidate everything derived from it.
    pub fn replace_mask(&mut self, mask: Result<SegmentationMask, MaskError>) {
        self.inputs.mask = mask;
        self.invalidate();
    }

    // ── Calibration and size ───────────────────────────────────────────────

    pub fn calibration(&mut self) -> Outcome<Calibration> {
        memoized!(
            self,
            calibration,
            Calibration::resolve(
                self.inputs.pixels_per_mm,
                self.inputs.micrometer.as_ref(),
                &self.config.calibration,
            )
        )
    }

    pub fn pixels_per_mm(&mut self) -> Outcome<f64> {
        self.calibration().map(|c| c.pixels_per_mm)
    }

    /// Foreground pixel count of the body + eye mask.
    pub fn total_animal_pixels(&mut self) -> Outcome<usize> {
        memoized!(
            self,
            total_animal_pixels,
            animal_mask(&self.inputs, &mut self.masks.animal).map(|m| m.count())
        )
    }

    /// Body + eye area in mm².
    pub fn animal_area(&mut self) -> Outcome<f64> {
        memoized!(self, animal_area, {
            let pixels = need("total_animal_pixels", self.total_animal_pixels());
            let ppm = need("calibration", self.pixels_per_mm());
            pixels.and_then(|px| ppm.map(|ppm| px as f64 / (ppm * ppm)))
        })
    }

    /// Head-to-tail distance in mm.
    pub fn animal_length(&mut self) -> Outcome<f64> {
        memoized!(self, animal_length, {
            let ppm = need("calibration", self.pixels_per_mm());
            ppm.and_then(|ppm| {
                let head = need("head", self.head())?;
                let tail = need("tail", self.tail())?;
                Ok(distance(head, tail) / ppm)
            })
        })
    }

    // ── Ellipses and directions ────────────────────────────────────────────

    pub fn body_ellipse(&mut self) -> Outcome<EllipseFit> {
        memoized!(
            self,
            body_ellipse,
            animal_mask(&self.inputs, &mut self.masks.animal)
                .and_then(|m| fit_mask(m, &self.config.ellipse))
        )
    }

    pub fn eye_ellipse(&mut self) -> Outcome<EllipseFit> {
        memoized!(
            self,
            eye_ellipse,
            eye_mask(&self.inputs, &mut self.masks.eye).and_then(|m| fit_mask(m, &self.config.ellipse))
        )
    }

    pub fn antero_posterior(&mut self) -> Outcome<AnteroPosterior> {
        memoized!(self, antero_posterior, {
            let body = need("body_ellipse", self.body_ellipse());
            let eye = need("eye_ellipse", self.eye_ellipse());
            body.and_then(|b| eye.and_then(|e| resolve_antero_posterior(&b, e.center())))
        })
    }

    pub fn dorso_ventral(&mut self) -> Outcome<DorsoVentral> {
        memoized!(self, dorso_ventral, {
            let body = need("body_ellipse", self.body_ellipse());
            let eye = need("eye_ellipse", self.eye_ellipse());
            body.and_then(|b| eye.and_then(|e| resolve_dorso_ventral(&b, e.center())))
        })
    }

    // ── Landmarks ──────────────────────────────────────────────────────────

    pub fn eye_dorsal(&mut self) -> Outcome<[f64; 2]> {
        memoized!(self, eye_dorsal, self.compute_eye_dorsal())
    }

    fn compute_eye_dorsal(&mut self) -> Outcome<[f64; 2]> {
        let body = need("body_ellipse", self.body_ellipse())?;
        let eye = need("eye_ellipse", self.eye_ellipse())?;
        let dv = need("dorso_ventral", self.dorso_ventral())?;
        let mask = eye_mask(&self.inputs, &mut self.masks.eye)?;
        find_eye_dorsal(mask, &eye, &body, dv.dorsal, &self.config.trace)
    }

    pub fn tail(&mut self) -> Outcome<[f64; 2]> {
        memoized!(self, tail, self.compute_tail())
    }

    fn compute_tail(&mut self) -> Outcome<[f64; 2]> {
        let body = need("body_ellipse", self.body_ellipse())?;
        let ap = need("antero_posterior", self.antero_posterior())?;
        let mask = animal_mask(&self.inputs, &mut self.masks.animal)?;
        find_tail(mask, &body, ap.posterior, &self.config.landmarks, &self.config.trace)
    }

    pub fn head(&mut self) -> Outcome<[f64; 2]> {
        memoized!(self, head, self.compute_head())
    }

    fn compute_head(&mut self) -> Outcome<[f64; 2]> {
        let eye_dorsal = need("eye_dorsal", self.eye_dorsal())?;
        let tail = need("tail", self.tail())?;
        let mask = animal_mask(&self.inputs, &mut self.masks.animal)?;
        find_head(mask, eye_dorsal, tail, &self.config.landmarks, &self.config.trace)
    }

    pub fn dorsal_point(&mut self) -> Outcome<[f64; 2]> {
        memoized!(self, dorsal_point, self.compute_dorsal_point())
    }

    fn compute_dorsal_point(&mut self) -> Outcome<[f64; 2]> {
        let head = need("head", self.head())?;
        let tail = need("tail", self.tail())?;
        let dv = need("dorso_ventral", self.dorso_ventral())?;
        let mask = animal_mask(&self.inputs, &mut self.masks.animal)?;
        find_dorsal_point(
            mask,
            head,
            tail,
            dv.dorsal,
            &self.config.landmarks,
            &self.config.trace,
        )
    }

    // ── Pedestal ───────────────────────────────────────────────────────────

    /// Pedestal height with its settled contour.
    pub fn pedestal(&mut self) -> Outcome<PedestalHeight> {
        memoized!(self, pedestal, self.compute_pedestal())
    }

    fn compute_pedestal(&mut self) -> Outcome<PedestalHeight> {
        let ppm = need("calibration", self.pixels_per_mm())?;
        let body = need("body_ellipse", self.body_ellipse())?;
        let head = need("head", self.head())?;
        let dp = need("dorsal_point", self.dorsal_point())?;
        let photo = self
            .inputs
            .photo
            .as_ref()
            .ok_or(MeasureError::MissingInput("photo"))?;
        let mask = decoded(&self.inputs)?;
        measure_height(photo, mask, dp, head, body.center(), ppm, &self.config.pedestal)
    }

    /// Pedestal height in mm.
    pub fn pedestal_height(&mut self) -> Outcome<f64> {
        self.pedestal().map(|p| p.height)
    }

    /// Settled pedestal contour in pixel coordinates.
    pub fn pedestal_contour(&mut self) -> Outcome<Vec<[f64; 2]>> {
        self.pedestal().map(|p| p.contour)
    }

    /// Area cut off by the head–dorsal-point chord, in mm².
    pub fn pedestal_size(&mut self) -> Outcome<f64> {
        memoized!(self, pedestal_size, self.compute_pedestal_size())
    }

    fn compute_pedestal_size(&mut self) -> Outcome<f64> {
        let ppm = need("calibration", self.pixels_per_mm())?;
        let body = need("body_ellipse", self.body_ellipse())?;
        let head = need("head", self.head())?;
        let dp = need("dorsal_point", self.dorsal_point())?;
        let mask = animal_mask(&self.inputs, &mut self.masks.animal)?;
        pedestal_area(mask, body.center(), head, dp, ppm)
    }

    pub fn pedestal_score_height(&mut self) -> Outcome<f64> {
        memoized!(self, pedestal_score_height, {
            let height = need("pedestal_height", self.pedestal_height());
            let length = need("animal_length", self.animal_length());
            height.and_then(|h| length.and_then(|l| score_height(h, l)))
        })
    }

    pub fn pedestal_score_area(&mut self) -> Outcome<f64> {
        memoized!(self, pedestal_score_area, {
            let height = need("pedestal_height", self.pedestal_height());
            let area = need("animal_area", self.animal_area());
            height.and_then(|h| area.and_then(|a| score_area(h, a)))
        })
    }

    // ── Output ─────────────────────────────────────────────────────────────

    /// Evaluate every field and flatten into an output record.
    pub fn to_record(&mut self) -> MeasurementRecord {
        let mut failures = BTreeMap::new();
        let id = self.id.id.clone();
        let mut keep = |field: &str, e: MeasureError| {
            tracing::warn!(specimen = %id, field, reason = %e, "measurement undefined");
            failures.insert(field.to_string(), e.to_string());
        };
        macro_rules! field {
            ($name:literal, $v:expr) => {
                match $v {
                    Ok(v) => Some(v),
                    Err(e) => {
                        keep($name, e);
                        None
                    }
                }
            };
        }

        let calibration = field!("calibration", self.calibration());
        let body = field!("body_ellipse", self.body_ellipse());
        let eye = field!("eye_ellipse", self.eye_ellipse());
        let ap = field!("antero_posterior", self.antero_posterior());
        let dv = field!("dorso_ventral", self.dorso_ventral());

        let mut rec = MeasurementRecord {
            specimen_id: self.id.id.clone(),
            identity: self.id.identity.clone(),
            pixels_per_mm: calibration.map(|c| c.pixels_per_mm),
            calibration_source: calibration.map(|c| c.source),
            total_animal_pixels: field!("total_animal_pixels", self.total_animal_pixels()),
            animal_area: field!("animal_area", self.animal_area()),
            animal_length: field!("animal_length", self.animal_length()),
            animal_x_center: body.map(|b| b.center_x),
            animal_y_center: body.map(|b| b.center_y),
            animal_major: body.map(|b| b.major_axis_length),
            animal_minor: body.map(|b| b.minor_axis_length),
            animal_theta: body.map(|b| b.theta),
            eye_x_center: eye.map(|e| e.center_x),
            eye_y_center: eye.map(|e| e.center_y),
            eye_major: eye.map(|e| e.major_axis_length),
            eye_minor: eye.map(|e| e.minor_axis_length),
            eye_theta: eye.map(|e| e.theta),
            anterior: ap.map(|a| a.anterior),
            posterior: ap.map(|a| a.posterior),
            dorsal: dv.map(|d| d.dorsal),
            ventral: dv.map(|d| d.ventral),
            eye_dorsal: field!("eye_dorsal", self.eye_dorsal()),
            head: field!("head", self.head()),
            tail: field!("tail", self.tail()),
            dorsal_point: field!("dorsal_point", self.dorsal_point()),
            pedestal_size: field!("pedestal_size", self.pedestal_size()),
            pedestal_height: field!("pedestal_height", self.pedestal_height()),
            pedestal_score_height: field!("pedestal_score_height", self.pedestal_score_height()),
            pedestal_score_area: field!("pedestal_score_area", self.pedestal_score_area()),
            failures: BTreeMap::new(),
        };
        rec.failures = failures;
        rec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::Channel;
    use crate::test_utils::{draw_specimen_mask, draw_specimen_photo};

    fn record(pedestal_radius: f64, ppm: Option<f64>) -> SpecimenRecord {
        let mask = draw_specimen_mask(pedestal_radius);
        let photo = draw_specimen_photo(&mask);
        let mut inputs = SpecimenInputs::new(Ok(mask)).with_photo(photo);
        inputs.pixels_per_mm = ppm;
        SpecimenRecord::new(SpecimenId::new("S1"), inputs, MeasureConfig::default())
    }

    #[test]
    fn reference_specimen_landmarks() {
        let mut rec = record(0.0, Some(50.0));
        let body = rec.body_ellipse().unwrap();
        assert!((body.center_x - 100.0).abs() < 1.0, "{:?}", body);
        assert!((body.center_y - 100.0).abs() < 1.0, "{:?}", body);

        let ap = rec.antero_posterior().unwrap();
        assert!(ap.anterior[0] > 150.0, "{:?}", ap);
        assert!(ap.posterior[0] < 50.0, "{:?}", ap);
        let dv = rec.dorso_ventral().unwrap();
        assert!(dv.ventral[1] > dv.dorsal[1], "{:?}", dv);

        let tail = rec.tail().unwrap();
        assert!((tail[0] - 40.0).abs() <= 2.0, "tail {:?}", tail);
        let head = rec.head().unwrap();
        assert!((head[0] - 160.0).abs() <= 2.5, "head {:?}", head);
        let dp = rec.dorsal_point().unwrap();
        assert!((dp[1] - 70.0).abs() <= 2.0, "dorsal point {:?}", dp);

        let length = rec.animal_length().unwrap();
        assert!((length - 120.0 / 50.0).abs() < 0.1, "length {}", length);
    }

    #[test]
    fn pedestal_fields_defined_with_bump_and_calibration() {
        let mut rec = record(10.0, Some(50.0));
        let height = rec.pedestal_height().unwrap();
        let size = rec.pedestal_size().unwrap();
        assert!(height > 0.0);
        assert!(size > 0.0);
        assert!(rec.pedestal_score_height().unwrap() > 0.0);
        assert!(rec.pedestal_score_area().unwrap() > 0.0);
        assert_eq!(rec.pedestal_contour().unwrap().len(), 400);
    }

    #[test]
    fn missing_calibration_leaves_scaled_fields_undefined() {
        let mut rec = record(10.0, None);
        assert!(rec.body_ellipse().is_ok());
        assert!(rec.head().is_ok());
        for r in [
            rec.animal_area(),
            rec.animal_length(),
            rec.pedestal_height(),
            rec.pedestal_size(),
        ] {
            let e = r.unwrap_err();
            assert_eq!(e.root_cause(), &MeasureError::MissingCalibration);
        }
        let out = rec.to_record();
        assert_eq!(out.animal_area, None);
        assert_eq!(out.animal_length, None);
        assert_eq!(out.pedestal_height, None);
        assert_eq!(out.pedestal_size, None);
        assert!(out.total_animal_pixels.is_some());
        assert!(out.failures.contains_key("calibration"));
    }

    #[test]
    fn degenerate_mask_leaves_pedestal_undefined() {
        // A single body pixel: the ellipse covariance is singular.
        let mut labels = vec![Channel::Background; 40 * 40];
        labels[20 * 40 + 20] = Channel::Body;
        labels[10 * 40 + 10] = Channel::Eye;
        let mask = SegmentationMask::from_labels(40, 40, labels).unwrap();
        let inputs = SpecimenInputs::new(Ok(mask)).with_pixels_per_mm(10.0);
        let mut rec = SpecimenRecord::new(SpecimenId::new("D"), inputs, MeasureConfig::default());
        assert!(rec.pedestal_height().is_err());
        assert!(rec.pedestal_size().is_err());
        let out = rec.to_record();
        assert_eq!(out.pedestal_height, None);
        assert_eq!(out.pedestal_size, None);
        assert_eq!(out.total_animal_pixels, Some(2));
        assert!(out.animal_area.is_some());
    }

    #[test]
    fn malformed_mask_is_reported_per_field() {
        let inputs = SpecimenInputs::new(Err(MaskError::Empty)).with_pixels_per_mm(10.0);
        let mut rec = SpecimenRecord::new(SpecimenId::new("M"), inputs, MeasureConfig::default());
        assert_eq!(rec.body_ellipse(), Err(MeasureError::MalformedMask(MaskError::Empty)));
        assert!(rec.calibration().is_ok());
        let out = rec.to_record();
        assert_eq!(out.pixels_per_mm, Some(10.0));
        assert_eq!(out.head, None);
    }

    #[test]
    fn prerequisite_chain_names_the_missing_field() {
        let mut rec = record(0.0, None);
        let err = rec.animal_length().unwrap_err();
        match err {
            MeasureError::Prerequisite { field, .. } => assert_eq!(field, "calibration"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn cached_values_survive_until_invalidated() {
        let mut rec = record(0.0, Some(50.0));
        let before = rec.total_animal_pixels().unwrap();
        rec.inputs.mask = Ok(draw_specimen_mask(10.0));
        assert_eq!(rec.total_animal_pixels().unwrap(), before);
        rec.invalidate();
        assert!(rec.total_animal_pixels().unwrap() > before);

        rec.replace_mask(Ok(draw_specimen_mask(0.0)));
        assert_eq!(rec.total_animal_pixels().unwrap(), before);
    }

    #[test]
    fn separate_eye_mask_takes_precedence() {
        let mask = draw_specimen_mask(0.0);
        let eye = BinaryMask::from_fn(200, 200, |x, y| {
            (x as f64 - 60.0).hypot(y as f64 - 108.0) <= 6.0
        });
        let inputs = SpecimenInputs::new(Ok(mask))
            .with_eye_mask(eye)
            .with_pixels_per_mm(50.0);
        let mut rec = SpecimenRecord::new(SpecimenId::new("E"), inputs, MeasureConfig::default());
        let eye_fit = rec.eye_ellipse().unwrap();
        assert!((eye_fit.center_x - 60.0).abs() < 0.5);
        let ap = rec.antero_posterior().unwrap();
        assert!(ap.anterior[0] < 50.0, "{:?}", ap);
    }

    #[test]
    fn record_carries_identity() {
        let mask = draw_specimen_mask(0.0);
        let id = SpecimenId::new("X9").with_field("barcode", "0042");
        let mut rec = SpecimenRecord::new(id, SpecimenInputs::new(Ok(mask)), MeasureConfig::default());
        let out = rec.to_record();
        assert_eq!(out.specimen_id, "X9");
        assert_eq!(out.identity.get("barcode").map(String::as_str), Some("0042"));
        assert!(out.animal_x_center.is_some());
    }
}
