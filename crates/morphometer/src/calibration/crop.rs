//! Recursive removal of dark aperture corners from micrometer images.
//!
//! Each pass flags the corners whose edge row and edge column both carry a
//! run of very dark pixels, then looks the flagged pattern up in a fixed rule
//! table. The chosen rule yields a crop rectangle; cropping repeats until no
//! corner fires.

use image::GrayImage;
use serde::{Deserialize, Serialize};

use super::circle::{find_aperture_circle, CircleSearchConfig};

/// Corner-cropping parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CropConfig {
    /// Intensity below which a pixel counts as aperture shadow.
    pub dark_threshold: u8,
    /// Minimum contiguous run of dark pixels along an edge.
    pub corner_min_run: usize,
    /// Maximum number of recursive crop passes.
    pub max_depth: usize,
    /// Circular aperture search used when all four corners are dark.
    pub circle: CircleSearchConfig,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            dark_threshold: 50,
            corner_min_run: 5,
            max_depth: 16,
            circle: CircleSearchConfig::default(),
        }
    }
}

// ── Corners ────────────────────────────────────────────────────────────────

/// Image corner probed for aperture shadow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl Corner {
    const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomRight,
        Corner::BottomLeft,
    ];

    const fn bit(self) -> u8 {
        match self {
            Corner::TopLeft => 1,
            Corner::TopRight => 2,
            Corner::BottomRight => 4,
            Corner::BottomLeft => 8,
        }
    }

    fn is_left(self) -> bool {
        matches!(self, Corner::TopLeft | Corner::BottomLeft)
    }

    fn is_right(self) -> bool {
        !self.is_left()
    }
}

/// A flagged corner and how far its shadow reaches into the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CornerHit {
    pub corner: Corner,
    /// Column where the shadow along the edge row ends.
    pub col: u32,
    /// Row where the shadow along the edge column ends.
    pub row: u32,
}

/// Indices of dark pixels along a 1-D edge profile, or `None` when no run of
/// `min_run` consecutive dark pixels exists.
fn dark_indices(values: impl Iterator<Item = u8>, threshold: u8, min_run: usize) -> Option<Vec<u32>> {
    let mut idx = Vec::new();
    let mut run = 0usize;
    let mut best = 0usize;
    for (i, v) in values.enumerate() {
        if v < threshold {
            idx.push(i as u32);
            run += 1;
            best = best.max(run);
        } else {
            run = 0;
        }
    }
    (best >= min_run.max(1)).then_some(idx)
}

/// Flag every corner whose edge row and edge column both carry a dark run.
pub(crate) fn detect_corners(img: &GrayImage, config: &CropConfig) -> Vec<CornerHit> {
    let (w, h) = img.dimensions();
    if w < 2 || h < 2 {
        return Vec::new();
    }
    let (hw, hh) = (w / 2, h / 2);
    let row = |y: u32, xs: std::ops::Range<u32>| {
        dark_indices(
            xs.map(move |x| img.get_pixel(x, y)[0]),
            config.dark_threshold,
            config.corner_min_run,
        )
    };
    let col = |x: u32, ys: std::ops::Range<u32>| {
        dark_indices(
            ys.map(move |y| img.get_pixel(x, y)[0]),
            config.dark_threshold,
            config.corner_min_run,
        )
    };
    let first = |v: &[u32]| v.first().copied().unwrap_or(0);
    let last = |v: &[u32]| v.last().copied().unwrap_or(0);

    let mut hits = Vec::new();
    for corner in Corner::ALL {
        let hit = match corner {
            Corner::TopLeft => row(0, 0..hw)
                .zip(col(0, 0..hh))
                .map(|(r, c)| (last(&r), last(&c))),
            Corner::TopRight => row(0, hw..w)
                .zip(col(w - 1, 0..hh))
                .map(|(r, c)| (hw + first(&r), last(&c))),
            Corner::BottomRight => row(h - 1, hw..w)
                .zip(col(w - 1, hh..h))
                .map(|(r, c)| (hw + first(&r), hh + first(&c))),
            Corner::BottomLeft => row(h - 1, 0..hw)
                .zip(col(0, hh..h))
                .map(|(r, c)| (last(&r), hh + first(&c))),
        };
        if let Some((col, row)) = hit {
            hits.push(CornerHit { corner, col, row });
        }
    }
    hits
}

// ── Rule table ─────────────────────────────────────────────────────────────

/// Crop applied when the flagged corners cannot be cut away column-wise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CropRule {
    /// All four corners: find the circular aperture and crop inside it.
    Aperture,
    /// Three corners: keep the quadrant-aligned region opposite the two
    /// corners adjacent to the missing one.
    Missing(Corner),
    /// Only top corners: keep rows below the deepest top shadow.
    BelowTop,
    /// Only bottom corners: keep rows above the shallowest bottom shadow.
    AboveBottom,
    /// Only right corners: keep columns left of the right shadow.
    LeftOfRight,
    /// Only left corners: keep columns right of the left shadow.
    RightOfLeft,
    /// Diagonal pair: nothing sensible to cut.
    Stop,
}

const TL: u8 = Corner::TopLeft.bit();
const TR: u8 = Corner::TopRight.bit();
const BR: u8 = Corner::BottomRight.bit();
const BL: u8 = Corner::BottomLeft.bit();

/// Flagged-corner pattern → crop rule. Single corners resolve as top/bottom
/// first, then right/left.
const PATTERN_RULES: [(u8, CropRule); 15] = [
    (TL, CropRule::BelowTop),
    (TR, CropRule::BelowTop),
    (BR, CropRule::AboveBottom),
    (BL, CropRule::AboveBottom),
    (TL | TR, CropRule::BelowTop),
    (BR | BL, CropRule::AboveBottom),
    (TR | BR, CropRule::LeftOfRight),
    (TL | BL, CropRule::RightOfLeft),
    (TL | BR, CropRule::Stop),
    (TR | BL, CropRule::Stop),
    (TL | TR | BR, CropRule::Missing(Corner::BottomLeft)),
    (TL | TR | BL, CropRule::Missing(Corner::BottomRight)),
    (TL | BR | BL, CropRule::Missing(Corner::TopRight)),
    (TR | BR | BL, CropRule::Missing(Corner::TopLeft)),
    (TL | TR | BR | BL, CropRule::Aperture),
];

pub(crate) fn rule_for(hits: &[CornerHit]) -> CropRule {
    let pattern = hits.iter().fold(0u8, |acc, h| acc | h.corner.bit());
    PATTERN_RULES
        .iter()
        .find(|(p, _)| *p == pattern)
        .map(|&(_, rule)| rule)
        .unwrap_or(CropRule::Stop)
}

/// Half-open crop rectangle `[x0, x1) × [y0, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CropRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl CropRect {
    fn full(w: u32, h: u32) -> Self {
        Self {
            x0: 0,
            y0: 0,
            x1: w,
            y1: h,
        }
    }

    fn clamped(self, w: u32, h: u32) -> Self {
        let x1 = self.x1.min(w);
        let y1 = self.y1.min(h);
        Self {
            x0: self.x0.min(x1),
            y0: self.y0.min(y1),
            x1,
            y1,
        }
    }

    fn is_empty(&self) -> bool {
        self.x1 <= self.x0 || self.y1 <= self.y0
    }
}

fn hit(hits: &[CornerHit], corner: Corner) -> Option<CornerHit> {
    hits.iter().copied().find(|h| h.corner == corner)
}

/// Crop rectangle for one pass, or `None` when cropping should stop.
pub(crate) fn plan_crop(img: &GrayImage, hits: &[CornerHit], config: &CropConfig) -> Option<CropRect> {
    let (w, h) = img.dimensions();
    if hits.is_empty() {
        return None;
    }
    let full = CropRect::full(w, h);

    // Column-wise crop between the innermost left and right shadows.
    let left = hits
        .iter()
        .filter(|c| c.corner.is_left())
        .map(|c| c.col)
        .max()
        .unwrap_or(0);
    let right = hits
        .iter()
        .filter(|c| c.corner.is_right())
        .map(|c| c.col)
        .min()
        .unwrap_or(w - 1);
    let centre_pair = left + 1 == w / 2 && right == w / 2;
    if left <= w / 4 && right >= (w * 3) / 4 && !centre_pair {
        return Some(CropRect {
            x0: left,
            x1: right,
            ..full
        });
    }

    let rect = match rule_for(hits) {
        CropRule::Stop => return None,
        CropRule::Aperture => match find_aperture_circle(img, &config.circle) {
            Some(c) => {
                let half = config.circle.crop_radius_factor * c.radius;
                let lo = |v: f64| (v - half).max(0.0).floor() as u32;
                let hi = |v: f64| (v + half).max(0.0).floor() as u32;
                CropRect {
                    x0: lo(c.center_x),
                    y0: lo(c.center_y),
                    x1: hi(c.center_x),
                    y1: hi(c.center_y),
                }
            }
            None => {
                tracing::debug!("no aperture circle found; keeping lower half");
                CropRect { y0: h / 2, ..full }
            }
        },
        CropRule::Missing(missing) => {
            let (tl, tr) = (hit(hits, Corner::TopLeft), hit(hits, Corner::TopRight));
            let (br, bl) = (hit(hits, Corner::BottomRight), hit(hits, Corner::BottomLeft));
            match missing {
                Corner::TopRight => CropRect {
                    x0: tl?.col,
                    y1: br?.row,
                    ..full
                },
                Corner::BottomRight => CropRect {
                    x0: bl?.col,
                    y0: tr?.row,
                    ..full
                },
                Corner::TopLeft => CropRect {
                    x1: tr?.col,
                    y1: bl?.row,
                    ..full
                },
                Corner::BottomLeft => CropRect {
                    x1: br?.col,
                    y0: tl?.row,
                    ..full
                },
            }
        }
        CropRule::AboveBottom => CropRect {
            y1: hits.iter().map(|c| c.row).min()?,
            ..full
        },
        CropRule::BelowTop => CropRect {
            y0: hits.iter().map(|c| c.row).max()?,
            ..full
        },
        CropRule::LeftOfRight => CropRect {
            x1: hits.iter().map(|c| c.col).min()?,
            ..full
        },
        CropRule::RightOfLeft => CropRect {
            x0: hits.iter().map(|c| c.col).max()?,
            ..full
        },
    };
    Some(rect)
}

/// Repeatedly crop dark aperture corners away.
///
/// Stops when no corner fires, the rule table says stop, a pass would not
/// change the image or would empty it, or `max_depth` passes ran.
pub fn crop_aperture(img: &GrayImage, config: &CropConfig) -> GrayImage {
    let mut current = img.clone();
    for depth in 0..config.max_depth {
        let hits = detect_corners(&current, config);
        let (w, h) = current.dimensions();
        let Some(rect) = plan_crop(&current, &hits, config) else {
            break;
        };
        let rect = rect.clamped(w, h);
        if rect.is_empty() || rect == CropRect::full(w, h) {
            break;
        }
        tracing::debug!(
            depth,
            corners = hits.len(),
            x0 = rect.x0,
            y0 = rect.y0,
            x1 = rect.x1,
            y1 = rect.y1,
            "cropping aperture corners"
        );
        current =
            image::imageops::crop_imm(&current, rect.x0, rect.y0, rect.x1 - rect.x0, rect.y1 - rect.y0)
                .to_image();
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn bright(w: u32, h: u32) -> GrayImage {
        GrayImage::from_pixel(w, h, Luma([200]))
    }

    #[test]
    fn clean_image_is_untouched() {
        let img = bright(120, 80);
        let out = crop_aperture(&img, &CropConfig::default());
        assert_eq!(out.dimensions(), (120, 80));
    }

    #[test]
    fn short_dark_runs_do_not_flag_corners() {
        // Thin dark ticks touching the border: 3 px runs only.
        let img = GrayImage::from_fn(120, 80, |x, _| Luma([if x % 10 < 3 { 20 } else { 200 }]));
        assert!(detect_corners(&img, &CropConfig::default()).is_empty());
    }

    #[test]
    fn side_bands_are_cropped_column_wise() {
        let img = GrayImage::from_fn(200, 100, |x, _| {
            Luma([if x < 20 || x >= 180 { 10 } else { 200 }])
        });
        let hits = detect_corners(&img, &CropConfig::default());
        assert_eq!(hits.len(), 4);
        let out = crop_aperture(&img, &CropConfig::default());
        assert_eq!(out.dimensions(), (161, 100));
        assert!(detect_corners(&out, &CropConfig::default()).is_empty());
    }

    #[test]
    fn bottom_band_is_cropped_row_wise() {
        let img = GrayImage::from_fn(200, 100, |_, y| Luma([if y >= 80 { 10 } else { 200 }]));
        let hits = detect_corners(&img, &CropConfig::default());
        assert_eq!(rule_for(&hits), CropRule::AboveBottom);
        let out = crop_aperture(&img, &CropConfig::default());
        assert_eq!(out.dimensions(), (200, 80));
    }

    #[test]
    fn three_corner_shadow_uses_missing_corner_rule() {
        // Left band, bottom band and a top-left notch; top-right corner clear.
        let img = GrayImage::from_fn(200, 200, |x, y| {
            let dark = x < 30 || y >= 170 || (y < 20 && x < 60);
            Luma([if dark { 10 } else { 200 }])
        });
        let hits = detect_corners(&img, &CropConfig::default());
        assert_eq!(hits.len(), 3);
        assert_eq!(rule_for(&hits), CropRule::Missing(Corner::TopRight));
        let out = crop_aperture(&img, &CropConfig::default());
        // columns from the top-left shadow end, rows above the bottom-right shadow
        assert_eq!(out.dimensions(), (141, 170));
    }

    #[test]
    fn rule_table_covers_every_pattern() {
        for bits in 1u8..16 {
            let hits: Vec<CornerHit> = Corner::ALL
                .iter()
                .filter(|c| bits & c.bit() != 0)
                .map(|&corner| CornerHit {
                    corner,
                    col: 0,
                    row: 0,
                })
                .collect();
            let rule = rule_for(&hits);
            match bits.count_ones() {
                4 => assert_eq!(rule, CropRule::Aperture),
                3 => assert!(matches!(rule, CropRule::Missing(_))),
                _ => {}
            }
        }
        let diagonal = [
            CornerHit {
                corner: Corner::TopLeft,
                col: 0,
                row: 0,
            },
            CornerHit {
                corner: Corner::BottomRight,
                col: 0,
                row: 0,
            },
        ];
        assert_eq!(rule_for(&diagonal), CropRule::Stop);
    }

    #[test]
    fn circular_aperture_is_cropped_inside_circle() {
        let (w, h) = (800u32, 800u32);
        let img = GrayImage::from_fn(w, h, |x, y| {
            let d = (x as f64 - 400.0).hypot(y as f64 - 400.0);
            Luma([if d <= 320.0 { 200 } else { 10 }])
        });
        let hits = detect_corners(&img, &CropConfig::default());
        assert_eq!(rule_for(&hits), CropRule::Aperture);
        let out = crop_aperture(&img, &CropConfig::default());
        let (ow, oh) = out.dimensions();
        // 2 · 0.7 · 320 = 448
        assert!((ow as i64 - 448).abs() <= 8, "width {}", ow);
        assert!((oh as i64 - 448).abs() <= 8, "height {}", oh);
    }

    #[test]
    fn four_corners_without_circle_keep_lower_half() {
        // Wide, shallow corner notches: too wide for a column crop, and the
        // image is smaller than the minimum aperture radius.
        let (w, h) = (400u32, 300u32);
        let img = GrayImage::from_fn(w, h, |x, y| {
            let dark = (x < 120 || x >= 280) && (y < 20 || y >= 280);
            Luma([if dark { 10 } else { 200 }])
        });
        let cfg = CropConfig::default();
        let hits = detect_corners(&img, &cfg);
        assert_eq!(rule_for(&hits), CropRule::Aperture);
        assert!(find_aperture_circle(&img, &cfg.circle).is_none());
        assert_eq!(
            plan_crop(&img, &hits, &cfg),
            Some(CropRect {
                x0: 0,
                y0: 150,
                x1: 400,
                y1: 300
            })
        );
        // The lower half still has bottom notches, removed row-wise next.
        let out = crop_aperture(&img, &cfg);
        assert_eq!(out.dimensions(), (400, 130));
    }

    #[test]
    fn zero_circle_canny_threshold_does_not_panic() {
        let img = GrayImage::from_fn(300, 300, |x, y| {
            let d = (x as f64 - 150.0).hypot(y as f64 - 150.0);
            Luma([if d <= 140.0 { 200 } else { 10 }])
        });
        let mut cfg = CropConfig::default();
        cfg.circle.canny_high = 0.0;
        cfg.circle.min_radius = 100;
        let out = crop_aperture(&img, &cfg);
        assert!(out.width() <= 300 && out.height() <= 300);
    }
}
