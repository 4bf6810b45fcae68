//! Segmentation masks: per-pixel class labels and derived binary masks.
//!
//! A [`SegmentationMask`] is validated once when decoded. Every consumer then
//! works on [`BinaryMask`] selections (body + eye, eye only, background).

use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

// ── Error type ─────────────────────────────────────────────────────────────

/// Errors raised while decoding a segmentation mask.
#[derive(Debug, Clone, PartialEq)]
pub enum MaskError {
    /// Image has zero width or height.
    Empty,
    /// RGB label image whose channels disagree at a pixel.
    ChannelMismatch {
        /// Column of the first offending pixel.
        x: u32,
        /// Row of the first offending pixel.
        y: u32,
    },
    /// More distinct label values than semantic channels.
    TooManyLabels {
        /// Number of distinct values found.
        found: usize,
    },
    /// Planes or label buffer disagree with the declared dimensions.
    DimensionMismatch {
        /// Expected `(width, height)` or plane count.
        expected: (u32, u32),
        /// Observed `(width, height)` or plane count.
        got: (u32, u32),
    },
    /// A pixel of a channel stack with zero or several hot planes.
    NotOneHot {
        /// Column of the first offending pixel.
        x: u32,
        /// Row of the first offending pixel.
        y: u32,
        /// Number of hot planes at that pixel.
        hot: usize,
    },
}

impl std::fmt::Display for MaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "mask has no pixels"),
            Self::ChannelMismatch { x, y } => {
                write!(f, "RGB label channels disagree at ({}, {})", x, y)
            }
            Self::TooManyLabels { found } => write!(
                f,
                "{} distinct labels, at most {} supported",
                found,
                Channel::ALL.len()
            ),
            Self::DimensionMismatch { expected, got } => write!(
                f,
                "dimension mismatch: expected {}x{}, got {}x{}",
                expected.0, expected.1, got.0, got.1
            ),
            Self::NotOneHot { x, y, hot } => {
                write!(f, "pixel ({}, {}) has {} hot channels, expected 1", x, y, hot)
            }
        }
    }
}

impl std::error::Error for MaskError {}

// ── Channels ───────────────────────────────────────────────────────────────

/// Semantic class of a segmented pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Channel {
    Background = 0,
    Body = 1,
    Eye = 2,
    Antenna = 3,
}

impl Channel {
    /// All channels in label order.
    pub const ALL: [Channel; 4] = [
        Channel::Background,
        Channel::Body,
        Channel::Eye,
        Channel::Antenna,
    ];

    /// Channel for a label index, if in range.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

// ── Segmentation mask ──────────────────────────────────────────────────────

/// Validated single-label segmentation of one specimen photograph.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationMask {
    width: u32,
    height: u32,
    labels: Vec<Channel>,
}

impl SegmentationMask {
    /// Build from a row-major label buffer.
    pub fn from_labels(width: u32, height: u32, labels: Vec<Channel>) -> Result<Self, MaskError> {
        if width == 0 || height == 0 {
            return Err(MaskError::Empty);
        }
        let expected = width as usize * height as usize;
        if labels.len() != expected {
            return Err(MaskError::DimensionMismatch {
                expected: (width, height),
                got: (labels.len() as u32, 1),
            });
        }
        Ok(Self {
            width,
            height,
            labels,
        })
    }

    /// Decode a label image with one grey level per class.
    ///
    /// Distinct levels are ranked in ascending order and mapped onto
    /// background, body, eye, antenna. A mask with fewer than four classes
    /// present uses the leading channels only.
    pub fn from_label_image(img: &GrayImage) -> Result<Self, MaskError> {
        let (w, h) = img.dimensions();
        let mut present = [false; 256];
        for &v in img.as_raw() {
            present[v as usize] = true;
        }
        let mut rank = [None; 256];
        let mut next = 0usize;
        for (value, _) in present.iter().enumerate().filter(|(_, &p)| p) {
            rank[value] = Channel::from_index(next);
            next += 1;
        }
        if next > Channel::ALL.len() {
            return Err(MaskError::TooManyLabels { found: next });
        }
        let labels = img
            .as_raw()
            .iter()
            .map(|&v| rank[v as usize].unwrap_or(Channel::Background))
            .collect();
        Self::from_labels(w, h, labels)
    }

    /// Decode a label image that was saved as RGB with R == G == B.
    pub fn from_rgb_labels(img: &RgbImage) -> Result<Self, MaskError> {
        let (w, h) = img.dimensions();
        let mut gray = GrayImage::new(w, h);
        for (x, y, px) in img.enumerate_pixels() {
            let [r, g, b] = px.0;
            if r != g || g != b {
                return Err(MaskError::ChannelMismatch { x, y });
            }
            gray.put_pixel(x, y, image::Luma([r]));
        }
        Self::from_label_image(&gray)
    }

    /// Decode a one-hot stack of per-channel planes (non-zero = hot).
    ///
    /// Three planes cover background, body and eye; a fourth adds antenna.
    pub fn from_channel_planes(planes: &[GrayImage]) -> Result<Self, MaskError> {
        let first = planes.first().ok_or(MaskError::Empty)?;
        if planes.len() < 3 || planes.len() > Channel::ALL.len() {
            return Err(MaskError::DimensionMismatch {
                expected: (Channel::ALL.len() as u32, 1),
                got: (planes.len() as u32, 1),
            });
        }
        let (w, h) = first.dimensions();
        for p in planes {
            if p.dimensions() != (w, h) {
                return Err(MaskError::DimensionMismatch {
                    expected: (w, h),
                    got: p.dimensions(),
                });
            }
        }
        let mut labels = Vec::with_capacity(w as usize * h as usize);
        for y in 0..h {
            for x in 0..w {
                let mut hot = planes
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.get_pixel(x, y)[0] != 0);
                let (Some((index, _)), None) = (hot.next(), hot.next()) else {
                    let hot = planes
                        .iter()
                        .filter(|p| p.get_pixel(x, y)[0] != 0)
                        .count();
                    return Err(MaskError::NotOneHot { x, y, hot });
                };
                labels.push(Channel::ALL[index]);
            }
        }
        Self::from_labels(w, h, labels)
    }

    /// Decode whatever the image loader produced: 8-bit grey labels, or an
    /// RGB(A) rendering of the same.
    pub fn from_dynamic(img: &image::DynamicImage) -> Result<Self, MaskError> {
        match img {
            image::DynamicImage::ImageLuma8(gray) => Self::from_label_image(gray),
            other => Self::from_rgb_labels(&other.to_rgb8()),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Class label at pixel `(x, y)`.
    pub fn channel_at(&self, x: u32, y: u32) -> Channel {
        self.labels[(y * self.width + x) as usize]
    }

    /// Binary mask whose foreground is the union of `channels`.
    pub fn select(&self, channels: &[Channel]) -> BinaryMask {
        let data = self
            .labels
            .iter()
            .map(|c| u8::from(channels.contains(c)))
            .collect();
        BinaryMask {
            width: self.width,
            height: self.height,
            data,
        }
    }

    /// Merged body + eye foreground (the whole animal).
    pub fn animal(&self) -> BinaryMask {
        self.select(&[Channel::Body, Channel::Eye])
    }

    pub fn eye(&self) -> BinaryMask {
        self.select(&[Channel::Eye])
    }
}

// ── Binary mask ────────────────────────────────────────────────────────────

/// Foreground (1) / background (0) mask in image pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl BinaryMask {
    /// Threshold a grey image: any non-zero pixel is foreground.
    pub fn from_gray(img: &GrayImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.as_raw().iter().map(|&v| u8::from(v != 0)).collect(),
        }
    }

    /// Build from a predicate over pixel coordinates.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(u8::from(f(x, y)));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Foreground test; out-of-range coordinates are background.
    #[inline]
    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.data[(y * self.width + x) as usize] != 0
    }

    /// Set one pixel.
    pub fn set(&mut self, x: u32, y: u32, foreground: bool) {
        if x < self.width && y < self.height {
            self.data[(y * self.width + x) as usize] = u8::from(foreground);
        }
    }

    /// Value at an integer pixel, clamped to the border (0.0 or 1.0).
    #[inline]
    pub(crate) fn value_clamped(&self, x: i64, y: i64) -> f64 {
        let x = x.clamp(0, self.width as i64 - 1) as u32;
        let y = y.clamp(0, self.height as i64 - 1) as u32;
        f64::from(self.data[(y * self.width + x) as usize])
    }

    /// Number of foreground pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// Foreground pixel coordinates as `[x, y]`, row-major order.
    pub fn foreground_points(&self) -> Vec<[f64; 2]> {
        let w = self.width as usize;
        self.data
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != 0)
            .map(|(i, _)| [(i % w) as f64, (i / w) as f64])
            .collect()
    }
}
