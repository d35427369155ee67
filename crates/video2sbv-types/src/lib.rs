//! Shared domain models for the video2sbv workspace.
//!
//! This crate centralizes the lightweight data structures passed between the
//! decoder, locator, comparator, OCR, and CLI crates. Keep it free of native
//! SDKs so every crate can depend on it cheaply.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Serialize, Serializer};
use thiserror::Error;

pub type FrameResult<T> = Result<T, FrameError>;

/// Number of bytes per pixel in a packed RGB24 frame.
pub const RGB_CHANNELS: usize = 3;

/// Max variation between two renderings of the same pixel, in grey levels.
/// Shared by region localization and region comparison.
pub const NOISE_INTENSITY: u8 = 10;

/// Decoded video frame stored as packed RGB24 rows.
#[derive(Clone)]
pub struct VideoFrame {
    width: u32,
    height: u32,
    stride: usize,
    frame_index: Option<u64>,
    timestamp: Option<Duration>,
    data: Arc<[u8]>,
}

impl fmt::Debug for VideoFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("timestamp", &self.timestamp)
            .field("bytes", &self.data.len())
            .field("frame_index", &self.frame_index)
            .finish()
    }
}

impl VideoFrame {
    pub fn from_rgb_owned(
        width: u32,
        height: u32,
        stride: usize,
        timestamp: Option<Duration>,
        data: Vec<u8>,
    ) -> FrameResult<Self> {
        let row_bytes = (width as usize)
            .checked_mul(RGB_CHANNELS)
            .ok_or_else(|| FrameError::InvalidFrame {
                reason: "calculated RGB row length overflowed".into(),
            })?;
        if stride < row_bytes {
            return Err(FrameError::InvalidFrame {
                reason: format!("stride {stride} is smaller than the RGB row length {row_bytes}"),
            });
        }
        let required = stride
            .checked_mul(height as usize)
            .ok_or_else(|| FrameError::InvalidFrame {
                reason: "calculated RGB plane length overflowed".into(),
            })?;
        if data.len() < required {
            return Err(FrameError::InvalidFrame {
                reason: format!(
                    "insufficient RGB bytes: got {} expected at least {}",
                    data.len(),
                    required
                ),
            });
        }
        Ok(Self {
            width,
            height,
            stride,
            timestamp,
            data: Arc::from(data.into_boxed_slice()),
            frame_index: None,
        })
    }

    /// Builds a tightly packed frame where every pixel has the same color.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = rgb.repeat(width as usize * height as usize);
        Self {
            width,
            height,
            stride: width as usize * RGB_CHANNELS,
            timestamp: None,
            data: Arc::from(data.into_boxed_slice()),
            frame_index: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn timestamp(&self) -> Option<Duration> {
        self.timestamp
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Pixel bytes of row `y`, without stride padding.
    pub fn row(&self, y: u32) -> &[u8] {
        let offset = y as usize * self.stride;
        &self.data[offset..offset + self.width as usize * RGB_CHANNELS]
    }

    pub fn frame_index(&self) -> Option<u64> {
        self.frame_index
    }

    pub fn with_frame_index(mut self, index: Option<u64>) -> Self {
        self.frame_index = index;
        self
    }

    pub fn with_timestamp(mut self, timestamp: Option<Duration>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Pixel rectangle in full-frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegionBounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl RegionBounds {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Moves every edge `px` pixels inwards. Returns `None` once nothing is left.
    pub fn shrink(&self, px: u32) -> Option<Self> {
        let width = self.width.checked_sub(px.checked_mul(2)?)?;
        let height = self.height.checked_sub(px.checked_mul(2)?)?;
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self {
            x: self.x + px,
            y: self.y + px,
            width,
            height,
        })
    }
}

/// Grayscale crop believed to contain subtitle glyphs.
///
/// Intensities are inverted relative to the source frame, so glyph strokes
/// are bright on a dark background.
#[derive(Clone, PartialEq, Eq)]
pub struct Region {
    bounds: RegionBounds,
    data: Vec<u8>,
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("bounds", &self.bounds)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl Region {
    pub fn from_owned(bounds: RegionBounds, data: Vec<u8>) -> FrameResult<Self> {
        let required = bounds.width as usize * bounds.height as usize;
        if data.len() != required {
            return Err(FrameError::InvalidFrame {
                reason: format!(
                    "region {}x{} expects {} bytes, got {}",
                    bounds.width,
                    bounds.height,
                    required,
                    data.len()
                ),
            });
        }
        Ok(Self { bounds, data })
    }

    pub fn bounds(&self) -> RegionBounds {
        self.bounds
    }

    pub fn width(&self) -> u32 {
        self.bounds.width
    }

    pub fn height(&self) -> u32 {
        self.bounds.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// One subtitle entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cue {
    #[serde(rename = "start_ms", serialize_with = "serialize_millis")]
    pub start: Duration,
    #[serde(rename = "end_ms", serialize_with = "serialize_millis")]
    pub end: Duration,
    pub text: String,
    pub start_frame: u64,
}

impl Cue {
    pub fn new(start: Duration, end: Duration, text: String, start_frame: u64) -> Self {
        Self {
            start,
            end,
            text,
            start_frame,
        }
    }
}

fn serialize_millis<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_millis() as u64)
}

/// Presentation time of frame `index`, computed as `index * (1000 / fps)` ms
/// and rounded to the microsecond.
pub fn frame_time(index: u64, fps: f64) -> Duration {
    if !(fps.is_finite() && fps > 0.0) {
        return Duration::ZERO;
    }
    let millis = index as f64 * (1000.0 / fps);
    Duration::from_micros((millis * 1000.0).round() as u64)
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("backend {backend} is not supported in this build")]
    Unsupported { backend: &'static str },

    #[error("{backend} backend failed: {message}")]
    BackendFailure {
        backend: &'static str,
        message: String,
    },

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("invalid frame: {reason}")]
    InvalidFrame { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    pub fn unsupported(backend: &'static str) -> Self {
        Self::Unsupported { backend }
    }

    pub fn backend_failure(backend: &'static str, message: impl Into<String>) -> Self {
        Self::BackendFailure {
            backend,
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rejects_short_buffers() {
        let err = VideoFrame::from_rgb_owned(4, 2, 12, None, vec![0; 20]).unwrap_err();
        assert!(matches!(err, FrameError::InvalidFrame { .. }));
    }

    #[test]
    fn frame_row_skips_stride_padding() {
        let mut data = vec![0u8; 16 * 2];
        data[16..28].fill(7);
        let frame = VideoFrame::from_rgb_owned(4, 2, 16, None, data).unwrap();
        assert_eq!(frame.row(1), &[7; 12]);
        assert_eq!(frame.row(0).len(), 12);
    }

    #[test]
    fn shrink_rejects_degenerate_rectangles() {
        assert_eq!(RegionBounds::new(0, 0, 2, 40).shrink(1), None);
        assert_eq!(RegionBounds::new(0, 0, 40, 1).shrink(1), None);
        assert_eq!(
            RegionBounds::new(5, 6, 40, 33).shrink(1),
            Some(RegionBounds::new(6, 7, 38, 31))
        );
    }

    #[test]
    fn region_checks_buffer_length() {
        let bounds = RegionBounds::new(0, 0, 3, 2);
        assert!(Region::from_owned(bounds, vec![0; 6]).is_ok());
        assert!(Region::from_owned(bounds, vec![0; 5]).is_err());
    }

    #[test]
    fn frame_time_matches_frame_rate() {
        assert_eq!(frame_time(0, 25.0), Duration::ZERO);
        assert_eq!(frame_time(25, 25.0), Duration::from_secs(1));
        assert_eq!(frame_time(3, 30.0), Duration::from_millis(100));
        assert_eq!(frame_time(10, 0.0), Duration::ZERO);
    }
}
