//! Subtitle region localization.
//!
//! The bottom strip of a frame is converted to inverted luminance, binarized
//! against a noise threshold, and the largest connected component (by
//! bounding-box area) is cropped out as the candidate subtitle region.

mod components;

use thiserror::Error;
use video2sbv_types::{RGB_CHANNELS, Region, RegionBounds, VideoFrame};

pub use components::{ComponentRect, component_rects};
pub use video2sbv_types::NOISE_INTENSITY;

// Fraction of the frame height above which nothing is considered.
pub const DEFAULT_SEPARATOR: f64 = 0.87;
// Regions narrower or shorter than this are not worth recognizing.
pub const MIN_OCR_IMG_SIZE: u32 = 32;
// Pixels trimmed from each side of the detected rectangle.
const EDGE_SHRINK_PX: u32 = 1;

#[derive(Debug, Error, PartialEq)]
pub enum LocatorError {
    #[error("separator must lie strictly between 0 and 1 (got {value})")]
    InvalidSeparator { value: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocatorConfig {
    pub separator: f64,
    pub noise_intensity: u8,
    pub min_region_size: u32,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR,
            noise_intensity: NOISE_INTENSITY,
            min_region_size: MIN_OCR_IMG_SIZE,
        }
    }
}

impl LocatorConfig {
    pub fn validate(&self) -> Result<(), LocatorError> {
        if !(self.separator > 0.0 && self.separator < 1.0) {
            return Err(LocatorError::InvalidSeparator {
                value: self.separator,
            });
        }
        Ok(())
    }
}

pub struct RegionLocalizer {
    config: LocatorConfig,
}

impl RegionLocalizer {
    pub fn new(config: LocatorConfig) -> Result<Self, LocatorError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Finds the subtitle region in `frame`, or `None` when the bottom strip
    /// holds nothing large enough to recognize.
    pub fn locate(&self, frame: &VideoFrame) -> Option<Region> {
        let width = frame.width();
        let height = frame.height();
        let top = separator_row(height, self.config.separator);
        if width == 0 || top >= height {
            return None;
        }
        let strip_height = height - top;

        let inverted = inverted_luma(frame, top);
        let mask: Vec<u8> = inverted
            .iter()
            .map(|&value| u8::from(value > self.config.noise_intensity))
            .collect();

        let best = largest_component(&component_rects(
            &mask,
            width as usize,
            strip_height as usize,
        ))?;
        let min = self.config.min_region_size as usize;
        if best.width < min || best.height < min {
            return None;
        }

        let local = RegionBounds::new(
            best.x as u32,
            best.y as u32,
            best.width as u32,
            best.height as u32,
        )
        .shrink(EDGE_SHRINK_PX)?;

        let mut data = Vec::with_capacity(local.width as usize * local.height as usize);
        for y in local.y..local.y + local.height {
            let offset = y as usize * width as usize + local.x as usize;
            data.extend_from_slice(&inverted[offset..offset + local.width as usize]);
        }
        let bounds = RegionBounds {
            y: local.y + top,
            ..local
        };
        Region::from_owned(bounds, data).ok()
    }
}

/// First row of the bottom strip, `round(height * separator)`.
pub fn separator_row(height: u32, separator: f64) -> u32 {
    let row = (f64::from(height) * separator).round();
    if row <= 0.0 {
        0
    } else if row >= f64::from(height) {
        height
    } else {
        row as u32
    }
}

/// ITU-R BT.601 luma, rounded.
pub fn luma(rgb: &[u8]) -> u8 {
    let weighted = 299 * u32::from(rgb[0]) + 587 * u32::from(rgb[1]) + 114 * u32::from(rgb[2]);
    ((weighted + 500) / 1000) as u8
}

fn inverted_luma(frame: &VideoFrame, top: u32) -> Vec<u8> {
    let width = frame.width() as usize;
    let mut out = Vec::with_capacity(width * (frame.height() - top) as usize);
    for y in top..frame.height() {
        out.extend(
            frame
                .row(y)
                .chunks_exact(RGB_CHANNELS)
                .map(|pixel| 255 - luma(pixel)),
        );
    }
    out
}

// A later component replaces the current pick only with a strictly larger area.
fn largest_component(rects: &[ComponentRect]) -> Option<ComponentRect> {
    let mut best: Option<ComponentRect> = None;
    for rect in rects {
        match best {
            Some(current) if rect.area() <= current.area() => {}
            _ => best = Some(*rect),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: [u8; 3] = [255, 255, 255];
    const BLACK: [u8; 3] = [0, 0, 0];

    fn frame_with_boxes(width: u32, height: u32, boxes: &[(u32, u32, u32, u32)]) -> VideoFrame {
        let stride = width as usize * RGB_CHANNELS;
        let mut data = WHITE.repeat(width as usize * height as usize);
        for &(x0, y0, x1, y1) in boxes {
            for y in y0..y1 {
                for x in x0..x1 {
                    let offset = y as usize * stride + x as usize * RGB_CHANNELS;
                    data[offset..offset + RGB_CHANNELS].copy_from_slice(&BLACK);
                }
            }
        }
        VideoFrame::from_rgb_owned(width, height, stride, None, data).unwrap()
    }

    fn localizer() -> RegionLocalizer {
        RegionLocalizer::new(LocatorConfig::default()).unwrap()
    }

    #[test]
    fn luma_uses_bt601_weights() {
        assert_eq!(luma(&[255, 255, 255]), 255);
        assert_eq!(luma(&[0, 0, 0]), 0);
        assert_eq!(luma(&[255, 0, 0]), 76);
        assert_eq!(luma(&[0, 255, 0]), 150);
        assert_eq!(luma(&[0, 0, 255]), 29);
    }

    #[test]
    fn separator_row_rounds_and_clamps() {
        assert_eq!(separator_row(360, 0.87), 313);
        assert_eq!(separator_row(100, 0.5), 50);
        assert_eq!(separator_row(100, 1.5), 100);
        assert_eq!(separator_row(0, 0.87), 0);
    }

    #[test]
    fn rejects_out_of_range_separator() {
        for separator in [0.0, 1.0, -0.2, f64::NAN] {
            let config = LocatorConfig {
                separator,
                ..LocatorConfig::default()
            };
            assert!(RegionLocalizer::new(config).is_err());
        }
    }

    #[test]
    fn blank_frame_has_no_region() {
        let frame = frame_with_boxes(640, 360, &[]);
        assert!(localizer().locate(&frame).is_none());
    }

    #[test]
    fn zero_sized_frame_has_no_region() {
        let frame = VideoFrame::filled(0, 0, WHITE);
        assert!(localizer().locate(&frame).is_none());
    }

    #[test]
    fn caption_is_cropped_in_frame_coordinates() {
        let frame = frame_with_boxes(640, 360, &[(200, 318, 440, 354)]);
        let region = localizer().locate(&frame).unwrap();
        assert_eq!(region.bounds(), RegionBounds::new(201, 319, 238, 34));
        assert_eq!(region.data().len(), 238 * 34);
        assert!(region.data().iter().all(|&value| value == 255));
    }

    #[test]
    fn content_above_separator_is_ignored() {
        let frame = frame_with_boxes(640, 360, &[(100, 100, 400, 200)]);
        assert!(localizer().locate(&frame).is_none());
    }

    #[test]
    fn small_components_are_rejected() {
        let frame = frame_with_boxes(640, 360, &[(100, 320, 400, 350)]);
        assert!(localizer().locate(&frame).is_none());
    }

    #[test]
    fn largest_component_wins() {
        let frame = frame_with_boxes(
            640,
            360,
            &[(10, 316, 60, 356), (100, 316, 300, 356), (400, 316, 450, 356)],
        );
        let region = localizer().locate(&frame).unwrap();
        assert_eq!(region.bounds(), RegionBounds::new(101, 317, 198, 38));
    }

    #[test]
    fn equal_areas_keep_the_first_in_scan_order() {
        let frame = frame_with_boxes(640, 360, &[(300, 320, 350, 360), (10, 316, 60, 356)]);
        let region = localizer().locate(&frame).unwrap();
        assert_eq!(region.bounds().x, 11);
        assert_eq!(region.bounds().y, 317);
    }

    #[test]
    fn tiny_rectangles_never_survive_shrinking() {
        let config = LocatorConfig {
            min_region_size: 1,
            ..LocatorConfig::default()
        };
        let localizer = RegionLocalizer::new(config).unwrap();
        let thin = frame_with_boxes(640, 360, &[(100, 320, 102, 350)]);
        assert!(localizer.locate(&thin).is_none());
        let flat = frame_with_boxes(640, 360, &[(100, 320, 300, 322)]);
        assert!(localizer.locate(&flat).is_none());
        let ok = frame_with_boxes(640, 360, &[(100, 320, 103, 323)]);
        assert_eq!(
            localizer.locate(&ok).unwrap().bounds(),
            RegionBounds::new(101, 321, 1, 1)
        );
    }

    #[test]
    fn light_noise_below_threshold_is_background() {
        let frame = VideoFrame::filled(640, 360, [250, 250, 250]);
        assert!(localizer().locate(&frame).is_none());
        let frame = VideoFrame::filled(640, 360, [240, 240, 240]);
        let region = localizer().locate(&frame).unwrap();
        assert_eq!(region.bounds(), RegionBounds::new(1, 314, 638, 45));
    }
}
