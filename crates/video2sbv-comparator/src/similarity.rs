pub use video2sbv_types::NOISE_INTENSITY;
use video2sbv_types::Region;

use crate::SubtitleComparator;
use crate::pipeline::ops;
use crate::pipeline::{ComparisonReport, ReportMetric};

// Side of the square structuring element used to smooth the difference.
pub const SMOOTH_KERNEL_SIZE: usize = 5;
// More differing pixels than this means the caption changed.
pub const DIFF_PX_COUNT_THRES: usize = 10;

pub const METRIC_WIDTH_DELTA: &str = "width_delta";
pub const METRIC_CHAR_WIDTH: &str = "char_width";
pub const METRIC_DIFF_PIXELS: &str = "diff_pixels";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ComparatorSettings {
    pub noise_intensity: u8,
    pub smooth_kernel_size: usize,
    pub diff_px_count_threshold: usize,
}

impl Default for ComparatorSettings {
    fn default() -> Self {
        Self {
            noise_intensity: NOISE_INTENSITY,
            smooth_kernel_size: SMOOTH_KERNEL_SIZE,
            diff_px_count_threshold: DIFF_PX_COUNT_THRES,
        }
    }
}

/// Pixel-difference comparator.
///
/// Regions whose widths differ by at least half an approximate character
/// width are different outright. Otherwise the current region is resampled
/// to the previous region's size, the absolute difference is opened with a
/// square kernel to drop anti-aliasing noise, and the surviving pixels above
/// the noise level are counted.
pub struct SimilarityComparator {
    settings: ComparatorSettings,
}

impl SimilarityComparator {
    pub fn new(settings: ComparatorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ComparatorSettings {
        &self.settings
    }
}

impl Default for SimilarityComparator {
    fn default() -> Self {
        Self::new(ComparatorSettings::default())
    }
}

impl SubtitleComparator for SimilarityComparator {
    fn name(&self) -> &'static str {
        "pixel-diff"
    }

    fn compare(&self, previous: &Region, current: &Region) -> ComparisonReport {
        let char_width = f64::from(previous.height() + current.height()) / 2.0;
        let width_delta = previous.width().abs_diff(current.width());
        let mut details = vec![
            ReportMetric::new(METRIC_WIDTH_DELTA, width_delta as f32),
            ReportMetric::new(METRIC_CHAR_WIDTH, char_width as f32),
        ];
        if f64::from(width_delta) >= char_width / 2.0 {
            return ComparisonReport::with_details(false, details);
        }

        let width = previous.width() as usize;
        let height = previous.height() as usize;
        if width == 0 || height == 0 || current.width() == 0 || current.height() == 0 {
            return ComparisonReport::with_details(false, details);
        }

        let resized = ops::resize_bilinear(
            current.data(),
            current.width() as usize,
            current.height() as usize,
            width,
            height,
        );
        let diff = ops::abs_diff(&resized, previous.data());
        let smoothed = ops::open(&diff, width, height, self.settings.smooth_kernel_size);
        let diff_pixels = ops::count_above(&smoothed, self.settings.noise_intensity);
        details.push(ReportMetric::new(METRIC_DIFF_PIXELS, diff_pixels as f32));

        let same = diff_pixels <= self.settings.diff_px_count_threshold;
        ComparisonReport::with_details(same, details)
    }
}
