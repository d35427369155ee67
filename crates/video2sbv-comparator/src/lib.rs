//! Decides whether two subtitle crops show the same caption.

pub mod pipeline;
pub mod similarity;

pub use pipeline::{ComparisonReport, ReportMetric};
pub use similarity::{
    ComparatorSettings, DIFF_PX_COUNT_THRES, NOISE_INTENSITY, SMOOTH_KERNEL_SIZE,
    SimilarityComparator,
};

use video2sbv_types::Region;

/// Trait implemented by subtitle comparators.
pub trait SubtitleComparator: Send + Sync {
    /// Stable comparator name used for logging and diagnostics.
    fn name(&self) -> &'static str;

    /// Compares `current` against the previously kept `previous` region.
    ///
    /// The comparison is directional; callers must keep the argument order.
    fn compare(&self, previous: &Region, current: &Region) -> ComparisonReport;
}
