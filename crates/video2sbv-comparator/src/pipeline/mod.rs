pub mod ops;
pub mod report;

pub use report::{ComparisonReport, ReportMetric};
