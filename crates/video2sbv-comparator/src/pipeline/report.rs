/// Individual metric emitted by a comparator.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportMetric {
    pub name: &'static str,
    pub value: f32,
}

impl ReportMetric {
    pub fn new(name: &'static str, value: f32) -> Self {
        Self { name, value }
    }
}

/// Comparison output returned to the tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonReport {
    pub same_segment: bool,
    pub details: Vec<ReportMetric>,
}

impl ComparisonReport {
    pub fn with_details(same_segment: bool, details: Vec<ReportMetric>) -> Self {
        Self {
            same_segment,
            details,
        }
    }

    pub fn metric(&self, name: &str) -> Option<f32> {
        self.details
            .iter()
            .find(|metric| metric.name == name)
            .map(|metric| metric.value)
    }
}
