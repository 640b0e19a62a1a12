mod class_overlap;
mod metric_group;

pub use class_overlap::class_overlap_report;
pub use metric_group::{DataClass, MetricGroup};
