mod metric;
mod ops;

pub use metric::{Metric, MetricKey};
pub use ops::{sort_metrics, to_percent_metrics};
