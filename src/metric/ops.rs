use ahash::AHashMap;
use anyhow::Result;

use crate::error::ReportError;
use crate::metric::Metric;

/// Sort metrics by metric id, class id, group id, then sketch id.
/// `None` sorts before any value.
pub fn sort_metrics(mut metrics: Vec<Metric>) -> Vec<Metric> {
    metrics.sort_by(|a, b| {
        (&a.metric_id, &a.class_id, &a.group_id, &a.sketch_id)
            .cmp(&(&b.metric_id, &b.class_id, &b.group_id, &b.sketch_id))
    });
    metrics
}

/// Convert numerator metrics into fractions of the matching total metric.
///
/// Totals are matched on `(metric_id, class_id)`. The output keeps the
/// numerator's tags, renames the metric id to `percent_metric_id` when given,
/// and reports 0 where the total is 0.
pub fn to_percent_metrics(
    numerators: &[Metric],
    totals: &[Metric],
    percent_metric_id: Option<&str>,
) -> Result<Vec<Metric>> {
    let denominators: AHashMap<(&str, Option<&str>), f64> = totals.iter()
        .map(|m| ((m.metric_id.as_str(), m.class_id()), m.value))
        .collect();

    numerators.iter().map(|metric| -> Result<Metric> {
        let total = *denominators.get(&(metric.metric_id.as_str(), metric.class_id()))
            .ok_or_else(|| ReportError::MissingDenominator {
                metric_id: metric.metric_id.clone(),
                class_id: metric.class_id().unwrap_or_default().to_string(),
            })?;

        let mut percent = metric.clone();
        percent.value = if total == 0.0 { 0.0 } else { metric.value / total };
        if let Some(id) = percent_metric_id { percent.metric_id = id.to_string(); }
        Ok(percent)
    }).collect()
}
