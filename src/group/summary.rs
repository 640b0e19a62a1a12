use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;

use crate::error::ReportError;
use crate::metric::Metric;

/// One row per group for the group summary table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub group_id: String,
    /// Sum of the group's collection totals over all classes.
    pub value: f64,
    /// `value` as a fraction of the summed class totals.
    pub perc_value: f64,
    /// Number of member sketches with a metric in the group.
    pub num_sketches: usize,
    /// Fraction of each class total held by the group.
    pub classes: BTreeMap<String, f64>,
}

fn class_total<'m>(totals: &'m [Metric], metric: &Metric) -> Result<&'m Metric> {
    totals.iter()
        .find(|t| t.is_total() && t.class_id() == metric.class_id())
        .ok_or_else(|| ReportError::MissingDenominator {
            metric_id: metric.metric_id.clone(),
            class_id: metric.class_id().unwrap_or_default().to_string(),
        }.into())
}

/// Flatten group metrics into one summary row per group present, in order of
/// first appearance. `total_metrics` holds one ungrouped total per class.
pub fn flatten_by_group_all_class(
    collection_id: &str,
    group_metrics: &[Metric],
    total_metrics: &[Metric],
) -> Result<Vec<GroupSummary>> {
    let mut order: Vec<&str> = Vec::new();
    for group_id in group_metrics.iter().filter_map(Metric::group_id) {
        if !order.contains(&group_id) { order.push(group_id); }
    }

    order.into_iter().map(|group_id| -> Result<GroupSummary> {
        let mut classes = BTreeMap::new();
        let mut value = 0.0;
        let mut denominator = 0.0;
        let mut members: Vec<&str> = Vec::new();

        for metric in group_metrics.iter().filter(|m| m.group_id() == Some(group_id)) {
            if metric.sketch_id() == Some(collection_id) {
                let total = class_total(total_metrics, metric)?.value;
                let ratio = if total == 0.0 { 0.0 } else { metric.value / total };
                classes.insert(metric.class_id().unwrap_or_default().to_string(), ratio);
                value += metric.value;
                denominator += total;
            } else if let Some(id) = metric.sketch_id() {
                if !members.contains(&id) { members.push(id); }
            }
        }

        Ok(GroupSummary {
            group_id: group_id.to_string(),
            value,
            perc_value: if denominator == 0.0 { 0.0 } else { value / denominator },
            num_sketches: members.len(),
            classes,
        })
    }).collect()
}

/// Check that, per class, the collection's group totals do not exceed the
/// class total. Totals are never clamped; an overshoot is an error.
pub fn verify_group_totals(collection_id: &str, group_metrics: &[Metric], totals: &[Metric]) -> Result<()> {
    let mut sums: BTreeMap<&str, (f64, &Metric)> = BTreeMap::new();
    for metric in group_metrics.iter()
        .filter(|m| m.group_id().is_some() && m.sketch_id() == Some(collection_id))
    {
        let entry = sums.entry(metric.class_id().unwrap_or_default()).or_insert((0.0, metric));
        entry.0 += metric.value;
    }

    for (class_id, (sum, metric)) in sums {
        let total = class_total(totals, metric)?.value;
        let tolerance = 1e-9 * total.abs().max(1.0);
        if sum > total + tolerance {
            return Err(ReportError::TotalExceeded { class_id: class_id.to_string(), sum, total }.into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group_metric(group: &str, class: &str, sketch: &str, value: f64) -> Metric {
        Metric::new("area", value).with_class(class).with_group(group).with_sketch(sketch)
    }

    fn totals() -> Vec<Metric> {
        vec![Metric::new("area", 10.0).with_class("coral"), Metric::new("area", 20.0).with_class("seagrass")]
    }

    #[test]
    fn flatten_rows_per_group() {
        let metrics = vec![
            group_metric("HIGH", "coral", "a", 2.0),
            group_metric("HIGH", "coral", "coll", 2.0),
            group_metric("HIGH", "seagrass", "a", 5.0),
            group_metric("HIGH", "seagrass", "coll", 5.0),
            group_metric("MEDIUM", "coral", "coll", 0.0),
            group_metric("MEDIUM", "seagrass", "coll", 0.0),
        ];
        let rows = flatten_by_group_all_class("coll", &metrics, &totals()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].group_id, "HIGH");
        assert_eq!(rows[0].num_sketches, 1);
        assert!((rows[0].value - 7.0).abs() < 1e-12);
        assert!((rows[0].perc_value - 7.0 / 30.0).abs() < 1e-12);
        assert!((rows[0].classes["coral"] - 0.2).abs() < 1e-12);
        assert_eq!(rows[1].num_sketches, 0);
        assert_eq!(rows[1].perc_value, 0.0);
    }

    #[test]
    fn flatten_requires_class_totals() {
        let metrics = vec![group_metric("HIGH", "kelp", "coll", 1.0)];
        assert!(flatten_by_group_all_class("coll", &metrics, &totals()).is_err());
    }

    #[test]
    fn totals_within_bounds() {
        let metrics = vec![group_metric("HIGH", "coral", "coll", 6.0), group_metric("MEDIUM", "coral", "coll", 4.0)];
        assert!(verify_group_totals("coll", &metrics, &totals()).is_ok());
    }

    #[test]
    fn overshoot_is_reported() {
        let metrics = vec![group_metric("HIGH", "coral", "coll", 6.0), group_metric("MEDIUM", "coral", "coll", 5.0)];
        let err = verify_group_totals("coll", &metrics, &totals()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ReportError>(),
            Some(ReportError::TotalExceeded { class_id, .. }) if class_id == "coral"
        ));
    }
}
