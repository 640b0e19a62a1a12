use std::collections::BTreeMap;

use anyhow::Result;
use rayon::prelude::*;
use tracing::debug;

use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::geom::{overlap_sketch_metrics, OverlapOperation, ReferenceFeatures};
use crate::group::GroupAggregator;
use crate::metric::{sort_metrics, Metric};
use crate::protection::ProtectionClassifier;
use crate::report::MetricGroup;
use crate::sketch::SketchInput;

/// Overlap of a sketch with every class of `metric_group`, plus protection
/// group totals.
///
/// Every class must have reference features. Lockout sketches get the raw
/// per-sketch metrics only. Otherwise each individual sketch is classified by
/// protection level and the group engine output is appended; lockout children
/// of a collection are reported raw and left out of every group.
pub fn class_overlap_report(
    config: &ReportConfig,
    metric_group: &MetricGroup,
    sketch: &SketchInput,
    features_by_class: &BTreeMap<String, ReferenceFeatures>,
    operation: &dyn OverlapOperation,
) -> Result<Vec<Metric>> {
    let features: Vec<(&str, &ReferenceFeatures)> = metric_group.class_ids()
        .map(|class_id| -> Result<(&str, &ReferenceFeatures)> {
            let features = features_by_class.get(class_id)
                .ok_or_else(|| ReportError::MissingFeatures(class_id.to_string()))?;
            Ok((class_id, features))
        })
        .collect::<Result<_>>()?;

    let metrics: Vec<Metric> = features.par_iter()
        .map(|&(class_id, features)| overlap_sketch_metrics(&metric_group.metric_id, class_id, features, sketch, operation))
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .flatten()
        .collect();

    let lockout_class_id = config.lockout_sketch_class_id.as_str();
    if sketch.is_lockout(lockout_class_id) {
        debug!(sketch = sketch.id(), "lockout sketch, skipping protection groups");
        return Ok(sort_metrics(metrics));
    }

    // Lockout children keep their raw metrics but never join a group.
    let classifier = ProtectionClassifier::from_config(config);
    let mut levels: BTreeMap<&str, &str> = BTreeMap::new();
    for child in sketch.sketches() {
        if child.is_lockout(lockout_class_id) {
            debug!(sketch = child.id(), "lockout child, excluded from protection groups");
            continue;
        }
        levels.insert(child.id(), classifier.classify(&child.properties)?);
    }
    let grouped_input: Vec<Metric> = metrics.iter()
        .filter(|metric| !sketch.sketch(metric.sketch_id().unwrap_or_default())
            .is_some_and(|child| child.is_lockout(lockout_class_id)))
        .cloned()
        .collect();

    let group_metrics = GroupAggregator::new(&metric_group.metric_id, &config.groups, features_by_class)
        .only_classes(metric_group.class_ids())
        .aggregate(
            sketch,
            &grouped_input,
            |metric: &Metric| metric.sketch_id().and_then(|id| levels.get(id)).map(|level| level.to_string()),
            operation,
        )?;

    Ok(sort_metrics(metrics.into_iter().chain(group_metrics).collect()))
}
