use std::collections::BTreeMap;

use anyhow::Result;

use crate::config::NO_PROTECTION;
use crate::metric::{sort_metrics, Metric};
use crate::protection::ProtectionClassifier;
use crate::sketch::SketchInput;

/// Count individual sketches per protection level.
///
/// Lockout sketches are counted as `NO_PROTECTION`. Emits one metric per level
/// present, with both `class_id` and `group_id` set to the level.
pub fn protection_counts(
    metric_id: &str,
    sketch: &SketchInput,
    classifier: &ProtectionClassifier,
    lockout_class_id: &str,
) -> Result<Vec<Metric>> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for child in sketch.sketches() {
        let level = if child.is_lockout(lockout_class_id) {
            NO_PROTECTION
        } else {
            classifier.classify(&child.properties)?
        };
        *counts.entry(level).or_default() += 1;
    }

    Ok(sort_metrics(counts.into_iter()
        .map(|(level, count)| Metric::new(metric_id, count as f64).with_class(level).with_group(level))
        .collect()))
}
