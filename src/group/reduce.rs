use anyhow::Result;
use geo::{BooleanOps, MultiPolygon};

use crate::geom::{ensure_finite, union_all, OverlapOperation, ReferenceFeatures};

/// Overlap between `features` and the sketches of one group, with territory
/// claimed by higher-ranked groups removed first.
///
/// Each group sketch is differenced against the union of the higher sketches;
/// empty remainders are dropped and what is left is flattened into single
/// polygons. The overlap operation then runs once over that set, so sketches
/// of the same group never count twice.
pub(super) fn reduced_group_overlap(
    metric_id: &str,
    group_sketches: &[&MultiPolygon<f64>],
    higher_sketches: &[&MultiPolygon<f64>],
    features: &ReferenceFeatures,
    operation: &dyn OverlapOperation,
) -> Result<f64> {
    if group_sketches.is_empty() { return Ok(0.0) }

    if higher_sketches.is_empty() {
        let sketches: Vec<MultiPolygon<f64>> = group_sketches.iter().map(|&s| s.clone()).collect();
        return operation.overlap(metric_id, features, &sketches);
    }

    for (i, shape) in group_sketches.iter().chain(higher_sketches).enumerate() {
        ensure_finite(shape, &format!("group sketch[{i}]"))?;
    }

    let higher: Vec<MultiPolygon<f64>> = higher_sketches.iter().map(|&s| s.clone()).collect();
    let higher_union = union_all(&higher);

    let remaining: Vec<MultiPolygon<f64>> = group_sketches.iter()
        .map(|sketch| sketch.difference(&higher_union))
        .filter(|diff| !diff.0.is_empty())
        .flat_map(|diff| diff.0.into_iter().map(|polygon| MultiPolygon::new(vec![polygon])))
        .collect();

    if remaining.is_empty() { return Ok(0.0) }
    operation.overlap(metric_id, features, &remaining)
}
