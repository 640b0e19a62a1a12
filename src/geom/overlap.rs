use anyhow::Result;
use geo::{Area, BooleanOps, BoundingRect, Intersects, MultiPolygon};
use rayon::prelude::*;

use crate::geom::{ensure_finite, union_all, Geometries, PointSet};
use crate::metric::Metric;
use crate::sketch::SketchInput;

/// Reference features for one class, measured against sketches.
#[derive(Debug, Clone)]
pub enum ReferenceFeatures {
    Polygons(Geometries),
    Points(PointSet),
}

/// The geometry overlap capability: measure how much of `features` the union
/// of `sketches` covers (an area, sum or count depending on the implementation).
///
/// Implementations must be deterministic; failures propagate to the caller
/// and are never retried.
pub trait OverlapOperation: Sync {
    fn overlap(&self, metric_id: &str, features: &ReferenceFeatures, sketches: &[MultiPolygon<f64>]) -> Result<f64>;
}

impl<F> OverlapOperation for F
where
    F: Fn(&str, &ReferenceFeatures, &[MultiPolygon<f64>]) -> Result<f64> + Sync,
{
    fn overlap(&self, metric_id: &str, features: &ReferenceFeatures, sketches: &[MultiPolygon<f64>]) -> Result<f64> {
        self(metric_id, features, sketches)
    }
}

/// Planar area of reference polygons covered by the sketches, in squared coordinate units.
/// Point features contribute nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolygonAreaOverlap;

impl OverlapOperation for PolygonAreaOverlap {
    fn overlap(&self, _metric_id: &str, features: &ReferenceFeatures, sketches: &[MultiPolygon<f64>]) -> Result<f64> {
        let ReferenceFeatures::Polygons(geoms) = features else { return Ok(0.0) };
        for (i, sketch) in sketches.iter().enumerate() {
            ensure_finite(sketch, &format!("sketch[{i}]"))?;
        }

        let union = union_all(sketches);
        let Some(rect) = union.bounding_rect() else { return Ok(0.0) };

        Ok(geoms.query(&rect)
            .map(|idx| geoms.shapes()[idx].intersection(&union).unsigned_area())
            .sum())
    }
}

/// Number of reference points that fall inside (or on the edge of) the sketches.
/// Polygon features contribute nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointCountOverlap;

impl OverlapOperation for PointCountOverlap {
    fn overlap(&self, _metric_id: &str, features: &ReferenceFeatures, sketches: &[MultiPolygon<f64>]) -> Result<f64> {
        let ReferenceFeatures::Points(points) = features else { return Ok(0.0) };
        for (i, sketch) in sketches.iter().enumerate() {
            ensure_finite(sketch, &format!("sketch[{i}]"))?;
        }

        let union = union_all(sketches);
        let Some(rect) = union.bounding_rect() else { return Ok(0.0) };

        Ok(points.query(&rect).filter(|point| union.intersects(point)).count() as f64)
    }
}

/// Per-sketch metrics for one class: one metric per individual sketch, and for
/// a collection one more for the collection as a whole (overlap with the union
/// of its children).
pub fn overlap_sketch_metrics(
    metric_id: &str,
    class_id: &str,
    features: &ReferenceFeatures,
    sketch: &SketchInput,
    operation: &dyn OverlapOperation,
) -> Result<Vec<Metric>> {
    let mut metrics = sketch.sketches().par_iter()
        .map(|child| -> Result<Metric> {
            let value = operation.overlap(metric_id, features, std::slice::from_ref(&child.geometry))?;
            Ok(Metric::new(metric_id, value).with_class(class_id).with_sketch(child.id()))
        })
        .collect::<Result<Vec<_>>>()?;

    if sketch.is_collection() {
        let value = operation.overlap(metric_id, features, &sketch.geometries())?;
        metrics.push(Metric::new(metric_id, value).with_class(class_id).with_sketch(sketch.id()));
    }

    Ok(metrics)
}
