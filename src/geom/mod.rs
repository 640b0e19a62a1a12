mod geom;
mod overlap;

pub use geom::{ensure_finite, union_all, Geometries, PointSet};
pub use overlap::{overlap_sketch_metrics, OverlapOperation, PointCountOverlap, PolygonAreaOverlap, ReferenceFeatures};
