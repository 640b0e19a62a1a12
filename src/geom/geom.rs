use anyhow::Result;
use geo::{BooleanOps, BoundingRect, CoordsIter, MultiPolygon, Point, Rect};
use rstar::{RTree, RTreeObject, AABB};

use crate::error::ReportError;

/// R-tree entry: the envelope of one reference feature and its index in `shapes`.
#[derive(Debug, Clone, Copy)]
struct IndexedEnvelope {
    idx: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope { self.envelope }
}

fn envelope(rect: &Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners(rect.min().into(), rect.max().into())
}

/// Polygon reference features (e.g. coral or mangrove extents) indexed by bounding box.
/// Features are assumed not to overlap one another.
#[derive(Debug, Clone)]
pub struct Geometries {
    shapes: Vec<MultiPolygon<f64>>,
    rtree: RTree<IndexedEnvelope>,
}

impl Geometries {
    /// Construct a Geometries object from a vector of MultiPolygons.
    /// Empty MultiPolygons are kept but never returned by queries.
    pub fn new(polygons: Vec<MultiPolygon<f64>>) -> Self {
        Self {
            rtree: RTree::bulk_load(
                polygons.iter().enumerate()
                    .filter_map(|(idx, polygon)| polygon.bounding_rect().map(|rect| IndexedEnvelope { idx, envelope: envelope(&rect) }))
                    .collect()
            ),
            shapes: polygons,
        }
    }

    /// Get the number of features.
    #[inline] pub fn len(&self) -> usize { self.shapes.len() }

    /// Check if there are no features.
    #[inline] pub fn is_empty(&self) -> bool { self.shapes.is_empty() }

    /// Get a reference to the list of features.
    #[inline] pub fn shapes(&self) -> &[MultiPolygon<f64>] { &self.shapes }

    /// Indices of features whose bounding boxes intersect the given rectangle.
    pub(crate) fn query(&self, rect: &Rect<f64>) -> impl Iterator<Item = usize> + '_ {
        self.rtree.locate_in_envelope_intersecting(&envelope(rect))
            .map(|entry| entry.idx)
    }

    /// Compute the bounding rectangle of all features.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.shapes.iter()
            .filter_map(|polygon| polygon.bounding_rect())
            .reduce(|a, b| Rect::new(
                geo::Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                geo::Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
            ))
    }
}

/// Point reference features (e.g. dive sites) indexed for envelope queries.
#[derive(Debug, Clone)]
pub struct PointSet {
    rtree: RTree<[f64; 2]>,
}

impl PointSet {
    pub fn new(points: &[Point<f64>]) -> Self {
        Self { rtree: RTree::bulk_load(points.iter().map(|p| [p.x(), p.y()]).collect()) }
    }

    #[inline] pub fn len(&self) -> usize { self.rtree.size() }

    #[inline] pub fn is_empty(&self) -> bool { self.rtree.size() == 0 }

    /// Points inside the given rectangle (boundary inclusive).
    pub(crate) fn query(&self, rect: &Rect<f64>) -> impl Iterator<Item = Point<f64>> + '_ {
        self.rtree.locate_in_envelope(&envelope(rect)).map(|&[x, y]| Point::new(x, y))
    }
}

/// Union a list of MultiPolygons into one. An empty list yields an empty MultiPolygon.
/// This may be slow for large numbers of complex polygons.
pub fn union_all(shapes: &[MultiPolygon<f64>]) -> MultiPolygon<f64> {
    shapes.iter().cloned()
        .reduce(|a, b| a.union(&b))
        .unwrap_or_else(|| MultiPolygon::new(vec![]))
}

/// Reject geometry with non-finite coordinates before handing it to boolean ops.
pub fn ensure_finite(shape: &MultiPolygon<f64>, label: &str) -> Result<()> {
    if shape.coords_iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(ReportError::Geometry(format!("{label} has non-finite coordinates")).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use geo::{polygon, Area, MultiPolygon};

    use super::*;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)]])
    }

    #[test]
    fn union_of_overlapping_squares() {
        let union = union_all(&[rect(0.0, 0.0, 2.0, 2.0), rect(1.0, 0.0, 3.0, 2.0)]);
        assert!((union.unsigned_area() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn union_of_nothing_is_empty() {
        assert!(union_all(&[]).0.is_empty());
    }

    #[test]
    fn query_by_bounding_box() {
        let geoms = Geometries::new(vec![rect(0.0, 0.0, 1.0, 1.0), rect(5.0, 5.0, 6.0, 6.0)]);
        let hits: Vec<usize> = geoms.query(&geo::Rect::new((0.5, 0.5), (2.0, 2.0))).collect();
        assert_eq!(hits, vec![0]);
        assert_eq!(geoms.len(), 2);
        let bounds = geoms.bounds().unwrap();
        assert_eq!(bounds.max().x, 6.0);
    }

    #[test]
    fn query_skips_empty_features() {
        let geoms = Geometries::new(vec![MultiPolygon::new(vec![]), rect(1.0, 1.0, 2.0, 2.0)]);
        let hits: Vec<usize> = geoms.query(&geo::Rect::new((2.0, 2.0), (3.0, 3.0))).collect();
        assert_eq!(hits, vec![1]);
        assert_eq!(geoms.len(), 2);
    }

    #[test]
    fn point_query() {
        let points = PointSet::new(&[Point::new(0.5, 0.5), Point::new(3.0, 3.0)]);
        assert_eq!(points.query(&geo::Rect::new((0.0, 0.0), (1.0, 1.0))).count(), 1);
    }

    #[test]
    fn non_finite_is_rejected() {
        assert!(ensure_finite(&rect(0.0, 0.0, 1.0, 1.0), "ok").is_ok());
        assert!(ensure_finite(&rect(0.0, 0.0, f64::NAN, 1.0), "bad").is_err());
    }
}
