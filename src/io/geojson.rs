use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use geo::{Coord, LineString, MultiPolygon, Point, Polygon};
use serde_json::Value;

use crate::geom::{Geometries, PointSet, ReferenceFeatures};
use crate::ous::RespondentShape;
use crate::sketch::{Sketch, SketchCollection, SketchInput, SketchProperties};

/// Read a sketch from GeoJSON bytes.
///
/// A `Feature` is a single sketch. A `FeatureCollection` is a sketch
/// collection whose own properties (id, name) sit on the collection object.
pub fn read_sketch_from_geojson_bytes(bytes: &[u8]) -> Result<SketchInput> {
    let value: Value = serde_json::from_slice(bytes).context("Failed to parse GeoJSON bytes")?;

    match value["type"].as_str() {
        Some("Feature") => Ok(parse_sketch(&value)?.into()),
        Some("FeatureCollection") => {
            let properties = parse_properties(&value["properties"])
                .context("Invalid sketch collection properties")?;
            let sketches = features(&value)?.iter()
                .map(parse_sketch)
                .collect::<Result<Vec<_>>>()?;
            Ok(SketchCollection { properties, sketches }.into())
        }
        other => bail!("Expected a GeoJSON Feature or FeatureCollection, found {other:?}"),
    }
}

/// Read reference features for one class from GeoJSON bytes.
/// A collection made only of points is read as a point set, otherwise as polygons.
pub fn read_reference_features_from_geojson_bytes(bytes: &[u8]) -> Result<ReferenceFeatures> {
    let value: Value = serde_json::from_slice(bytes).context("Failed to parse GeoJSON bytes")?;
    let geometries: Vec<&Value> = features(&value)?.iter()
        .map(|feature| &feature["geometry"])
        .filter(|geometry| !geometry.is_null())
        .collect();

    let is_point = |geometry: &&Value| matches!(geometry["type"].as_str(), Some("Point" | "MultiPoint"));
    if !geometries.is_empty() && geometries.iter().all(is_point) {
        let points = geometries.iter()
            .map(|geometry| parse_points(geometry))
            .collect::<Result<Vec<_>>>()?
            .concat();
        return Ok(ReferenceFeatures::Points(PointSet::new(&points)));
    }

    let polygons = geometries.iter()
        .map(|geometry| parse_polygonal(geometry))
        .collect::<Result<Vec<_>>>()?;
    Ok(ReferenceFeatures::Polygons(Geometries::new(polygons)))
}

/// Read survey shapes from GeoJSON bytes. Properties are kept as-is; features
/// without a polygonal geometry are rejected.
pub fn read_respondent_shapes_from_geojson_bytes(bytes: &[u8]) -> Result<Vec<RespondentShape>> {
    let value: Value = serde_json::from_slice(bytes).context("Failed to parse GeoJSON bytes")?;
    features(&value)?.iter()
        .enumerate()
        .map(|(idx, feature)| -> Result<RespondentShape> {
            let geometry = parse_polygonal(&feature["geometry"])
                .with_context(|| format!("Invalid geometry in survey feature {idx}"))?;
            let properties = feature["properties"].as_object().cloned().unwrap_or_default();
            Ok(RespondentShape::new(properties, geometry))
        })
        .collect()
}

pub fn read_sketch_from_geojson_file(path: &Path) -> Result<SketchInput> {
    read_sketch_from_geojson_bytes(&read_file(path)?)
        .with_context(|| format!("Failed to read sketch from {}", path.display()))
}

pub fn read_reference_features_from_geojson_file(path: &Path) -> Result<ReferenceFeatures> {
    read_reference_features_from_geojson_bytes(&read_file(path)?)
        .with_context(|| format!("Failed to read reference features from {}", path.display()))
}

pub fn read_respondent_shapes_from_geojson_file(path: &Path) -> Result<Vec<RespondentShape>> {
    read_respondent_shapes_from_geojson_bytes(&read_file(path)?)
        .with_context(|| format!("Failed to read survey shapes from {}", path.display()))
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read GeoJSON file: {}", path.display()))
}

fn features(value: &Value) -> Result<&Vec<Value>> {
    value["features"].as_array()
        .ok_or_else(|| anyhow!("Expected a GeoJSON FeatureCollection with a features array"))
}

fn parse_properties(value: &Value) -> Result<SketchProperties> {
    if value.is_null() { return Ok(SketchProperties::default()) }
    Ok(serde_json::from_value(value.clone())?)
}

fn parse_sketch(feature: &Value) -> Result<Sketch> {
    let properties = parse_properties(&feature["properties"])?;
    let geometry = parse_polygonal(&feature["geometry"])
        .with_context(|| format!("Invalid geometry for sketch {}", properties.id))?;
    Ok(Sketch::new(properties, geometry))
}

/// Parse a `Polygon` or `MultiPolygon` geometry object.
fn parse_polygonal(geometry: &Value) -> Result<MultiPolygon<f64>> {
    let coords = geometry["coordinates"].as_array()
        .ok_or_else(|| anyhow!("Geometry has no coordinates"))?;

    match geometry["type"].as_str() {
        Some("Polygon") => Ok(MultiPolygon(vec![parse_polygon_coords(coords)?])),
        Some("MultiPolygon") => {
            let polygons = coords.iter()
                .map(|polygon| -> Result<Polygon<f64>> {
                    let rings = polygon.as_array().ok_or_else(|| anyhow!("Invalid MultiPolygon: polygon is not an array"))?;
                    parse_polygon_coords(rings)
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(MultiPolygon(polygons))
        }
        other => bail!("Expected Polygon or MultiPolygon geometry, found {other:?}"),
    }
}

/// Parse `[exterior, hole, hole, ...]` rings.
fn parse_polygon_coords(rings: &[Value]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| -> Result<LineString<f64>> {
        let coords = ring.as_array().ok_or_else(|| anyhow!("Invalid Polygon: ring is not an array"))?;
        parse_ring_coords(coords)
    });

    let exterior = rings.next().ok_or_else(|| anyhow!("Invalid Polygon: missing exterior ring"))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

/// Parse a ring of `[x, y]` positions, closing it if needed.
fn parse_ring_coords(coords: &[Value]) -> Result<LineString<f64>> {
    let mut points = coords.iter()
        .map(parse_position)
        .collect::<Result<Vec<_>>>()?;

    if !points.is_empty() && points[0] != points[points.len() - 1] {
        points.push(points[0]);
    }
    Ok(LineString(points))
}

fn parse_position(position: &Value) -> Result<Coord<f64>> {
    let x = position[0].as_f64().ok_or_else(|| anyhow!("Invalid coordinate: x must be a number"))?;
    let y = position[1].as_f64().ok_or_else(|| anyhow!("Invalid coordinate: y must be a number"))?;
    Ok(Coord { x, y })
}

fn parse_points(geometry: &Value) -> Result<Vec<Point<f64>>> {
    let coords = &geometry["coordinates"];
    match geometry["type"].as_str() {
        Some("Point") => Ok(vec![parse_position(coords)?.into()]),
        Some("MultiPoint") => coords.as_array()
            .ok_or_else(|| anyhow!("Invalid MultiPoint coordinates"))?
            .iter()
            .map(|position| -> Result<Point<f64>> { Ok(parse_position(position)?.into()) })
            .collect(),
        other => bail!("Expected Point or MultiPoint geometry, found {other:?}"),
    }
}
