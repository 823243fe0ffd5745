//! Shared shapefile plumbing: geometry conversion, `.prj` sidecars.

use std::path::Path;

use geo::Winding;
use geo_types::{Geometry, MultiPolygon, Polygon};
use shapefile::{Point as ShpPoint, PointZ, Polygon as ShpPolygon, PolygonRing};

use crate::error::{PipelineError, Result};

/// All (geometry, attribute record) pairs of a shapefile, converted to
/// geo-types. Shapes without a geo-types mapping are skipped.
pub fn read_shapes(
    path: &Path,
) -> Result<Vec<(Geometry<f64>, shapefile::dbase::Record)>> {
    let mut reader = shapefile::Reader::from_path(path)?;
    let mut out = Vec::new();
    for pair in reader.iter_shapes_and_records() {
        let (shape, record) = pair?;
        if let Some(geometry) = shape_to_geometry(shape) {
            out.push((geometry, record));
        }
    }
    Ok(out)
}

/// Collect the polygonal parts of a geometry into a multipolygon.
pub fn polygons_of(geometry: &Geometry<f64>) -> Vec<Polygon<f64>> {
    match geometry {
        Geometry::Polygon(p) => vec![p.clone()],
        Geometry::MultiPolygon(mp) => mp.0.clone(),
        Geometry::GeometryCollection(gc) => gc.iter().flat_map(polygons_of).collect(),
        _ => Vec::new(),
    }
}

/// Convert a multipolygon into a shapefile polygon shape. Ring winding
/// follows the ESRI convention (outer clockwise, holes counter-clockwise).
pub fn to_shp_polygon(shapes: &MultiPolygon<f64>) -> ShpPolygon {
    let mut rings = Vec::new();
    for polygon in &shapes.0 {
        let mut exterior = polygon.exterior().clone();
        exterior.make_cw_winding();
        rings.push(PolygonRing::Outer(ring_points(&exterior)));
        for interior in polygon.interiors() {
            let mut interior = interior.clone();
            interior.make_ccw_winding();
            rings.push(PolygonRing::Inner(ring_points(&interior)));
        }
    }
    ShpPolygon::with_rings(rings)
}

fn ring_points(ring: &geo_types::LineString<f64>) -> Vec<ShpPoint> {
    let mut points: Vec<ShpPoint> = ring.coords().map(|c| ShpPoint::new(c.x, c.y)).collect();
    if points.first().map(|p| (p.x, p.y)) != points.last().map(|p| (p.x, p.y)) {
        if let Some(first) = points.first().copied() {
            points.push(first);
        }
    }
    points
}

/// Flatten a shapefile geometry that may carry Z/M into plain polygons.
pub fn shape_to_geometry(shape: shapefile::Shape) -> Option<Geometry<f64>> {
    match shape {
        shapefile::Shape::PolygonZ(p) => {
            let flat = ShpPolygon::with_rings(
                p.rings()
                    .iter()
                    .map(|ring| {
                        let points: Vec<ShpPoint> = ring
                            .points()
                            .iter()
                            .map(|p: &PointZ| ShpPoint::new(p.x, p.y))
                            .collect();
                        match ring {
                            shapefile::PolygonRing::Outer(_) => PolygonRing::Outer(points),
                            shapefile::PolygonRing::Inner(_) => PolygonRing::Inner(points),
                        }
                    })
                    .collect(),
            );
            Geometry::<f64>::try_from(shapefile::Shape::Polygon(flat)).ok()
        }
        shapefile::Shape::PointZ(p) => Some(Geometry::Point(geo_types::Point::new(p.x, p.y))),
        shapefile::Shape::PointM(p) => Some(Geometry::Point(geo_types::Point::new(p.x, p.y))),
        other => Geometry::<f64>::try_from(other).ok(),
    }
}

/// Read the `.prj` sidecar of a shapefile.
pub fn read_prj(shp_path: &Path) -> Result<String> {
    let prj = shp_path.with_extension("prj");
    std::fs::read_to_string(&prj).map_err(|_| {
        PipelineError::Crs(format!(
            "missing projection sidecar: {}",
            prj.display()
        ))
    })
}

/// Write the `.prj` sidecar next to a generated shapefile.
pub fn write_prj(shp_path: &Path, wkt: &str) -> Result<()> {
    std::fs::write(shp_path.with_extension("prj"), wkt)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::polygon;

    #[test]
    fn test_ring_points_closes_open_rings() {
        let open = geo_types::LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
        let points = ring_points(&open);
        assert_eq!(points.len(), 4);
        assert_eq!((points[0].x, points[0].y), (points[3].x, points[3].y));
    }

    #[test]
    fn test_polygon_round_trip_through_shapefile_types() {
        let original = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 0.0, y: 2.0),
            (x: 0.0, y: 0.0),
        ]]);
        let shp = to_shp_polygon(&original);
        let back = Geometry::<f64>::try_from(shapefile::Shape::Polygon(shp)).unwrap();
        let polygons = polygons_of(&back);
        assert_eq!(polygons.len(), 1);
    }
}
