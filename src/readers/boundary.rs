//! Provincial boundary extraction from the national administrative boundary
//! shapefile.

use std::path::Path;

use geo_types::MultiPolygon;
use shapefile::dbase::FieldValue;

use crate::error::{PipelineError, Result};
use crate::models::Province;
use crate::readers::vector;
use crate::utils::constants::BOUNDARY_NAME_FIELD;

/// The province's polygons and the boundary file's `.prj` WKT.
pub fn read_province_boundary(
    boundary_path: &Path,
    province: Province,
) -> Result<(MultiPolygon<f64>, String)> {
    let wkt = vector::read_prj(boundary_path)?;

    let mut polygons = Vec::new();
    for (geometry, record) in vector::read_shapes(boundary_path)? {
        let name = match record.get(BOUNDARY_NAME_FIELD) {
            Some(FieldValue::Character(Some(name))) => name.trim().to_string(),
            _ => continue,
        };
        if name == province.name() {
            polygons.extend(vector::polygons_of(&geometry));
        }
    }

    if polygons.is_empty() {
        return Err(PipelineError::MissingData(format!(
            "no feature named {} in {}",
            province.name(),
            boundary_path.display()
        )));
    }

    Ok((MultiPolygon::new(polygons), wkt))
}

/// Read an already-generated provincial boundary (`Province.shp`).
pub fn read_saved_boundary(path: &Path) -> Result<(MultiPolygon<f64>, String)> {
    let wkt = vector::read_prj(path)?;
    let mut polygons = Vec::new();
    for (geometry, _) in vector::read_shapes(path)? {
        polygons.extend(vector::polygons_of(&geometry));
    }
    if polygons.is_empty() {
        return Err(PipelineError::MissingData(format!(
            "no polygons in {}",
            path.display()
        )));
    }
    Ok((MultiPolygon::new(polygons), wkt))
}
