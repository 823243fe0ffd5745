//! Loads the provincial grid layers generated by the grid builder.

use std::collections::BTreeMap;
use std::path::Path;

use geo_types::{Geometry, MultiPolygon, Point};
use shapefile::dbase::FieldValue;

use crate::error::{PipelineError, Result};
use crate::models::grid::{GridCell, ProvincialGrid};
use crate::models::table::GridId;
use crate::readers::vector;
use crate::spatial::crs::Crs;
use crate::utils::constants::{CENTROIDS_FILE, GRID_FILE};

fn record_id(record: &shapefile::dbase::Record) -> Option<GridId> {
    match record.get("id") {
        Some(FieldValue::Numeric(Some(id))) => Some(*id as GridId),
        _ => None,
    }
}

/// Load `clippedGrid.shp` + `centroids.shp` from a province directory,
/// joining the two layers on the `id` attribute.
pub fn load_grid(dir: &Path) -> Result<ProvincialGrid> {
    let grid_path = dir.join(GRID_FILE);
    let centroid_path = dir.join(CENTROIDS_FILE);
    if !grid_path.exists() || !centroid_path.exists() {
        return Err(PipelineError::MissingData(format!(
            "provincial grid layers missing in {} (run the grid command first)",
            dir.display()
        )));
    }

    let crs_wkt = vector::read_prj(&grid_path)?;
    let crs = Crs::from_wkt(&crs_wkt)?;

    let mut centroids: BTreeMap<GridId, Point<f64>> = BTreeMap::new();
    for (geometry, record) in vector::read_shapes(&centroid_path)? {
        if let (Some(id), Geometry::Point(point)) = (record_id(&record), geometry) {
            centroids.insert(id, point);
        }
    }

    let mut cells = Vec::new();
    for (geometry, record) in vector::read_shapes(&grid_path)? {
        let Some(id) = record_id(&record) else {
            continue;
        };
        let polygons = vector::polygons_of(&geometry);
        if polygons.is_empty() {
            continue;
        }
        let centroid = centroids.get(&id).copied().ok_or_else(|| {
            PipelineError::InvalidFormat(format!("grid cell {} has no centroid", id))
        })?;
        cells.push(GridCell {
            id,
            geometry: MultiPolygon::new(polygons),
            centroid,
        });
    }

    if cells.is_empty() {
        return Err(PipelineError::MissingData(format!(
            "empty grid layer in {}",
            dir.display()
        )));
    }

    Ok(ProvincialGrid {
        cells,
        crs,
        crs_wkt,
    })
}
