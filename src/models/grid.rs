use geo_types::{MultiPolygon, Point};

use crate::models::table::GridId;
use crate::spatial::crs::Crs;

/// One cell of the provincial grid: a fixed-size rectangle clipped to the
/// province boundary, with a stable id and a sampling centroid.
#[derive(Debug, Clone)]
pub struct GridCell {
    pub id: GridId,
    pub geometry: MultiPolygon<f64>,
    pub centroid: Point<f64>,
}

/// The provincial grid layers, loaded from `clippedGrid.shp`/`centroids.shp`.
/// All geometries are in the boundary file's (projected) CRS.
#[derive(Debug, Clone)]
pub struct ProvincialGrid {
    pub cells: Vec<GridCell>,
    pub crs: Crs,
    pub crs_wkt: String,
}

impl ProvincialGrid {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn grid_ids(&self) -> impl Iterator<Item = GridId> + '_ {
        self.cells.iter().map(|c| c.id)
    }

    /// (id, centroid) pairs for raster sampling.
    pub fn centroids(&self) -> impl Iterator<Item = (GridId, Point<f64>)> + '_ {
        self.cells.iter().map(|c| (c.id, c.centroid))
    }
}
