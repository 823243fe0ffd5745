//! Zonal statistics: per-cell means of raster pixels falling inside each grid
//! cell polygon.

use geo::{BoundingRect, Intersects};
use geo_types::Point;

use crate::models::grid::GridCell;
use crate::models::table::GridId;
use crate::spatial::crs::Crs;
use crate::spatial::raster::Raster;
use std::collections::BTreeMap;

/// Mean of the finite pixel values of one band inside each cell.
///
/// The raster and the cells may be in different coordinate systems; pixel
/// centers are re-expressed in the cell CRS before the point-in-polygon test.
/// Cells with no covering pixel map to None.
pub fn zonal_mean(
    raster: &Raster,
    band: usize,
    raster_crs: &Crs,
    cells: &[GridCell],
    cell_crs: &Crs,
) -> BTreeMap<GridId, Option<f64>> {
    let values = raster.band(band);
    let mut means = BTreeMap::new();

    for cell in cells {
        let Some(rect) = cell.geometry.bounding_rect() else {
            means.insert(cell.id, None);
            continue;
        };

        // cell bounding box, expressed in the raster CRS, to bound the pixel
        // window that needs testing
        let corners = [
            (rect.min().x, rect.min().y),
            (rect.min().x, rect.max().y),
            (rect.max().x, rect.min().y),
            (rect.max().x, rect.max().y),
        ];
        let mut min_row = f64::INFINITY;
        let mut max_row = f64::NEG_INFINITY;
        let mut min_col = f64::INFINITY;
        let mut max_col = f64::NEG_INFINITY;
        for (x, y) in corners {
            let (rx, ry) = raster_crs.transform_from(cell_crs, x, y);
            let (row, col) = raster.transform.locate(rx, ry);
            min_row = min_row.min(row);
            max_row = max_row.max(row);
            min_col = min_col.min(col);
            max_col = max_col.max(col);
        }

        let row_start = min_row.floor().max(0.0) as usize;
        let col_start = min_col.floor().max(0.0) as usize;
        let row_end = ((max_row.ceil() as isize + 1).max(0) as usize).min(raster.height());
        let col_end = ((max_col.ceil() as isize + 1).max(0) as usize).min(raster.width());

        let mut sum = 0.0_f64;
        let mut count = 0_usize;
        for row in row_start..row_end {
            for col in col_start..col_end {
                let value = values[[row, col]];
                if !value.is_finite() {
                    continue;
                }
                let (x, y) = raster.transform.pixel_center(row, col);
                let (cx, cy) = cell_crs.transform_from(raster_crs, x, y);
                if cell.geometry.intersects(&Point::new(cx, cy)) {
                    sum += value as f64;
                    count += 1;
                }
            }
        }

        means.insert(
            cell.id,
            if count > 0 { Some(sum / count as f64) } else { None },
        );
    }

    means
}
