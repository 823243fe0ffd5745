//! In-memory raster with an affine geotransform: the unit every download is
//! reduced to before sampling, masking, or zonal statistics.

use geo::{BoundingRect, Contains};
use geo_types::{MultiPolygon, Point};
use ndarray::{Array2, Array3, ArrayView2};

use crate::error::{PipelineError, Result};
use crate::spatial::crs::Crs;

/// North-up affine transform mapping pixel indices to CRS coordinates.
/// `pixel_height` is negative for the usual row-0-at-the-top orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub top_left_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Transform covering `bbox`-style extents with the given pixel counts,
    /// row 0 at `max_y`.
    pub fn from_extent(min_x: f64, max_x: f64, min_y: f64, max_y: f64, width: usize, height: usize) -> Self {
        Self {
            top_left_x: min_x,
            pixel_width: (max_x - min_x) / width as f64,
            top_left_y: max_y,
            pixel_height: -(max_y - min_y) / height as f64,
        }
    }

    /// Coordinates of a pixel center.
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.top_left_x + (col as f64 + 0.5) * self.pixel_width,
            self.top_left_y + (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Fractional (row, col) of a coordinate; (0, 0) is the center of the
    /// top-left pixel.
    pub fn locate(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (y - self.top_left_y) / self.pixel_height - 0.5,
            (x - self.top_left_x) / self.pixel_width - 0.5,
        )
    }
}

/// Resampling method for reprojection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resampling {
    Nearest,
    Bilinear,
}

/// A (possibly multi-band) raster tied to a geotransform. Band order is
/// (band, row, col); nodata is NaN.
#[derive(Debug, Clone)]
pub struct Raster {
    pub bands: Array3<f32>,
    pub transform: GeoTransform,
}

impl Raster {
    pub fn new(bands: Array3<f32>, transform: GeoTransform) -> Self {
        Self { bands, transform }
    }

    pub fn from_band(band: Array2<f32>, transform: GeoTransform) -> Self {
        let (rows, cols) = band.dim();
        let bands = band
            .into_shape((1, rows, cols))
            .expect("band reshape cannot fail");
        Self { bands, transform }
    }

    pub fn band_count(&self) -> usize {
        self.bands.dim().0
    }

    pub fn height(&self) -> usize {
        self.bands.dim().1
    }

    pub fn width(&self) -> usize {
        self.bands.dim().2
    }

    pub fn band(&self, index: usize) -> ArrayView2<'_, f32> {
        self.bands.index_axis(ndarray::Axis(0), index)
    }

    /// Nearest-pixel values of every band at a coordinate, or None when the
    /// point falls outside the raster.
    pub fn sample(&self, x: f64, y: f64) -> Option<Vec<f32>> {
        let (row_f, col_f) = self.transform.locate(x, y);
        let row = row_f.round();
        let col = col_f.round();
        if !row.is_finite()
            || !col.is_finite()
            || row < 0.0
            || col < 0.0
            || row >= self.height() as f64
            || col >= self.width() as f64
        {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        Some(
            (0..self.band_count())
                .map(|b| self.bands[[b, row, col]])
                .collect(),
        )
    }

    fn resample_band(&self, band: usize, row_f: f64, col_f: f64, method: Resampling) -> f32 {
        match method {
            Resampling::Nearest => {
                let row = row_f.round();
                let col = col_f.round();
                if !row.is_finite()
                    || !col.is_finite()
                    || row < 0.0
                    || col < 0.0
                    || row >= self.height() as f64
                    || col >= self.width() as f64
                {
                    f32::NAN
                } else {
                    self.bands[[band, row as usize, col as usize]]
                }
            }
            Resampling::Bilinear => {
                let r0 = row_f.floor();
                let c0 = col_f.floor();
                if !r0.is_finite()
                    || !c0.is_finite()
                    || r0 < 0.0
                    || c0 < 0.0
                    || r0 + 1.0 >= self.height() as f64
                    || c0 + 1.0 >= self.width() as f64
                {
                    // fall back to nearest on the border
                    return self.resample_band(band, row_f, col_f, Resampling::Nearest);
                }
                let (r0, c0) = (r0 as usize, c0 as usize);
                let fr = (row_f - r0 as f64) as f32;
                let fc = (col_f - c0 as f64) as f32;
                let v00 = self.bands[[band, r0, c0]];
                let v01 = self.bands[[band, r0, c0 + 1]];
                let v10 = self.bands[[band, r0 + 1, c0]];
                let v11 = self.bands[[band, r0 + 1, c0 + 1]];
                v00 * (1.0 - fr) * (1.0 - fc)
                    + v01 * (1.0 - fr) * fc
                    + v10 * fr * (1.0 - fc)
                    + v11 * fr * fc
            }
        }
    }

    /// Warp every band into the destination CRS, keeping the source pixel
    /// counts and covering the source footprint.
    pub fn reproject(&self, src_crs: &Crs, dst_crs: &Crs, method: Resampling) -> Result<Raster> {
        if src_crs == dst_crs {
            return Ok(self.clone());
        }

        let (width, height) = (self.width(), self.height());
        // Project the source outline (corners plus edge midpoints) to bound
        // the destination footprint.
        let mut min_x = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        let cols = [0.0, width as f64 / 2.0, width as f64];
        let rows = [0.0, height as f64 / 2.0, height as f64];
        for &row in &rows {
            for &col in &cols {
                let x = self.transform.top_left_x + col * self.transform.pixel_width;
                let y = self.transform.top_left_y + row * self.transform.pixel_height;
                let (dx, dy) = dst_crs.transform_from(src_crs, x, y);
                if !dx.is_finite() || !dy.is_finite() {
                    return Err(PipelineError::Crs(
                        "source raster footprint does not project into the target CRS".to_string(),
                    ));
                }
                min_x = min_x.min(dx);
                max_x = max_x.max(dx);
                min_y = min_y.min(dy);
                max_y = max_y.max(dy);
            }
        }

        let transform = GeoTransform::from_extent(min_x, max_x, min_y, max_y, width, height);
        let band_count = self.band_count();
        let mut bands = Array3::<f32>::from_elem((band_count, height, width), f32::NAN);

        for row in 0..height {
            for col in 0..width {
                let (x, y) = transform.pixel_center(row, col);
                let (sx, sy) = src_crs.transform_from(dst_crs, x, y);
                let (row_f, col_f) = self.transform.locate(sx, sy);
                for b in 0..band_count {
                    bands[[b, row, col]] = self.resample_band(b, row_f, col_f, method);
                }
            }
        }

        Ok(Raster { bands, transform })
    }

    /// Mask pixels outside the polygons with NaN and crop to the polygons'
    /// bounding rectangle. Polygons must be in the raster's CRS.
    pub fn mask(&self, shapes: &MultiPolygon<f64>) -> Result<Raster> {
        let rect = shapes
            .bounding_rect()
            .ok_or_else(|| PipelineError::Raster("mask geometry has no extent".to_string()))?;

        let (top_f, left_f) = self.transform.locate(rect.min().x, rect.max().y);
        let (bottom_f, right_f) = self.transform.locate(rect.max().x, rect.min().y);
        let top = top_f.floor().max(0.0) as usize;
        let left = left_f.floor().max(0.0) as usize;
        let bottom = (bottom_f.ceil() as usize + 1).min(self.height());
        let right = (right_f.ceil() as usize + 1).min(self.width());
        if top >= bottom || left >= right {
            return Err(PipelineError::Raster(
                "mask geometry does not overlap the raster".to_string(),
            ));
        }

        let (rows, cols) = (bottom - top, right - left);
        let band_count = self.band_count();
        let mut bands = Array3::<f32>::from_elem((band_count, rows, cols), f32::NAN);
        for row in 0..rows {
            for col in 0..cols {
                let (x, y) = self.transform.pixel_center(top + row, left + col);
                if shapes.contains(&Point::new(x, y)) {
                    for b in 0..band_count {
                        bands[[b, row, col]] = self.bands[[b, top + row, left + col]];
                    }
                }
            }
        }

        let transform = GeoTransform {
            top_left_x: self.transform.top_left_x + left as f64 * self.transform.pixel_width,
            pixel_width: self.transform.pixel_width,
            top_left_y: self.transform.top_left_y + top as f64 * self.transform.pixel_height,
            pixel_height: self.transform.pixel_height,
        };
        Ok(Raster { bands, transform })
    }
}

/// Centered finite differences of a band over actual pixel spacing, one-sided
/// at the edges: the (∂z/∂x, ∂z/∂y) pair used for slope and aspect.
pub fn gradient(band: ArrayView2<'_, f32>, dx: f64, dy: f64) -> (Array2<f32>, Array2<f32>) {
    let (rows, cols) = band.dim();
    let mut ddx = Array2::<f32>::zeros((rows, cols));
    let mut ddy = Array2::<f32>::zeros((rows, cols));

    for row in 0..rows {
        for col in 0..cols {
            ddx[[row, col]] = if cols == 1 {
                0.0
            } else if col == 0 {
                (band[[row, 1]] - band[[row, 0]]) / dx as f32
            } else if col == cols - 1 {
                (band[[row, col]] - band[[row, col - 1]]) / dx as f32
            } else {
                (band[[row, col + 1]] - band[[row, col - 1]]) / (2.0 * dx as f32)
            };

            ddy[[row, col]] = if rows == 1 {
                0.0
            } else if row == 0 {
                (band[[1, col]] - band[[0, col]]) / dy as f32
            } else if row == rows - 1 {
                (band[[row, col]] - band[[row - 1, col]]) / dy as f32
            } else {
                (band[[row + 1, col]] - band[[row - 1, col]]) / (2.0 * dy as f32)
            };
        }
    }

    (ddx, ddy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn unit_transform() -> GeoTransform {
        // 1 unit per pixel, origin at (0, 4), 4x4 raster covering y in [0,4]
        GeoTransform {
            top_left_x: 0.0,
            pixel_width: 1.0,
            top_left_y: 4.0,
            pixel_height: -1.0,
        }
    }

    #[test]
    fn test_locate_inverts_pixel_center() {
        let t = unit_transform();
        let (x, y) = t.pixel_center(1, 2);
        let (row, col) = t.locate(x, y);
        assert!((row - 1.0).abs() < 1e-12);
        assert!((col - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_sample_nearest() {
        let band = array![[1.0_f32, 2.0], [3.0, 4.0]];
        let raster = Raster::from_band(
            band,
            GeoTransform {
                top_left_x: 0.0,
                pixel_width: 1.0,
                top_left_y: 2.0,
                pixel_height: -1.0,
            },
        );
        assert_eq!(raster.sample(0.5, 1.5), Some(vec![1.0]));
        assert_eq!(raster.sample(1.5, 0.5), Some(vec![4.0]));
        assert_eq!(raster.sample(5.0, 5.0), None);
    }

    #[test]
    fn test_gradient_of_linear_ramp() {
        // z = 2x + 3y on a grid with dx=1, dy=1
        let mut band = Array2::<f32>::zeros((4, 4));
        for row in 0..4 {
            for col in 0..4 {
                band[[row, col]] = 2.0 * col as f32 + 3.0 * row as f32;
            }
        }
        let (ddx, ddy) = gradient(band.view(), 1.0, 1.0);
        for row in 0..4 {
            for col in 0..4 {
                assert!((ddx[[row, col]] - 2.0).abs() < 1e-6);
                assert!((ddy[[row, col]] - 3.0).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_mask_crops_and_nans_outside() {
        use geo_types::polygon;

        let band = Array2::<f32>::ones((4, 4));
        let raster = Raster::from_band(band, unit_transform());
        // polygon covering the lower-left 2x2 quadrant
        let poly = polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 0.0, y: 2.0),
            (x: 0.0, y: 0.0),
        ];
        let masked = raster.mask(&MultiPolygon::new(vec![poly])).unwrap();
        assert!(masked.height() <= 3 && masked.width() <= 3);
        // center of the quadrant is kept
        let v = masked.sample(1.0, 1.0).unwrap();
        assert_eq!(v[0], 1.0);
    }

    #[test]
    fn test_reproject_identity_crs_is_clone() {
        let band = array![[1.0_f32, 2.0], [3.0, 4.0]];
        let raster = Raster::from_band(band, unit_transform());
        let out = raster
            .reproject(&Crs::Geographic, &Crs::Geographic, Resampling::Bilinear)
            .unwrap();
        assert_eq!(out.bands, raster.bands);
    }
}
