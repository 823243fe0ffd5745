//! Decodes a downloaded reanalysis NetCDF file into a raster stack, one band
//! per daily timestep.

use std::path::Path;

use ndarray::Array3;
use netcdf::attribute::AttrValue;

use crate::error::{PipelineError, Result};
use crate::spatial::raster::{GeoTransform, Raster};

fn attr_f64(var: &netcdf::Variable<'_>, name: &str) -> Option<f64> {
    match var.attribute(name)?.value().ok()? {
        AttrValue::Double(v) => Some(v),
        AttrValue::Float(v) => Some(v as f64),
        AttrValue::Int(v) => Some(v as f64),
        AttrValue::Short(v) => Some(v as f64),
        _ => None,
    }
}

fn coordinate_values(file: &netcdf::File, names: &[&str]) -> Result<Vec<f64>> {
    for name in names {
        if let Some(var) = file.variable(name) {
            let values = var.values::<f64>(None, None)?;
            return Ok(values.into_iter().collect());
        }
    }
    Err(PipelineError::InvalidFormat(format!(
        "reanalysis file is missing a coordinate variable (tried {:?})",
        names
    )))
}

/// Read one variable of a reanalysis NetCDF file. The returned raster has one
/// band per timestep, rows following the file's latitude order, and a
/// geographic geotransform derived from the coordinate variables. Packed
/// values are unscaled through `scale_factor`/`add_offset`; fill values
/// become NaN.
pub fn read_reanalysis(path: &Path, variable: &str) -> Result<Raster> {
    let file = netcdf::open(path)?;

    let lats = coordinate_values(&file, &["latitude", "lat"])?;
    let lons = coordinate_values(&file, &["longitude", "lon"])?;
    let (n_rows, n_cols) = (lats.len(), lons.len());
    if n_rows < 2 || n_cols < 2 {
        return Err(PipelineError::InvalidFormat(
            "reanalysis grid is degenerate".to_string(),
        ));
    }

    let var = file.variable(variable).ok_or_else(|| {
        PipelineError::InvalidFormat(format!("missing variable {} in reanalysis file", variable))
    })?;

    let scale = attr_f64(&var, "scale_factor").unwrap_or(1.0);
    let offset = attr_f64(&var, "add_offset").unwrap_or(0.0);
    let fill = attr_f64(&var, "_FillValue").or_else(|| attr_f64(&var, "missing_value"));

    let raw = var.values::<f64>(None, None)?;
    let n_times = raw.len() / (n_rows * n_cols);
    if n_times * n_rows * n_cols != raw.len() {
        return Err(PipelineError::InvalidFormat(format!(
            "variable {} does not factor into (time, {}, {})",
            variable, n_rows, n_cols
        )));
    }

    let flat: Vec<f32> = raw
        .into_iter()
        .map(|value| {
            if fill.is_some_and(|f| value == f) {
                f32::NAN
            } else {
                (value * scale + offset) as f32
            }
        })
        .collect();
    let bands = Array3::from_shape_vec((n_times, n_rows, n_cols), flat)
        .map_err(|e| PipelineError::InvalidFormat(e.to_string()))?;

    // Coordinate variables give pixel centers; extend half a step outwards.
    let d_lon = (lons[n_cols - 1] - lons[0]) / (n_cols - 1) as f64;
    let d_lat = (lats[n_rows - 1] - lats[0]) / (n_rows - 1) as f64;
    let transform = GeoTransform {
        top_left_x: lons[0] - d_lon / 2.0,
        pixel_width: d_lon,
        top_left_y: lats[0] - d_lat / 2.0,
        pixel_height: d_lat,
    };

    Ok(Raster::new(bands, transform))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_sample(path: &Path, times: usize) {
        let mut file = netcdf::create(path).unwrap();
        file.add_dimension("time", times).unwrap();
        file.add_dimension("latitude", 3).unwrap();
        file.add_dimension("longitude", 4).unwrap();

        let mut lat = file
            .add_variable::<f64>("latitude", &["latitude"])
            .unwrap();
        lat.put_values(&[52.0, 51.0, 50.0], None, None).unwrap();
        let mut lon = file
            .add_variable::<f64>("longitude", &["longitude"])
            .unwrap();
        lon.put_values(&[-120.0, -119.0, -118.0, -117.0], None, None)
            .unwrap();

        let mut t2m = file
            .add_variable::<f64>("t2m", &["time", "latitude", "longitude"])
            .unwrap();
        let values: Vec<f64> = (0..times * 12).map(|i| 270.0 + i as f64).collect();
        t2m.put_values(&values, None, None).unwrap();
    }

    #[test]
    fn test_read_reanalysis_stack() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Dataset.nc");
        write_sample(&path, 2);

        let raster = read_reanalysis(&path, "t2m").unwrap();
        assert_eq!(raster.band_count(), 2);
        assert_eq!(raster.height(), 3);
        assert_eq!(raster.width(), 4);

        // first band, top-left pixel (lat 52, lon -120)
        assert_eq!(raster.bands[[0, 0, 0]], 270.0);
        // latitude decreases southwards in the file; transform follows it
        assert!(raster.transform.pixel_height < 0.0);

        // sampling at a coordinate returns all bands
        let values = raster.sample(-119.0, 51.0).unwrap();
        assert_eq!(values, vec![275.0, 287.0]);
    }

    #[test]
    fn test_missing_variable_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Dataset.nc");
        write_sample(&path, 1);
        assert!(read_reanalysis(&path, "tp").is_err());
    }
}
