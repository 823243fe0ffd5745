pub mod crs;
pub mod raster;
pub mod zonal;

pub use crs::Crs;
pub use raster::{GeoTransform, Raster, Resampling};
