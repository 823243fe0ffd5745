//! Float TIFF output with `.tfw` world-file sidecars. Existing targets are
//! deleted first so reruns regenerate cleanly.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use ndarray::ArrayView2;
use tiff::encoder::{colortype, TiffEncoder};

use crate::error::{PipelineError, Result};
use crate::spatial::raster::{GeoTransform, Raster};

fn remove_outputs(path: &Path) -> Result<()> {
    for target in [path.to_path_buf(), path.with_extension("tfw")] {
        if target.exists() {
            std::fs::remove_file(&target)?;
        }
    }
    Ok(())
}

fn write_world_file(path: &Path, transform: &GeoTransform) -> Result<()> {
    // world files reference the center of the top-left pixel
    let content = format!(
        "{}\n0.0\n0.0\n{}\n{}\n{}\n",
        transform.pixel_width,
        transform.pixel_height,
        transform.top_left_x + transform.pixel_width / 2.0,
        transform.top_left_y + transform.pixel_height / 2.0,
    );
    std::fs::write(path.with_extension("tfw"), content)?;
    Ok(())
}

fn encode_band(
    encoder: &mut TiffEncoder<BufWriter<File>>,
    band: ArrayView2<'_, f32>,
) -> Result<()> {
    let (rows, cols) = band.dim();
    let data: Vec<f32> = band.iter().copied().collect();
    encoder
        .write_image::<colortype::Gray32Float>(cols as u32, rows as u32, &data)
        .map_err(PipelineError::Tiff)?;
    Ok(())
}

/// Write a single band with its world file.
pub fn write_band(path: &Path, band: ArrayView2<'_, f32>, transform: &GeoTransform) -> Result<()> {
    remove_outputs(path)?;
    let file = BufWriter::new(File::create(path)?);
    let mut encoder = TiffEncoder::new(file)?;
    encode_band(&mut encoder, band)?;
    write_world_file(path, transform)?;
    Ok(())
}

/// Write every band of a raster as successive TIFF pages, with a world file.
pub fn write_raster(path: &Path, raster: &Raster) -> Result<()> {
    remove_outputs(path)?;
    let file = BufWriter::new(File::create(path)?);
    let mut encoder = TiffEncoder::new(file)?;
    for index in 0..raster.band_count() {
        encode_band(&mut encoder, raster.band(index))?;
    }
    write_world_file(path, &raster.transform)?;
    Ok(())
}
