//! Single-band float TIFF reading, with world-file (`.tfw`) sidecars carrying
//! the geotransform.

use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use ndarray::Array2;
use tiff::decoder::{Decoder, DecodingResult};

use crate::error::{PipelineError, Result};
use crate::spatial::raster::{GeoTransform, Raster};

/// Decode the first image of a TIFF stream into a float band.
pub fn decode_band<R: Read + Seek>(reader: R) -> Result<Array2<f32>> {
    let mut decoder = Decoder::new(reader)?;
    let (width, height) = decoder.dimensions()?;
    let shape = (height as usize, width as usize);

    let data: Vec<f32> = match decoder.read_image()? {
        DecodingResult::U8(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U16(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U32(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I16(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I32(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::F32(buf) => buf,
        DecodingResult::F64(buf) => buf.into_iter().map(|v| v as f32).collect(),
        _ => {
            return Err(PipelineError::InvalidFormat(
                "unsupported TIFF sample format".to_string(),
            ))
        }
    };

    Array2::from_shape_vec(shape, data)
        .map_err(|e| PipelineError::InvalidFormat(e.to_string()))
}

/// Decode a TIFF response body held in memory.
pub fn read_band_bytes(bytes: &[u8]) -> Result<Array2<f32>> {
    decode_band(Cursor::new(bytes))
}

/// Decode the first image of a TIFF file into a float band.
pub fn read_band(path: &Path) -> Result<Array2<f32>> {
    let file = File::open(path)?;
    decode_band(file)
}

/// Read a raster whose geotransform is known from its request parameters.
pub fn read_with_transform(path: &Path, transform: GeoTransform) -> Result<Raster> {
    Ok(Raster::from_band(read_band(path)?, transform))
}

/// Read a raster with its `.tfw` world-file sidecar.
pub fn read_with_world_file(path: &Path) -> Result<Raster> {
    let transform = read_world_file(path)?;
    Ok(Raster::from_band(read_band(path)?, transform))
}

/// Parse the 6-line ESRI world file next to a raster. Rotation terms must be
/// zero; the pipeline only produces north-up rasters.
pub fn read_world_file(path: &Path) -> Result<GeoTransform> {
    let tfw = path.with_extension("tfw");
    let text = std::fs::read_to_string(&tfw).map_err(|_| {
        PipelineError::Raster(format!("missing world file: {}", tfw.display()))
    })?;
    let values: Vec<f64> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| PipelineError::Raster(format!("malformed world file {}: {}", tfw.display(), e)))?;
    if values.len() != 6 {
        return Err(PipelineError::Raster(format!(
            "world file {} must have 6 lines",
            tfw.display()
        )));
    }
    if values[1] != 0.0 || values[2] != 0.0 {
        return Err(PipelineError::Raster(format!(
            "world file {} carries a rotated transform",
            tfw.display()
        )));
    }

    // world files reference the center of the top-left pixel
    Ok(GeoTransform {
        pixel_width: values[0],
        pixel_height: values[3],
        top_left_x: values[4] - values[0] / 2.0,
        top_left_y: values[5] - values[3] / 2.0,
    })
}
