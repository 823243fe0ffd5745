//! Bounding-box to image-dimension resolution, shared by the imagery and DEM
//! requests.

use crate::models::province::BoundingBox;
use crate::utils::constants::{MAX_PIXELS, METERS_PER_DEGREE_LAT, METERS_PER_DEGREE_LON};

/// Pixel dimensions for a bounding box at the given target resolution.
///
/// Width and height come from the approximate metric extent of the box; either
/// axis is capped at the process API's limit of 2500 pixels.
pub fn image_dimensions(bbox: &BoundingBox, meters_per_pixel: f64) -> (usize, usize) {
    let width_meters = (bbox.east - bbox.west) * METERS_PER_DEGREE_LON;
    let height_meters = (bbox.north - bbox.south) * METERS_PER_DEGREE_LAT;

    let width = ((width_meters / meters_per_pixel) as usize).min(MAX_PIXELS);
    let height = ((height_meters / meters_per_pixel) as usize).min(MAX_PIXELS);

    (width.max(1), height.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_box_is_not_capped() {
        // ~1 degree square at 1000 m/px is ~111 x 110 pixels
        let bbox = BoundingBox {
            north: 50.0,
            west: -111.0,
            south: 49.0,
            east: -110.0,
        };
        let (w, h) = image_dimensions(&bbox, 1_000.0);
        assert_eq!(w, 111);
        assert_eq!(h, 110);
    }

    #[test]
    fn test_wide_box_caps_at_api_limit() {
        // British Columbia: ~25 degrees of longitude exceeds 2500 px at 1 km
        let bbox = BoundingBox {
            north: 60.01,
            west: -139.04,
            south: 48.25,
            east: -114.08,
        };
        let (w, h) = image_dimensions(&bbox, 1_000.0);
        assert_eq!(w, MAX_PIXELS);
        assert_eq!(h, 1300);
    }
}
