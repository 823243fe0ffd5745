//! Coordinate reference systems of the datasets this pipeline touches:
//! geographic WGS84 (all the web APIs) and Lambert Conformal Conic (the
//! Canadian boundary and fire products). Parsed from shapefile `.prj` WKT.

use geo::MapCoords;
use geo_types::Coord;

use crate::error::{PipelineError, Result};

/// Ellipsoidal Lambert Conformal Conic (two standard parallels), Snyder's
/// formulation. Angles in the parameter struct are degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct LambertConformalConic {
    pub lat_origin: f64,
    pub lon_origin: f64,
    pub parallel_1: f64,
    pub parallel_2: f64,
    pub false_easting: f64,
    pub false_northing: f64,
    pub semi_major: f64,
    pub inverse_flattening: f64,
    // derived constants
    e: f64,
    n: f64,
    f: f64,
    rho_0: f64,
}

impl LambertConformalConic {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        lat_origin: f64,
        lon_origin: f64,
        parallel_1: f64,
        parallel_2: f64,
        false_easting: f64,
        false_northing: f64,
        semi_major: f64,
        inverse_flattening: f64,
    ) -> Result<Self> {
        let flattening = 1.0 / inverse_flattening;
        let e = (flattening * (2.0 - flattening)).sqrt();

        let phi_0 = lat_origin.to_radians();
        let phi_1 = parallel_1.to_radians();
        let phi_2 = parallel_2.to_radians();

        let m1 = Self::m(e, phi_1);
        let m2 = Self::m(e, phi_2);
        let t0 = Self::t(e, phi_0);
        let t1 = Self::t(e, phi_1);
        let t2 = Self::t(e, phi_2);

        let n = if (parallel_1 - parallel_2).abs() < 1e-9 {
            phi_1.sin()
        } else {
            (m1.ln() - m2.ln()) / (t1.ln() - t2.ln())
        };
        if n.abs() < 1e-12 {
            return Err(PipelineError::Crs(
                "degenerate Lambert Conformal Conic parallels".to_string(),
            ));
        }
        let f = m1 / (n * t1.powf(n));
        let rho_0 = semi_major * f * t0.powf(n);

        Ok(Self {
            lat_origin,
            lon_origin,
            parallel_1,
            parallel_2,
            false_easting,
            false_northing,
            semi_major,
            inverse_flattening,
            e,
            n,
            f,
            rho_0,
        })
    }

    fn m(e: f64, phi: f64) -> f64 {
        phi.cos() / (1.0 - e * e * phi.sin() * phi.sin()).sqrt()
    }

    fn t(e: f64, phi: f64) -> f64 {
        let es = e * phi.sin();
        (std::f64::consts::FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
    }

    /// Geographic (lon, lat) degrees to projected (x, y).
    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let phi = lat.to_radians();
        let rho = self.semi_major * self.f * Self::t(self.e, phi).powf(self.n);
        let theta = self.n * (lon - self.lon_origin).to_radians();

        let x = self.false_easting + rho * theta.sin();
        let y = self.false_northing + self.rho_0 - rho * theta.cos();
        (x, y)
    }

    /// Projected (x, y) back to geographic (lon, lat) degrees.
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let dx = x - self.false_easting;
        let dy = self.rho_0 - (y - self.false_northing);

        let rho = (dx * dx + dy * dy).sqrt() * self.n.signum();
        let theta = (dx * self.n.signum()).atan2(dy * self.n.signum());
        let lon = theta / self.n + self.lon_origin.to_radians();

        let t = (rho / (self.semi_major * self.f)).powf(1.0 / self.n);
        // iterate the conformal latitude back to geodetic
        let mut phi = std::f64::consts::FRAC_PI_2 - 2.0 * t.atan();
        for _ in 0..8 {
            let es = self.e * phi.sin();
            let next = std::f64::consts::FRAC_PI_2
                - 2.0 * (t * ((1.0 - es) / (1.0 + es)).powf(self.e / 2.0)).atan();
            if (next - phi).abs() < 1e-12 {
                phi = next;
                break;
            }
            phi = next;
        }

        (lon.to_degrees(), phi.to_degrees())
    }
}

/// A coordinate reference system this pipeline can transform through.
#[derive(Debug, Clone, PartialEq)]
pub enum Crs {
    /// Geographic longitude/latitude, WGS84-compatible datum.
    Geographic,
    /// Projected Lambert Conformal Conic, units meters.
    Lambert(LambertConformalConic),
}

impl Crs {
    pub fn is_projected(&self) -> bool {
        matches!(self, Crs::Lambert(_))
    }

    /// Parse the CRS out of `.prj` WKT. Recognizes geographic WKT and the
    /// Lambert Conformal Conic family; anything else is an error.
    pub fn from_wkt(wkt: &str) -> Result<Crs> {
        if wkt.contains("PROJECTION") {
            if !wkt.contains("Lambert_Conformal_Conic") {
                return Err(PipelineError::Crs(format!(
                    "unsupported projection in WKT: {}",
                    wkt.chars().take(80).collect::<String>()
                )));
            }
            let (semi_major, inverse_flattening) = parse_spheroid(wkt)?;
            let parallel_1 = parse_parameter(wkt, "standard_parallel_1")
                .ok_or_else(|| PipelineError::Crs("missing standard_parallel_1".into()))?;
            let parallel_2 = parse_parameter(wkt, "standard_parallel_2").unwrap_or(parallel_1);
            let lcc = LambertConformalConic::new(
                parse_parameter(wkt, "latitude_of_origin").unwrap_or(0.0),
                parse_parameter(wkt, "central_meridian").unwrap_or(0.0),
                parallel_1,
                parallel_2,
                parse_parameter(wkt, "false_easting").unwrap_or(0.0),
                parse_parameter(wkt, "false_northing").unwrap_or(0.0),
                semi_major,
                inverse_flattening,
            )?;
            Ok(Crs::Lambert(lcc))
        } else if wkt.contains("GEOGCS") {
            Ok(Crs::Geographic)
        } else {
            Err(PipelineError::Crs(
                "unrecognized coordinate system WKT".to_string(),
            ))
        }
    }

    /// Projected/geographic coordinates to geographic (lon, lat).
    pub fn to_geographic(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Crs::Geographic => (x, y),
            Crs::Lambert(lcc) => lcc.inverse(x, y),
        }
    }

    /// Geographic (lon, lat) to this CRS.
    pub fn from_geographic(&self, lon: f64, lat: f64) -> (f64, f64) {
        match self {
            Crs::Geographic => (lon, lat),
            Crs::Lambert(lcc) => lcc.forward(lon, lat),
        }
    }

    /// Coordinates in `from`, re-expressed in `self`.
    pub fn transform_from(&self, from: &Crs, x: f64, y: f64) -> (f64, f64) {
        if self == from {
            return (x, y);
        }
        let (lon, lat) = from.to_geographic(x, y);
        self.from_geographic(lon, lat)
    }
}

/// Re-express every coordinate of a geometry in another CRS.
pub fn transform_geometry(
    geometry: &geo_types::Geometry<f64>,
    from: &Crs,
    to: &Crs,
) -> geo_types::Geometry<f64> {
    if from == to {
        return geometry.clone();
    }
    geometry.map_coords(|Coord { x, y }| {
        let (x, y) = to.transform_from(from, x, y);
        Coord { x, y }
    })
}

/// Extract a `PARAMETER["name",value]` entry from WKT.
fn parse_parameter(wkt: &str, name: &str) -> Option<f64> {
    let lower = wkt.to_lowercase();
    let tag = format!("parameter[\"{}\"", name.to_lowercase());
    let start = lower.find(&tag)? + tag.len();
    let rest = &wkt[start..];
    let value = rest
        .trim_start_matches([',', ' '])
        .split(']')
        .next()?
        .trim();
    value.parse().ok()
}

/// Extract semi-major axis and inverse flattening from `SPHEROID[...]`.
fn parse_spheroid(wkt: &str) -> Result<(f64, f64)> {
    let lower = wkt.to_lowercase();
    let start = lower
        .find("spheroid[")
        .ok_or_else(|| PipelineError::Crs("missing SPHEROID in WKT".to_string()))?;
    let rest = &wkt[start..];
    let body = rest
        .split('[')
        .nth(1)
        .and_then(|s| s.split(']').next())
        .ok_or_else(|| PipelineError::Crs("malformed SPHEROID in WKT".to_string()))?;
    let mut parts = body.split(',').skip(1); // skip the name
    let semi_major = parts
        .next()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .ok_or_else(|| PipelineError::Crs("malformed SPHEROID semi-major axis".to_string()))?;
    let inverse_flattening = parts
        .next()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .ok_or_else(|| PipelineError::Crs("malformed SPHEROID flattening".to_string()))?;
    Ok((semi_major, inverse_flattening))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Statistics Canada Lambert, the CRS of the national boundary file.
    pub const STATCAN_LAMBERT_WKT: &str = r#"PROJCS["NAD83_Statistics_Canada_Lambert",GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Lambert_Conformal_Conic"],PARAMETER["False_Easting",6200000.0],PARAMETER["False_Northing",3000000.0],PARAMETER["Central_Meridian",-91.866667],PARAMETER["Standard_Parallel_1",49.0],PARAMETER["Standard_Parallel_2",77.0],PARAMETER["Latitude_Of_Origin",63.390675],UNIT["Meter",1.0]]"#;

    const WGS84_WKT: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

    #[test]
    fn test_parse_geographic_wkt() {
        assert_eq!(Crs::from_wkt(WGS84_WKT).unwrap(), Crs::Geographic);
    }

    #[test]
    fn test_parse_lambert_wkt() {
        let crs = Crs::from_wkt(STATCAN_LAMBERT_WKT).unwrap();
        match &crs {
            Crs::Lambert(lcc) => {
                assert_eq!(lcc.parallel_1, 49.0);
                assert_eq!(lcc.parallel_2, 77.0);
                assert_eq!(lcc.false_easting, 6_200_000.0);
                assert_eq!(lcc.semi_major, 6_378_137.0);
            }
            _ => panic!("expected Lambert"),
        }
        assert!(crs.is_projected());
    }

    #[test]
    fn test_unsupported_projection_rejected() {
        let wkt = r#"PROJCS["UTM",PROJECTION["Transverse_Mercator"]]"#;
        assert!(Crs::from_wkt(wkt).is_err());
    }

    #[test]
    fn test_lambert_round_trip() {
        let crs = Crs::from_wkt(STATCAN_LAMBERT_WKT).unwrap();
        for &(lon, lat) in &[
            (-123.1, 49.3),  // Vancouver
            (-114.07, 51.05), // Calgary
            (-63.57, 44.65), // Halifax
            (-52.71, 47.56), // St. John's
        ] {
            let (x, y) = crs.from_geographic(lon, lat);
            let (lon2, lat2) = crs.to_geographic(x, y);
            assert!((lon - lon2).abs() < 1e-8, "lon {} -> {}", lon, lon2);
            assert!((lat - lat2).abs() < 1e-8, "lat {} -> {}", lat, lat2);
        }
    }

    #[test]
    fn test_lambert_scale_is_metric() {
        // one degree of longitude at the first standard parallel is ~73 km
        let crs = Crs::from_wkt(STATCAN_LAMBERT_WKT).unwrap();
        let (x1, y1) = crs.from_geographic(-110.0, 49.0);
        let (x2, y2) = crs.from_geographic(-109.0, 49.0);
        let distance = ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt();
        assert!(
            (70_000.0..76_000.0).contains(&distance),
            "unexpected scale: {} m",
            distance
        );
    }

    #[test]
    fn test_transform_geometry_round_trip() {
        let crs = Crs::from_wkt(STATCAN_LAMBERT_WKT).unwrap();
        let point: geo_types::Geometry<f64> = geo_types::Point::new(-120.0, 55.0).into();
        let projected = transform_geometry(&point, &Crs::Geographic, &crs);
        let back = transform_geometry(&projected, &crs, &Crs::Geographic);
        if let geo_types::Geometry::Point(p) = back {
            assert!((p.x() + 120.0).abs() < 1e-8);
            assert!((p.y() - 55.0).abs() < 1e-8);
        } else {
            panic!("expected point");
        }
    }
}
