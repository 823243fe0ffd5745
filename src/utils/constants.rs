/// Grid cell size in boundary-CRS units (meters)
pub const GRID_CELL_WIDTH: f64 = 10_000.0;
pub const GRID_CELL_HEIGHT: f64 = 10_000.0;

/// Target raster resolution for imagery and DEM requests, meters per pixel
pub const RESOLUTION_METERS: f64 = 1_000.0;

/// Sentinel Hub process API limit on either image axis
pub const MAX_PIXELS: usize = 2_500;

/// Approximate meters per degree at mid latitudes
pub const METERS_PER_DEGREE_LON: f64 = 111_320.0;
pub const METERS_PER_DEGREE_LAT: f64 = 110_574.0;

/// Accepted range for the dataset year
pub const MIN_YEAR: i32 = 1940;
pub const MAX_YEAR: i32 = 2024;

/// Plausible Kelvin range for reanalysis near-surface temperatures
pub const MIN_KELVIN: f64 = 150.0;
pub const MAX_KELVIN: f64 = 350.0;

/// Provincial file names
pub const PROVINCE_FILE: &str = "Province.shp";
pub const GRID_FILE: &str = "clippedGrid.shp";
pub const CENTROIDS_FILE: &str = "centroids.shp";
pub const FIRE_FILE: &str = "FireData.shp";
pub const REANALYSIS_FILE: &str = "Dataset.nc";
pub const REANALYSIS_REPROJECTED_FILE: &str = "cop_reprojected.tif";
pub const IMAGE_FILE: &str = "output_image.tif";
pub const DEM_REPROJECTED_FILE: &str = "Reprojected.tif";
pub const DEM_FILE: &str = "DEM.tif";
pub const SLOPE_FILE: &str = "slope.tif";
pub const ASPECT_FILE: &str = "aspect.tif";

/// CDS reanalysis dataset id
pub const ERA5_DATASET: &str = "reanalysis-era5-single-levels";

/// Default CDS API endpoint (overridable through CDSAPI_URL)
pub const CDS_API_URL: &str = "https://cds.climate.copernicus.eu/api/v2";

/// Copernicus Data Space endpoints
pub const SH_BASE_URL: &str = "https://sh.dataspace.copernicus.eu";
pub const SH_TOKEN_URL: &str =
    "https://identity.dataspace.copernicus.eu/auth/realms/CDSE/protocol/openid-connect/token";

/// Fire shapefile attribute names
pub const FIRE_AGENCY_FIELD: &str = "SRC_AGENCY";
pub const FIRE_YEAR_FIELD: &str = "YEAR";
pub const FIRE_MONTH_FIELD: &str = "MONTH";
pub const FIRE_DAY_FIELD: &str = "DAY";
pub const FIRE_REPORT_DATE_FIELD: &str = "REP_DATE";

/// Boundary shapefile attribute holding the province name
pub const BOUNDARY_NAME_FIELD: &str = "PRENAME";
