use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::error::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Unknown province: {0}")]
    InvalidProvince(String),

    #[error("Unknown feature: {0}")]
    InvalidFeature(String),

    #[error("Unknown month: {0}")]
    InvalidMonth(String),

    #[error("Coordinate system error: {0}")]
    Crs(String),

    #[error("Raster error: {0}")]
    Raster(String),

    #[error("Authentication failure: {0}")]
    Auth(String),

    #[error("Download failure: {0}")]
    Download(String),

    #[error("Missing required data: {0}")]
    MissingData(String),

    #[error("Data merge error: {0}")]
    DataMerge(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
}
