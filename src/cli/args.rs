use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "firegrid")]
#[command(about = "Wildfire ignition dataset builder for Canadian provinces")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate the provincial boundary, grid and centroid layers
    Grid {
        #[arg(short, long, help = "National administrative boundary shapefile")]
        boundary: PathBuf,

        #[arg(short, long, help = "Province name, e.g. 'British Columbia'")]
        province: String,

        #[arg(long, help = "Grid cell size in meters [default: 10000]")]
        cell_size: Option<f64>,

        #[arg(short, long, default_value = ".", help = "Base data directory")]
        data_dir: PathBuf,
    },

    /// Download, process and merge the requested features into the final CSV
    Build {
        #[arg(short, long, help = "Province name, e.g. 'British Columbia'")]
        province: String,

        #[arg(short, long, help = "Dataset year (1940-2024)")]
        year: i32,

        #[arg(
            short,
            long,
            value_delimiter = ',',
            help = "Months, by name or number (e.g. january,february or 1,2)"
        )]
        months: Vec<String>,

        #[arg(
            short,
            long,
            value_delimiter = ',',
            help = "Features: temperature, total-precipitation, average-wind-speed, \
                    relative-humidity, ndvi, slope, aspect, elevation"
        )]
        features: Vec<String>,

        #[arg(long, help = "National fire database shapefile (first run only)")]
        fire_data: Option<PathBuf>,

        #[arg(short, long, default_value = ".", help = "Base data directory")]
        data_dir: PathBuf,
    },
}
