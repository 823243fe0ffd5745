pub mod climate_dataset;
pub mod data_merger;
pub mod fire_dataset;
pub mod grid_builder;
pub mod ndvi_dataset;
pub mod terrain_dataset;

pub use climate_dataset::ClimateDatasetBuilder;
pub use data_merger::DatasetMerger;
pub use fire_dataset::FireDatasetBuilder;
pub use grid_builder::GridBuilder;
pub use ndvi_dataset::NdviDatasetBuilder;
pub use terrain_dataset::TerrainDatasetBuilder;
