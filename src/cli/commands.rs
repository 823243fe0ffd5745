use std::str::FromStr;

use crate::cli::args::{Cli, Commands};
use crate::error::Result;
use crate::models::{BuildRequest, Feature, Province};
use crate::pipeline;
use crate::utils::dates;
use crate::utils::ProgressReporter;

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Grid {
            boundary,
            province,
            cell_size,
            data_dir,
        } => {
            let province = Province::from_str(&province)?;
            println!("Generating provincial layers for {}...", province);

            let progress = ProgressReporter::new_spinner("Clipping grid...", false);
            let dir = pipeline::build_provincial_layers(
                province,
                &boundary,
                &data_dir,
                cell_size.map(|s| (s, s)),
            )?;
            progress.finish_with_message(&format!(
                "Provincial layers ready in {}",
                dir.display()
            ));
        }

        Commands::Build {
            province,
            year,
            months,
            features,
            fire_data,
            data_dir,
        } => {
            let province = Province::from_str(&province)?;
            let mut months = months
                .iter()
                .map(|m| dates::parse_month(m))
                .collect::<Result<Vec<_>>>()?;
            months.sort_unstable();
            months.dedup();
            let features = features
                .iter()
                .map(|f| Feature::from_str(f))
                .collect::<Result<Vec<_>>>()?;

            let request = BuildRequest {
                province,
                year,
                months,
                features,
                fire_data,
                data_dir,
            }
            .validated()?;

            println!("Building {} dataset for {}...", year, province);
            println!(
                "Features: {}",
                request
                    .features
                    .iter()
                    .map(|f| f.label())
                    .collect::<Vec<_>>()
                    .join(", ")
            );

            let progress = ProgressReporter::new_spinner("Running pipeline...", false);
            let output = pipeline::build_dataset(&request).await?;
            progress.finish_with_message(&format!("Dataset written to {}", output.display()));
        }
    }

    Ok(())
}
