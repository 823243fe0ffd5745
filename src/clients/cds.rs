//! Climate Data Store client: submits a retrieval, polls the task until the
//! result is ready, downloads it. One request per variable, sequentially —
//! no retries and no timeouts anywhere in the pipeline.

use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::models::province::BoundingBox;
use crate::utils::constants::CDS_API_URL;

/// A single-variable ERA5 retrieval request.
#[derive(Debug, Clone, Serialize)]
pub struct ReanalysisRequest {
    pub product_type: String,
    pub variable: String,
    pub year: String,
    pub month: Vec<String>,
    pub day: Vec<String>,
    pub time: String,
    pub format: String,
    pub area: [f64; 4],
}

impl ReanalysisRequest {
    /// Fixed 12:00 daily snapshot over all days of the given months, clipped
    /// to the bounding box, delivered as NetCDF.
    pub fn daily_noon(variable: &str, year: i32, months: &[u32], bbox: &BoundingBox) -> Self {
        Self {
            product_type: "reanalysis".to_string(),
            variable: variable.to_string(),
            year: year.to_string(),
            month: months.iter().map(|m| format!("{:02}", m)).collect(),
            day: (1..=31).map(|d| format!("{:02}", d)).collect(),
            time: "12:00".to_string(),
            format: "netcdf".to_string(),
            area: bbox.as_area(),
        }
    }
}

pub struct CdsClient {
    http: reqwest::Client,
    base_url: String,
    uid: String,
    key: String,
}

impl CdsClient {
    /// Credentials come from `CDSAPI_KEY` (`uid:key` form, as in
    /// `~/.cdsapirc`); `CDSAPI_URL` overrides the endpoint.
    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("firegrid").required(false))
            .add_source(config::Environment::default())
            .build()?;

        let raw_key = settings.get_string("cdsapi_key")?;
        let (uid, key) = raw_key.split_once(':').ok_or_else(|| {
            PipelineError::Auth("CDSAPI_KEY must have the form uid:key".to_string())
        })?;
        let base_url = settings
            .get_string("cdsapi_url")
            .unwrap_or_else(|_| CDS_API_URL.to_string());

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            uid: uid.to_string(),
            key: key.to_string(),
        })
    }

    /// Submit a retrieval and block until the product is written to `target`.
    pub async fn retrieve(
        &self,
        dataset: &str,
        request: &ReanalysisRequest,
        target: &Path,
    ) -> Result<()> {
        info!("requesting {} from {}", request.variable, dataset);

        let submit_url = format!("{}/resources/{}", self.base_url, dataset);
        let mut task: Value = self
            .http
            .post(&submit_url)
            .basic_auth(&self.uid, Some(&self.key))
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        loop {
            match task["state"].as_str() {
                Some("completed") => break,
                Some("failed") => {
                    let reason = task["error"]["message"]
                        .as_str()
                        .unwrap_or("unspecified CDS failure");
                    return Err(PipelineError::Download(format!(
                        "{} retrieval failed: {}",
                        request.variable, reason
                    )));
                }
                Some("queued") | Some("running") => {
                    let request_id = task["request_id"].as_str().ok_or_else(|| {
                        PipelineError::Download("CDS task without request_id".to_string())
                    })?;
                    debug!("task {} is {}", request_id, task["state"]);
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    let poll_url = format!("{}/tasks/{}", self.base_url, request_id);
                    task = self
                        .http
                        .get(&poll_url)
                        .basic_auth(&self.uid, Some(&self.key))
                        .send()
                        .await?
                        .error_for_status()?
                        .json()
                        .await?;
                }
                other => {
                    return Err(PipelineError::Download(format!(
                        "unexpected CDS task state: {:?}",
                        other
                    )))
                }
            }
        }

        let location = task["location"].as_str().ok_or_else(|| {
            PipelineError::Download("completed CDS task without a location".to_string())
        })?;
        let download_url = if location.starts_with("http") {
            location.to_string()
        } else {
            format!("{}/{}", self.base_url.trim_end_matches('/'), location)
        };

        let bytes = self
            .http
            .get(&download_url)
            .basic_auth(&self.uid, Some(&self.key))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        info!("downloaded {} bytes to {}", bytes.len(), target.display());
        std::fs::write(target, &bytes)?;
        Ok(())
    }
}
