//! Sentinel Hub process-API client (Copernicus Data Space): OAuth2
//! client-credentials token, NDVI composites, and DEM retrieval.

use chrono::NaiveDate;
use serde_json::json;
use tracing::{debug, info};

use crate::clients::ApiCredentials;
use crate::error::{PipelineError, Result};
use crate::models::province::BoundingBox;
use crate::utils::constants::{SH_BASE_URL, SH_TOKEN_URL};

/// Pixel evalscript computing NDVI = (B08 − B04)/(B08 + B04) from
/// reflectance as a single float band.
const NDVI_EVALSCRIPT: &str = r#"
//VERSION=3
function setup() {
  return {
    input: [
      {
        bands: ["B04", "B08"],
        units: "REFLECTANCE",
      },
    ],
    output: {
      id: "default",
      bands: 1,
      sampleType: SampleType.FLOAT32,
    },
  }
}

function evaluatePixel(sample) {
    let val = (sample.B08 - sample.B04) / (sample.B08 + sample.B04);
    return [val]
}
"#;

/// DEM evalscript; elevation is delivered divided by 1000 (kilometers).
const DEM_EVALSCRIPT: &str = r#"
//VERSION=3
function setup() {
  return {
    input: ["DEM"],
    output: { bands: 1 },
  }
}

function evaluatePixel(sample) {
  return [sample.DEM / 1000];
}
"#;

pub struct SentinelHubClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl SentinelHubClient {
    /// Fetch an OAuth2 access token with the client-credentials grant.
    pub async fn authenticate(credentials: &ApiCredentials) -> Result<Self> {
        let http = reqwest::Client::new();
        let response = http
            .post(SH_TOKEN_URL)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(PipelineError::Auth(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }
        let body: serde_json::Value = response.json().await?;
        let token = body["access_token"]
            .as_str()
            .ok_or_else(|| PipelineError::Auth("token response without access_token".to_string()))?
            .to_string();

        Ok(Self {
            http,
            base_url: SH_BASE_URL.to_string(),
            token,
        })
    }

    /// List the account's WMS instances; connectivity probe after
    /// authentication.
    pub async fn probe_wms_instances(&self) -> Result<String> {
        let url = format!("{}/configuration/v1/wms/instances", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        debug!("WMS instances: {}", body);
        Ok(body)
    }

    async fn process(&self, request: serde_json::Value) -> Result<Vec<u8>> {
        let url = format!("{}/api/v1/process", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "image/tiff")
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Download(format!(
                "process API returned {}: {}",
                status, body
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// Least-cloud-cover Sentinel-2 L2A NDVI composite over a date interval.
    pub async fn fetch_ndvi_composite(
        &self,
        bbox: &BoundingBox,
        size: (usize, usize),
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<u8>> {
        info!(
            "requesting NDVI composite {} to {} at {}x{}",
            start, end, size.0, size.1
        );
        let request = json!({
            "input": {
                "bounds": {
                    "properties": {"crs": "http://www.opengis.net/def/crs/OGC/1.3/CRS84"},
                    "bbox": bbox.as_wsen(),
                },
                "data": [
                    {
                        "type": "sentinel-2-l2a",
                        "dataFilter": {
                            "timeRange": {
                                "from": format!("{}T00:00:00Z", start),
                                "to": format!("{}T23:59:59Z", end),
                            },
                            "mosaickingOrder": "leastCC",
                        },
                    }
                ],
            },
            "output": {
                "width": size.0,
                "height": size.1,
                "responses": [
                    {
                        "identifier": "default",
                        "format": {"type": "image/tiff"},
                    }
                ],
            },
            "evalscript": NDVI_EVALSCRIPT,
        });
        self.process(request).await
    }

    /// Copernicus 30 m DEM over the bounding box, bilinear both ways,
    /// kilometers per the evalscript.
    pub async fn fetch_dem(&self, bbox: &BoundingBox, size: (usize, usize)) -> Result<Vec<u8>> {
        info!("requesting DEM at {}x{}", size.0, size.1);
        let request = json!({
            "input": {
                "bounds": {
                    "properties": {"crs": "http://www.opengis.net/def/crs/OGC/1.3/CRS84"},
                    "bbox": bbox.as_wsen(),
                },
                "data": [
                    {
                        "type": "dem",
                        "dataFilter": {"demInstance": "COPERNICUS_30"},
                        "processing": {
                            "upsampling": "BILINEAR",
                            "downsampling": "BILINEAR",
                        },
                    }
                ],
            },
            "output": {
                "width": size.0,
                "height": size.1,
                "responses": [
                    {
                        "identifier": "default",
                        "format": {"type": "image/tiff"},
                    }
                ],
            },
            "evalscript": DEM_EVALSCRIPT,
        });
        self.process(request).await
    }
}
