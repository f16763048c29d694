//! HTTP client for the Revify analysis backend.
//!
//! Thin wrapper over the backend's `/api` surface. Every operation maps
//! transport failures and non-2xx statuses into a typed [`ApiError`];
//! nothing here panics or leaks `reqwest` errors past the boundary.
//! Request timeouts surface as the same error as connection failures.

mod backend;

pub use backend::AnalysisBackend;

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::{AnalysisResult, StatusSnapshot};

/// Errors from backend operations.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unable to connect to the Revify API")]
    Unreachable,

    #[error("Feature extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Analysis is already running. Please wait for it to complete.")]
    AlreadyRunning,

    #[error("Failed to start analysis: {0}")]
    StartFailed(String),

    #[error("Failed to get analysis status")]
    StatusUnavailable,

    #[error("No results available yet")]
    NotFound,

    #[error("Failed to get results")]
    FetchFailed,

    #[error("Failed to download file: {0}")]
    DownloadFailed(String),
}

/// Error payload the backend attaches to failed responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// Extract the backend's error message from a failed response, if any.
async fn error_message(response: reqwest::Response) -> Option<String> {
    response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.error)
        .filter(|msg| !msg.is_empty())
}

#[derive(Debug, Serialize)]
struct ExtractRequest<'a> {
    product_url: &'a str,
    product_name: &'a str,
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    product_url: &'a str,
    product_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    selected_features: Option<&'a [String]>,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    features: Vec<String>,
}

/// Client for the Revify backend API.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the given base URL (e.g.
    /// `http://localhost:5000/api`) with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait::async_trait]
impl AnalysisBackend for ApiClient {
    async fn health_check(&self) -> Result<(), ApiError> {
        debug!("GET {}", self.endpoint("health"));
        let response = self
            .client
            .get(self.endpoint("health"))
            .send()
            .await
            .map_err(|_| ApiError::Unreachable)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ApiError::Unreachable)
        }
    }

    async fn extract_features(&self, url: &str, name: &str) -> Result<Vec<String>, ApiError> {
        debug!("POST {} for {}", self.endpoint("extract-features"), url);
        let response = self
            .client
            .post(self.endpoint("extract-features"))
            .json(&ExtractRequest {
                product_url: url,
                product_name: name,
            })
            .send()
            .await
            .map_err(|e| ApiError::ExtractionFailed(transport_message(&e)))?;

        if !response.status().is_success() {
            let message = error_message(response)
                .await
                .unwrap_or_else(|| "Failed to extract features".to_string());
            return Err(ApiError::ExtractionFailed(message));
        }

        let body: ExtractResponse = response
            .json()
            .await
            .map_err(|_| ApiError::ExtractionFailed("Invalid response from backend".to_string()))?;
        Ok(body.features)
    }

    async fn start_analysis(
        &self,
        url: &str,
        name: &str,
        selected_features: Option<&[String]>,
    ) -> Result<(), ApiError> {
        debug!("POST {} for {}", self.endpoint("analyze"), url);
        let response = self
            .client
            .post(self.endpoint("analyze"))
            .json(&AnalyzeRequest {
                product_url: url,
                product_name: name,
                // Empty selection is treated as absent; the backend
                // extracts its own features in that case.
                selected_features: selected_features.filter(|f| !f.is_empty()),
            })
            .send()
            .await
            .map_err(|e| ApiError::StartFailed(transport_message(&e)))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::CONFLICT => Err(ApiError::AlreadyRunning),
            _ => {
                let message = error_message(response)
                    .await
                    .unwrap_or_else(|| "Failed to start analysis".to_string());
                Err(ApiError::StartFailed(message))
            }
        }
    }

    async fn get_status(&self) -> Result<StatusSnapshot, ApiError> {
        let response = self
            .client
            .get(self.endpoint("status"))
            .send()
            .await
            .map_err(|_| ApiError::StatusUnavailable)?;

        if !response.status().is_success() {
            return Err(ApiError::StatusUnavailable);
        }

        response
            .json::<StatusSnapshot>()
            .await
            .map_err(|_| ApiError::StatusUnavailable)
    }

    async fn get_results(&self) -> Result<AnalysisResult, ApiError> {
        let response = self
            .client
            .get(self.endpoint("results"))
            .send()
            .await
            .map_err(|_| ApiError::FetchFailed)?;

        match response.status() {
            status if status.is_success() => {
                response.json().await.map_err(|_| ApiError::FetchFailed)
            }
            StatusCode::NOT_FOUND => Err(ApiError::NotFound),
            _ => Err(ApiError::FetchFailed),
        }
    }

    async fn download_file(&self, filename: &str) -> Result<Vec<u8>, ApiError> {
        let endpoint = self.endpoint(&format!("download/{}", filename));
        debug!("GET {}", endpoint);
        let response = self
            .client
            .get(endpoint)
            .send()
            .await
            .map_err(|e| ApiError::DownloadFailed(transport_message(&e)))?;

        if !response.status().is_success() {
            return Err(ApiError::DownloadFailed(format!(
                "server returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::DownloadFailed(transport_message(&e)))?;
        Ok(bytes.to_vec())
    }
}

/// Human-readable reason for a transport failure. Timeouts and
/// connection failures are deliberately not distinguished further.
fn transport_message(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else {
        "connection failed".to_string()
    }
}
