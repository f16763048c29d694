//! Backend operation trait.
//!
//! The flow controller talks to the backend through this trait so tests
//! can substitute a scripted implementation for the HTTP client.

use crate::models::{AnalysisResult, StatusSnapshot};

use super::ApiError;

/// Operations the analysis backend exposes.
#[async_trait::async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Check that the backend is reachable and healthy.
    async fn health_check(&self) -> Result<(), ApiError>;

    /// Extract the product's features from its URL.
    async fn extract_features(&self, url: &str, name: &str) -> Result<Vec<String>, ApiError>;

    /// Start the analysis workflow. `selected_features` narrows the
    /// analysis; `None` (or empty) lets the backend pick its own.
    async fn start_analysis(
        &self,
        url: &str,
        name: &str,
        selected_features: Option<&[String]>,
    ) -> Result<(), ApiError>;

    /// Fetch the current workflow status.
    async fn get_status(&self) -> Result<StatusSnapshot, ApiError>;

    /// Fetch the finished report.
    async fn get_results(&self) -> Result<AnalysisResult, ApiError>;

    /// Download an exported report file as raw bytes.
    async fn download_file(&self, filename: &str) -> Result<Vec<u8>, ApiError>;
}
