//! HTTP client for the Vitrine API.
//!
//! [`ApiClient`] wraps reqwest with the endpoints the uploader needs and implements
//! [`ChunkTransport`], so [`UploadSessionController`] can drive chunked uploads against a
//! live server. Tests drive the controller with scripted transports instead.

pub mod controller;
pub mod transport;

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use vitrine_core::models::GalleryUploadResponse;

pub use controller::{
    FallbackNotice, FileUpload, SessionState, UploadOutcome, UploadReport,
    UploadSessionController, UploadSettings,
};
pub use transport::{ChunkRequest, ChunkTransport, TransportError};

/// API version prefix (e.g. "/api/v0"). Set VITRINE_API_VERSION to match the server.
pub fn api_prefix() -> String {
    let version = std::env::var("VITRINE_API_VERSION").unwrap_or_else(|_| "v0".to_string());
    format!("/api/{}", version)
}

/// HTTP client for the Vitrine API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create client from environment: VITRINE_API_URL (or API_URL).
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("VITRINE_API_URL")
            .or_else(|_| std::env::var("API_URL"))
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        Self::new(base_url)
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.build_url(path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let body: T = response
            .json()
            .await
            .context("Failed to parse response as JSON")?;

        Ok(body)
    }

    /// POST a multipart form and return the raw response body.
    pub async fn post_multipart_text(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> std::result::Result<String, TransportError> {
        let url = self.build_url(path);
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }

    /// Normalize a merged image under the server's tmp media directory.
    pub async fn finalize_gallery_image(&self, file: &str) -> Result<GalleryUploadResponse> {
        self.post_json(
            &format!("{}/gallery/finalize", api_prefix()),
            &serde_json::json!({ "file": file }),
        )
        .await
    }
}
