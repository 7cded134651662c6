//! Chunk transport seam between the session controller and HTTP.

use async_trait::async_trait;
use bytes::Bytes;

use crate::{api_prefix, ApiClient};

/// One request's worth of a file.
#[derive(Debug, Clone)]
pub struct ChunkRequest {
    pub file_name: String,
    pub index: u32,
    pub total: u32,
    pub payload: Bytes,
}

/// The request never produced a readable reply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("server responded with status {status}: {body}")]
    Status { status: u16, body: String },
}

#[async_trait]
pub trait ChunkTransport: Send + Sync {
    /// Send one chunk and return the raw response body.
    async fn send_chunk(&self, request: ChunkRequest) -> Result<String, TransportError>;
}

#[async_trait]
impl ChunkTransport for ApiClient {
    async fn send_chunk(&self, request: ChunkRequest) -> Result<String, TransportError> {
        let mut form = reqwest::multipart::Form::new().text("name", request.file_name.clone());
        // Whole-file requests leave the counters out; the server defaults them to 0 of 1.
        if request.total > 1 {
            form = form
                .text("chunk", request.index.to_string())
                .text("chunks", request.total.to_string());
        }
        let part = reqwest::multipart::Part::bytes(request.payload.to_vec())
            .file_name(request.file_name)
            .mime_str("application/octet-stream")
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let form = form.part("file", part);

        self.post_multipart_text(&format!("{}/uploads/chunk", api_prefix()), form)
            .await
    }
}
