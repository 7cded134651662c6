//! Chunk upload handler.
//!
//! Each request carries one chunk of a file. The last chunk finalizes the file under the
//! tmp media directory and normalizes it before answering.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::State;
use axum::Json;
use bytes::Bytes;
use vitrine_core::models::{ChunkDescriptor, ChunkUploadResponse};
use vitrine_core::AppError;
use vitrine_storage::{session_key_for, ChunkOutcome};

use crate::constants::FILE_FIELD;
use crate::error::log_error;
use crate::response;
use crate::state::AppState;

/// Parsed multipart form of one chunk request
#[derive(Debug)]
pub(crate) struct ChunkForm {
    pub name: String,
    pub chunk: u32,
    pub chunks: u32,
    pub payload: Bytes,
}

impl ChunkForm {
    /// Read `file`, `name`, `chunk` (or `chunkIndex`) and `chunks` (or `chunkCount`).
    /// Missing counters mean a single-chunk upload; a missing name falls back to the
    /// uploaded file's name.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut name: Option<String> = None;
        let mut file_name: Option<String> = None;
        let mut chunk: Option<u32> = None;
        let mut chunks: Option<u32> = None;
        let mut payload: Option<Bytes> = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read multipart: {}", e)))?
        {
            let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();

            match field_name.as_str() {
                FILE_FIELD => {
                    if payload.is_some() {
                        return Err(AppError::InvalidInput(
                            "Multiple file fields are not allowed; send exactly one field named 'file'"
                                .to_string(),
                        ));
                    }
                    file_name = field.file_name().map(|s| s.to_string());
                    let data = field.bytes().await.map_err(|e| {
                        AppError::InvalidInput(format!("Failed to read file data: {}", e))
                    })?;
                    payload = Some(data);
                }
                "name" => name = Some(read_text(field, "name").await?),
                "chunk" | "chunkIndex" => {
                    chunk = Some(parse_counter(&read_text(field, "chunk").await?, "chunk")?)
                }
                "chunks" | "chunkCount" => {
                    chunks = Some(parse_counter(&read_text(field, "chunks").await?, "chunks")?)
                }
                _ => {}
            }
        }

        let payload =
            payload.ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))?;
        let name = name
            .filter(|n| !n.trim().is_empty())
            .or(file_name)
            .ok_or_else(|| AppError::InvalidInput("No file name provided".to_string()))?;

        Ok(Self {
            name,
            chunk: chunk.unwrap_or(0),
            chunks: chunks.unwrap_or(1),
            payload,
        })
    }
}

async fn read_text(
    field: axum::extract::multipart::Field<'_>,
    label: &str,
) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read field '{}': {}", label, e)))
}

fn parse_counter(value: &str, label: &str) -> Result<u32, AppError> {
    value.trim().parse::<u32>().map_err(|_| {
        AppError::InvalidInput(format!(
            "Field '{}' must be a non-negative integer, got '{}'",
            label, value
        ))
    })
}

/// Upload one chunk of a gallery image
#[utoipa::path(
    post,
    path = "/api/v0/uploads/chunk",
    tag = "uploads",
    request_body(content = inline(Object), content_type = "multipart/form-data",
        description = "Fields: file (bytes), name, chunk/chunkIndex (default 0), chunks/chunkCount (default 1)"),
    responses(
        (status = 200, description = "Chunk result: pending, completed or failed", body = ChunkUploadResponse)
    )
)]
pub async fn upload_chunk(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Json<ChunkUploadResponse> {
    let response = match handle_chunk(&state, multipart).await {
        Ok(response) => response,
        Err(err) => {
            log_error(&err, "upload_chunk");
            response::chunk_failure(&err)
        }
    };
    Json(response)
}

async fn handle_chunk(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ChunkUploadResponse, AppError> {
    let multipart = multipart.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    let form = ChunkForm::from_multipart(multipart).await?;
    let key = session_key_for(&form.name)?;
    if !state.config.is_allowed_extension(&key) {
        return Err(disallowed_file_type(&key));
    }

    let (chunk, chunks) = (form.chunk, form.chunks);
    let descriptor = ChunkDescriptor::new(key.clone(), chunk, chunks, form.payload);
    let normalizer = &state.normalizer;

    let (outcome, normalized) = state
        .assembler
        .accept_with(descriptor, |path| async move {
            let start = Instant::now();
            let asset = normalizer.normalize(&path).await?;
            let size = tokio::fs::metadata(&path).await?.len();
            Ok::<_, AppError>((asset, size, start.elapsed()))
        })
        .await?;

    match (outcome, normalized) {
        (ChunkOutcome::Pending { .. }, _) => Ok(response::chunk_pending(chunk, chunks)),
        (ChunkOutcome::Finalized { .. }, Some(normalized)) => {
            let (asset, size, elapsed) = normalized?;

            tracing::info!(
                key = %key,
                chunks = chunks,
                size_bytes = size,
                width = asset.final_width,
                height = asset.final_height,
                engine = %asset.engine,
                duration_ms = elapsed.as_secs_f64() * 1000.0,
                "Chunked upload completed"
            );

            let url = state.config.tmp_media_url(&key);
            Ok(response::chunk_completed(&key, size, &asset, url))
        }
        (ChunkOutcome::Finalized { path, .. }, None) => Err(AppError::Internal(format!(
            "Finalized upload {} was not normalized",
            path.display()
        ))),
    }
}

/// Error for a file whose extension is not on the allow-list
pub(crate) fn disallowed_file_type(key: &str) -> AppError {
    let name = key.rsplit('/').next().unwrap_or(key);
    AppError::InvalidInput(format!("Disallowed file type: {}", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_counter() {
        assert_eq!(parse_counter("3", "chunks").unwrap(), 3);
        assert_eq!(parse_counter(" 0 ", "chunk").unwrap(), 0);
        assert!(parse_counter("-1", "chunk").is_err());
        assert!(parse_counter("two", "chunks").is_err());
    }
}
