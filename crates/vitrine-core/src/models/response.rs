//! JSON contract returned to the gallery widget and the upload client.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Final-chunk success payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CompletedUpload {
    /// Relative path of the assembled file
    pub name: String,
    /// Size in bytes after normalization
    pub size: u64,
    pub width: u32,
    pub height: u32,
    pub url: String,
}

/// Response of the chunk upload endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ChunkUploadResponse {
    Completed(CompletedUpload),
    /// Intermediate chunk stored; more are expected
    Accepted { error: bool, chunk: u32, chunks: u32 },
    Failed { error: bool, message: String },
}

impl ChunkUploadResponse {
    pub fn accepted(chunk: u32, chunks: u32) -> Self {
        ChunkUploadResponse::Accepted {
            error: false,
            chunk,
            chunks,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        ChunkUploadResponse::Failed {
            error: true,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ChunkUploadResponse::Failed { .. })
    }
}

/// Response of the gallery finalize endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum GalleryUploadResponse {
    Success {
        /// Relative path with the `.tmp` marker
        file: String,
        url: String,
        width: u32,
        height: u32,
    },
    Failure {
        /// Relative path, or null when it was never determined
        file: Option<String>,
        error: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chunk_response_shapes() {
        let completed = ChunkUploadResponse::Completed(CompletedUpload {
            name: "p/h/photo.jpg".to_string(),
            size: 1024,
            width: 2000,
            height: 1500,
            url: "http://localhost/media/tmp/catalog/product/p/h/photo.jpg".to_string(),
        });
        assert_eq!(
            serde_json::to_value(&completed).unwrap(),
            json!({
                "name": "p/h/photo.jpg",
                "size": 1024,
                "width": 2000,
                "height": 1500,
                "url": "http://localhost/media/tmp/catalog/product/p/h/photo.jpg"
            })
        );

        assert_eq!(
            serde_json::to_value(ChunkUploadResponse::failed("disk full")).unwrap(),
            json!({"error": true, "message": "disk full"})
        );
        assert_eq!(
            serde_json::to_value(ChunkUploadResponse::accepted(1, 3)).unwrap(),
            json!({"error": false, "chunk": 1, "chunks": 3})
        );
    }

    #[test]
    fn test_gallery_failure_with_unknown_file_serializes_null() {
        let failure = GalleryUploadResponse::Failure {
            file: None,
            error: "Could not create tmp directory".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&failure).unwrap(),
            json!({"file": null, "error": "Could not create tmp directory"})
        );
    }

    #[test]
    fn test_chunk_response_parses_each_variant() {
        let parsed: ChunkUploadResponse =
            serde_json::from_value(json!({"error": true, "message": "boom"})).unwrap();
        assert!(parsed.is_error());

        let parsed: ChunkUploadResponse =
            serde_json::from_value(json!({"error": false, "chunk": 0, "chunks": 2})).unwrap();
        assert_eq!(parsed, ChunkUploadResponse::accepted(0, 2));
    }
}
