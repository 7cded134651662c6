//! Response builder
//!
//! Pure conversions from assembler/normalizer outcomes, or the error that stopped a
//! request, into the JSON records the gallery widget and the upload client read.

use vitrine_core::constants::TMP_FILE_SUFFIX;
use vitrine_core::models::{
    ChunkUploadResponse, CompletedUpload, GalleryUploadResponse, ImageAsset,
};
use vitrine_core::{AppError, ErrorMetadata};

/// Intermediate chunk stored
pub fn chunk_pending(chunk: u32, chunks: u32) -> ChunkUploadResponse {
    ChunkUploadResponse::accepted(chunk, chunks)
}

/// Last chunk stored, file finalized and normalized
pub fn chunk_completed(
    name: &str,
    size: u64,
    asset: &ImageAsset,
    url: String,
) -> ChunkUploadResponse {
    ChunkUploadResponse::Completed(CompletedUpload {
        name: name.to_string(),
        size,
        width: asset.final_width,
        height: asset.final_height,
        url,
    })
}

pub fn chunk_failure(error: &AppError) -> ChunkUploadResponse {
    ChunkUploadResponse::failed(error.client_message())
}

/// `relative` is the dispersed path under the tmp media directory
pub fn gallery_success(relative: &str, url: String, asset: &ImageAsset) -> GalleryUploadResponse {
    GalleryUploadResponse::Success {
        file: tmp_file_name(relative),
        url,
        width: asset.final_width,
        height: asset.final_height,
    }
}

/// `relative` is `None` when the failure happened before the file was located
pub fn gallery_failure(relative: Option<&str>, error: &AppError) -> GalleryUploadResponse {
    GalleryUploadResponse::Failure {
        file: relative.map(tmp_file_name),
        error: error.client_message(),
    }
}

fn tmp_file_name(relative: &str) -> String {
    format!("{}{}", relative, TMP_FILE_SUFFIX)
}
