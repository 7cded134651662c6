//! Gallery finalize handler.
//!
//! Normalizes an image that was already merged under the tmp media directory and
//! answers with the record the gallery widget expects.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use utoipa::ToSchema;
use vitrine_core::constants::TMP_FILE_SUFFIX;
use vitrine_core::models::GalleryUploadResponse;
use vitrine_core::AppError;
use vitrine_storage::validate_dispersed_key;

use crate::error::log_error;
use crate::handlers::chunk_upload::disallowed_file_type;
use crate::response;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct FinalizeRequest {
    /// Relative path under the tmp media directory, with or without the `.tmp` marker
    pub file: String,
}

/// Normalize a merged gallery image
#[utoipa::path(
    post,
    path = "/api/v0/gallery/finalize",
    tag = "gallery",
    request_body = FinalizeRequest,
    responses(
        (status = 200, description = "Normalized image record or failure record", body = GalleryUploadResponse)
    )
)]
pub async fn finalize_gallery_image(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FinalizeRequest>, JsonRejection>,
) -> Json<GalleryUploadResponse> {
    let mut relative: Option<String> = None;
    let response = match handle_finalize(&state, payload, &mut relative).await {
        Ok(response) => response,
        Err(err) => {
            log_error(&err, "finalize_gallery_image");
            response::gallery_failure(relative.as_deref(), &err)
        }
    };
    Json(response)
}

async fn handle_finalize(
    state: &AppState,
    payload: Result<Json<FinalizeRequest>, JsonRejection>,
    relative_out: &mut Option<String>,
) -> Result<GalleryUploadResponse, AppError> {
    let tmp_dir = state.config.tmp_media_dir();
    tokio::fs::create_dir_all(&tmp_dir).await.map_err(|e| {
        AppError::Directory(format!(
            "Could not create tmp directory {}: {}",
            tmp_dir.display(),
            e
        ))
    })?;

    let Json(request) = payload.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    let file = request.file.trim_start_matches('/');
    let relative = file.strip_suffix(TMP_FILE_SUFFIX).unwrap_or(file).to_string();
    validate_dispersed_key(&relative)?;

    let absolute = tmp_dir.join(&relative);
    if absolute.starts_with(&state.config.staging_dir) {
        return Err(AppError::InvalidInput(format!("Not an upload path: {}", relative)));
    }
    *relative_out = Some(relative.clone());

    if !state.config.is_allowed_extension(&relative) {
        return Err(disallowed_file_type(&relative));
    }

    let asset = state
        .assembler
        .with_key_lock(&relative, || async {
            if !tokio::fs::try_exists(&absolute).await.unwrap_or(false) {
                return Err(AppError::NotFound(relative.clone()));
            }
            state
                .normalizer
                .normalize(&absolute)
                .await
                .map_err(AppError::from)
        })
        .await??;
    let url = state.config.tmp_media_url(&relative);

    tracing::info!(
        file = %relative,
        width = asset.final_width,
        height = asset.final_height,
        transformed = asset.transformed,
        "Gallery image finalized"
    );

    Ok(response::gallery_success(&relative, url, &asset))
}
