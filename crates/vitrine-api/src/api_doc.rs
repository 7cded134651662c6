//! OpenAPI documentation.

use utoipa::OpenApi;
use vitrine_core::models;

use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vitrine API",
        version = "0.1.0",
        description = "Chunked product-gallery image uploads (v0). Every upload endpoint answers HTTP 200 with a JSON record; failures are reported in the body."
    ),
    paths(
        handlers::chunk_upload::upload_chunk,
        handlers::gallery::finalize_gallery_image,
        handlers::health::health_check,
    ),
    components(schemas(
        models::ChunkUploadResponse,
        models::CompletedUpload,
        models::GalleryUploadResponse,
        models::ImageDimensions,
        handlers::gallery::FinalizeRequest,
        handlers::health::HealthResponse,
    )),
    tags(
        (name = "uploads", description = "Chunked file upload"),
        (name = "gallery", description = "Gallery image finalization"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

/// Returns the OpenAPI document served at `/api-docs/openapi.json`.
pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
