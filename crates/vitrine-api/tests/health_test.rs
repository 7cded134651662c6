//! Health and documentation endpoint tests.

mod helpers;

use helpers::setup_test_app;
use serde_json::Value;

#[tokio::test]
async fn test_health_check() {
    let app = setup_test_app().await;

    let response = app.client().get("/health").await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["active_sessions"], 0);
    assert!(body["image_engine"].is_string());
}

#[tokio::test]
async fn test_openapi_document_lists_upload_routes() {
    let app = setup_test_app().await;

    let response = app.client().get("/api-docs/openapi.json").await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert!(body["paths"]["/api/v0/uploads/chunk"].is_object());
    assert!(body["paths"]["/api/v0/gallery/finalize"].is_object());
}
