//! Test helpers: build AppState and router on a temporary media root.
//!
//! Run from workspace root: `cargo test -p vitrine-api`.

pub mod fixtures;

use std::path::PathBuf;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use tempfile::TempDir;
use vitrine_api::constants;
use vitrine_api::setup::routes;
use vitrine_api::state::AppState;
use vitrine_core::Config;

/// API path prefix for tests (e.g. `/api/v0`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

/// Test application: server plus the temp media root it writes into.
pub struct TestApp {
    pub server: TestServer,
    pub config: Config,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Absolute path of a file under the tmp media directory
    pub fn tmp_media_file(&self, relative: &str) -> PathBuf {
        self.config.tmp_media_dir().join(relative)
    }
}

pub async fn setup_test_app() -> TestApp {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = Config::with_media_root(temp_dir.path().join("media"));
    let state = AppState::new(config.clone());
    let router = routes::setup_routes(&config, state).await.unwrap();
    let server = TestServer::new(router).unwrap();

    TestApp {
        server,
        config,
        _temp_dir: temp_dir,
    }
}

/// Multipart form for one chunk, using the field names the gallery widget sends.
pub fn chunk_form(name: &str, chunk: u32, chunks: u32, payload: Vec<u8>) -> MultipartForm {
    MultipartForm::new()
        .add_text("name", name.to_string())
        .add_text("chunk", chunk.to_string())
        .add_text("chunks", chunks.to_string())
        .add_part(
            "file",
            Part::bytes(payload)
                .file_name("blob")
                .mime_type("application/octet-stream"),
        )
}
