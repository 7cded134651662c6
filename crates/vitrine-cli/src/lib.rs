use vitrine_api_client::{UploadOutcome, UploadReport};

/// JSON printed for a finished upload.
pub fn report_json(report: &UploadReport) -> serde_json::Value {
    match &report.outcome {
        UploadOutcome::Complete { record, .. } => record.clone(),
        UploadOutcome::Failed { reason } => serde_json::json!({
            "file": report.file_name,
            "error": reason,
        }),
    }
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
