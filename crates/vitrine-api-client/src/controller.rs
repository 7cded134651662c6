//! Client-side upload session state machine.
//!
//! Each file is sent in chunks with per-chunk retries. When chunked transmission fails,
//! or the server's final answer is unusable, the file is resent once as a single request
//! with retries reduced. That fallback happens at most once per file and only changes
//! that file's settings.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bytes::Bytes;
use serde_json::Value;

use crate::transport::{ChunkRequest, ChunkTransport, TransportError};

pub const DEFAULT_CHUNK_SIZE: u64 = 2 * 1024 * 1024;
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Per-file transmission knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSettings {
    /// `None` sends the whole file in one request
    pub chunk_size: Option<u64>,
    /// Retries per chunk after the first attempt
    pub max_retries: u32,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            chunk_size: Some(DEFAULT_CHUNK_SIZE),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl UploadSettings {
    /// Read VITRINE_CHUNK_SIZE (bytes, 0 disables chunking) and VITRINE_MAX_RETRIES.
    pub fn from_env() -> Result<Self> {
        let mut settings = Self::default();

        if let Ok(value) = std::env::var("VITRINE_CHUNK_SIZE") {
            let size: u64 = value
                .parse()
                .context("VITRINE_CHUNK_SIZE must be a number of bytes")?;
            settings.chunk_size = (size > 0).then_some(size);
        }
        if let Ok(value) = std::env::var("VITRINE_MAX_RETRIES") {
            settings.max_retries = value
                .parse()
                .context("VITRINE_MAX_RETRIES must be a non-negative integer")?;
        }

        Ok(settings)
    }

    /// Settings a file switches to after falling back.
    pub fn single_shot() -> Self {
        Self {
            chunk_size: None,
            max_retries: 1,
        }
    }

    fn chunk_count(&self, len: u64) -> Option<u32> {
        match self.chunk_size {
            Some(size) if size > 0 && len > size => u32::try_from(len.div_ceil(size)).ok(),
            _ => Some(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    ChunkTransmitting,
    FallbackSingleShot,
    Complete,
    Failed,
}

/// User-visible notice emitted when a file switches to single-request mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackNotice {
    ChunkTransportFailed { file_name: String, error: String },
    ServerRejected { file_name: String, reason: String },
}

impl fmt::Display for FallbackNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackNotice::ChunkTransportFailed { file_name, error } => write!(
                f,
                "Chunked upload of {} failed ({}), retrying as a single request",
                file_name, error
            ),
            FallbackNotice::ServerRejected { file_name, reason } => write!(
                f,
                "Server rejected {} ({}), retrying as a single request",
                file_name, reason
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// `record` is the server's final JSON answer
    Complete { record: Value, fell_back: bool },
    Failed { reason: String },
}

#[derive(Debug, Clone)]
pub struct UploadReport {
    pub file_name: String,
    pub outcome: UploadOutcome,
    pub notices: Vec<FallbackNotice>,
    pub requests_sent: u32,
    pub state: SessionState,
}

impl UploadReport {
    pub fn is_complete(&self) -> bool {
        matches!(self.outcome, UploadOutcome::Complete { .. })
    }
}

/// One file's upload, with its own copy of the settings.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    data: Bytes,
    settings: UploadSettings,
    fell_back: bool,
    state: SessionState,
    requests_sent: u32,
}

impl FileUpload {
    fn new(file_name: String, data: Bytes, settings: UploadSettings) -> Self {
        Self {
            file_name,
            data,
            settings,
            fell_back: false,
            state: SessionState::Idle,
            requests_sent: 0,
        }
    }

    pub fn settings(&self) -> UploadSettings {
        self.settings
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Switch to single-request mode. Returns false if the fallback was already used.
    fn fall_back(&mut self) -> bool {
        if self.fell_back {
            return false;
        }
        self.fell_back = true;
        self.settings = UploadSettings::single_shot();
        self.state = SessionState::FallbackSingleShot;
        true
    }
}

/// Why one pass over a file did not produce a usable record.
enum PassFailure {
    Transport(TransportError),
    Rejected(String),
}

type NoticeHandler = Arc<dyn Fn(&FallbackNotice) + Send + Sync>;

/// Drives uploads through a [`ChunkTransport`].
pub struct UploadSessionController<T: ChunkTransport> {
    transport: T,
    settings: UploadSettings,
    retry_delay: Duration,
    notice_handler: Option<NoticeHandler>,
}

impl<T: ChunkTransport> UploadSessionController<T> {
    pub fn new(transport: T, settings: UploadSettings) -> Self {
        Self {
            transport,
            settings,
            retry_delay: Duration::from_millis(500),
            notice_handler: None,
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_notice_handler(
        mut self,
        handler: impl Fn(&FallbackNotice) + Send + Sync + 'static,
    ) -> Self {
        self.notice_handler = Some(Arc::new(handler));
        self
    }

    /// Settings new files start with. Fallbacks never change these.
    pub fn settings(&self) -> UploadSettings {
        self.settings
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn upload_file(&self, path: &Path) -> Result<UploadReport> {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .context("File path has no usable file name")?
            .to_string();

        Ok(self.upload(file_name, Bytes::from(data)).await)
    }

    pub async fn upload(&self, file_name: impl Into<String>, data: Bytes) -> UploadReport {
        let start = Instant::now();
        let mut file = FileUpload::new(file_name.into(), data, self.settings);
        let mut notices = Vec::new();

        let outcome = loop {
            if !file.fell_back {
                file.state = SessionState::ChunkTransmitting;
            }

            let failure = match self.send_pass(&mut file).await {
                Ok(body) => match evaluate(&body) {
                    Ok(record) => {
                        break UploadOutcome::Complete {
                            record,
                            fell_back: file.fell_back,
                        }
                    }
                    Err(reason) => PassFailure::Rejected(reason),
                },
                Err(failure) => failure,
            };

            let notice = match failure {
                PassFailure::Transport(error) => FallbackNotice::ChunkTransportFailed {
                    file_name: file.file_name.clone(),
                    error: error.to_string(),
                },
                PassFailure::Rejected(reason) => FallbackNotice::ServerRejected {
                    file_name: file.file_name.clone(),
                    reason,
                },
            };

            if !file.fall_back() {
                break UploadOutcome::Failed {
                    reason: failure_reason(&notice),
                };
            }

            tracing::warn!(
                file_name = %file.file_name,
                notice = %notice,
                "Falling back to single-request upload"
            );
            if let Some(handler) = &self.notice_handler {
                handler(&notice);
            }
            notices.push(notice);
        };

        file.state = match outcome {
            UploadOutcome::Complete { .. } => SessionState::Complete,
            UploadOutcome::Failed { .. } => SessionState::Failed,
        };

        match &outcome {
            UploadOutcome::Complete { fell_back, .. } => tracing::info!(
                file_name = %file.file_name,
                size = file.data.len(),
                requests = file.requests_sent,
                fell_back = *fell_back,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Upload complete"
            ),
            UploadOutcome::Failed { reason } => tracing::error!(
                file_name = %file.file_name,
                requests = file.requests_sent,
                reason = %reason,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Upload failed"
            ),
        }

        UploadReport {
            file_name: file.file_name,
            outcome,
            notices,
            requests_sent: file.requests_sent,
            state: file.state,
        }
    }

    /// Send every chunk of `file` once through, returning the last response body.
    async fn send_pass(&self, file: &mut FileUpload) -> Result<String, PassFailure> {
        let len = file.data.len() as u64;
        let total = file.settings.chunk_count(len).ok_or_else(|| {
            PassFailure::Rejected("File has too many chunks for the chunk size".to_string())
        })?;
        let chunk_size = match file.settings.chunk_size {
            Some(size) if total > 1 => size,
            _ => len.max(1),
        };

        let mut last_body = String::new();
        for index in 0..total {
            let start = (index as u64 * chunk_size).min(len) as usize;
            let end = ((index as u64 + 1) * chunk_size).min(len) as usize;
            let request = ChunkRequest {
                file_name: file.file_name.clone(),
                index,
                total,
                payload: file.data.slice(start..end),
            };

            let body = self
                .send_with_retries(file, request)
                .await
                .map_err(PassFailure::Transport)?;

            if index + 1 < total {
                if let Some(reason) = intermediate_rejection(&body) {
                    return Err(PassFailure::Rejected(reason));
                }
            }
            last_body = body;
        }

        Ok(last_body)
    }

    async fn send_with_retries(
        &self,
        file: &mut FileUpload,
        request: ChunkRequest,
    ) -> Result<String, TransportError> {
        let mut attempt = 0;
        loop {
            file.requests_sent += 1;
            match self.transport.send_chunk(request.clone()).await {
                Ok(body) => return Ok(body),
                Err(error) if attempt < file.settings.max_retries => {
                    attempt += 1;
                    tracing::debug!(
                        file_name = %request.file_name,
                        chunk = request.index,
                        chunks = request.total,
                        attempt = attempt,
                        error = %error,
                        "Retrying chunk"
                    );
                    if !self.retry_delay.is_zero() {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
                Err(error) => return Err(error),
            }
        }
    }
}

/// Check the final response of a pass.
fn evaluate(body: &str) -> Result<Value, String> {
    let record: Value =
        serde_json::from_str(body).map_err(|_| "Invalid server response".to_string())?;

    if is_truthy(record.get("error")) {
        return Err(error_message(&record));
    }
    for dimension in ["width", "height"] {
        if record.get(dimension).and_then(Value::as_f64) == Some(0.0) {
            return Err(format!("Server reported zero {}", dimension));
        }
    }

    Ok(record)
}

/// Intermediate chunks only fail on an explicit error flag.
fn intermediate_rejection(body: &str) -> Option<String> {
    let record: Value = serde_json::from_str(body).ok()?;
    is_truthy(record.get("error")).then(|| error_message(&record))
}

fn error_message(record: &Value) -> String {
    record
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| record.get("error").and_then(Value::as_str))
        .unwrap_or("Upload failed")
        .to_string()
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn failure_reason(notice: &FallbackNotice) -> String {
    match notice {
        FallbackNotice::ChunkTransportFailed { error, .. } => error.clone(),
        FallbackNotice::ServerRejected { reason, .. } => reason.clone(),
    }
}
