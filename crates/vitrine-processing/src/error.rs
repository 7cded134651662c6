use std::io;
use std::path::PathBuf;

use vitrine_core::AppError;

/// Fatal normalization errors. Anything else degrades to the untouched file.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("Invalid image file {}: {reason}", path.display())]
    InvalidImage { path: PathBuf, reason: String },

    #[error("Normalization task failed: {0}")]
    Task(String),
}

/// An engine failed to open, transform or save an image.
#[derive(Debug, thiserror::Error)]
pub enum TransformFailure {
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<NormalizeError> for AppError {
    fn from(err: NormalizeError) -> Self {
        match err {
            NormalizeError::InvalidImage { ref path, .. } => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                AppError::InvalidImage(name)
            }
            NormalizeError::Task(msg) => AppError::Internal(msg),
        }
    }
}
