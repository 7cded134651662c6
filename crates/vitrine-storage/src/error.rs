use std::io;
use std::path::PathBuf;

use vitrine_core::AppError;

#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("Failed to create directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write chunk {index} of {key}: {source}")]
    ChunkWrite {
        key: String,
        index: u32,
        #[source]
        source: io::Error,
    },

    #[error("Failed to finalize {key}: {source}")]
    Finalize {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid session key: {0}")]
    InvalidKey(String),

    #[error("Invalid chunk: {0}")]
    InvalidChunk(String),
}

/// Result type for chunk assembly operations
pub type AssemblyResult<T> = Result<T, AssemblyError>;

impl From<AssemblyError> for AppError {
    fn from(err: AssemblyError) -> Self {
        match err {
            AssemblyError::Directory { .. } => AppError::Directory(err.to_string()),
            AssemblyError::ChunkWrite { .. } | AssemblyError::Finalize { .. } => {
                AppError::ChunkWrite(err.to_string())
            }
            AssemblyError::InvalidKey(msg) | AssemblyError::InvalidChunk(msg) => {
                AppError::InvalidInput(msg)
            }
        }
    }
}
