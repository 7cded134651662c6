//! Vitrine Core Library
//!
//! This crate provides the domain models, error types and configuration shared by the
//! chunk assembler, the image normalizer, the HTTP API and the upload client.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{Config, ImageEngineKind};
pub use error::{AppError, ErrorMetadata, LogLevel};
