//! API constants

/// API version segment
pub const API_VERSION: &str = "v0";

/// Versioned prefix for upload routes
pub const API_PREFIX: &str = "/api/v0";

/// Multipart field carrying the chunk bytes
pub const FILE_FIELD: &str = "file";
