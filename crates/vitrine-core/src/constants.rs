//! Shared constants

/// Widest image the normalizer keeps; wider images are scaled down to this width.
pub const DEFAULT_IMAGE_MAX_WIDTH: u32 = 2000;

/// Media-relative directory holding merged, not yet committed gallery images.
pub const TMP_MEDIA_PATH: &str = "tmp/catalog/product";

/// Suffix the gallery contract appends to relative temp file paths.
pub const TMP_FILE_SUFFIX: &str = ".tmp";

/// Extension of in-progress staging files.
pub const STAGING_SUFFIX: &str = ".part";

/// Longest file name the filesystem accepts (NAME_MAX), staging suffix included.
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Longest trailing `.ext` kept when a long filename is shortened.
pub const MAX_EXTENSION_LENGTH: usize = 16;

/// Image types the gallery accepts, by extension.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "gif", "png"];

/// Receiving sessions idle this long are dropped with their staging file.
pub const DEFAULT_SESSION_IDLE_TIMEOUT_SECS: u64 = 3600;

/// Default JPEG re-encode quality (0-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 90;
