//! Configuration module
//!
//! Server-side settings for the chunk assembler, the image normalizer and the HTTP
//! surface. Values come from the environment (a `.env` file is honoured) with defaults
//! suitable for local development.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_IMAGE_MAX_WIDTH, DEFAULT_JPEG_QUALITY,
    DEFAULT_SESSION_IDLE_TIMEOUT_SECS, TMP_MEDIA_PATH,
};

// Common constants
const SERVER_PORT: u16 = 3000;
const MAX_CHUNK_MB: usize = 16;
const MAX_CONCURRENT_REQUESTS: usize = 64;

/// Which image engine the normalizer should use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ImageEngineKind {
    /// Decoder-driven auto-orientation (all eight EXIF orientations, any format).
    #[default]
    Auto,
    /// JPEG-only EXIF rotation (tags 3, 6 and 8).
    Fallback,
}

impl FromStr for ImageEngineKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" | "preferred" => Ok(ImageEngineKind::Auto),
            "fallback" | "exif" => Ok(ImageEngineKind::Fallback),
            other => Err(anyhow::anyhow!(
                "Invalid IMAGE_ENGINE '{}'. Must be 'auto' or 'fallback'",
                other
            )),
        }
    }
}

impl fmt::Display for ImageEngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageEngineKind::Auto => write!(f, "auto"),
            ImageEngineKind::Fallback => write!(f, "fallback"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    /// Root of the public media directory.
    pub media_root: PathBuf,
    /// Public URL the media root is served under.
    pub media_base_url: String,
    /// Directory holding `.part` files while chunks arrive. Must live on the same
    /// filesystem as `media_root` so finalization is a plain rename.
    pub staging_dir: PathBuf,
    pub image_max_width: u32,
    pub image_engine: ImageEngineKind,
    pub jpeg_quality: u8,
    /// Upper bound on a single request body (one chunk plus form overhead).
    pub max_chunk_bytes: usize,
    pub max_concurrent_requests: usize,
    /// Lowercase extensions accepted for upload, without the dot.
    pub allowed_extensions: Vec<String>,
    /// Receiving sessions without a chunk for this long are evicted.
    pub session_idle_timeout: Duration,
}

fn default_allowed_extensions() -> Vec<String> {
    DEFAULT_ALLOWED_EXTENSIONS
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let server_port = env::var("SERVER_PORT")
            .or_else(|_| env::var("PORT"))
            .unwrap_or_else(|_| SERVER_PORT.to_string())
            .parse::<u16>()
            .unwrap_or(SERVER_PORT);

        let media_root = PathBuf::from(
            env::var("MEDIA_ROOT").unwrap_or_else(|_| "./pub/media".to_string()),
        );

        let media_base_url = env::var("MEDIA_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}/media", server_port));

        let staging_dir = env::var("STAGING_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| media_root.join(TMP_MEDIA_PATH).join(".staging"));

        let image_max_width = env::var("IMAGE_MAX_WIDTH")
            .unwrap_or_else(|_| DEFAULT_IMAGE_MAX_WIDTH.to_string())
            .parse::<u32>()
            .unwrap_or(DEFAULT_IMAGE_MAX_WIDTH);

        let image_engine = match env::var("IMAGE_ENGINE") {
            Ok(value) => value.parse::<ImageEngineKind>()?,
            Err(_) => ImageEngineKind::default(),
        };

        let jpeg_quality = env::var("JPEG_QUALITY")
            .unwrap_or_else(|_| DEFAULT_JPEG_QUALITY.to_string())
            .parse::<u8>()
            .unwrap_or(DEFAULT_JPEG_QUALITY);

        let max_chunk_mb = env::var("MAX_CHUNK_MB")
            .unwrap_or_else(|_| MAX_CHUNK_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_CHUNK_MB);

        let max_concurrent_requests = env::var("MAX_CONCURRENT_REQUESTS")
            .unwrap_or_else(|_| MAX_CONCURRENT_REQUESTS.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_CONCURRENT_REQUESTS);

        let allowed_extensions = match env::var("ALLOWED_EXTENSIONS") {
            Ok(value) => value
                .split(',')
                .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
            Err(_) => default_allowed_extensions(),
        };

        let session_idle_timeout_secs = env::var("SESSION_IDLE_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_SESSION_IDLE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .unwrap_or(DEFAULT_SESSION_IDLE_TIMEOUT_SECS);

        let config = Config {
            server_port,
            environment,
            media_root,
            media_base_url,
            staging_dir,
            image_max_width,
            image_engine,
            jpeg_quality,
            max_chunk_bytes: max_chunk_mb * 1024 * 1024,
            max_concurrent_requests,
            allowed_extensions,
            session_idle_timeout: Duration::from_secs(session_idle_timeout_secs),
        };

        config.validate()?;
        Ok(config)
    }

    /// Config rooted at `media_root` with every other value at its default.
    pub fn with_media_root(media_root: impl Into<PathBuf>) -> Self {
        let media_root = media_root.into();
        let staging_dir = media_root.join(TMP_MEDIA_PATH).join(".staging");
        Config {
            server_port: SERVER_PORT,
            environment: "development".to_string(),
            media_root,
            media_base_url: format!("http://localhost:{}/media", SERVER_PORT),
            staging_dir,
            image_max_width: DEFAULT_IMAGE_MAX_WIDTH,
            image_engine: ImageEngineKind::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_chunk_bytes: MAX_CHUNK_MB * 1024 * 1024,
            max_concurrent_requests: MAX_CONCURRENT_REQUESTS,
            allowed_extensions: default_allowed_extensions(),
            session_idle_timeout: Duration::from_secs(DEFAULT_SESSION_IDLE_TIMEOUT_SECS),
        }
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.image_max_width == 0 {
            return Err(anyhow::anyhow!("IMAGE_MAX_WIDTH must be greater than 0"));
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(anyhow::anyhow!(
                "JPEG_QUALITY must be between 1 and 100, got {}",
                self.jpeg_quality
            ));
        }
        if self.max_chunk_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_CHUNK_MB must be greater than 0"));
        }
        if self.max_concurrent_requests == 0 {
            return Err(anyhow::anyhow!(
                "MAX_CONCURRENT_REQUESTS must be greater than 0"
            ));
        }
        if self.allowed_extensions.is_empty() {
            return Err(anyhow::anyhow!("ALLOWED_EXTENSIONS must list at least one extension"));
        }
        if self.session_idle_timeout.is_zero() {
            return Err(anyhow::anyhow!(
                "SESSION_IDLE_TIMEOUT_SECS must be greater than 0"
            ));
        }
        if self.media_base_url.trim().is_empty() {
            return Err(anyhow::anyhow!("MEDIA_BASE_URL must not be empty"));
        }
        Ok(())
    }

    /// Whether `name` ends in one of the allowed extensions (case-insensitive).
    pub fn is_allowed_extension(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                self.allowed_extensions.iter().any(|allowed| *allowed == ext)
            })
            .unwrap_or(false)
    }

    /// Absolute directory that merged gallery images land in.
    pub fn tmp_media_dir(&self) -> PathBuf {
        self.media_root.join(TMP_MEDIA_PATH)
    }

    /// Public URL of a file relative to the tmp media directory.
    pub fn tmp_media_url(&self, relative: &str) -> String {
        format!(
            "{}/{}/{}",
            self.media_base_url.trim_end_matches('/'),
            TMP_MEDIA_PATH,
            relative.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_kind_parse() {
        assert_eq!("auto".parse::<ImageEngineKind>().unwrap(), ImageEngineKind::Auto);
        assert_eq!(
            "FALLBACK".parse::<ImageEngineKind>().unwrap(),
            ImageEngineKind::Fallback
        );
        assert!("imagick".parse::<ImageEngineKind>().is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::with_media_root("/srv/media");
        assert!(config.validate().is_ok());
        assert_eq!(config.image_max_width, 2000);
        assert_eq!(
            config.staging_dir,
            PathBuf::from("/srv/media/tmp/catalog/product/.staging")
        );
    }

    #[test]
    fn test_validate_rejects_bad_quality() {
        let mut config = Config::with_media_root("/srv/media");
        config.jpeg_quality = 0;
        assert!(config.validate().is_err());
        config.jpeg_quality = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_allowed_extensions() {
        let config = Config::with_media_root("/srv/media");
        assert!(config.is_allowed_extension("p/h/photo.jpg"));
        assert!(config.is_allowed_extension("p/h/PHOTO.JPEG"));
        assert!(config.is_allowed_extension("a/n/anim.gif"));
        assert!(!config.is_allowed_extension("v/e/vector.webp"));
        assert!(!config.is_allowed_extension("n/o/noext"));
        assert!(!config.is_allowed_extension("p/h/photo.png.php"));

        let mut config = config;
        config.allowed_extensions.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tmp_media_url() {
        let mut config = Config::with_media_root("/srv/media");
        config.media_base_url = "https://shop.example/media/".to_string();
        assert_eq!(
            config.tmp_media_url("/p/h/photo.jpg"),
            "https://shop.example/media/tmp/catalog/product/p/h/photo.jpg"
        );
    }
}
