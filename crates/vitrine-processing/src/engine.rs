//! Image engine capability interface and engine selection.

use std::io::{BufWriter, Seek, Write};
use std::path::Path;
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use vitrine_core::models::ImageDimensions;
use vitrine_core::ImageEngineKind;

#[cfg(feature = "auto-orient")]
use crate::image::AutoOrientEngine;
use crate::image::ExifRotateEngine;
use crate::TransformFailure;

/// Decoded image plus what the engine learned while opening it.
#[derive(Debug, Clone)]
pub struct WorkingImage {
    pub image: DynamicImage,
    pub format: ImageFormat,
    /// EXIF orientation found in the source (1-8), if any
    pub orientation_tag: Option<u16>,
}

impl WorkingImage {
    pub fn dimensions(&self) -> ImageDimensions {
        let (width, height) = self.image.dimensions();
        ImageDimensions::new(width, height)
    }
}

/// Operations the normalizer needs from an image backend.
///
/// Engines are synchronous; the normalizer runs them on the blocking pool.
pub trait ImageEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Read stored dimensions without decoding pixel data.
    fn probe_dimensions(&self, path: &Path) -> Result<ImageDimensions, image::ImageError> {
        let (width, height) = ImageReader::open(path)?
            .with_guessed_format()?
            .into_dimensions()?;
        Ok(ImageDimensions::new(width, height))
    }

    fn open(&self, path: &Path) -> Result<WorkingImage, TransformFailure>;

    /// Rotate/flip pixel data so the image displays upright without metadata.
    fn correct_orientation(&self, image: WorkingImage) -> Result<WorkingImage, TransformFailure>;

    /// Scale down to `width` keeping the aspect ratio. Never upscales.
    fn resize(&self, mut image: WorkingImage, width: u32) -> Result<WorkingImage, TransformFailure> {
        let current = image.dimensions();
        let target = current.constrained_to_width(width);
        if target != current {
            image.image = image
                .image
                .resize_exact(target.width, target.height, FilterType::Lanczos3);
        }
        Ok(image)
    }

    /// Write the image over `path` in its source format.
    fn save(
        &self,
        image: &WorkingImage,
        path: &Path,
        jpeg_quality: u8,
    ) -> Result<(), TransformFailure> {
        save_atomic(&image.image, image.format, path, jpeg_quality)
    }
}

/// Encode to a sibling temp file, sync it, then rename it over `path`.
///
/// Readers never observe a half-written image.
pub fn save_atomic(
    image: &DynamicImage,
    format: ImageFormat,
    path: &Path,
    jpeg_quality: u8,
) -> Result<(), TransformFailure> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".normalize-")
        .tempfile_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        encode(image, format, &mut writer, jpeg_quality)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| TransformFailure::Io(e.error))?;
    Ok(())
}

fn encode<W: Write + Seek>(
    image: &DynamicImage,
    format: ImageFormat,
    writer: &mut W,
    jpeg_quality: u8,
) -> Result<(), TransformFailure> {
    match format {
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(writer, jpeg_quality);
            rgb.write_with_encoder(encoder)
                .map_err(TransformFailure::Encode)
        }
        other => image.write_to(writer, other).map_err(TransformFailure::Encode),
    }
}

/// Outcome of engine selection at startup.
pub enum EngineSelection {
    Preferred(Arc<dyn ImageEngine>),
    /// The preferred engine is unavailable; `reason` says why
    Fallback {
        engine: Arc<dyn ImageEngine>,
        reason: String,
    },
}

impl EngineSelection {
    pub fn engine(&self) -> Arc<dyn ImageEngine> {
        match self {
            EngineSelection::Preferred(engine) => engine.clone(),
            EngineSelection::Fallback { engine, .. } => engine.clone(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, EngineSelection::Fallback { .. })
    }
}

/// Pick the image engine once, from configuration and compiled features.
pub fn select_engine(kind: ImageEngineKind) -> EngineSelection {
    match kind {
        ImageEngineKind::Auto => preferred_engine(),
        ImageEngineKind::Fallback => EngineSelection::Fallback {
            engine: Arc::new(ExifRotateEngine),
            reason: "IMAGE_ENGINE is set to fallback".to_string(),
        },
    }
}

#[cfg(feature = "auto-orient")]
fn preferred_engine() -> EngineSelection {
    EngineSelection::Preferred(Arc::new(AutoOrientEngine))
}

#[cfg(not(feature = "auto-orient"))]
fn preferred_engine() -> EngineSelection {
    EngineSelection::Fallback {
        engine: Arc::new(ExifRotateEngine),
        reason: "built without the auto-orient feature".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::tempdir;

    #[test]
    fn test_select_engine_honours_config() {
        let selection = select_engine(ImageEngineKind::Fallback);
        assert!(selection.is_fallback());
        assert_eq!(selection.engine().name(), "exif-rotate");
    }

    #[cfg(feature = "auto-orient")]
    #[test]
    fn test_select_engine_prefers_auto_orient() {
        let selection = select_engine(ImageEngineKind::Auto);
        assert!(!selection.is_fallback());
        assert_eq!(selection.engine().name(), "auto-orient");
    }

    #[test]
    fn test_resize_never_upscales() {
        let engine = ExifRotateEngine;
        let image = WorkingImage {
            image: DynamicImage::ImageRgba8(RgbaImage::new(40, 20)),
            format: ImageFormat::Png,
            orientation_tag: None,
        };

        let same = engine.resize(image.clone(), 100).unwrap();
        assert_eq!(same.dimensions(), ImageDimensions::new(40, 20));

        let smaller = engine.resize(image, 10).unwrap();
        assert_eq!(smaller.dimensions(), ImageDimensions::new(10, 5));
    }

    #[test]
    fn test_save_atomic_keeps_alpha_for_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alpha.png");
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 40])));

        save_atomic(&image, ImageFormat::Png, &path, 90).unwrap();

        let reloaded = image::open(&path).unwrap();
        assert!(reloaded.color().has_alpha());
        assert_eq!(reloaded.to_rgba8().get_pixel(0, 0), &Rgba([10, 20, 30, 40]));

        // Only the final file remains
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_save_atomic_jpeg_drops_alpha() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([200, 0, 0, 128])));

        save_atomic(&image, ImageFormat::Jpeg, &path, 90).unwrap();

        let reloaded = image::open(&path).unwrap();
        assert!(!reloaded.color().has_alpha());
        assert_eq!(reloaded.dimensions(), (8, 8));
    }
}
