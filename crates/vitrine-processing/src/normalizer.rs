use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use vitrine_core::models::ImageAsset;
use vitrine_core::Config;

use crate::engine::{select_engine, EngineSelection, ImageEngine};
use crate::{NormalizeError, TransformFailure};

/// Orientation correction plus width cap for finalized images.
#[derive(Clone)]
pub struct ImageNormalizer {
    engine: Arc<dyn ImageEngine>,
    max_width: u32,
    jpeg_quality: u8,
}

impl ImageNormalizer {
    pub fn new(engine: Arc<dyn ImageEngine>, max_width: u32, jpeg_quality: u8) -> Self {
        Self {
            engine,
            max_width,
            jpeg_quality,
        }
    }

    /// Build the normalizer from configuration, logging when the preferred engine is
    /// unavailable.
    pub fn from_config(config: &Config) -> Self {
        let selection = select_engine(config.image_engine);
        match &selection {
            EngineSelection::Preferred(engine) => {
                tracing::info!(engine = engine.name(), "Image engine selected");
            }
            EngineSelection::Fallback { engine, reason } => {
                tracing::info!(
                    engine = engine.name(),
                    reason = %reason,
                    "Preferred image engine unavailable, using fallback"
                );
            }
        }
        Self::new(selection.engine(), config.image_max_width, config.jpeg_quality)
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    pub fn max_width(&self) -> u32 {
        self.max_width
    }

    /// Normalize the image at `path` in place on the blocking pool.
    pub async fn normalize(&self, path: &Path) -> Result<ImageAsset, NormalizeError> {
        let normalizer = self.clone();
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || normalizer.normalize_blocking(&path))
            .await
            .map_err(|e| NormalizeError::Task(e.to_string()))?
    }

    /// Normalize the image at `path` in place.
    ///
    /// An unreadable file is an error. Engine failures after that are logged and the
    /// file is left untouched with `transformed = false`.
    pub fn normalize_blocking(&self, path: &Path) -> Result<ImageAsset, NormalizeError> {
        let start = Instant::now();

        let original = self
            .engine
            .probe_dimensions(path)
            .map_err(|e| NormalizeError::InvalidImage {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        let target = original.constrained_to_width(self.max_width);

        let (transformed, orientation_tag) = match self.transform(path, target.width) {
            Ok(tag) => (true, tag),
            Err(failure) => {
                tracing::warn!(
                    path = %path.display(),
                    engine = self.engine.name(),
                    error = %failure,
                    "Image transform failed, keeping original file"
                );
                (false, None)
            }
        };

        let fallback = if transformed { target } else { original };
        let final_dims = self.engine.probe_dimensions(path).unwrap_or(fallback);

        tracing::info!(
            path = %path.display(),
            engine = self.engine.name(),
            orig_width = original.width,
            orig_height = original.height,
            final_width = final_dims.width,
            final_height = final_dims.height,
            orientation = ?orientation_tag,
            transformed = transformed,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Image normalized"
        );

        Ok(ImageAsset {
            orig_width: original.width,
            orig_height: original.height,
            orientation_tag,
            final_width: final_dims.width,
            final_height: final_dims.height,
            engine: self.engine.name().to_string(),
            transformed,
        })
    }

    fn transform(&self, path: &Path, width: u32) -> Result<Option<u16>, TransformFailure> {
        let image = self.engine.open(path)?;
        let orientation_tag = image.orientation_tag;
        let image = self.engine.correct_orientation(image)?;
        let image = self.engine.resize(image, width)?;
        self.engine.save(&image, path, self.jpeg_quality)?;
        Ok(orientation_tag)
    }
}

impl std::fmt::Debug for ImageNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageNormalizer")
            .field("engine", &self.engine.name())
            .field("max_width", &self.max_width)
            .field("jpeg_quality", &self.jpeg_quality)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::WorkingImage;
    use crate::image::orientation::test_support::jpeg_bytes;
    use crate::image::{ExifRotateEngine, ImageOrientation};
    use image::{DynamicImage, GenericImageView, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io;
    use tempfile::tempdir;
    use vitrine_core::models::ImageDimensions;

    /// Left half red, right half blue.
    fn split_colors(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgb([220, 20, 20])
            } else {
                Rgb([20, 20, 220])
            }
        }))
    }

    fn close_to(actual: &Rgb<u8>, expected: [u8; 3]) -> bool {
        actual
            .0
            .iter()
            .zip(expected)
            .all(|(a, e)| (*a as i16 - e as i16).abs() <= 40)
    }

    #[tokio::test]
    async fn test_small_image_keeps_dimensions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("small.png");
        split_colors(300, 200).save(&path).unwrap();

        let normalizer = ImageNormalizer::new(Arc::new(ExifRotateEngine), 300, 90);
        let asset = normalizer.normalize(&path).await.unwrap();

        assert_eq!((asset.orig_width, asset.orig_height), (300, 200));
        assert_eq!(asset.final_dimensions(), ImageDimensions::new(300, 200));
        assert!(asset.transformed);
    }

    #[tokio::test]
    async fn test_wide_image_is_capped_with_rounded_height() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wide.png");
        split_colors(457, 301).save(&path).unwrap();

        let normalizer = ImageNormalizer::new(Arc::new(ExifRotateEngine), 200, 90);
        let asset = normalizer.normalize(&path).await.unwrap();

        // 301 * 200 / 457 = 131.7
        assert_eq!(asset.final_dimensions(), ImageDimensions::new(200, 132));
        assert_eq!(image::image_dimensions(&path).unwrap(), (200, 132));
    }

    #[tokio::test]
    async fn test_default_width_cap() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("large.png");
        DynamicImage::ImageLuma8(image::GrayImage::new(2400, 1000))
            .save(&path)
            .unwrap();

        let normalizer = ImageNormalizer::from_config(&Config::with_media_root(dir.path()));
        let asset = normalizer.normalize(&path).await.unwrap();

        // 1000 * 2000 / 2400 = 833.3
        assert_eq!(asset.final_dimensions(), ImageDimensions::new(2000, 833));
    }

    #[tokio::test]
    async fn test_fallback_rotation_matches_manual_rotation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("portrait.jpg");
        let source = split_colors(64, 32);
        std::fs::write(&path, jpeg_bytes(&source, Some(6))).unwrap();

        let normalizer = ImageNormalizer::new(Arc::new(ExifRotateEngine), 2000, 95);
        let asset = normalizer.normalize(&path).await.unwrap();
        assert_eq!(asset.orientation_tag, Some(6));
        assert_eq!(asset.final_dimensions(), ImageDimensions::new(32, 64));

        let data = std::fs::read(&path).unwrap();
        assert_eq!(ImageOrientation::read_jpeg_orientation(&data), None);

        let output = image::load_from_memory(&data).unwrap().to_rgb8();
        let expected = ImageOrientation::rotate_by_angle(source, 90).to_rgb8();
        assert_eq!(output.dimensions(), expected.dimensions());
        for (x, y) in [(16, 8), (16, 56), (4, 4), (28, 60)] {
            let want = expected.get_pixel(x, y).0;
            assert!(
                close_to(output.get_pixel(x, y), want),
                "pixel ({}, {}) differs",
                x,
                y
            );
        }
        // Left edge of the source ends up on top after a clockwise turn
        assert!(close_to(output.get_pixel(16, 8), [220, 20, 20]));
    }

    #[cfg(feature = "auto-orient")]
    #[tokio::test]
    async fn test_preferred_engine_swaps_dimensions_for_rotated_tags() {
        let dir = tempdir().unwrap();
        let normalizer =
            ImageNormalizer::new(Arc::new(crate::image::AutoOrientEngine), 40, 90);

        for tag in [3u16, 5, 6, 8] {
            let path = dir.path().join(format!("photo-{}.jpg", tag));
            std::fs::write(&path, jpeg_bytes(&split_colors(80, 40), Some(tag))).unwrap();

            let asset = normalizer.normalize(&path).await.unwrap();
            assert_eq!(asset.orientation_tag, Some(tag));
            // Width cap is computed from the stored width (80 -> 40) and applied after
            // orientation, so rotated images are already narrow enough.
            let expected = if tag >= 5 {
                ImageDimensions::new(40, 80)
            } else {
                ImageDimensions::new(40, 20)
            };
            assert_eq!(asset.final_dimensions(), expected, "tag {}", tag);
        }
    }

    #[tokio::test]
    async fn test_corrupt_file_is_invalid_image() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not an image").unwrap();

        let normalizer = ImageNormalizer::new(Arc::new(ExifRotateEngine), 2000, 90);
        let err = normalizer.normalize(&path).await.unwrap_err();
        assert!(matches!(err, NormalizeError::InvalidImage { .. }));
    }

    #[tokio::test]
    async fn test_png_alpha_survives_normalization() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logo.png");
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(120, 60, Rgba([0, 0, 0, 0])))
            .save(&path)
            .unwrap();

        let normalizer = ImageNormalizer::new(Arc::new(ExifRotateEngine), 60, 90);
        normalizer.normalize(&path).await.unwrap();

        let reloaded = image::open(&path).unwrap();
        assert_eq!(reloaded.dimensions(), (60, 30));
        assert!(reloaded.color().has_alpha());
        assert_eq!(reloaded.to_rgba8().get_pixel(10, 10)[3], 0);
    }

    struct BrokenSaveEngine;

    impl ImageEngine for BrokenSaveEngine {
        fn name(&self) -> &'static str {
            "broken-save"
        }

        fn open(&self, path: &Path) -> Result<WorkingImage, TransformFailure> {
            ExifRotateEngine.open(path)
        }

        fn correct_orientation(
            &self,
            image: WorkingImage,
        ) -> Result<WorkingImage, TransformFailure> {
            Ok(image)
        }

        fn save(&self, _: &WorkingImage, _: &Path, _: u8) -> Result<(), TransformFailure> {
            Err(TransformFailure::Io(io::Error::new(
                io::ErrorKind::Other,
                "disk full",
            )))
        }
    }

    #[tokio::test]
    async fn test_transform_failure_keeps_original() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wide.png");
        split_colors(500, 100).save(&path).unwrap();
        let before = std::fs::read(&path).unwrap();

        let normalizer = ImageNormalizer::new(Arc::new(BrokenSaveEngine), 200, 90);
        let asset = normalizer.normalize(&path).await.unwrap();

        assert!(!asset.transformed);
        assert_eq!(asset.final_dimensions(), ImageDimensions::new(500, 100));
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }
}
