use std::io::Cursor;
use std::path::Path;

use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};

use super::read_source;
use crate::engine::{ImageEngine, WorkingImage};
use crate::TransformFailure;

/// Preferred engine: the decoder reports orientation for JPEG, PNG and WebP alike, and
/// all eight EXIF orientations (mirrored ones included) are applied.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoOrientEngine;

impl ImageEngine for AutoOrientEngine {
    fn name(&self) -> &'static str {
        "auto-orient"
    }

    fn open(&self, path: &Path) -> Result<WorkingImage, TransformFailure> {
        let (data, format) = read_source(path)?;

        let mut decoder = ImageReader::with_format(Cursor::new(&data), format)
            .into_decoder()
            .map_err(TransformFailure::Decode)?;
        let orientation = decoder.orientation().map_err(TransformFailure::Decode)?;
        let image = DynamicImage::from_decoder(decoder).map_err(TransformFailure::Decode)?;

        Ok(WorkingImage {
            image,
            format,
            orientation_tag: exif_tag(orientation),
        })
    }

    fn correct_orientation(
        &self,
        mut image: WorkingImage,
    ) -> Result<WorkingImage, TransformFailure> {
        let orientation = image
            .orientation_tag
            .and_then(|tag| Orientation::from_exif(tag as u8));

        if let Some(orientation) = orientation {
            tracing::debug!(
                orientation = ?orientation,
                engine = self.name(),
                "Applying EXIF orientation"
            );
            image.image.apply_orientation(orientation);
        }
        Ok(image)
    }
}

fn exif_tag(orientation: Orientation) -> Option<u16> {
    let tag = match orientation {
        Orientation::NoTransforms => return None,
        Orientation::FlipHorizontal => 2,
        Orientation::Rotate180 => 3,
        Orientation::FlipVertical => 4,
        Orientation::Rotate90FlipH => 5,
        Orientation::Rotate90 => 6,
        Orientation::Rotate270FlipH => 7,
        Orientation::Rotate270 => 8,
    };
    Some(tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::orientation::test_support::jpeg_bytes;
    use image::{GenericImageView, Rgb, RgbImage};
    use tempfile::tempdir;

    fn landscape() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(48, 24, Rgb([30, 160, 90])))
    }

    #[test]
    fn test_dimensions_follow_orientation_tag() {
        let dir = tempdir().unwrap();
        let engine = AutoOrientEngine;

        for tag in 1..=8u16 {
            let path = dir.path().join(format!("tagged-{}.jpg", tag));
            std::fs::write(&path, jpeg_bytes(&landscape(), Some(tag))).unwrap();

            let opened = engine.open(&path).unwrap();
            let expected_tag = if tag == 1 { None } else { Some(tag) };
            assert_eq!(opened.orientation_tag, expected_tag);

            let corrected = engine.correct_orientation(opened).unwrap();
            let expected = if tag >= 5 { (24, 48) } else { (48, 24) };
            assert_eq!(corrected.image.dimensions(), expected, "tag {}", tag);
        }
    }

    #[test]
    fn test_untagged_png_is_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.png");
        landscape().save(&path).unwrap();

        let engine = AutoOrientEngine;
        let opened = engine.open(&path).unwrap();
        assert_eq!(opened.format, image::ImageFormat::Png);
        assert_eq!(opened.orientation_tag, None);

        let corrected = engine.correct_orientation(opened).unwrap();
        assert_eq!(corrected.image.dimensions(), (48, 24));
    }
}
