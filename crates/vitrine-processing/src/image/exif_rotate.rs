use std::path::Path;

use image::ImageFormat;

use super::orientation::ImageOrientation;
use super::read_source;
use crate::engine::{ImageEngine, WorkingImage};
use crate::TransformFailure;

/// Fallback engine: reads the orientation from JPEG EXIF only and applies the pure
/// rotations (tags 3, 6 and 8). Mirrored orientations, unknown tags and other formats
/// are left as they are.
///
/// The tag is cleared on save because the re-encoded file carries no EXIF block.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifRotateEngine;

impl ImageEngine for ExifRotateEngine {
    fn name(&self) -> &'static str {
        "exif-rotate"
    }

    fn open(&self, path: &Path) -> Result<WorkingImage, TransformFailure> {
        let (data, format) = read_source(path)?;
        let orientation_tag = if format == ImageFormat::Jpeg {
            ImageOrientation::read_jpeg_orientation(&data)
        } else {
            None
        };
        let image = image::load_from_memory_with_format(&data, format)
            .map_err(TransformFailure::Decode)?;

        Ok(WorkingImage {
            image,
            format,
            orientation_tag,
        })
    }

    fn correct_orientation(
        &self,
        mut image: WorkingImage,
    ) -> Result<WorkingImage, TransformFailure> {
        let Some(angle) = image
            .orientation_tag
            .and_then(ImageOrientation::rotation_for_tag)
        else {
            return Ok(image);
        };

        tracing::debug!(
            orientation = ?image.orientation_tag,
            rotate = angle,
            engine = self.name(),
            "Applying EXIF rotation"
        );
        image.image = ImageOrientation::rotate_by_angle(image.image, angle);
        Ok(image)
    }
}
