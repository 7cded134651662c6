use bytes::Bytes;
use image::DynamicImage;
use img_parts::jpeg::Jpeg;
use img_parts::ImageEXIF;

/// EXIF orientation helpers for the JPEG-only engine
pub struct ImageOrientation;

impl ImageOrientation {
    /// Read the EXIF orientation tag (1-8) from JPEG data.
    ///
    /// Returns `None` for non-JPEG data, a missing EXIF segment, a missing tag or a value
    /// outside 1-8.
    pub fn read_jpeg_orientation(data: &[u8]) -> Option<u16> {
        let jpeg = Jpeg::from_bytes(Bytes::copy_from_slice(data)).ok()?;
        let exif = jpeg.exif()?;

        let parsed = exif::Reader::new().read_raw(exif.to_vec()).ok()?;
        let field = parsed.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
        let value = field.value.get_uint(0)?;

        match value {
            1..=8 => Some(value as u16),
            _ => None,
        }
    }

    /// Clockwise rotation for the orientations the fallback engine handles.
    pub fn rotation_for_tag(tag: u16) -> Option<u16> {
        match tag {
            3 => Some(180),
            6 => Some(90),
            8 => Some(270),
            _ => None,
        }
    }

    /// Rotate image by specified angle (90, 180, or 270 degrees clockwise).
    /// The pixel format is kept.
    pub fn rotate_by_angle(img: DynamicImage, angle: u16) -> DynamicImage {
        match angle {
            90 => img.rotate90(),
            180 => img.rotate180(),
            270 => img.rotate270(),
            _ => img,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::Cursor;

    use bytes::Bytes;
    use image::{DynamicImage, ImageFormat};
    use img_parts::jpeg::Jpeg;
    use img_parts::ImageEXIF;

    /// Minimal big-endian TIFF block holding a single Orientation entry.
    pub fn orientation_exif(tag: u16) -> Vec<u8> {
        let mut tiff = Vec::with_capacity(26);
        tiff.extend_from_slice(b"MM\x00\x2a");
        tiff.extend_from_slice(&8u32.to_be_bytes());
        tiff.extend_from_slice(&1u16.to_be_bytes());
        // Orientation, SHORT, count 1, value left-aligned
        tiff.extend_from_slice(&0x0112u16.to_be_bytes());
        tiff.extend_from_slice(&3u16.to_be_bytes());
        tiff.extend_from_slice(&1u32.to_be_bytes());
        tiff.extend_from_slice(&tag.to_be_bytes());
        tiff.extend_from_slice(&[0, 0]);
        tiff.extend_from_slice(&0u32.to_be_bytes());
        tiff
    }

    /// Encode `image` as JPEG, optionally tagged with an EXIF orientation.
    pub fn jpeg_bytes(image: &DynamicImage, orientation: Option<u16>) -> Vec<u8> {
        let mut buffer = Vec::new();
        DynamicImage::ImageRgb8(image.to_rgb8())
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)
            .unwrap();

        let Some(tag) = orientation else {
            return buffer;
        };
        let mut jpeg = Jpeg::from_bytes(Bytes::from(buffer)).unwrap();
        jpeg.set_exif(Some(Bytes::from(orientation_exif(tag))));
        jpeg.encoder().bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::jpeg_bytes;
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};

    fn sample() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 8, Rgb([120, 40, 200])))
    }

    #[test]
    fn test_read_jpeg_orientation() {
        for tag in 1..=8 {
            let data = jpeg_bytes(&sample(), Some(tag));
            assert_eq!(ImageOrientation::read_jpeg_orientation(&data), Some(tag));
        }
    }

    #[test]
    fn test_read_jpeg_orientation_absent() {
        let data = jpeg_bytes(&sample(), None);
        assert_eq!(ImageOrientation::read_jpeg_orientation(&data), None);
        assert_eq!(ImageOrientation::read_jpeg_orientation(b"not a jpeg"), None);
    }

    #[test]
    fn test_rotation_for_tag() {
        assert_eq!(ImageOrientation::rotation_for_tag(3), Some(180));
        assert_eq!(ImageOrientation::rotation_for_tag(6), Some(90));
        assert_eq!(ImageOrientation::rotation_for_tag(8), Some(270));
        for tag in [1, 2, 4, 5, 7] {
            assert_eq!(ImageOrientation::rotation_for_tag(tag), None);
        }
    }

    #[test]
    fn test_rotation_dimension_changes() {
        let img = sample();
        assert_eq!(img.dimensions(), (16, 8));

        let rotated = ImageOrientation::rotate_by_angle(img.clone(), 90);
        assert_eq!(rotated.dimensions(), (8, 16));

        let rotated = ImageOrientation::rotate_by_angle(img.clone(), 180);
        assert_eq!(rotated.dimensions(), (16, 8));

        let rotated = ImageOrientation::rotate_by_angle(img.clone(), 270);
        assert_eq!(rotated.dimensions(), (8, 16));

        let rotated = ImageOrientation::rotate_by_angle(img.clone(), 45);
        assert_eq!(rotated.dimensions(), img.dimensions());
    }
}
