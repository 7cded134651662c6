//! Test fixtures: generated images.

use std::io::Cursor;

use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use img_parts::jpeg::{markers, Jpeg, JpegSegment};

/// Smooth gradient, cheap to encode and to compare after resizing.
pub fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    }))
}

pub fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Vec::new();
    image.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
    buffer
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    encode(&gradient(width, height), ImageFormat::Png)
}

/// A valid JPEG of `width` x `height`, padded with comment segments to at least
/// `min_len` bytes so it needs several chunks.
pub fn padded_jpeg(width: u32, height: u32, min_len: usize) -> Vec<u8> {
    let encoded = encode(&gradient(width, height), ImageFormat::Jpeg);
    let mut len = encoded.len();
    let mut jpeg = Jpeg::from_bytes(Bytes::from(encoded)).unwrap();

    while len < min_len {
        let size = (min_len - len).clamp(1, 60_000);
        let segment = JpegSegment::new_with_contents(markers::COM, Bytes::from(vec![b'x'; size]));
        let position = jpeg.segments().len().min(1);
        jpeg.segments_mut().insert(position, segment);
        // marker + length field + contents
        len += size + 4;
    }

    jpeg.encoder().bytes().to_vec()
}
