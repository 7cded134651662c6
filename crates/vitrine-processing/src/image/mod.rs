//! Image engines
//!
//! - `auto_orient`: decoder-driven orientation for every format (feature `auto-orient`)
//! - `exif_rotate`: JPEG-only EXIF rotation
//! - `orientation`: EXIF tag reading and rotation helpers

#[cfg(feature = "auto-orient")]
pub mod auto_orient;
pub mod exif_rotate;
pub mod orientation;

#[cfg(feature = "auto-orient")]
pub use auto_orient::AutoOrientEngine;
pub use exif_rotate::ExifRotateEngine;
pub use orientation::ImageOrientation;

use std::path::Path;

use image::ImageFormat;

use crate::TransformFailure;

/// Read a source file and detect its format from content.
pub(crate) fn read_source(path: &Path) -> Result<(Vec<u8>, ImageFormat), TransformFailure> {
    let data = std::fs::read(path)?;
    let format = image::guess_format(&data).map_err(TransformFailure::Decode)?;
    Ok((data, format))
}
