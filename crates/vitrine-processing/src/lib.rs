//! Vitrine Processing Library
//!
//! Post-processing for finalized gallery images: EXIF orientation correction and an
//! aspect-preserving downscale, written back over the file in place.
//!
//! Two engines implement [`ImageEngine`]:
//!
//! - [`AutoOrientEngine`] (feature `auto-orient`, on by default) reads the orientation
//!   from decoder metadata for any supported format and applies all eight EXIF
//!   orientations;
//! - [`ExifRotateEngine`] reads the tag from JPEG EXIF only and handles the three pure
//!   rotations (3, 6 and 8).
//!
//! The engine is picked once with [`select_engine`]; [`ImageNormalizer`] drives it.

pub mod engine;
pub mod error;
pub mod image;
pub mod normalizer;

pub use engine::{select_engine, EngineSelection, ImageEngine, WorkingImage};
pub use error::{NormalizeError, TransformFailure};
#[cfg(feature = "auto-orient")]
pub use self::image::AutoOrientEngine;
pub use self::image::ExifRotateEngine;
pub use normalizer::ImageNormalizer;
