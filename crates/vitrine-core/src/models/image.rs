use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Dimensions after scaling down to `max_width`, keeping the aspect ratio.
    /// Images already within bounds are returned unchanged.
    pub fn constrained_to_width(self, max_width: u32) -> Self {
        if self.width <= max_width || self.width == 0 {
            return self;
        }
        let height = (self.height as f64 * max_width as f64 / self.width as f64).round() as u32;
        Self {
            width: max_width,
            height: height.max(1),
        }
    }
}

/// A finalized image after normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAsset {
    pub orig_width: u32,
    pub orig_height: u32,
    /// EXIF orientation tag found in the source, if any (1-8)
    pub orientation_tag: Option<u16>,
    pub final_width: u32,
    pub final_height: u32,
    /// Name of the engine that processed the file
    pub engine: String,
    /// False when the engine failed and the file was left untouched
    pub transformed: bool,
}

impl ImageAsset {
    pub fn final_dimensions(&self) -> ImageDimensions {
        ImageDimensions::new(self.final_width, self.final_height)
    }
}
