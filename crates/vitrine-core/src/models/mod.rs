pub mod image;
pub mod response;
pub mod upload;

pub use image::{ImageAsset, ImageDimensions};
pub use response::{ChunkUploadResponse, CompletedUpload, GalleryUploadResponse};
pub use upload::{ChunkDescriptor, SessionState, UploadSession};
