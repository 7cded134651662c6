pub mod chunk_upload;
pub mod gallery;
pub mod health;
