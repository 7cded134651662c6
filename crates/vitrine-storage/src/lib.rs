//! Vitrine Storage Library
//!
//! Reassembles files delivered as sequential chunks. Each upload is identified by a
//! session key, a relative path such as `p/h/photo.jpg`:
//!
//! - chunks accumulate in `<staging_dir>/<key>.part`;
//! - the last chunk renames the staging file to `<target_dir>/<key>`.
//!
//! Keys must not contain `..`, a leading `/` or empty segments. Key derivation from
//! client filenames lives in the `keys` module so every entry point agrees on layout.

pub mod assembler;
pub mod error;
pub mod keys;

// Re-export commonly used types
pub use assembler::{ChunkAssembler, ChunkOutcome};
pub use error::{AssemblyError, AssemblyResult};
pub use keys::{
    dispersion_path, sanitize_filename, session_key_for, validate_dispersed_key, validate_key,
    MAX_SANITIZED_LENGTH,
};
