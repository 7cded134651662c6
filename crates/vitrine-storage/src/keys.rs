//! Session key derivation.
//!
//! Key format: `{c1}/{c2}/{filename}` where `c1` and `c2` are the first two characters of
//! the sanitized filename, lowercased, with anything non-alphanumeric replaced by `_`.

use std::path::Path;

use vitrine_core::constants::{MAX_EXTENSION_LENGTH, MAX_FILENAME_LENGTH, STAGING_SUFFIX};

use crate::error::{AssemblyError, AssemblyResult};

/// Longest sanitized filename; the staging copy adds its suffix on top.
pub const MAX_SANITIZED_LENGTH: usize = MAX_FILENAME_LENGTH - STAGING_SUFFIX.len();

/// Sanitize a client-supplied filename: drop any directory part, replace characters
/// outside `[A-Za-z0-9._-]` with `_` and cap the length at [`MAX_SANITIZED_LENGTH`],
/// shortening the stem so the extension survives.
pub fn sanitize_filename(filename: &str) -> AssemblyResult<String> {
    let filename_only = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);

    if filename_only.contains("..") {
        return Err(AssemblyError::InvalidKey(
            "Filename contains invalid path traversal".to_string(),
        ));
    }

    let sanitized: String = filename_only
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.trim_matches('.').is_empty() {
        return Ok("file".to_string());
    }

    Ok(shorten(sanitized, MAX_SANITIZED_LENGTH))
}

/// Cut an ASCII filename down to `max_len` bytes, keeping a short extension.
fn shorten(mut name: String, max_len: usize) -> String {
    if name.len() <= max_len {
        return name;
    }

    let extension = match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot <= MAX_EXTENSION_LENGTH => {
            name[dot..].to_string()
        }
        _ => String::new(),
    };
    name.truncate(max_len - extension.len());
    let stem = name.trim_end_matches('.');
    format!("{}{}", stem, extension)
}

/// Two-level directory prefix for a filename, e.g. `photo.jpg` -> `p/h`.
pub fn dispersion_path(filename: &str) -> String {
    let mut chars = filename.chars().map(|c| {
        if c.is_ascii_alphanumeric() {
            c.to_ascii_lowercase()
        } else {
            '_'
        }
    });
    let first = chars.next().unwrap_or('_');
    let second = chars.next().unwrap_or('_');
    format!("{}/{}", first, second)
}

/// Session key for a client filename: sanitized and dispersed.
pub fn session_key_for(filename: &str) -> AssemblyResult<String> {
    let sanitized = sanitize_filename(filename)?;
    Ok(format!("{}/{}", dispersion_path(&sanitized), sanitized))
}

/// Reject keys that could escape the staging or target directories.
pub fn validate_key(key: &str) -> AssemblyResult<()> {
    if key.is_empty() {
        return Err(AssemblyError::InvalidKey("Session key is empty".to_string()));
    }
    if key.starts_with('/') || key.contains('\\') {
        return Err(AssemblyError::InvalidKey(format!(
            "Session key must be a relative path: {}",
            key
        )));
    }
    if key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(AssemblyError::InvalidKey(format!(
            "Session key contains invalid segments: {}",
            key
        )));
    }
    Ok(())
}

/// Check that `key` has exactly the `c1/c2/name` shape [`session_key_for`] produces.
///
/// Anything else (dot segments such as the staging directory, extra levels, names the
/// sanitizer would change) is rejected.
pub fn validate_dispersed_key(key: &str) -> AssemblyResult<()> {
    validate_key(key)?;

    let invalid = || AssemblyError::InvalidKey(format!("Not an upload path: {}", key));
    let segments: Vec<&str> = key.split('/').collect();
    let [c1, c2, name] = segments.as_slice() else {
        return Err(invalid());
    };
    if name.starts_with('.') || sanitize_filename(name).ok().as_deref() != Some(*name) {
        return Err(invalid());
    }
    if dispersion_path(name) != format!("{}/{}", c1, c2) {
        return Err(invalid());
    }
    Ok(())
}
