//! Utility functions for dirsubset
//!
//! Path helpers shared by the indexer and the verifier, plus byte
//! formatting for summaries.

use crate::error::{Result, VerifyError};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Check that `path` exists and is a directory
///
/// # Errors
///
/// - [`VerifyError::NotFound`] if nothing exists at `path`
/// - [`VerifyError::NotADirectory`] if `path` is a file or other non-directory
/// - [`VerifyError::Io`] if the metadata lookup fails for another reason
pub fn validate_directory(path: &Path) -> Result<()> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(VerifyError::NotADirectory { path: path.to_path_buf() }),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(VerifyError::NotFound { path: path.to_path_buf() })
        }
        Err(e) => Err(VerifyError::Io(e)),
    }
}

/// Path of `path` relative to `base`
///
/// `path` must have been produced by walking `base`, so the prefix is
/// stripped lexically.
///
/// # Errors
///
/// - [`VerifyError::Internal`] if the path is not under the base path
pub fn make_relative(path: &Path, base: &Path) -> Result<PathBuf> {
    path.strip_prefix(base)
        .map(Path::to_path_buf)
        .map_err(|_| VerifyError::internal(format!("{:?} is not under {:?}", path, base)))
}

/// Format bytes in human-readable form
///
/// Uses binary (1024-based) units. Values below 1 KB are shown as whole
/// numbers, larger values with two decimals.
///
/// ```rust,ignore
/// assert_eq!(format_bytes(1536), "1.50 KB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}
