//! Comparison keys for files in a tree
//!
//! A [`FileKey`] is the identity two trees are compared by: the path of a
//! file relative to its root, with components joined by `/` on every
//! platform. Case handling is an explicit [`CasePolicy`] instead of a rule
//! hidden in the indexer.
//!
//! ## Case policy
//!
//! | Policy     | Key for `Docs\Readme.MD` |
//! |------------|--------------------------|
//! | `Preserve` | `Docs/Readme.MD`         |
//! | `Fold`     | `docs/readme.md`         |
//!
//! `Fold` matches how case-insensitive filesystems resolve names, so it is
//! the default on Windows. Under `Fold`, two files in one tree that differ
//! only by case produce the same key. The indexer keeps the first and
//! reports the collision; see [`crate::index`].

use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fmt::{self, Write as _};
use std::path::{Component, Path};

/// How letter case participates in key identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CasePolicy {
    /// Keep the case found on disk
    Preserve,
    /// Lower-case every key
    Fold,
}

impl CasePolicy {
    /// Policy matching the case sensitivity of the host platform's usual filesystem
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            CasePolicy::Fold
        } else {
            CasePolicy::Preserve
        }
    }
}

impl Default for CasePolicy {
    fn default() -> Self {
        Self::platform_default()
    }
}

/// Normalized relative path used as the unit of comparison
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileKey(String);

impl FileKey {
    /// Build a key from a path relative to a tree root.
    ///
    /// Only normal components contribute; `.` components are dropped.
    /// Names that are not valid Unicode are escaped reversibly: a literal
    /// `\` becomes `\\`, an invalid byte becomes `\xNN` (Unix) and an
    /// unpaired surrogate becomes `\uNNNN` (Windows). Distinct names
    /// therefore always give distinct keys.
    pub fn from_relative(relative: &Path, policy: CasePolicy) -> Self {
        let mut joined = String::new();
        for component in relative.components() {
            if let Component::Normal(name) = component {
                if !joined.is_empty() {
                    joined.push('/');
                }
                push_escaped(name, &mut joined);
            }
        }
        match policy {
            CasePolicy::Preserve => FileKey(joined),
            CasePolicy::Fold => FileKey(joined.to_lowercase()),
        }
    }

    /// The key as a `/`-separated string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn push_literal(text: &str, out: &mut String) {
    for c in text.chars() {
        if c == '\\' {
            out.push_str("\\\\");
        } else {
            out.push(c);
        }
    }
}

#[cfg(unix)]
fn push_escaped(name: &OsStr, out: &mut String) {
    use std::os::unix::ffi::OsStrExt;

    for chunk in name.as_bytes().utf8_chunks() {
        push_literal(chunk.valid(), out);
        for byte in chunk.invalid() {
            let _ = write!(out, "\\x{:02x}", byte);
        }
    }
}

#[cfg(windows)]
fn push_escaped(name: &OsStr, out: &mut String) {
    use std::os::windows::ffi::OsStrExt;

    for unit in char::decode_utf16(name.encode_wide()) {
        match unit {
            Ok('\\') => out.push_str("\\\\"),
            Ok(c) => out.push(c),
            Err(e) => {
                let _ = write!(out, "\\u{:04x}", e.unpaired_surrogate());
            }
        }
    }
}

#[cfg(not(any(unix, windows)))]
fn push_escaped(name: &OsStr, out: &mut String) {
    push_literal(&name.to_string_lossy(), out);
}

/// Render a relative path with `/` separators and its original case.
///
/// For messages only: names that are not valid Unicode are converted lossily.
pub fn display_path(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
