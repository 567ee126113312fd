//! Tree indexing
//!
//! A [`TreeIndex`] is built by one traversal of one root directory. It maps
//! each regular file's [`FileKey`] to the file's absolute path and the size
//! observed during the walk. Sizes are never re-read afterwards, so the
//! comparator works from a single consistent snapshot of metadata.
//!
//! ## What gets indexed
//!
//! - Regular files at any depth below the root
//! - Nothing else: directories, symbolic links, sockets and device files are
//!   skipped. Links are never followed, so a link cycle cannot be entered.
//! - Files whose path matches an exclude pattern are left out; a directory
//!   whose path matches is pruned with everything below it.
//!
//! ## Ordering
//!
//! Siblings are visited in file-name order, which makes the index order (and
//! therefore diagnostic order) reproducible for an unchanged tree.
//!
//! ## Problems during the walk
//!
//! Unreadable directories, entries that vanish mid-walk and key collisions
//! are recorded as [`Warning`]s on the index rather than aborting the build
//! or being dropped.

use crate::error::{Result, VerifyError};
use crate::key::{display_path, CasePolicy, FileKey};
use crate::utils;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

/// Options controlling how a tree is indexed
#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    /// How case participates in key identity
    pub case_policy: CasePolicy,
    /// Glob patterns for files or directories to leave out
    pub exclude_patterns: Vec<String>,
}

impl IndexOptions {
    /// Options with the platform case policy and no excludes
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the case policy
    pub fn with_case_policy(mut self, policy: CasePolicy) -> Self {
        self.case_policy = policy;
        self
    }

    /// Set exclude patterns (glob syntax, matched against `/`-separated relative paths)
    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    /// Compile exclude patterns. Returns `None` when there are none.
    ///
    /// Under [`CasePolicy::Fold`] patterns match case-insensitively, matching
    /// how keys are compared.
    pub(crate) fn compile_excludes(&self) -> Result<Option<GlobSet>> {
        if self.exclude_patterns.is_empty() {
            return Ok(None);
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude_patterns {
            let glob = GlobBuilder::new(pattern)
                .case_insensitive(self.case_policy == CasePolicy::Fold)
                .literal_separator(true)
                .build()
                .map_err(|e| VerifyError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.kind().to_string(),
                })?;
            builder.add(glob);
        }

        builder
            .build()
            .map(Some)
            .map_err(|e| VerifyError::InvalidPattern {
                pattern: self.exclude_patterns.join(", "),
                reason: e.to_string(),
            })
    }
}

/// A regular file recorded in an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedFile {
    /// Comparison key
    pub key: FileKey,
    /// Relative path with original case, for messages
    pub display_path: String,
    /// Absolute path on disk
    pub path: PathBuf,
    /// Size in bytes at index time
    pub size: u64,
}

/// Non-fatal problem found while indexing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// An entry could not be read during traversal. Anything below it was not indexed.
    Traversal {
        /// Root of the tree being walked
        root: PathBuf,
        /// Offending path, when known
        path: Option<PathBuf>,
        /// Underlying error text
        message: String,
    },
    /// Two files in one tree produced the same key
    KeyCollision {
        /// Root of the tree being walked
        root: PathBuf,
        /// Shared key
        key: FileKey,
        /// Path that stayed in the index
        kept: String,
        /// Path that was left out
        dropped: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::Traversal { root, path: Some(path), message } => {
                write!(f, "could not read {} under {}: {}", path.display(), root.display(), message)
            }
            Warning::Traversal { root, path: None, message } => {
                write!(f, "traversal error under {}: {}", root.display(), message)
            }
            Warning::KeyCollision { root, key, kept, dropped } => write!(
                f,
                "key collision under {}: '{}' and '{}' both map to '{}'; only '{}' was compared",
                root.display(),
                kept,
                dropped,
                key,
                kept
            ),
        }
    }
}

/// Immutable index of the regular files under one root
#[derive(Debug, Clone)]
pub struct TreeIndex {
    root: PathBuf,
    case_policy: CasePolicy,
    entries: Vec<IndexedFile>,
    lookup: HashMap<FileKey, usize>,
    warnings: Vec<Warning>,
}

impl TreeIndex {
    /// Walk `root` and index every regular file below it
    ///
    /// # Errors
    ///
    /// - [`VerifyError::NotFound`] if `root` does not exist
    /// - [`VerifyError::NotADirectory`] if `root` is not a directory
    /// - [`VerifyError::InvalidPattern`] if an exclude pattern does not compile
    ///
    /// Failures below the root are recorded as warnings instead.
    pub fn build(root: &Path, options: &IndexOptions) -> Result<Self> {
        utils::validate_directory(root)?;
        let excludes = options.compile_excludes()?;
        let root = root.canonicalize()?;
        let start = Instant::now();

        let mut index = TreeIndex {
            root: root.clone(),
            case_policy: options.case_policy,
            entries: Vec::new(),
            lookup: HashMap::new(),
            warnings: Vec::new(),
        };

        let walker = WalkDir::new(&root)
            .follow_links(false)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| match &excludes {
                Some(set) => !is_excluded(set, entry.path(), &root),
                None => true,
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Walk error under {:?}: {}", root, e);
                    index.warnings.push(Warning::Traversal {
                        root: root.clone(),
                        path: e.path().map(Path::to_path_buf),
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                trace!("Skipping non-regular entry {:?}", entry.path());
                continue;
            }

            if let Err(e) = index.record(entry.path(), entry.metadata().map(|m| m.len())) {
                warn!("Could not index {:?}: {}", entry.path(), e);
                index.warnings.push(Warning::Traversal {
                    root: root.clone(),
                    path: Some(entry.path().to_path_buf()),
                    message: e.to_string(),
                });
            }
        }

        debug!(
            "Indexed {} files ({}) under {:?} in {:?} with {} warnings",
            index.entries.len(),
            utils::format_bytes(index.total_bytes()),
            index.root,
            start.elapsed(),
            index.warnings.len()
        );

        Ok(index)
    }

    fn record(&mut self, path: &Path, size: std::result::Result<u64, walkdir::Error>) -> Result<()> {
        let size = size.map_err(|e| match e.into_io_error() {
            Some(io) => VerifyError::Io(io),
            None => VerifyError::internal("metadata unavailable"),
        })?;
        let relative = utils::make_relative(path, &self.root)?;
        let key = FileKey::from_relative(&relative, self.case_policy);
        let shown = display_path(&relative);

        if let Some(&existing) = self.lookup.get(&key) {
            let kept = self.entries[existing].display_path.clone();
            warn!("Key collision on '{}': keeping '{}', dropping '{}'", key, kept, shown);
            self.warnings.push(Warning::KeyCollision {
                root: self.root.clone(),
                key,
                kept,
                dropped: shown,
            });
            return Ok(());
        }

        self.lookup.insert(key.clone(), self.entries.len());
        self.entries.push(IndexedFile {
            key,
            display_path: shown,
            path: path.to_path_buf(),
            size,
        });
        Ok(())
    }

    /// Canonical root this index was built from
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Case policy used to derive keys
    pub fn case_policy(&self) -> CasePolicy {
        self.case_policy
    }

    /// Number of indexed files
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no files were indexed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a file by key
    pub fn get(&self, key: &FileKey) -> Option<&IndexedFile> {
        self.lookup.get(key).map(|&position| &self.entries[position])
    }

    /// Whether `key` is present
    pub fn contains(&self, key: &FileKey) -> bool {
        self.lookup.contains_key(key)
    }

    /// Files in enumeration order
    pub fn iter(&self) -> std::slice::Iter<'_, IndexedFile> {
        self.entries.iter()
    }

    /// Files as a slice, in enumeration order
    pub fn files(&self) -> &[IndexedFile] {
        &self.entries
    }

    /// Problems recorded during the walk
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Sum of all indexed file sizes
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|f| f.size).sum()
    }
}

impl<'a> IntoIterator for &'a TreeIndex {
    type Item = &'a IndexedFile;
    type IntoIter = std::slice::Iter<'a, IndexedFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn is_excluded(set: &GlobSet, path: &Path, root: &Path) -> bool {
    match path.strip_prefix(root) {
        Ok(relative) => set.is_match(display_path(relative)),
        Err(_) => false,
    }
}
