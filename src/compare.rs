//! Directional tree comparison
//!
//! The comparator answers one question: is every file in tree A present in
//! tree B at the same key with identical content? Files that only exist in B
//! are never looked at.
//!
//! ## Per-file check
//!
//! For each file of A, in A's index order:
//!
//! 1. No file with the same key in B → [`DiffEntry::Missing`]
//! 2. Sizes differ → [`DiffEntry::SizeMismatch`]. Nothing is hashed.
//! 3. Sizes agree → both sides are hashed. Different digests give
//!    [`DiffEntry::ContentMismatch`]; a read failure on either side gives
//!    [`DiffEntry::Unreadable`] and the run carries on.
//!
//! ## Workers
//!
//! With one worker the check runs inline on the calling thread. With more,
//! a dedicated rayon pool of that size runs one task per file and each task
//! sends its outcome over a channel; the calling thread is the only
//! receiver and places outcomes back by position, so the report is the same
//! whatever the worker count.
//!
//! ## Aborting
//!
//! Raising an [`AbortHandle`] stops new checks from starting. Checks already
//! running finish, and the result is marked [`Completion::Incomplete`] with
//! the number of files that were never checked.

use crate::error::{Result, VerifyError};
use crate::hash::{ContentHasher, Sha256Hasher};
use crate::index::{IndexedFile, TreeIndex, Warning};
use crate::utils;

use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Which tree a file belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    /// The tree that must be contained
    A,
    /// The tree expected to contain it
    B,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::A => f.write_str("A"),
            Side::B => f.write_str("B"),
        }
    }
}

/// One discrepancy between a file in A and its counterpart in B
///
/// `path` is A's relative path with its original case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiffEntry {
    /// No file with this key exists in B
    Missing {
        /// Relative path in A
        path: String,
    },
    /// Both files exist with different sizes
    SizeMismatch {
        /// Relative path in A
        path: String,
        /// Size in A
        size_a: u64,
        /// Size in B
        size_b: u64,
    },
    /// Same size, different content
    ContentMismatch {
        /// Relative path in A
        path: String,
    },
    /// Content could not be compared because one side failed to read
    Unreadable {
        /// Relative path in A
        path: String,
        /// Side whose read failed
        side: Side,
        /// Error text
        reason: String,
    },
}

impl DiffEntry {
    /// Relative path the entry refers to
    pub fn path(&self) -> &str {
        match self {
            DiffEntry::Missing { path }
            | DiffEntry::SizeMismatch { path, .. }
            | DiffEntry::ContentMismatch { path }
            | DiffEntry::Unreadable { path, .. } => path,
        }
    }

    /// Short machine-friendly name of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            DiffEntry::Missing { .. } => "missing",
            DiffEntry::SizeMismatch { .. } => "size_mismatch",
            DiffEntry::ContentMismatch { .. } => "content_mismatch",
            DiffEntry::Unreadable { .. } => "unreadable",
        }
    }
}

impl fmt::Display for DiffEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffEntry::Missing { path } => write!(f, "missing: {} does not exist in B", path),
            DiffEntry::SizeMismatch { path, size_a, size_b } => write!(
                f,
                "size mismatch: {} (A: {} bytes, B: {} bytes)",
                path, size_a, size_b
            ),
            DiffEntry::ContentMismatch { path } => {
                write!(f, "content mismatch: {} has different content in B", path)
            }
            DiffEntry::Unreadable { path, side, reason } => write!(
                f,
                "content mismatch (unreadable in {}): {}: {}",
                side, path, reason
            ),
        }
    }
}

/// Whether every file of A was checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Completion {
    /// The pass covered all of A
    Complete,
    /// The pass was aborted
    Incomplete {
        /// Files of A that were never checked
        unchecked: usize,
    },
}

/// Counters gathered during a comparison
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareStats {
    /// Files of A that were checked
    pub files_checked: usize,
    /// Individual files hashed (A and B sides counted separately)
    pub files_hashed: usize,
    /// Bytes fed to the hasher
    pub bytes_hashed: u64,
    /// Wall-clock time of the pass in milliseconds
    pub elapsed_ms: u64,
}

/// Outcome of comparing tree A against tree B
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// True iff the pass was complete and produced no diagnostics
    pub all_matched: bool,
    /// One entry per failing file, in A's index order
    pub diagnostics: Vec<DiffEntry>,
    /// Indexing problems from both trees
    pub warnings: Vec<Warning>,
    /// Whether the pass covered every file of A
    pub completion: Completion,
    /// Counters
    pub stats: CompareStats,
}

impl ComparisonResult {
    /// Whether every file of A was checked
    pub fn is_complete(&self) -> bool {
        self.completion == Completion::Complete
    }

    /// One-line summary of the result
    pub fn summary(&self) -> String {
        match self.completion {
            Completion::Complete if self.all_matched => format!(
                "{} files checked, all present in B with identical content",
                self.stats.files_checked
            ),
            Completion::Complete => format!(
                "{} files checked, {} discrepancies",
                self.stats.files_checked,
                self.diagnostics.len()
            ),
            Completion::Incomplete { unchecked } => format!(
                "aborted after {} files ({} unchecked), {} discrepancies so far",
                self.stats.files_checked,
                unchecked,
                self.diagnostics.len()
            ),
        }
    }
}

/// Shared flag that asks a running comparison to stop
///
/// Clones share the same flag. The flag is sticky: once raised, every
/// comparison that observes it stops before checking anything until
/// [`reset`](Self::reset) is called. Raising it before a run starts is how
/// a caller cancels that run.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    /// New, unraised handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the comparison to stop starting new checks
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether `abort` has been called since the last `reset`
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Lower the flag so the handle can stop a later run
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Progress snapshot passed to the progress callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareProgress {
    /// Files of A checked so far
    pub checked: usize,
    /// Files in A
    pub total: usize,
    /// Bytes hashed so far
    pub bytes_hashed: u64,
    /// Diagnostics produced so far
    pub discrepancies: usize,
}

type ProgressFn = dyn Fn(CompareProgress) + Send + Sync;

/// Result of checking a single file of A
#[derive(Debug)]
struct Outcome {
    diagnostic: Option<DiffEntry>,
    files_hashed: usize,
    bytes_hashed: u64,
}

/// Compares two indexes
///
/// ```rust,no_run
/// use dirsubset::compare::Comparator;
/// use dirsubset::index::{IndexOptions, TreeIndex};
/// use std::path::Path;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let options = IndexOptions::new();
/// let a = TreeIndex::build(Path::new("photos"), &options)?;
/// let b = TreeIndex::build(Path::new("/mnt/backup/photos"), &options)?;
///
/// let result = Comparator::new().with_workers(4).compare(&a, &b)?;
/// for diff in &result.diagnostics {
///     println!("{}", diff);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Comparator {
    hasher: Arc<dyn ContentHasher>,
    workers: usize,
    abort: AbortHandle,
    progress: Option<Arc<ProgressFn>>,
}

impl fmt::Debug for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Comparator")
            .field("workers", &self.workers)
            .field("aborted", &self.abort.is_aborted())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl Default for Comparator {
    fn default() -> Self {
        Self::new()
    }
}

impl Comparator {
    /// Sequential comparator using SHA-256 with 1 MiB chunks
    pub fn new() -> Self {
        Self {
            hasher: Arc::new(Sha256Hasher::new()),
            workers: 1,
            abort: AbortHandle::new(),
            progress: None,
        }
    }

    /// Use a different content hasher
    pub fn with_hasher(mut self, hasher: Arc<dyn ContentHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Number of concurrent checks (minimum 1, which means inline)
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Observe `handle` for abort requests
    pub fn with_abort_handle(mut self, handle: AbortHandle) -> Self {
        self.abort = handle;
        self
    }

    /// Report progress after each checked file
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(CompareProgress) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    /// Handle that aborts this comparator
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Configured worker count
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Check every file of `index_a` against `index_b`
    ///
    /// # Errors
    ///
    /// - [`VerifyError::InvalidConfiguration`] if the indexes were built
    ///   with different case policies, since their keys cannot match
    /// - [`VerifyError::ThreadPool`] if a worker pool was requested and
    ///   could not be started
    ///
    /// File-level failures are reported as [`DiffEntry::Unreadable`], never
    /// as errors.
    pub fn compare(&self, index_a: &TreeIndex, index_b: &TreeIndex) -> Result<ComparisonResult> {
        if index_a.case_policy() != index_b.case_policy() {
            return Err(VerifyError::configuration(format!(
                "indexes use different case policies ({:?} for A, {:?} for B)",
                index_a.case_policy(),
                index_b.case_policy()
            )));
        }

        let start = Instant::now();
        let slots = if self.workers > 1 && index_a.len() > 1 {
            self.run_pool(index_a, index_b)?
        } else {
            self.run_inline(index_a, index_b)
        };
        let result = self.assemble(slots, index_a, index_b, start);

        info!(
            "Compared {} files against {:?} in {}ms: {} discrepancies{}",
            result.stats.files_checked,
            index_b.root(),
            result.stats.elapsed_ms,
            result.diagnostics.len(),
            if result.is_complete() { "" } else { " (aborted)" }
        );

        Ok(result)
    }

    fn run_inline(&self, index_a: &TreeIndex, index_b: &TreeIndex) -> Vec<Option<Outcome>> {
        let total = index_a.len();
        let mut slots = Vec::with_capacity(total);
        let mut bytes_hashed = 0u64;
        let mut discrepancies = 0usize;

        for file in index_a {
            if self.abort.is_aborted() {
                break;
            }
            let outcome = self.check(file, index_b);
            bytes_hashed += outcome.bytes_hashed;
            discrepancies += usize::from(outcome.diagnostic.is_some());
            slots.push(Some(outcome));
            self.report_progress(CompareProgress { checked: slots.len(), total, bytes_hashed, discrepancies });
        }

        slots.resize_with(total, || None);
        slots
    }

    fn run_pool(&self, index_a: &TreeIndex, index_b: &TreeIndex) -> Result<Vec<Option<Outcome>>> {
        let total = index_a.len();
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("dirsubset-worker-{}", i))
            .build()?;
        debug!("Comparing {} files with {} workers", total, self.workers);

        let mut slots: Vec<Option<Outcome>> = Vec::with_capacity(total);
        slots.resize_with(total, || None);

        pool.in_place_scope_fifo(|scope| {
            let (tx, rx) = mpsc::channel::<(usize, Option<Outcome>)>();

            for (position, file) in index_a.iter().enumerate() {
                let tx = tx.clone();
                scope.spawn_fifo(move |_| {
                    let outcome = if self.abort.is_aborted() {
                        None
                    } else {
                        Some(self.check(file, index_b))
                    };
                    // The receiver outlives every task in this scope.
                    let _ = tx.send((position, outcome));
                });
            }
            drop(tx);

            let mut progress = CompareProgress { checked: 0, total, bytes_hashed: 0, discrepancies: 0 };
            for (position, outcome) in rx {
                if let Some(outcome) = &outcome {
                    progress.checked += 1;
                    progress.bytes_hashed += outcome.bytes_hashed;
                    progress.discrepancies += usize::from(outcome.diagnostic.is_some());
                    self.report_progress(progress.clone());
                }
                slots[position] = outcome;
            }
        });

        Ok(slots)
    }

    fn check(&self, file_a: &IndexedFile, index_b: &TreeIndex) -> Outcome {
        let path = file_a.display_path.clone();

        let Some(file_b) = index_b.get(&file_a.key) else {
            return Outcome { diagnostic: Some(DiffEntry::Missing { path }), files_hashed: 0, bytes_hashed: 0 };
        };

        if file_a.size != file_b.size {
            return Outcome {
                diagnostic: Some(DiffEntry::SizeMismatch {
                    path,
                    size_a: file_a.size,
                    size_b: file_b.size,
                }),
                files_hashed: 0,
                bytes_hashed: 0,
            };
        }

        let digest_a = match self.hasher.hash_file(&file_a.path) {
            Ok(digest) => digest,
            Err(e) => {
                warn!("Failed to read {:?}: {}", file_a.path, e);
                return Outcome {
                    diagnostic: Some(DiffEntry::Unreadable { path, side: Side::A, reason: e.to_string() }),
                    files_hashed: 0,
                    bytes_hashed: 0,
                };
            }
        };

        let digest_b = match self.hasher.hash_file(&file_b.path) {
            Ok(digest) => digest,
            Err(e) => {
                warn!("Failed to read {:?}: {}", file_b.path, e);
                return Outcome {
                    diagnostic: Some(DiffEntry::Unreadable { path, side: Side::B, reason: e.to_string() }),
                    files_hashed: 1,
                    bytes_hashed: file_a.size,
                };
            }
        };

        let diagnostic = if digest_a.as_bytes() == digest_b.as_bytes() {
            None
        } else {
            debug!("Digest mismatch for {}: {} vs {}", path, digest_a, digest_b);
            Some(DiffEntry::ContentMismatch { path })
        };

        Outcome { diagnostic, files_hashed: 2, bytes_hashed: file_a.size + file_b.size }
    }

    fn report_progress(&self, progress: CompareProgress) {
        if let Some(callback) = &self.progress {
            callback(progress);
        }
    }

    fn assemble(
        &self,
        slots: Vec<Option<Outcome>>,
        index_a: &TreeIndex,
        index_b: &TreeIndex,
        start: Instant,
    ) -> ComparisonResult {
        let mut stats = CompareStats::default();
        let mut diagnostics = Vec::new();
        let mut unchecked = 0usize;

        for slot in slots {
            match slot {
                Some(outcome) => {
                    stats.files_checked += 1;
                    stats.files_hashed += outcome.files_hashed;
                    stats.bytes_hashed += outcome.bytes_hashed;
                    diagnostics.extend(outcome.diagnostic);
                }
                None => unchecked += 1,
            }
        }
        stats.elapsed_ms = start.elapsed().as_millis() as u64;

        let completion = if unchecked == 0 {
            Completion::Complete
        } else {
            Completion::Incomplete { unchecked }
        };

        let warnings: Vec<Warning> = index_a
            .warnings()
            .iter()
            .chain(index_b.warnings())
            .cloned()
            .collect();

        debug!(
            "Hashed {} files ({})",
            stats.files_hashed,
            utils::format_bytes(stats.bytes_hashed)
        );

        ComparisonResult {
            all_matched: diagnostics.is_empty() && completion == Completion::Complete,
            diagnostics,
            warnings,
            completion,
            stats,
        }
    }
}

/// Compare two indexes sequentially with the default hasher
///
/// Both indexes should share a case policy; [`Comparator::compare`] rejects
/// a mismatch, this function only logs it.
pub fn compare(index_a: &TreeIndex, index_b: &TreeIndex) -> ComparisonResult {
    if index_a.case_policy() != index_b.case_policy() {
        warn!(
            "Comparing indexes with different case policies ({:?} vs {:?}); keys will not line up",
            index_a.case_policy(),
            index_b.case_policy()
        );
    }
    let comparator = Comparator::new();
    let start = Instant::now();
    let slots = comparator.run_inline(index_a, index_b);
    comparator.assemble(slots, index_a, index_b, start)
}
