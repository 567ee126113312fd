//! High-level entry point
//!
//! [`SubsetVerifier`] ties the pieces together: it validates both roots up
//! front, indexes each tree once and runs the [`Comparator`] with the
//! configured hasher, worker count and abort handle. Configuration goes
//! through [`VerifierBuilder`].
//!
//! ```rust,no_run
//! use dirsubset::{CasePolicy, VerifierBuilder};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let verifier = VerifierBuilder::new()
//!     .parallel_workers(8)
//!     .case_policy(CasePolicy::Preserve)
//!     .exclude_patterns(vec!["**/.DS_Store".to_string()])
//!     .build()?;
//!
//! let result = verifier.verify(Path::new("camera_roll"), Path::new("/mnt/nas/camera_roll"))?;
//! println!("{}", result.summary());
//! # Ok(())
//! # }
//! ```

use crate::compare::{AbortHandle, CompareProgress, Comparator, ComparisonResult};
use crate::error::{Result, VerifyError};
use crate::hash::{ContentHasher, Sha256Hasher, DEFAULT_CHUNK_SIZE};
use crate::index::{IndexOptions, TreeIndex};
use crate::key::CasePolicy;
use crate::utils;

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Builder for [`SubsetVerifier`]
///
/// Defaults:
/// - one worker per CPU core
/// - 1 MiB hash chunks
/// - the platform case policy
/// - no exclude patterns
pub struct VerifierBuilder {
    parallel_workers: usize,
    chunk_size: usize,
    case_policy: CasePolicy,
    exclude_patterns: Vec<String>,
    hasher: Option<Arc<dyn ContentHasher>>,
    abort: Option<AbortHandle>,
    progress: Option<Box<dyn Fn(CompareProgress) + Send + Sync>>,
}

impl Default for VerifierBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl VerifierBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            parallel_workers: num_cpus::get(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            case_policy: CasePolicy::platform_default(),
            exclude_patterns: Vec::new(),
            hasher: None,
            abort: None,
            progress: None,
        }
    }

    /// Set number of parallel workers
    ///
    /// `1` runs every check on the calling thread. `0` is rejected by
    /// [`build`](Self::build).
    pub fn parallel_workers(mut self, count: usize) -> Self {
        self.parallel_workers = count;
        self
    }

    /// Set the read size used when hashing
    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes;
        self
    }

    /// Set how case participates in key identity
    pub fn case_policy(mut self, policy: CasePolicy) -> Self {
        self.case_policy = policy;
        self
    }

    /// Set glob patterns for paths to leave out of both trees
    pub fn exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    /// Replace the SHA-256 hasher. `chunk_size` is ignored when set.
    pub fn hasher(mut self, hasher: Arc<dyn ContentHasher>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    /// Let `handle` stop a running verification
    pub fn abort_handle(mut self, handle: AbortHandle) -> Self {
        self.abort = Some(handle);
        self
    }

    /// Report progress after each checked file
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(CompareProgress) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Validate the configuration and build the verifier
    ///
    /// # Errors
    ///
    /// - [`VerifyError::InvalidConfiguration`] for zero workers or a zero chunk size
    /// - [`VerifyError::InvalidPattern`] if an exclude pattern does not compile
    pub fn build(self) -> Result<SubsetVerifier> {
        if self.parallel_workers == 0 {
            return Err(VerifyError::configuration("parallel workers must be at least 1"));
        }

        let hasher: Arc<dyn ContentHasher> = match self.hasher {
            Some(hasher) => hasher,
            None => Arc::new(Sha256Hasher::with_chunk_size(self.chunk_size)?),
        };

        let index_options = IndexOptions::new()
            .with_case_policy(self.case_policy)
            .with_exclude_patterns(self.exclude_patterns);
        // Fail on bad patterns now rather than after walking A.
        index_options.compile_excludes()?;

        let mut comparator = Comparator::new()
            .with_hasher(hasher)
            .with_workers(self.parallel_workers)
            .with_abort_handle(self.abort.unwrap_or_default());
        if let Some(progress) = self.progress {
            comparator = comparator.with_progress(progress);
        }

        Ok(SubsetVerifier { index_options, comparator })
    }
}

/// Checks whether one directory tree is contained in another
pub struct SubsetVerifier {
    index_options: IndexOptions,
    comparator: Comparator,
}

impl fmt::Debug for SubsetVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubsetVerifier")
            .field("index_options", &self.index_options)
            .field("comparator", &self.comparator)
            .finish()
    }
}

impl SubsetVerifier {
    /// Verifier with default settings
    pub fn new() -> Result<Self> {
        VerifierBuilder::new().build()
    }

    /// Options used to index both trees
    pub fn index_options(&self) -> &IndexOptions {
        &self.index_options
    }

    /// Handle that aborts verifications run by this verifier
    ///
    /// An aborted handle stays raised; call [`AbortHandle::reset`] before
    /// reusing the verifier.
    pub fn abort_handle(&self) -> AbortHandle {
        self.comparator.abort_handle()
    }

    /// Index a single tree with this verifier's options
    pub fn index(&self, root: &Path) -> Result<TreeIndex> {
        TreeIndex::build(root, &self.index_options)
    }

    /// Verify that every file under `dir_a` exists under `dir_b` with identical content
    ///
    /// Both roots are validated before either is walked.
    ///
    /// # Errors
    ///
    /// - [`VerifyError::NotFound`] / [`VerifyError::NotADirectory`] for a bad root
    /// - [`VerifyError::ThreadPool`] if the worker pool cannot start
    pub fn verify(&self, dir_a: &Path, dir_b: &Path) -> Result<ComparisonResult> {
        utils::validate_directory(dir_a)?;
        utils::validate_directory(dir_b)?;

        let index_a = self.index(dir_a)?;
        let index_b = self.index(dir_b)?;
        info!(
            "Indexed A: {} files, B: {} files",
            index_a.len(),
            index_b.len()
        );

        self.verify_indexes(&index_a, &index_b)
    }

    /// Compare two prebuilt indexes
    ///
    /// # Errors
    ///
    /// - [`VerifyError::InvalidConfiguration`] if the indexes use different case policies
    pub fn verify_indexes(&self, index_a: &TreeIndex, index_b: &TreeIndex) -> Result<ComparisonResult> {
        debug!("Comparing {:?} against {:?}", index_a.root(), index_b.root());
        self.comparator.compare(index_a, index_b)
    }
}
