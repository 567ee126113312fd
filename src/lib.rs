//! # dirsubset - is A contained in B?
//!
//! Verifies that every file under a directory A also exists under a
//! directory B at the same relative path with byte-identical content.
//! Typical uses are checking that a backup, copy or sync target really holds
//! everything from a source folder before the source is deleted.
//!
//! ## Overview
//!
//! Verification happens in two stages:
//!
//! 1. **Indexing**: each tree is walked once and every regular file is
//!    recorded under a normalized [`FileKey`] together with its size.
//! 2. **Comparison**: for every file of A, in A's order, the counterpart in
//!    B is looked up. Sizes are compared first; only same-size pairs are
//!    hashed (streaming SHA-256, 1 MiB chunks by default).
//!
//! The comparison is directional. Extra files in B are fine.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dirsubset::SubsetVerifier;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let verifier = SubsetVerifier::new()?;
//! let result = verifier.verify(Path::new("./photos"), Path::new("/mnt/backup/photos"))?;
//!
//! if result.all_matched {
//!     println!("Backup is complete");
//! } else {
//!     for diff in &result.diagnostics {
//!         println!("{}", diff);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Lower-level API
//!
//! ```rust,no_run
//! use dirsubset::{compare, IndexOptions, TreeIndex};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = IndexOptions::new();
//! let a = TreeIndex::build(Path::new("a"), &options)?;
//! let b = TreeIndex::build(Path::new("b"), &options)?;
//! let result = compare(&a, &b);
//! println!("{}", result.summary());
//! # Ok(())
//! # }
//! ```
//!
//! ## Key normalization
//!
//! Keys always use `/` as separator. Whether case is folded is decided by
//! [`CasePolicy`]; the default folds case on Windows only. See [`key`].
//!
//! ## What is not done
//!
//! - Nothing is ever written, copied or deleted
//! - Symbolic links and other non-regular files are skipped, not followed
//! - Permissions, timestamps and ownership are not compared
//!
//! ## Error Handling
//!
//! Invalid roots fail fast with [`VerifyError::NotFound`] or
//! [`VerifyError::NotADirectory`]. A file that cannot be read during
//! comparison does not fail the run; it is reported as
//! [`DiffEntry::Unreadable`]. Directories that cannot be walked show up as
//! [`Warning`]s on the result.
//!
//! ## Module Organization
//!
//! - [`key`]: file keys and case policy
//! - [`index`]: tree indexing
//! - [`hash`]: streaming content hashing
//! - [`compare`]: the comparator, diagnostics and abort handling
//! - [`verifier`]: builder-configured entry point
//! - [`report`]: text and JSON rendering
//! - [`error`]: error types

pub mod compare;
pub mod error;
pub mod hash;
pub mod index;
pub mod key;
pub mod report;
pub mod verifier;

mod utils;

pub use compare::{
    compare, AbortHandle, CompareProgress, CompareStats, Comparator, ComparisonResult, Completion,
    DiffEntry, Side,
};
pub use error::{Result, VerifyError};
pub use hash::{ContentDigest, ContentHasher, Sha256Hasher};
pub use index::{IndexOptions, IndexedFile, TreeIndex, Warning};
pub use key::{CasePolicy, FileKey};
pub use utils::{format_bytes, validate_directory};
pub use verifier::{SubsetVerifier, VerifierBuilder};
