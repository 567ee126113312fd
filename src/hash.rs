//! Streaming content hashing
//!
//! Files are hashed with SHA-256 in fixed-size chunks so memory use does not
//! depend on file size. The comparator only reaches for a hasher after sizes
//! already agree, and it does so through the [`ContentHasher`] trait so an
//! alternative implementation can be plugged in.
//!
//! ```rust,no_run
//! use dirsubset::hash::{ContentHasher, Sha256Hasher};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let hasher = Sha256Hasher::new();
//! let a = hasher.hash_file(Path::new("a/movie.mkv"))?;
//! let b = hasher.hash_file(Path::new("b/movie.mkv"))?;
//! println!("identical: {}", a == b);
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, VerifyError};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use tracing::trace;

/// Default read size for streaming hashes (1 MiB)
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// A 256-bit content digest
///
/// Compared as raw bytes. The hex form from `Display` is meant for debug
/// logs; reports never include it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// Wrap raw digest bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({})", &self.to_hex()[..16])
    }
}

/// Computes content digests for files
///
/// Implementations must be usable from several worker threads at once.
pub trait ContentHasher: Send + Sync {
    /// Hash the full content of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Io`] if the file cannot be opened or a read
    /// fails partway. No partial digest is ever returned.
    fn hash_file(&self, path: &Path) -> Result<ContentDigest>;
}

/// SHA-256 hasher reading files in fixed-size chunks
#[derive(Debug, Clone)]
pub struct Sha256Hasher {
    chunk_size: usize,
}

impl Sha256Hasher {
    /// Create a hasher using [`DEFAULT_CHUNK_SIZE`]
    pub fn new() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE }
    }

    /// Create a hasher with a custom read size
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::InvalidConfiguration`] if `chunk_size` is zero.
    pub fn with_chunk_size(chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(VerifyError::configuration("chunk size must be greater than zero"));
        }
        Ok(Self { chunk_size })
    }

    /// Read size used for each chunk
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl Default for Sha256Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentHasher for Sha256Hasher {
    fn hash_file(&self, path: &Path) -> Result<ContentDigest> {
        // Closed when `file` drops, on success and on every error return.
        let mut file = File::open(path)?;
        let (digest, bytes) = hash_reader(&mut file, self.chunk_size)?;
        trace!("Hashed {:?} ({} bytes): {}", path, bytes, digest);
        Ok(digest)
    }
}

/// Hash everything `reader` yields, reading at most `chunk_size` bytes at a time.
///
/// Returns the digest and the number of bytes consumed. Interrupted reads
/// are retried; any other read error aborts the hash.
pub fn hash_reader<R: Read>(reader: &mut R, chunk_size: usize) -> Result<(ContentDigest, u64)> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; chunk_size.max(1)];
    let mut total = 0u64;

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(VerifyError::Io(e)),
        };
        hasher.update(&buffer[..bytes_read]);
        total += bytes_read as u64;
    }

    Ok((ContentDigest(hasher.finalize().into()), total))
}

/// Hash an in-memory buffer
pub fn hash_bytes(data: &[u8]) -> ContentDigest {
    ContentDigest(Sha256::digest(data).into())
}
