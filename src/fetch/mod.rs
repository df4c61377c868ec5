//! Fetch-by-path access to the files of a publication container.
//!
//! Every parser in this crate reads container entries through the
//! [`Fetcher`] trait and never touches the container format directly.
//! Paths are relative to the container root and use forward slashes
//! (e.g. `OEBPS/text/ch01.xhtml`); a leading `/` is ignored.

mod archive;
mod directory;

pub use archive::ZipFetcher;
pub use directory::DirectoryFetcher;

use std::collections::HashMap;
use std::io;

use thiserror::Error;

/// Failure to read a single container entry.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("File not found in container: {0}")]
    NotFound(String),

    #[error("I/O error while reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl FetchError {
    pub(crate) fn io(path: &str, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            FetchError::NotFound(path.to_string())
        } else {
            FetchError::Io {
                path: path.to_string(),
                source,
            }
        }
    }
}

/// Random access to the entries of a publication container.
///
/// Implementations must not share writable state between calls in a way
/// that is visible to the caller: two parses over two fetchers never
/// interact.
pub trait Fetcher: Send + Sync {
    /// Read the full contents of the entry at `path`.
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>, FetchError>;

    /// Returns true if an entry exists at `path`.
    fn contains(&self, path: &str) -> bool {
        self.read_bytes(path).is_ok()
    }
}

impl<F: Fetcher + ?Sized> Fetcher for Box<F> {
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        (**self).read_bytes(path)
    }

    fn contains(&self, path: &str) -> bool {
        (**self).contains(path)
    }
}

/// Strip the leading slash of an absolute container path.
pub(crate) fn normalize_entry_path(path: &str) -> &str {
    path.trim_start_matches('/')
}

// --- Implementation: In-Memory ---

/// A fetcher backed by an in-memory map of path -> bytes.
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, replacing any previous entry at the same path.
    pub fn insert(&mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        let path = path.into();
        let key = normalize_entry_path(&path).to_string();
        self.entries.insert(key, data.into());
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_entry(mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(path, data);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Fetcher for MemoryFetcher {
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        let key = normalize_entry_path(path);
        if let Some(data) = self.entries.get(key) {
            return Ok(data.clone());
        }

        // Same fallback as the archive reader: hrefs are often percent-encoded.
        let decoded = percent_encoding::percent_decode_str(key).decode_utf8_lossy();
        self.entries
            .get(decoded.as_ref())
            .cloned()
            .ok_or_else(|| FetchError::NotFound(path.to_string()))
    }

    fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(normalize_entry_path(path))
    }
}
