use std::path::{Component, Path, PathBuf};

use super::{FetchError, Fetcher, normalize_entry_path};

/// Fetcher over an exploded (unzipped) publication directory.
#[derive(Debug, Clone)]
pub struct DirectoryFetcher {
    root: PathBuf,
}

impl DirectoryFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a container path to a file below the root.
    ///
    /// Paths escaping the root (`..`, absolute prefixes) resolve to nothing.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(normalize_entry_path(path));
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(name) => resolved.push(name),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        Some(resolved)
    }
}

impl Fetcher for DirectoryFetcher {
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        let file = self
            .resolve(path)
            .ok_or_else(|| FetchError::NotFound(path.to_string()))?;

        match std::fs::read(&file) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let decoded = percent_encoding::percent_decode_str(path).decode_utf8_lossy();
                if decoded == path {
                    return Err(FetchError::NotFound(path.to_string()));
                }
                let file = self
                    .resolve(&decoded)
                    .ok_or_else(|| FetchError::NotFound(path.to_string()))?;
                std::fs::read(&file).map_err(|e| FetchError::io(path, e))
            }
            Err(e) => Err(FetchError::io(path, e)),
        }
    }

    fn contains(&self, path: &str) -> bool {
        self.resolve(path).is_some_and(|p| p.is_file())
    }
}
