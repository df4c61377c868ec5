use std::fs::File;
use std::io::{self, Cursor, Read, Seek};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use zip::ZipArchive;
use zip::result::ZipError;

use super::{FetchError, Fetcher, normalize_entry_path};
use crate::error::{Error, ParseError, Result};

/// Fetcher over a ZIP container (EPUB, packaged web publication).
///
/// The archive's central directory is read once on construction; entries are
/// decompressed on demand.
pub struct ZipFetcher<R> {
    archive: Mutex<ZipArchive<R>>,
}

impl ZipFetcher<File> {
    /// Open a ZIP container from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| {
            Error::from_required_fetch(FetchError::io(&path.to_string_lossy(), source))
        })?;
        Self::from_reader(file)
    }
}

impl ZipFetcher<Cursor<Vec<u8>>> {
    /// Read a ZIP container held in memory.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_reader(Cursor::new(data))
    }
}

impl<R: Read + Seek> ZipFetcher<R> {
    /// Read a ZIP container from any [`Read`] + [`Seek`] source.
    ///
    /// Fails with [`Error::WrongContainerType`] when the source is not a ZIP
    /// archive.
    pub fn from_reader(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader).map_err(|e| match e {
            ZipError::Io(source) => Error::Parse(ParseError::Io {
                path: "<archive>".to_string(),
                source,
            }),
            other => Error::WrongContainerType(format!("not a ZIP archive: {other}")),
        })?;

        tracing::debug!(entries = archive.len(), "opened ZIP container");

        Ok(Self {
            archive: Mutex::new(archive),
        })
    }

    /// Names of all entries in the archive, in central-directory order.
    pub fn entry_names(&self) -> Vec<String> {
        let archive = self.archive.lock().unwrap_or_else(PoisonError::into_inner);
        archive.file_names().map(str::to_string).collect()
    }
}

impl<R: Read + Seek + Send> Fetcher for ZipFetcher<R> {
    fn read_bytes(&self, path: &str) -> std::result::Result<Vec<u8>, FetchError> {
        let mut archive = self.archive.lock().unwrap_or_else(PoisonError::into_inner);
        let key = normalize_entry_path(path);

        // Try direct lookup first
        match read_entry(&mut archive, key) {
            Err(ZipError::FileNotFound) => {}
            other => return other.map_err(|e| zip_error(path, e)),
        }

        // Fallback: try percent-decoded path (handles malformed EPUBs)
        let decoded = percent_encoding::percent_decode_str(key)
            .decode_utf8()
            .map_err(|_| FetchError::NotFound(path.to_string()))?;
        if decoded == key {
            return Err(FetchError::NotFound(path.to_string()));
        }

        read_entry(&mut archive, &decoded).map_err(|e| zip_error(path, e))
    }
}

/// Upper bound on the buffer reserved from an entry's declared size.
const MAX_PREALLOCATION: u64 = 1 << 20;

/// Initial buffer size for an entry; the header size is not trusted.
fn initial_capacity(declared_size: u64) -> usize {
    declared_size.min(MAX_PREALLOCATION) as usize
}

fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> std::result::Result<Vec<u8>, ZipError> {
    let mut file = archive.by_name(name)?;
    let mut contents = Vec::with_capacity(initial_capacity(file.size()));
    file.read_to_end(&mut contents)?;
    Ok(contents)
}

fn zip_error(path: &str, err: ZipError) -> FetchError {
    match err {
        ZipError::FileNotFound => FetchError::NotFound(path.to_string()),
        ZipError::Io(source) => FetchError::io(path, source),
        other => FetchError::Io {
            path: path.to_string(),
            source: io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    use super::*;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, data) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_read_deflated_entry() {
        let data = build_zip(&[("OEBPS/content.opf", b"<package/>")]);
        let fetcher = ZipFetcher::from_bytes(data).unwrap();
        assert_eq!(fetcher.read_bytes("OEBPS/content.opf").unwrap(), b"<package/>");
        assert_eq!(fetcher.read_bytes("/OEBPS/content.opf").unwrap(), b"<package/>");
    }

    #[test]
    fn test_missing_entry_is_not_found() {
        let data = build_zip(&[("mimetype", b"application/epub+zip")]);
        let fetcher = ZipFetcher::from_bytes(data).unwrap();
        assert!(matches!(
            fetcher.read_bytes("META-INF/container.xml"),
            Err(FetchError::NotFound(_))
        ));
    }

    #[test]
    fn test_percent_encoded_lookup() {
        let data = build_zip(&[("OEBPS/my chapter.xhtml", b"x")]);
        let fetcher = ZipFetcher::from_bytes(data).unwrap();
        assert_eq!(fetcher.read_bytes("OEBPS/my%20chapter.xhtml").unwrap(), b"x");
    }

    #[test]
    fn test_not_a_zip() {
        let result = ZipFetcher::from_bytes(b"definitely not a zip file".to_vec());
        assert!(matches!(result, Err(Error::WrongContainerType(_))));
    }

    #[test]
    fn test_entry_names() {
        let data = build_zip(&[("a.txt", b"a"), ("b/c.txt", b"c")]);
        let fetcher = ZipFetcher::from_bytes(data).unwrap();
        let mut names = fetcher.entry_names();
        names.sort();
        assert_eq!(names, vec!["a.txt", "b/c.txt"]);
    }

    #[test]
    fn test_declared_size_does_not_drive_allocation() {
        assert_eq!(initial_capacity(42), 42);
        assert_eq!(initial_capacity(u64::MAX), MAX_PREALLOCATION as usize);

        let large = vec![b'x'; 3 << 20];
        let data = build_zip(&[("big.bin", large.as_slice())]);
        let fetcher = ZipFetcher::from_bytes(data).unwrap();
        assert_eq!(fetcher.read_bytes("big.bin").unwrap().len(), large.len());
    }
}
