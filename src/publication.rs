//! Opening a publication from disk.

use std::path::Path;

use crate::error::{Error, Result};
use crate::fetch::{DirectoryFetcher, Fetcher, ZipFetcher};
use crate::model::Manifest;
use crate::parser::default_parsers;
use crate::presentation::PresentationPreset;

/// A parsed publication: its manifest and the presentation preset derived
/// from the manifest's metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Publication {
    pub manifest: Manifest,
    pub presentation: PresentationPreset,
}

impl Publication {
    pub fn new(manifest: Manifest) -> Self {
        let presentation = PresentationPreset::from_metadata(&manifest.metadata);
        Self {
            manifest,
            presentation,
        }
    }

    /// Open an EPUB or packaged web publication, either as an archive file
    /// or as an exploded directory.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use vellum::Publication;
    ///
    /// let publication = Publication::open("book.epub")?;
    /// println!("{}", publication.manifest.metadata.title.string());
    /// # Ok::<(), vellum::Error>(())
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            Self::open_fetcher(&DirectoryFetcher::new(path))
        } else {
            Self::open_fetcher(&ZipFetcher::open(path)?)
        }
    }

    /// Parse the publication stored in `fetcher` with the first parser that
    /// recognizes the container.
    pub fn open_fetcher(fetcher: &dyn Fetcher) -> Result<Self> {
        for parser in default_parsers() {
            if parser.accepts(fetcher) {
                tracing::debug!("container recognized by the {} parser", parser.name());
                return parser.parse(fetcher);
            }
        }
        Err(Error::WrongContainerType(
            "neither META-INF/container.xml nor manifest.json found".into(),
        ))
    }
}
