//! Error types for vellum operations.

use thiserror::Error;

use crate::fetch::FetchError;

/// Fatal errors raised while opening or parsing a publication.
///
/// Recoverable problems (a link without `href`, an unreadable NCX, ...) never
/// surface here; they are reported through a
/// [`WarningLogger`](crate::WarningLogger) or logged and skipped.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Wrong container type: {0}")]
    WrongContainerType(String),

    #[error("Missing required file: {0}")]
    MissingFile(String),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Missing required cross-reference: {0}")]
    MissingCrossReference(String),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),
}

/// Underlying cause of [`Error::Parse`].
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error while reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Parse(ParseError::Xml(e))
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Error::Parse(ParseError::XmlAttr(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Parse(ParseError::Json(e))
    }
}

impl Error {
    /// Map a fetch failure for a file the parse cannot do without.
    pub(crate) fn from_required_fetch(err: FetchError) -> Self {
        match err {
            FetchError::NotFound(path) => Error::MissingFile(path),
            FetchError::Io { path, source } => Error::Parse(ParseError::Io { path, source }),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
