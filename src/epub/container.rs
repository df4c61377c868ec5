//! OCF container checks: `mimetype` and `META-INF/container.xml`.

use quick_xml::Reader;
use quick_xml::events::Event;

use super::xml::{attribute, local_name};
use crate::error::{Error, Result};
use crate::fetch::{FetchError, Fetcher};
use crate::model::media_type;
use crate::util::decode_xml;

pub const CONTAINER_PATH: &str = "META-INF/container.xml";
pub const MIMETYPE_PATH: &str = "mimetype";

/// Check the optional `mimetype` entry.
///
/// An absent entry is accepted; one with any other content than
/// `application/epub+zip` is not an EPUB container.
pub fn check_mimetype(fetcher: &dyn Fetcher) -> Result<()> {
    match fetcher.read_bytes(MIMETYPE_PATH) {
        Ok(bytes) => {
            let declared = String::from_utf8_lossy(&bytes);
            let declared = declared.trim();
            if declared != media_type::EPUB {
                return Err(Error::WrongContainerType(format!(
                    "mimetype entry declares {declared:?}"
                )));
            }
            Ok(())
        }
        Err(FetchError::NotFound(_)) => {
            tracing::debug!("no mimetype entry, assuming EPUB");
            Ok(())
        }
        Err(e) => Err(Error::from_required_fetch(e)),
    }
}

/// Read `META-INF/container.xml` and return the package document path.
pub fn package_path(fetcher: &dyn Fetcher) -> Result<String> {
    let bytes = fetcher
        .read_bytes(CONTAINER_PATH)
        .map_err(Error::from_required_fetch)?;

    parse_rootfile(&bytes)?.ok_or_else(|| {
        Error::MissingCrossReference(format!("no rootfile full-path in {CONTAINER_PATH}"))
    })
}

/// First `rootfile@full-path` of a container document.
pub fn parse_rootfile(bytes: &[u8]) -> Result<Option<String>> {
    let content = decode_xml(bytes);
    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Empty(e) | Event::Start(e) if local_name(e.name().as_ref()) == b"rootfile" => {
                if let Some(path) = attribute(&e, b"full-path")?
                    && !path.trim().is_empty()
                {
                    return Ok(Some(path.trim().trim_start_matches('/').to_string()));
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemoryFetcher;

    const CONTAINER: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

    #[test]
    fn test_package_path() {
        let fetcher = MemoryFetcher::new().with_entry(CONTAINER_PATH, CONTAINER);
        assert_eq!(package_path(&fetcher).unwrap(), "OEBPS/content.opf");
    }

    #[test]
    fn test_missing_rootfile() {
        let fetcher = MemoryFetcher::new()
            .with_entry(CONTAINER_PATH, "<container><rootfiles/></container>");
        assert!(matches!(
            package_path(&fetcher),
            Err(Error::MissingCrossReference(_))
        ));
    }

    #[test]
    fn test_missing_container() {
        let fetcher = MemoryFetcher::new();
        assert!(matches!(package_path(&fetcher), Err(Error::MissingFile(_))));
    }

    #[test]
    fn test_mimetype_check() {
        assert!(check_mimetype(&MemoryFetcher::new()).is_ok());

        let epub = MemoryFetcher::new().with_entry(MIMETYPE_PATH, "application/epub+zip");
        assert!(check_mimetype(&epub).is_ok());

        let other = MemoryFetcher::new().with_entry(MIMETYPE_PATH, "application/zip");
        assert!(matches!(
            check_mimetype(&other),
            Err(Error::WrongContainerType(_))
        ));
    }
}
