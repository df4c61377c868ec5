use crate::epub::{NavType, NavigationDocument, container, encryption, ncx, opf};
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::model::{Link, LinkListExt, Manifest, Subcollections, TOC, media_type};
use crate::parser::{PublicationParser, merge_collections};
use crate::publication::Publication;

/// Assembles a publication from an EPUB container.
///
/// Navigation comes from the EPUB 3 navigation document. When it yields no
/// table of contents, the NCX fills in the lists the navigation document
/// left empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpubParser;

impl EpubParser {
    /// Parse the EPUB stored in `fetcher`.
    pub fn parse(fetcher: &dyn Fetcher) -> Result<Publication> {
        container::check_mimetype(fetcher)?;
        let opf_path = container::package_path(fetcher)?;
        tracing::debug!("package document at {opf_path}");

        let encryption = encryption::parse(fetcher);
        let package = opf::parse(fetcher, &opf_path, &encryption)?;

        let links = package
            .reading_order
            .iter()
            .chain(&package.resources)
            .cloned()
            .collect::<Vec<_>>();

        let mut subcollections = navigation_collections(fetcher, &links);
        let has_toc = subcollections
            .get(TOC)
            .is_some_and(|toc| toc.iter().any(|c| !c.links.is_empty()));
        if !has_toc {
            let fallback = ncx_collections(fetcher, &links);
            subcollections = merge_collections(subcollections, fallback);
        }

        let manifest = Manifest::new(package.metadata)
            .with_reading_order(package.reading_order)
            .with_resources(package.resources)
            .with_subcollections(subcollections);

        tracing::info!(
            title = manifest.metadata.title.string(),
            reading_order = manifest.reading_order.len(),
            toc = manifest.table_of_contents().len(),
            "parsed EPUB"
        );

        Ok(Publication::new(manifest))
    }
}

impl PublicationParser for EpubParser {
    fn name(&self) -> &'static str {
        "epub"
    }

    fn accepts(&self, fetcher: &dyn Fetcher) -> bool {
        fetcher.contains(container::CONTAINER_PATH)
    }

    fn parse(&self, fetcher: &dyn Fetcher) -> Result<Publication> {
        EpubParser::parse(fetcher)
    }
}

/// Lists of the navigation document, if the package declares a readable one.
fn navigation_collections(fetcher: &dyn Fetcher, links: &[Link]) -> Subcollections {
    let Some(nav_link) = links.first_with_rel("contents") else {
        tracing::debug!("no navigation document declared");
        return Subcollections::new();
    };
    let path = nav_link.href_path();

    let document = fetcher
        .read_bytes(path)
        .map_err(|e| e.to_string())
        .and_then(|bytes| NavigationDocument::parse(&bytes, path).map_err(|e| e.to_string()));

    match document {
        Ok(document) => document.to_subcollections(),
        Err(e) => {
            tracing::warn!("skipping navigation document {path}: {e}");
            Subcollections::new()
        }
    }
}

/// `toc` and `pageList` of the NCX, if the package has a readable one.
fn ncx_collections(fetcher: &dyn Fetcher, links: &[Link]) -> Subcollections {
    let Some(ncx_link) = links.first_with_media_type(media_type::NCX) else {
        return Subcollections::new();
    };
    let path = ncx_link.href_path();

    let document = fetcher
        .read_bytes(path)
        .map_err(|e| e.to_string())
        .and_then(|bytes| ncx::parse(&bytes, path).map_err(|e| e.to_string()));

    match document {
        Ok(document) => {
            tracing::debug!(
                toc = document.links(NavType::Toc).len(),
                "table of contents read from NCX"
            );
            document.to_subcollections()
        }
        Err(e) => {
            tracing::warn!("skipping NCX {path}: {e}");
            Subcollections::new()
        }
    }
}
