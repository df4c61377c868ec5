use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::model::Manifest;
use crate::parser::PublicationParser;
use crate::publication::Publication;
use crate::warning::TracingWarningLogger;

/// Path of the manifest in a packaged web publication.
pub const MANIFEST_PATH: &str = "manifest.json";

/// Assembles a packaged web publication (audiobook, comic, PDF package)
/// from its `manifest.json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebPubParser;

impl WebPubParser {
    pub fn parse(fetcher: &dyn Fetcher) -> Result<Publication> {
        let bytes = fetcher
            .read_bytes(MANIFEST_PATH)
            .map_err(Error::from_required_fetch)?;
        let json: serde_json::Value = serde_json::from_slice(&bytes)?;
        let manifest = Manifest::from_json_with_warnings(&json, &mut TracingWarningLogger)?;

        tracing::info!(
            title = manifest.metadata.title.string(),
            reading_order = manifest.reading_order.len(),
            "parsed web publication manifest"
        );

        Ok(Publication::new(manifest))
    }
}

impl PublicationParser for WebPubParser {
    fn name(&self) -> &'static str {
        "webpub"
    }

    fn accepts(&self, fetcher: &dyn Fetcher) -> bool {
        fetcher.contains(MANIFEST_PATH)
    }

    fn parse(&self, fetcher: &dyn Fetcher) -> Result<Publication> {
        WebPubParser::parse(fetcher)
    }
}
