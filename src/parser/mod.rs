//! Publication parsers: assemble a [`Publication`] from a container.
//!
//! A parser reads container entries through a [`Fetcher`] and never owns
//! it, so the same fetcher can be offered to several parsers in turn.

mod epub;
mod webpub;

pub use epub::EpubParser;
pub use webpub::WebPubParser;

use crate::error::Result;
use crate::fetch::Fetcher;
use crate::model::Subcollections;
use crate::publication::Publication;

/// Polymorphic interface for container-specific assembly.
pub trait PublicationParser: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Returns true if the container looks like one this parser handles.
    fn accepts(&self, fetcher: &dyn Fetcher) -> bool;

    /// Assemble the publication stored in the container.
    fn parse(&self, fetcher: &dyn Fetcher) -> Result<Publication>;
}

/// Every built-in parser, in probing order.
pub fn default_parsers() -> [&'static dyn PublicationParser; 2] {
    [&EpubParser, &WebPubParser]
}

/// Combine two sets of collections. For every role present in both,
/// `primary` wins.
pub fn merge_collections(primary: Subcollections, fallback: Subcollections) -> Subcollections {
    let mut merged = primary;
    for (role, collections) in fallback {
        merged.entry(role).or_insert(collections);
    }
    merged
}
