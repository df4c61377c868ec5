//! # vellum
//!
//! A publication manifest model and a structure parser for EPUB and
//! packaged web publications.
//!
//! ## Features
//!
//! - Readium Web Publication Manifest model: parse, serialize, query
//! - EPUB 2/3 structure: package document, encryption manifest, navigation
//!   document and NCX
//! - Profile conformance checks (EPUB, audiobook, DiViNa, PDF)
//! - Presentation presets for LTR, RTL and CJK content
//!
//! ## Quick Start
//!
//! ```no_run
//! use vellum::Publication;
//!
//! let publication = Publication::open("input.epub").unwrap();
//! let manifest = &publication.manifest;
//! println!("{}", manifest.to_json_string_pretty().unwrap());
//!
//! for link in manifest.table_of_contents() {
//!     println!("{} -> {}", link.title.as_deref().unwrap_or("?"), link.href);
//! }
//! ```
//!
//! ## Working with Manifests
//!
//! The [`Manifest`] struct is the central data type. It can be built
//! directly and round-trips through its JSON form:
//!
//! ```
//! use vellum::{Link, Manifest, Metadata, Profile};
//!
//! let manifest = Manifest::new(Metadata::new("My Book").with_profile(Profile::EPUB))
//!     .with_reading_order(vec![
//!         Link::new("chapter1.xhtml").with_media_type("application/xhtml+xml"),
//!     ])
//!     .with_table_of_contents(vec![Link::new("chapter1.xhtml").with_title("Chapter 1")]);
//!
//! assert!(manifest.conforms_to(&Profile::EPUB));
//! assert!(manifest.link_with_href("chapter1.xhtml#start").is_some());
//! assert_eq!(Manifest::from_json(&manifest.to_json()).unwrap(), manifest);
//! ```

pub mod epub;
pub mod error;
pub mod fetch;
pub mod model;
pub mod parser;
pub mod presentation;
pub mod publication;
pub(crate) mod util;
pub mod warning;

pub use error::{Error, ParseError, Result};
pub use fetch::{DirectoryFetcher, FetchError, Fetcher, MemoryFetcher, ZipFetcher};
pub use model::{
    Contributor, Encryption, Link, LinkListExt, LocalizedString, Manifest, Metadata, Profile,
    PublicationCollection, ReadingProgression,
};
pub use parser::{EpubParser, PublicationParser, WebPubParser};
pub use presentation::{ContentLayout, PresentationPreset, PresentationSetting};
pub use publication::Publication;
pub use warning::{ListWarningLogger, Severity, TracingWarningLogger, Warning, WarningLogger};
