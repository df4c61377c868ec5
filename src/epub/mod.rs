//! Readers for the documents of an EPUB container.
//!
//! Each reader works over bytes (or a [`Fetcher`](crate::fetch::Fetcher)) and
//! returns an owned value; combining them into a manifest is the job of
//! [`EpubParser`](crate::parser::EpubParser).

pub mod container;
pub mod encryption;
pub mod nav;
pub mod ncx;
pub mod opf;
mod xml;

pub use encryption::EncryptionIndex;
pub use nav::{NavType, NavigationDocument};
pub use opf::PackageDocument;
