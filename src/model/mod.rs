//! Publication data model.
//!
//! This module contains:
//! - [`Manifest`], the normalized description of a publication
//! - [`Metadata`] and its localized strings, contributors and profiles
//! - [`Link`] and [`PublicationCollection`] for structure and navigation
//! - Media type helpers and the per-resource [`Encryption`] record

mod collection;
mod encryption;
mod json;
mod link;
mod manifest;
pub mod media_type;
mod metadata;

pub use collection::{PublicationCollection, Subcollections};
pub use encryption::{Encryption, LCP_SCHEME};
pub use link::{Link, LinkListExt, Page, Properties};
pub use manifest::{Manifest, TOC};
pub use metadata::{Contributor, LocalizedString, Metadata, Profile, ReadingProgression};
