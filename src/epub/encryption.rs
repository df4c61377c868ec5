//! `META-INF/encryption.xml`: which resources are encrypted, and how.

use std::collections::BTreeMap;

use quick_xml::Reader;
use quick_xml::events::Event;

use super::xml::{attribute, local_name};
use crate::error::Result;
use crate::fetch::{FetchError, Fetcher};
use crate::model::{Encryption, LCP_SCHEME};
use crate::util::{decode_path, decode_xml, resolve_href};

pub const ENCRYPTION_PATH: &str = "META-INF/encryption.xml";

/// Retrieval URI of the content key in an LCP license.
const LCP_KEY_RETRIEVAL: &str = "license.lcpl#/encryption/content_key";

/// Encrypted resources keyed by percent-decoded container path.
pub type EncryptionIndex = BTreeMap<String, Encryption>;

/// Read the encryption manifest of the container.
///
/// Never fails: a missing or unreadable document means nothing is known to
/// be encrypted.
pub fn parse(fetcher: &dyn Fetcher) -> EncryptionIndex {
    let bytes = match fetcher.read_bytes(ENCRYPTION_PATH) {
        Ok(bytes) => bytes,
        Err(FetchError::NotFound(_)) => return EncryptionIndex::new(),
        Err(e) => {
            tracing::debug!("cannot read {ENCRYPTION_PATH}: {e}");
            return EncryptionIndex::new();
        }
    };

    match parse_document(&bytes) {
        Ok(index) => {
            tracing::debug!(resources = index.len(), "read encryption manifest");
            index
        }
        Err(e) => {
            tracing::debug!("ignoring malformed {ENCRYPTION_PATH}: {e}");
            EncryptionIndex::new()
        }
    }
}

#[derive(Default)]
struct EncryptedData {
    algorithm: Option<String>,
    path: Option<String>,
    retrieval: Option<String>,
    compression_method: Option<String>,
    original_length: Option<u64>,
}

impl EncryptedData {
    fn finish(self) -> Option<(String, Encryption)> {
        let (algorithm, path) = (self.algorithm?, self.path?);

        let mut encryption = Encryption::new(algorithm);
        if self.retrieval.as_deref() == Some(LCP_KEY_RETRIEVAL) {
            encryption.scheme = Some(LCP_SCHEME.to_string());
        }
        encryption.compression = match self.compression_method.as_deref() {
            Some("8") => Some("deflate".to_string()),
            Some("0") => Some("none".to_string()),
            _ => None,
        };
        encryption.original_length = self.original_length;

        Some((path, encryption))
    }
}

/// Parse an encryption document.
pub fn parse_document(bytes: &[u8]) -> Result<EncryptionIndex> {
    let content = decode_xml(bytes);
    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    let mut index = EncryptionIndex::new();
    let mut current: Option<EncryptedData> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if local == b"EncryptedData" {
                    current = Some(EncryptedData::default());
                    continue;
                }
                let Some(data) = current.as_mut() else {
                    continue;
                };
                match local {
                    b"EncryptionMethod" => data.algorithm = attribute(&e, b"Algorithm")?,
                    b"RetrievalMethod" => data.retrieval = attribute(&e, b"URI")?,
                    b"CipherReference" => {
                        // URIs are relative to the container root.
                        data.path = attribute(&e, b"URI")?
                            .map(|uri| decode_path(&resolve_href("", &uri)));
                    }
                    b"Compression" => {
                        data.compression_method = attribute(&e, b"Method")?;
                        data.original_length = attribute(&e, b"OriginalLength")?
                            .and_then(|len| len.trim().parse().ok());
                    }
                    _ => {}
                }
            }
            Event::End(e) if local_name(e.name().as_ref()) == b"EncryptedData" => {
                if let Some((path, encryption)) = current.take().and_then(EncryptedData::finish) {
                    index.insert(path, encryption);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(index)
}
