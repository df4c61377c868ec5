use serde::{Deserialize, Serialize};

/// Scheme URI for resources protected by Readium LCP.
pub const LCP_SCHEME: &str = "http://readium.org/2014/01/lcp";

/// How a resource is encrypted (`properties.encrypted`).
///
/// Only describes the encryption; nothing in this crate decrypts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encryption {
    /// Algorithm URI, e.g. `http://www.w3.org/2001/04/xmlenc#aes256-cbc`.
    pub algorithm: String,

    /// Compression applied before encryption (`deflate` or `none`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<String>,

    /// Length of the resource before compression and encryption.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_length: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
}

impl Encryption {
    pub fn new(algorithm: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            compression: None,
            original_length: None,
            profile: None,
            scheme: None,
        }
    }
}
