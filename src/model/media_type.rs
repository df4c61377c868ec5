//! Media type constants and comparisons.
//!
//! Media types are compared on their `type/subtype` essence, ignoring case
//! and parameters (`text/html; charset=utf-8` matches `TEXT/HTML`).

pub const HTML: &str = "text/html";
pub const XHTML: &str = "application/xhtml+xml";
pub const PDF: &str = "application/pdf";
pub const NCX: &str = "application/x-dtbncx+xml";
pub const EPUB: &str = "application/epub+zip";
pub const OPF: &str = "application/oebps-package+xml";
pub const WEBPUB_MANIFEST: &str = "application/webpub+json";
pub const SMIL: &str = "application/smil+xml";

const BITMAP: &[&str] = &[
    "image/avif",
    "image/bmp",
    "image/gif",
    "image/jpeg",
    "image/jxl",
    "image/png",
    "image/tiff",
    "image/webp",
];

/// Lowercased `type/subtype` without parameters.
pub fn essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Returns true if both media types share the same essence.
pub fn matches(a: &str, b: &str) -> bool {
    essence(a) == essence(b)
}

pub fn is_audio(media_type: &str) -> bool {
    essence(media_type).starts_with("audio/")
}

pub fn is_bitmap(media_type: &str) -> bool {
    BITMAP.contains(&essence(media_type).as_str())
}

pub fn is_html(media_type: &str) -> bool {
    let essence = essence(media_type);
    essence == HTML || essence == XHTML
}

/// Guess a media type from a file extension.
pub fn guess_from_path(path: &str) -> Option<String> {
    let path = path.split(['#', '?']).next().unwrap_or(path);
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string())
}
