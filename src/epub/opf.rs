//! Package document (OPF): metadata, manifest and spine.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde_json::Value;

use super::encryption::EncryptionIndex;
use super::xml::{attribute, collapse_whitespace, local_name, resolve_entity};
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::model::{Contributor, Link, LocalizedString, Metadata, Page, Profile, ReadingProgression, media_type};
use crate::util::{decode_path, decode_xml, resolve_href};

/// The parts of a publication described by its package document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageDocument {
    pub metadata: Metadata,
    pub reading_order: Vec<Link>,
    pub resources: Vec<Link>,
}

/// Fetch and parse the package document at `opf_path`.
pub fn parse(fetcher: &dyn Fetcher, opf_path: &str, encryption: &EncryptionIndex) -> Result<PackageDocument> {
    let bytes = fetcher
        .read_bytes(opf_path)
        .map_err(Error::from_required_fetch)?;
    parse_document(&bytes, opf_path, encryption)
}

/// A `<manifest><item>` entry.
#[derive(Debug)]
struct ManifestItem {
    id: String,
    href: String,
    media_type: Option<String>,
    properties: Vec<String>,
}

#[derive(Debug)]
struct SpineItem {
    idref: String,
    linear: bool,
    properties: Vec<String>,
}

/// Metadata element whose text is being collected.
#[derive(Debug, Clone, PartialEq)]
enum TextTarget {
    Title,
    Identifier(Option<String>),
    Language,
    Creator,
    Contributor,
    Publisher,
    Description,
    Subject,
    Date,
    Modified,
}

#[derive(Default)]
struct RawMetadata {
    unique_identifier: Option<String>,
    titles: Vec<String>,
    identifiers: Vec<(Option<String>, String)>,
    languages: Vec<String>,
    creators: Vec<String>,
    contributors: Vec<String>,
    publishers: Vec<String>,
    descriptions: Vec<String>,
    subjects: Vec<String>,
    dates: Vec<String>,
    modified: Option<String>,
    cover_id: Option<String>,
    progression: Option<String>,
}

impl RawMetadata {
    fn push(&mut self, target: TextTarget, text: String) {
        if text.is_empty() {
            return;
        }
        match target {
            TextTarget::Title => self.titles.push(text),
            TextTarget::Identifier(id) => self.identifiers.push((id, text)),
            TextTarget::Language => self.languages.push(text),
            TextTarget::Creator => self.creators.push(text),
            TextTarget::Contributor => self.contributors.push(text),
            TextTarget::Publisher => self.publishers.push(text),
            TextTarget::Description => self.descriptions.push(text),
            TextTarget::Subject => self.subjects.push(text),
            TextTarget::Date => self.dates.push(text),
            TextTarget::Modified => {
                self.modified.get_or_insert(text);
            }
        }
    }

    fn into_metadata(self) -> Metadata {
        let identifier = self
            .identifiers
            .iter()
            .find(|(id, _)| id.is_some() && *id == self.unique_identifier)
            .or_else(|| self.identifiers.first())
            .map(|(_, value)| value.clone());

        Metadata {
            identifier,
            conforms_to: [Profile::EPUB].into_iter().collect(),
            title: LocalizedString::Plain(self.titles.into_iter().next().unwrap_or_default()),
            modified: self.modified,
            published: self.dates.into_iter().next(),
            languages: self.languages,
            authors: self.creators.into_iter().map(Contributor::new).collect(),
            contributors: self.contributors.into_iter().map(Contributor::new).collect(),
            publishers: self.publishers.into_iter().map(Contributor::new).collect(),
            subjects: self.subjects,
            reading_progression: self
                .progression
                .as_deref()
                .map(ReadingProgression::parse)
                .unwrap_or_default(),
            description: self.descriptions.into_iter().next(),
            ..Default::default()
        }
    }
}

fn tokens(value: Option<String>) -> Vec<String> {
    value
        .map(|v| v.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

fn text_target(local: &[u8], e: &BytesStart) -> Result<Option<TextTarget>> {
    let target = match local {
        b"title" => TextTarget::Title,
        b"identifier" => TextTarget::Identifier(attribute(e, b"id")?),
        b"language" => TextTarget::Language,
        b"creator" => TextTarget::Creator,
        b"contributor" => TextTarget::Contributor,
        b"publisher" => TextTarget::Publisher,
        b"description" => TextTarget::Description,
        b"subject" => TextTarget::Subject,
        b"date" => TextTarget::Date,
        b"meta" if attribute(e, b"property")?.as_deref() == Some("dcterms:modified") => {
            TextTarget::Modified
        }
        _ => return Ok(None),
    };
    Ok(Some(target))
}

/// Parse package document bytes. Hrefs are resolved against `opf_path`.
pub fn parse_document(bytes: &[u8], opf_path: &str, encryption: &EncryptionIndex) -> Result<PackageDocument> {
    let content = decode_xml(bytes);
    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(false);

    let mut raw = RawMetadata::default();
    let mut items: Vec<ManifestItem> = Vec::new();
    let mut spine: Vec<SpineItem> = Vec::new();

    let mut in_metadata = false;
    let mut current: Option<TextTarget> = None;
    let mut buf_text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                match local {
                    b"package" => raw.unique_identifier = attribute(&e, b"unique-identifier")?,
                    b"metadata" => in_metadata = true,
                    b"spine" => raw.progression = attribute(&e, b"page-progression-direction")?,
                    b"item" => items.extend(manifest_item(&e)?),
                    b"itemref" => spine.extend(spine_item(&e)?),
                    _ if in_metadata && current.is_none() => {
                        current = text_target(local, &e)?;
                        buf_text.clear();
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"spine" => raw.progression = attribute(&e, b"page-progression-direction")?,
                    b"item" => items.extend(manifest_item(&e)?),
                    b"itemref" => spine.extend(spine_item(&e)?),
                    // EPUB 2 cover declaration
                    b"meta" if in_metadata && attribute(&e, b"name")?.as_deref() == Some("cover") => {
                        raw.cover_id = attribute(&e, b"content")?;
                    }
                    _ => {}
                }
            }
            Event::Text(e) => {
                if current.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::CData(e) => {
                if current.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::GeneralRef(e) => {
                if current.is_some() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        buf_text.push_str(&resolved);
                    }
                }
            }
            Event::End(e) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if local == b"metadata" {
                    in_metadata = false;
                }
                if let Some(target) = current.take_if(|target| closes(target, local)) {
                    raw.push(target, collapse_whitespace(&buf_text));
                    buf_text.clear();
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let cover_id = raw.cover_id.clone();
    let metadata = raw.into_metadata();
    let (reading_order, resources) = assemble_links(items, spine, opf_path, cover_id.as_deref(), encryption);

    tracing::debug!(
        reading_order = reading_order.len(),
        resources = resources.len(),
        "parsed package document {opf_path}"
    );

    Ok(PackageDocument {
        metadata,
        reading_order,
        resources,
    })
}

fn closes(target: &TextTarget, local: &[u8]) -> bool {
    let expected: &[u8] = match target {
        TextTarget::Title => b"title",
        TextTarget::Identifier(_) => b"identifier",
        TextTarget::Language => b"language",
        TextTarget::Creator => b"creator",
        TextTarget::Contributor => b"contributor",
        TextTarget::Publisher => b"publisher",
        TextTarget::Description => b"description",
        TextTarget::Subject => b"subject",
        TextTarget::Date => b"date",
        TextTarget::Modified => b"meta",
    };
    local == expected
}

fn manifest_item(e: &BytesStart) -> Result<Option<ManifestItem>> {
    let (Some(id), Some(href)) = (attribute(e, b"id")?, attribute(e, b"href")?) else {
        return Ok(None);
    };
    Ok(Some(ManifestItem {
        id,
        href,
        media_type: attribute(e, b"media-type")?.filter(|m| !m.trim().is_empty()),
        properties: tokens(attribute(e, b"properties")?),
    }))
}

fn spine_item(e: &BytesStart) -> Result<Option<SpineItem>> {
    let Some(idref) = attribute(e, b"idref")? else {
        return Ok(None);
    };
    Ok(Some(SpineItem {
        idref,
        linear: attribute(e, b"linear")?.as_deref() != Some("no"),
        properties: tokens(attribute(e, b"properties")?),
    }))
}

/// Split manifest items into reading order and resources.
///
/// The reading order follows the linear spine; every other item, including
/// non-linear spine items, is a resource in manifest order.
fn assemble_links(
    items: Vec<ManifestItem>,
    spine: Vec<SpineItem>,
    opf_path: &str,
    cover_id: Option<&str>,
    encryption: &EncryptionIndex,
) -> (Vec<Link>, Vec<Link>) {
    let mut links: HashMap<String, Link> = HashMap::new();
    let mut manifest_order: Vec<String> = Vec::new();

    for item in items {
        if links.contains_key(&item.id) {
            continue;
        }
        let Some(link) = item_link(&item, opf_path, cover_id, encryption) else {
            tracing::debug!("dropping manifest item {} without a usable media type", item.href);
            continue;
        };
        manifest_order.push(item.id.clone());
        links.insert(item.id, link);
    }

    let mut reading_order = Vec::new();
    for itemref in spine {
        if !itemref.linear {
            continue;
        }
        let Some(mut link) = links.remove(&itemref.idref) else {
            continue;
        };
        if let Some(page) = itemref.properties.iter().find_map(|p| page_spread(p)) {
            link.properties.set_page(page);
        }
        reading_order.push(link);
    }

    let resources = manifest_order
        .iter()
        .filter_map(|id| links.remove(id))
        .collect();

    (reading_order, resources)
}

fn item_link(
    item: &ManifestItem,
    opf_path: &str,
    cover_id: Option<&str>,
    encryption: &EncryptionIndex,
) -> Option<Link> {
    let href = resolve_href(opf_path, &item.href);
    let media_type = item
        .media_type
        .clone()
        .or_else(|| media_type::guess_from_path(&href))?;

    let mut link = Link::new(href).with_media_type(media_type);

    let mut contains = Vec::new();
    for property in &item.properties {
        match property.as_str() {
            "nav" => link.rels.insert("contents".to_string()),
            "cover-image" => link.rels.insert("cover".to_string()),
            "mathml" | "svg" | "scripted" | "remote-resources" => {
                contains.push(Value::String(property.clone()));
                continue;
            }
            _ => continue,
        };
    }
    if cover_id == Some(item.id.as_str()) {
        link.rels.insert("cover".to_string());
    }
    if !contains.is_empty() {
        link.properties.insert("contains", Value::Array(contains));
    }
    if let Some(encrypted) = encryption.get(&decode_path(link.href_path())) {
        link.properties.set_encryption(encrypted);
    }

    Some(link)
}

fn page_spread(property: &str) -> Option<Page> {
    let property = property.strip_prefix("rendition:").unwrap_or(property);
    match property {
        "page-spread-left" => Some(Page::Left),
        "page-spread-right" => Some(Page::Right),
        "page-spread-center" => Some(Page::Center),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Encryption, LinkListExt};

    const OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="isbn">978-0000000000</dc:identifier>
    <dc:identifier id="uid">urn:uuid:1234</dc:identifier>
    <dc:title>Pride &amp;
      Prejudice</dc:title>
    <dc:title>Second title</dc:title>
    <dc:creator>Jane Austen</dc:creator>
    <dc:contributor>Editor Person</dc:contributor>
    <dc:publisher>Publisher</dc:publisher>
    <dc:language>en</dc:language>
    <dc:subject>Fiction</dc:subject>
    <dc:date>1813-01-28</dc:date>
    <dc:description>A novel.</dc:description>
    <meta property="dcterms:modified">2020-01-01T00:00:00Z</meta>
    <meta name="cover" content="cover-img"/>
  </metadata>
  <manifest>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="c1" href="text/c1.xhtml" media-type="application/xhtml+xml" properties="mathml scripted"/>
    <item id="c2" href="text/c2.xhtml" media-type="application/xhtml+xml"/>
    <item id="notes" href="text/notes.xhtml" media-type="application/xhtml+xml"/>
    <item id="cover-img" href="images/cover.jpg" media-type="image/jpeg"/>
    <item id="css" href="../styles/main.css"/>
    <item id="blob" href="data/blob"/>
  </manifest>
  <spine toc="ncx" page-progression-direction="rtl">
    <itemref idref="c1" properties="rendition:page-spread-right"/>
    <itemref idref="notes" linear="no"/>
    <itemref idref="c2" properties="page-spread-left"/>
    <itemref idref="missing"/>
  </spine>
</package>"#;

    fn parse_opf(encryption: &EncryptionIndex) -> PackageDocument {
        parse_document(OPF.as_bytes(), "OEBPS/content.opf", encryption).unwrap()
    }

    #[test]
    fn test_metadata() {
        let package = parse_opf(&EncryptionIndex::new());
        let metadata = &package.metadata;

        assert_eq!(metadata.identifier.as_deref(), Some("urn:uuid:1234"));
        assert_eq!(metadata.title.string(), "Pride & Prejudice");
        assert_eq!(metadata.authors, vec![Contributor::new("Jane Austen")]);
        assert_eq!(metadata.contributors, vec![Contributor::new("Editor Person")]);
        assert_eq!(metadata.publishers, vec![Contributor::new("Publisher")]);
        assert_eq!(metadata.languages, vec!["en"]);
        assert_eq!(metadata.subjects, vec!["Fiction"]);
        assert_eq!(metadata.published.as_deref(), Some("1813-01-28"));
        assert_eq!(metadata.modified.as_deref(), Some("2020-01-01T00:00:00Z"));
        assert_eq!(metadata.description.as_deref(), Some("A novel."));
        assert_eq!(metadata.reading_progression, ReadingProgression::Rtl);
        assert!(metadata.conforms_to.contains(&Profile::EPUB));
    }

    #[test]
    fn test_reading_order_and_resources() {
        let package = parse_opf(&EncryptionIndex::new());

        let order: Vec<_> = package.reading_order.iter().map(|l| l.href.as_str()).collect();
        assert_eq!(order, vec!["OEBPS/text/c1.xhtml", "OEBPS/text/c2.xhtml"]);
        assert_eq!(package.reading_order[0].properties.page(), Some(Page::Right));
        assert_eq!(package.reading_order[1].properties.page(), Some(Page::Left));
        assert_eq!(package.reading_order[0].properties.contains(), vec!["mathml", "scripted"]);

        let resources: Vec<_> = package.resources.iter().map(|l| l.href.as_str()).collect();
        assert_eq!(
            resources,
            vec![
                "OEBPS/nav.xhtml",
                "OEBPS/toc.ncx",
                "OEBPS/text/notes.xhtml",
                "OEBPS/images/cover.jpg",
                "styles/main.css",
            ]
        );
    }

    #[test]
    fn test_rels_and_guessed_media_type() {
        let package = parse_opf(&EncryptionIndex::new());

        assert_eq!(
            package.resources.first_with_rel("contents").map(|l| l.href.as_str()),
            Some("OEBPS/nav.xhtml")
        );
        assert_eq!(
            package.resources.first_with_rel("cover").map(|l| l.href.as_str()),
            Some("OEBPS/images/cover.jpg")
        );
        let css = package.resources.first_with_href("styles/main.css").unwrap();
        assert_eq!(css.media_type.as_deref(), Some("text/css"));
    }

    #[test]
    fn test_encrypted_resources() {
        let mut index = EncryptionIndex::new();
        index.insert(
            "OEBPS/text/c2.xhtml".to_string(),
            Encryption::new("http://www.w3.org/2001/04/xmlenc#aes256-cbc"),
        );
        let package = parse_opf(&index);

        let encrypted = package.reading_order[1].properties.encryption().unwrap();
        assert_eq!(encrypted.algorithm, "http://www.w3.org/2001/04/xmlenc#aes256-cbc");
        assert!(package.reading_order[0].properties.encryption().is_none());
    }

    #[test]
    fn test_identifier_falls_back_to_first() {
        let opf = r#"<package unique-identifier="nope"><metadata>
            <dc:identifier>first</dc:identifier><dc:identifier>second</dc:identifier>
        </metadata></package>"#;
        let package = parse_document(opf.as_bytes(), "content.opf", &EncryptionIndex::new()).unwrap();
        assert_eq!(package.metadata.identifier.as_deref(), Some("first"));
        assert_eq!(package.metadata.title.string(), "");
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        let result = parse_document(b"<package><metadata></package>", "content.opf", &EncryptionIndex::new());
        assert!(matches!(result, Err(Error::Parse(_))));
    }
}
