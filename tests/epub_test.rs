//! End-to-end EPUB assembly over in-memory archives.

use std::io::{Cursor, Write};

use tempfile::NamedTempFile;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use vellum::model::Page;
use vellum::{
    ContentLayout, Error, LinkListExt, Manifest, MemoryFetcher, PresentationSetting, Profile,
    Publication, ReadingProgression, ZipFetcher,
};

const CONTAINER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

const OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="uid">urn:uuid:0000-test</dc:identifier>
    <dc:title>Agnes Grey</dc:title>
    <dc:creator>Anne Bront&#235;</dc:creator>
    <dc:language>en</dc:language>
    <meta property="dcterms:modified">2024-05-01T00:00:00Z</meta>
  </metadata>
  <manifest>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="c1" href="text/c1.xhtml" media-type="application/xhtml+xml"/>
    <item id="c2" href="text/c2.xhtml" media-type="application/xhtml+xml"/>
    <item id="c3" href="text/c3.xhtml" media-type="application/xhtml+xml"/>
    <item id="cover" href="images/cover.jpg" media-type="image/jpeg" properties="cover-image"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="c1" properties="page-spread-right"/>
    <itemref idref="c2"/>
    <itemref idref="c3"/>
  </spine>
</package>"#;

const NAV_FULL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<body>
  <nav epub:type="toc">
    <ol>
      <li><a href="text/c1.xhtml">Chapter I</a></li>
      <li><a href="text/c2.xhtml">Chapter II</a>
        <ol><li><a href="text/c2.xhtml#part2">Part 2</a></li></ol>
      </li>
      <li><a href="text/c3.xhtml">Chapter III</a></li>
    </ol>
  </nav>
  <nav epub:type="landmarks">
    <ol><li><a epub:type="bodymatter" href="text/c1.xhtml">Start</a></li></ol>
  </nav>
</body>
</html>"#;

/// Navigation document with lists but an empty table of contents.
const NAV_WITHOUT_TOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<body>
  <nav epub:type="toc"><ol></ol></nav>
  <nav epub:type="page-list">
    <ol><li><a href="text/c1.xhtml#nav-page-1">1</a></li></ol>
  </nav>
  <nav epub:type="landmarks">
    <ol><li><a href="text/c1.xhtml">Start</a></li></ol>
  </nav>
</body>
</html>"#;

const NCX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <navMap>
    <navPoint id="n1" playOrder="1">
      <navLabel><text>NCX One</text></navLabel>
      <content src="text/c1.xhtml"/>
    </navPoint>
    <navPoint id="n2" playOrder="2">
      <navLabel><text>NCX Two</text></navLabel>
      <content src="text/c2.xhtml"/>
    </navPoint>
  </navMap>
  <pageList>
    <pageTarget id="p1" value="1" type="normal">
      <navLabel><text>1</text></navLabel>
      <content src="text/c1.xhtml#ncx-page-1"/>
    </pageTarget>
  </pageList>
</ncx>"#;

const XHTML: &str = r#"<html xmlns="http://www.w3.org/1999/xhtml"><body><p>Text</p></body></html>"#;

/// Build an EPUB archive: `mimetype` first and stored, then `entries`.
fn build_epub(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file("mimetype", stored).unwrap();
    zip.write_all(b"application/epub+zip").unwrap();
    for (name, data) in entries {
        zip.start_file(*name, deflated).unwrap();
        zip.write_all(data.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn epub_with_nav(nav: &str) -> Vec<u8> {
    build_epub(&[
        ("META-INF/container.xml", CONTAINER),
        ("OEBPS/content.opf", OPF),
        ("OEBPS/nav.xhtml", nav),
        ("OEBPS/toc.ncx", NCX),
        ("OEBPS/text/c1.xhtml", XHTML),
        ("OEBPS/text/c2.xhtml", XHTML),
        ("OEBPS/text/c3.xhtml", XHTML),
    ])
}

fn open(data: Vec<u8>) -> Publication {
    let fetcher = ZipFetcher::from_bytes(data).expect("Failed to read archive");
    Publication::open_fetcher(&fetcher).expect("Failed to parse EPUB")
}

#[test]
fn test_metadata_and_reading_order() {
    let publication = open(epub_with_nav(NAV_FULL));
    let manifest = &publication.manifest;

    assert_eq!(manifest.metadata.title.string(), "Agnes Grey");
    assert_eq!(manifest.metadata.identifier.as_deref(), Some("urn:uuid:0000-test"));
    assert_eq!(manifest.metadata.authors[0].name.string(), "Anne Bront\u{eb}");
    assert_eq!(manifest.metadata.modified.as_deref(), Some("2024-05-01T00:00:00Z"));

    let order: Vec<_> = manifest.reading_order.iter().map(|l| l.href.as_str()).collect();
    assert_eq!(
        order,
        vec!["OEBPS/text/c1.xhtml", "OEBPS/text/c2.xhtml", "OEBPS/text/c3.xhtml"]
    );
    assert_eq!(manifest.reading_order[0].properties.page(), Some(Page::Right));
    assert_eq!(
        manifest.link_with_rel("cover").map(|l| l.href.as_str()),
        Some("OEBPS/images/cover.jpg")
    );
}

#[test]
fn test_epub_conformance() {
    let manifest = open(epub_with_nav(NAV_FULL)).manifest;

    assert!(manifest.conforms_to(&Profile::EPUB));
    assert!(!manifest.conforms_to(&Profile::AUDIOBOOK));
    assert!(!manifest.conforms_to(&Profile::DIVINA));
}

#[test]
fn test_navigation_document_wins() {
    let manifest = open(epub_with_nav(NAV_FULL)).manifest;

    let toc = manifest.table_of_contents();
    assert_eq!(toc.len(), 3);
    assert_eq!(toc[1].title.as_deref(), Some("Chapter II"));
    assert_eq!(toc[1].children[0].href, "OEBPS/text/c2.xhtml#part2");

    assert_eq!(manifest.subcollection("landmarks")[0].links[0].title.as_deref(), Some("Start"));
    // The NCX is not read when the navigation document has a toc.
    assert!(manifest.subcollection("pageList").is_empty());
}

#[test]
fn test_empty_nav_toc_falls_back_to_ncx() {
    let manifest = open(epub_with_nav(NAV_WITHOUT_TOC)).manifest;

    let titles: Vec<_> = manifest
        .table_of_contents()
        .iter()
        .filter_map(|l| l.title.as_deref())
        .collect();
    assert_eq!(titles, vec!["NCX One", "NCX Two"]);
}

#[test]
fn test_nav_lists_are_kept_over_ncx() {
    let manifest = open(epub_with_nav(NAV_WITHOUT_TOC)).manifest;

    let pages = &manifest.subcollection("pageList")[0].links;
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].href, "OEBPS/text/c1.xhtml#nav-page-1");
    assert_eq!(manifest.subcollection("landmarks").len(), 1);
}

#[test]
fn test_assembled_manifest_round_trips() {
    for nav in [NAV_FULL, NAV_WITHOUT_TOC] {
        let manifest = open(epub_with_nav(nav)).manifest;
        assert_eq!(Manifest::from_json(&manifest.to_json()).unwrap(), manifest);
    }
}

#[test]
fn test_root_hrefs_keep_the_manifest_round_trippable() {
    let nav = r#"<html xmlns:epub="http://www.idpf.org/2007/ops"><body>
  <nav epub:type="toc"><ol>
    <li><a href="../">Container root</a></li>
    <li><a href="text/c1.xhtml">Chapter I</a></li>
  </ol></nav>
</body></html>"#;
    let manifest = open(epub_with_nav(nav)).manifest;

    let hrefs: Vec<_> = manifest.table_of_contents().iter().map(|l| l.href.as_str()).collect();
    assert_eq!(hrefs, vec!["OEBPS/text/c1.xhtml"]);
    assert_eq!(Manifest::from_json(&manifest.to_json()).unwrap(), manifest);
}

/// EPUB 2 package: no navigation document, only the NCX.
fn epub2_with_ncx(ncx: Option<&str>) -> Vec<u8> {
    let opf = OPF.replace(
        r#"<item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>"#,
        "",
    );
    let mut entries = vec![
        ("META-INF/container.xml", CONTAINER),
        ("OEBPS/content.opf", opf.as_str()),
        ("OEBPS/text/c1.xhtml", XHTML),
        ("OEBPS/text/c2.xhtml", XHTML),
        ("OEBPS/text/c3.xhtml", XHTML),
    ];
    if let Some(ncx) = ncx {
        entries.push(("OEBPS/toc.ncx", ncx));
    }
    build_epub(&entries)
}

#[test]
fn test_epub2_navigation_comes_from_ncx() {
    let manifest = open(epub2_with_ncx(Some(NCX))).manifest;

    assert!(manifest.links_with_rel("contents").is_empty());
    let toc = manifest.table_of_contents();
    assert_eq!(toc.len(), 2);
    assert_eq!(toc[0].href, "OEBPS/text/c1.xhtml");
    assert_eq!(toc[0].title.as_deref(), Some("NCX One"));

    let pages = &manifest.subcollection("pageList")[0].links;
    assert_eq!(pages[0].href, "OEBPS/text/c1.xhtml#ncx-page-1");
}

#[test]
fn test_unreadable_ncx_is_not_fatal() {
    let malformed = "<ncx><navMap><navPoint><content src=\"text/c1.xhtml\"/></ncx>";
    for data in [epub2_with_ncx(Some(malformed)), epub2_with_ncx(None)] {
        let manifest = open(data).manifest;
        assert_eq!(manifest.reading_order.len(), 3);
        assert!(manifest.table_of_contents().is_empty());
        assert!(manifest.subcollection("pageList").is_empty());
    }
}

#[test]
fn test_unreadable_ncx_behind_empty_nav_toc() {
    let data = build_epub(&[
        ("META-INF/container.xml", CONTAINER),
        ("OEBPS/content.opf", OPF),
        ("OEBPS/nav.xhtml", NAV_WITHOUT_TOC),
        ("OEBPS/toc.ncx", "<ncx><navMap></pageList></ncx>"),
        ("OEBPS/text/c1.xhtml", XHTML),
        ("OEBPS/text/c2.xhtml", XHTML),
        ("OEBPS/text/c3.xhtml", XHTML),
    ]);
    let manifest = open(data).manifest;

    assert!(manifest.table_of_contents().is_empty());
    assert_eq!(manifest.subcollection("landmarks").len(), 1);
}

#[test]
fn test_encrypted_resources_are_marked() {
    let encryption = r#"<encryption xmlns="urn:oasis:names:tc:opendocument:xmlns:container"
        xmlns:enc="http://www.w3.org/2001/04/xmlenc#" xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
      <enc:EncryptedData>
        <enc:EncryptionMethod Algorithm="http://www.w3.org/2001/04/xmlenc#aes256-cbc"/>
        <ds:KeyInfo><ds:RetrievalMethod URI="license.lcpl#/encryption/content_key"/></ds:KeyInfo>
        <enc:CipherData><enc:CipherReference URI="OEBPS/text/c2.xhtml"/></enc:CipherData>
      </enc:EncryptedData>
    </encryption>"#;
    let data = build_epub(&[
        ("META-INF/container.xml", CONTAINER),
        ("META-INF/encryption.xml", encryption),
        ("OEBPS/content.opf", OPF),
        ("OEBPS/nav.xhtml", NAV_FULL),
    ]);
    let manifest = open(data).manifest;

    let encrypted = manifest
        .link_with_href("OEBPS/text/c2.xhtml")
        .and_then(|l| l.properties.encryption())
        .expect("c2 should be encrypted");
    assert_eq!(encrypted.algorithm, "http://www.w3.org/2001/04/xmlenc#aes256-cbc");
    assert_eq!(encrypted.scheme.as_deref(), Some(vellum::model::LCP_SCHEME));

    let plain = manifest.link_with_href("OEBPS/text/c1.xhtml").unwrap();
    assert!(plain.properties.encryption().is_none());
}

#[test]
fn test_vertical_japanese_preset() {
    let opf = OPF
        .replace("<dc:language>en</dc:language>", "<dc:language>ja</dc:language>")
        .replace(r#"<spine toc="ncx">"#, r#"<spine toc="ncx" page-progression-direction="rtl">"#);
    let data = build_epub(&[
        ("META-INF/container.xml", CONTAINER),
        ("OEBPS/content.opf", opf.as_str()),
        ("OEBPS/nav.xhtml", NAV_FULL),
    ]);
    let publication = open(data);

    assert_eq!(
        publication.manifest.metadata.reading_progression,
        ReadingProgression::Rtl
    );
    assert_eq!(publication.presentation.layout(), ContentLayout::CjkVertical);
    assert_eq!(publication.presentation.get(PresentationSetting::Scroll), Some(true));
}

#[test]
fn test_wrong_mimetype() {
    let mut fetcher = MemoryFetcher::new()
        .with_entry("META-INF/container.xml", CONTAINER)
        .with_entry("OEBPS/content.opf", OPF);
    fetcher.insert("mimetype", "application/zip");

    assert!(matches!(
        Publication::open_fetcher(&fetcher),
        Err(Error::WrongContainerType(_))
    ));
}

#[test]
fn test_missing_rootfile() {
    let fetcher = MemoryFetcher::new()
        .with_entry("META-INF/container.xml", "<container><rootfiles></rootfiles></container>");
    assert!(matches!(
        Publication::open_fetcher(&fetcher),
        Err(Error::MissingCrossReference(_))
    ));
}

#[test]
fn test_open_from_disk() {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(&epub_with_nav(NAV_FULL)).unwrap();
    file.flush().unwrap();

    let publication = Publication::open(file.path()).expect("Failed to open EPUB");
    assert_eq!(publication.manifest.reading_order.len(), 3);
    assert!(publication.manifest.resources.first_with_rel("contents").is_some());
}

#[test]
fn test_open_exploded_directory() {
    let dir = tempfile::tempdir().unwrap();
    let files = [
        ("META-INF/container.xml", CONTAINER),
        ("OEBPS/content.opf", OPF),
        ("OEBPS/nav.xhtml", NAV_FULL),
    ];
    for (name, data) in files {
        let path = dir.path().join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
    }

    let publication = Publication::open(dir.path()).expect("Failed to open directory");
    assert_eq!(publication.manifest.table_of_contents().len(), 3);
}

#[test]
fn test_not_an_archive() {
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), "plain text, not a zip archive\n".repeat(20)).unwrap();
    assert!(matches!(
        Publication::open(file.path()),
        Err(Error::WrongContainerType(_))
    ));
}
