//! EPUB 3 navigation document (`<nav epub:type="...">` lists).

use std::collections::BTreeMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::xml::{attribute, collapse_whitespace, local_name, resolve_entity};
use crate::error::Result;
use crate::model::{Link, PublicationCollection, Subcollections};
use crate::util::{decode_xml, resolve_href};

/// Kind of navigation list, from the `epub:type` of a `<nav>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NavType {
    Toc,
    PageList,
    Landmarks,
    /// List of audio clips.
    Loa,
    /// List of illustrations.
    Loi,
    /// List of tables.
    Lot,
    /// List of videos.
    Lov,
}

impl NavType {
    pub const ALL: [NavType; 7] = [
        NavType::Toc,
        NavType::PageList,
        NavType::Landmarks,
        NavType::Loa,
        NavType::Loi,
        NavType::Lot,
        NavType::Lov,
    ];

    /// Parse an `epub:type` token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "toc" => Some(NavType::Toc),
            "page-list" => Some(NavType::PageList),
            "landmarks" => Some(NavType::Landmarks),
            "loa" => Some(NavType::Loa),
            "loi" => Some(NavType::Loi),
            "lot" => Some(NavType::Lot),
            "lov" => Some(NavType::Lov),
            _ => None,
        }
    }

    /// Key of the manifest sub-collection holding this list.
    pub fn collection_role(self) -> &'static str {
        match self {
            NavType::Toc => "toc",
            NavType::PageList => "pageList",
            NavType::Landmarks => "landmarks",
            NavType::Loa => "loa",
            NavType::Loi => "loi",
            NavType::Lot => "lot",
            NavType::Lov => "lov",
        }
    }
}

/// Navigation lists read from a navigation document or an NCX.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationDocument {
    lists: BTreeMap<NavType, Vec<Link>>,
}

impl NavigationDocument {
    /// Parse navigation document bytes. Hrefs are resolved against
    /// `nav_path`.
    pub fn parse(bytes: &[u8], nav_path: &str) -> Result<Self> {
        let content = decode_xml(bytes);
        let mut reader = Reader::from_str(&content);
        reader.config_mut().trim_text(false);

        let mut document = Self::default();
        let mut open_nav: Option<NavList> = None;
        let mut depth = 0usize;

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let name = e.name();
                    let local = local_name(name.as_ref());
                    match open_nav.as_mut() {
                        Some(nav) => nav.start(local, &e, nav_path, depth)?,
                        None if local == b"nav" => open_nav = NavList::open(&e, depth)?,
                        None => {}
                    }
                    depth += 1;
                }
                Event::Empty(e) => {
                    if let Some(nav) = open_nav.as_mut() {
                        let name = e.name();
                        nav.empty(local_name(name.as_ref()), &e, nav_path)?;
                    }
                }
                Event::Text(e) => {
                    if let Some(nav) = open_nav.as_mut() {
                        nav.text(&String::from_utf8_lossy(e.as_ref()));
                    }
                }
                Event::CData(e) => {
                    if let Some(nav) = open_nav.as_mut() {
                        nav.text(&String::from_utf8_lossy(e.as_ref()));
                    }
                }
                Event::GeneralRef(e) => {
                    if let Some(nav) = open_nav.as_mut() {
                        let entity = String::from_utf8_lossy(e.as_ref());
                        if let Some(resolved) = resolve_entity(&entity) {
                            nav.text(&resolved);
                        }
                    }
                }
                Event::End(e) => {
                    depth = depth.saturating_sub(1);
                    let name = e.name();
                    let local = local_name(name.as_ref());
                    let closes_nav = open_nav
                        .as_ref()
                        .is_some_and(|nav| local == b"nav" && depth == nav.depth);
                    if closes_nav {
                        if let Some(nav) = open_nav.take() {
                            let (types, links) = nav.finish();
                            for nav_type in types {
                                document.insert_first(nav_type, links.clone());
                            }
                        }
                    } else if let Some(nav) = open_nav.as_mut() {
                        nav.end(local, depth);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(document)
    }

    /// Links of the list `nav_type`, empty if the document has none.
    pub fn links(&self, nav_type: NavType) -> &[Link] {
        self.lists
            .get(&nav_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Record a list unless a non-empty one of the same type was already
    /// read. Empty lists are not recorded.
    pub(crate) fn insert_first(&mut self, nav_type: NavType, links: Vec<Link>) {
        if !links.is_empty() {
            self.lists.entry(nav_type).or_insert(links);
        }
    }

    /// Non-empty lists as manifest sub-collections keyed by role.
    pub fn to_subcollections(&self) -> Subcollections {
        self.lists
            .iter()
            .filter(|(_, links)| !links.is_empty())
            .map(|(nav_type, links)| {
                (
                    nav_type.collection_role().to_string(),
                    vec![PublicationCollection::new(links.clone())],
                )
            })
            .collect()
    }
}

/// An entry being built: its label, target and nested entries.
#[derive(Debug, Default)]
pub(super) struct NavItem {
    pub href: Option<String>,
    pub title: String,
    pub children: Vec<Link>,
}

impl NavItem {
    /// Entries without a target become `#` when they group children, and
    /// are dropped otherwise.
    pub fn into_link(self) -> Option<Link> {
        let href = match self.href {
            Some(href) => href,
            None if !self.children.is_empty() => "#".to_string(),
            None => return None,
        };
        let mut link = Link::new(href).with_children(self.children);
        let title = collapse_whitespace(&self.title);
        if !title.is_empty() {
            link.title = Some(title);
        }
        Some(link)
    }
}

/// Resolve a non-empty href attribute. Targets resolving to the container
/// root count as missing.
pub(super) fn target(href: Option<String>, base: &str) -> Option<String> {
    href.filter(|h| !h.trim().is_empty())
        .map(|h| resolve_href(base, &h))
        .filter(|h| !h.is_empty())
}

/// State of the `<nav>` currently being read.
struct NavList {
    types: Vec<NavType>,
    /// Element depth of the `<nav>` start tag.
    depth: usize,
    /// Open `<li>` entries; the first one collects the top level.
    items: Vec<NavItem>,
    /// Depth of the `<a>`/`<span>` whose text is the current label.
    label_depth: Option<usize>,
    labelled: bool,
}

impl NavList {
    fn open(e: &BytesStart, depth: usize) -> Result<Option<Self>> {
        let types: Vec<NavType> = attribute(e, b"type")?
            .unwrap_or_default()
            .split_whitespace()
            .filter_map(NavType::from_token)
            .collect();
        if types.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self {
            types,
            depth,
            items: vec![NavItem::default()],
            label_depth: None,
            labelled: false,
        }))
    }

    fn in_item(&self) -> bool {
        self.items.len() > 1
    }

    fn start(&mut self, local: &[u8], e: &BytesStart, base: &str, depth: usize) -> Result<()> {
        match local {
            b"li" => {
                self.items.push(NavItem::default());
                self.labelled = false;
            }
            b"a" | b"span" if self.in_item() && !self.labelled && self.label_depth.is_none() => {
                self.label_depth = Some(depth);
                self.labelled = true;
                if local == b"a"
                    && let Some(item) = self.items.last_mut()
                {
                    item.href = target(attribute(e, b"href")?, base);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn empty(&mut self, local: &[u8], e: &BytesStart, base: &str) -> Result<()> {
        if local == b"a" && self.in_item() && !self.labelled {
            self.labelled = true;
            if let Some(item) = self.items.last_mut() {
                item.href = target(attribute(e, b"href")?, base);
            }
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        if self.label_depth.is_some()
            && let Some(item) = self.items.last_mut()
        {
            item.title.push_str(text);
        }
    }

    fn end(&mut self, local: &[u8], depth: usize) {
        if self.label_depth == Some(depth) {
            self.label_depth = None;
        }
        if local == b"li" && self.in_item() {
            if let Some(link) = self.items.pop().and_then(NavItem::into_link)
                && let Some(parent) = self.items.last_mut()
            {
                parent.children.push(link);
            }
            // The parent's label was read before its nested list.
            self.labelled = true;
        }
    }

    fn finish(mut self) -> (Vec<NavType>, Vec<Link>) {
        let links = self.items.swap_remove(0).children;
        (self.types, links)
    }
}
