//! Legacy NCX index: `navMap` and `pageList`.

use quick_xml::Reader;
use quick_xml::events::Event;

use super::nav::{NavItem, NavType, NavigationDocument, target};
use super::xml::{attribute, local_name, resolve_entity};
use crate::error::Result;
use crate::util::decode_xml;

/// Parse NCX bytes into the `toc` and `page-list` lists. Hrefs are resolved
/// against `ncx_path`.
pub fn parse(bytes: &[u8], ncx_path: &str) -> Result<NavigationDocument> {
    let content = decode_xml(bytes);
    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(false);

    let mut document = NavigationDocument::default();
    // List being read, with its open entries; the first collects the top level.
    let mut section: Option<(NavType, Vec<NavItem>)> = None;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"navMap" if section.is_none() => {
                        section = Some((NavType::Toc, vec![NavItem::default()]));
                    }
                    b"pageList" if section.is_none() => {
                        section = Some((NavType::PageList, vec![NavItem::default()]));
                    }
                    b"navPoint" | b"pageTarget" => {
                        if let Some((_, stack)) = section.as_mut() {
                            stack.push(NavItem::default());
                        }
                    }
                    b"text" => in_text = true,
                    b"content" => set_src(&mut section, attribute(&e, b"src")?, ncx_path),
                    _ => {}
                }
            }
            Event::Empty(e) => {
                let name = e.name();
                if local_name(name.as_ref()) == b"content" {
                    set_src(&mut section, attribute(&e, b"src")?, ncx_path);
                }
            }
            Event::Text(e) => {
                if in_text {
                    push_text(&mut section, &String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::CData(e) => {
                if in_text {
                    push_text(&mut section, &String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::GeneralRef(e) => {
                if in_text {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        push_text(&mut section, &resolved);
                    }
                }
            }
            Event::End(e) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"text" => in_text = false,
                    b"navPoint" | b"pageTarget" => {
                        if let Some((_, stack)) = section.as_mut()
                            && stack.len() > 1
                            && let Some(link) = stack.pop().and_then(NavItem::into_link)
                            && let Some(parent) = stack.last_mut()
                        {
                            parent.children.push(link);
                        }
                    }
                    b"navMap" | b"pageList" => {
                        if let Some((nav_type, mut stack)) = section.take() {
                            document.insert_first(nav_type, stack.swap_remove(0).children);
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(document)
}

/// Current entry of the open list, if any entry is open.
fn current_item(section: &mut Option<(NavType, Vec<NavItem>)>) -> Option<&mut NavItem> {
    match section {
        Some((_, stack)) if stack.len() > 1 => stack.last_mut(),
        _ => None,
    }
}

fn set_src(section: &mut Option<(NavType, Vec<NavItem>)>, src: Option<String>, base: &str) {
    if let Some(item) = current_item(section)
        && item.href.is_none()
    {
        item.href = target(src, base);
    }
}

fn push_text(section: &mut Option<(NavType, Vec<NavItem>)>, text: &str) {
    if let Some(item) = current_item(section) {
        item.title.push_str(text);
    }
}
