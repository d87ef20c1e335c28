pub mod html;
pub mod listing;
pub mod normalize;
pub mod policy;
pub mod segment;

use html::{decode_latin1, table_rows};
use policy::ListingPolicy;
use segment::{segment, FieldGroup};

/// What the pipeline needs from a detail page.
#[derive(Debug, Default)]
pub struct DetailPage {
    pub group: Option<FieldGroup>,
    pub attachment_links: Vec<String>,
}

/// List page bytes → one field group per listing.
pub fn list_groups(content: &[u8], policy: &ListingPolicy) -> Vec<FieldGroup> {
    let rows = table_rows(&decode_latin1(content));
    segment(&rows, policy.marker_title)
}

/// Detail page bytes → the first field group plus document links.
pub fn parse_detail(content: &[u8], policy: &ListingPolicy) -> DetailPage {
    let rows = table_rows(&decode_latin1(content));
    let attachment_links = rows
        .iter()
        .filter(|r| r.cells.len() >= 2 && r.title().is_some_and(|t| policy.is_attachment(t)))
        .flat_map(|r| r.links.iter().cloned())
        .collect();
    DetailPage {
        group: segment(&rows, policy.marker_title).into_iter().next(),
        attachment_links,
    }
}

/// The portal answers invalid detail requests with an error snippet instead
/// of a full document.
pub fn is_detail_document(content: &[u8]) -> bool {
    content.starts_with(b"\n<!DOCTYPE")
}

#[cfg(test)]
mod tests {
    use super::*;
    use policy::ZVG_PORTAL;

    fn fixture(name: &str) -> Vec<u8> {
        std::fs::read(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    #[test]
    fn detail_page_links() {
        let page = parse_detail(&fixture("detail"), &ZVG_PORTAL);
        assert_eq!(page.attachment_links.len(), 3);
        assert!(page.attachment_links.iter().all(|l| l.contains("showAnhang")));
        let group = page.group.unwrap();
        assert_eq!(group.get("Grundbuch").unwrap(), ["Duisburg Blatt 4711"]);
    }

    #[test]
    fn detail_document_check() {
        assert!(is_detail_document(&fixture("detail")));
        assert!(!is_detail_document(b"Fehler: Objekt nicht gefunden"));
    }

    #[test]
    fn list_page_groups() {
        assert_eq!(list_groups(&fixture("list"), &ZVG_PORTAL).len(), 3);
    }
}
