use std::sync::LazyLock;

use regex::Regex;

use super::html::TableRow;

static LISTING_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"zvg_id=(?P<id>[0-9]{1,20})").unwrap());

/// The rows belonging to one listing: title → value cells, in page order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldGroup {
    fields: Vec<(String, Vec<String>)>,
    pub listing_id: Option<u64>,
}

impl FieldGroup {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.listing_id.is_none()
    }

    /// A repeated title replaces the earlier cells but keeps its position.
    pub fn insert(&mut self, title: &str, cells: Vec<String>) {
        match self.fields.iter_mut().find(|(t, _)| t == title) {
            Some((_, existing)) => *existing = cells,
            None => self.fields.push((title.to_string(), cells)),
        }
    }

    pub fn get(&self, title: &str) -> Option<&[String]> {
        self.fields
            .iter()
            .find(|(t, _)| t == title)
            .map(|(_, cells)| cells.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(t, c)| (t.as_str(), c.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

/// Fold state: the group being accumulated and the groups already closed.
struct Segmenter<'a> {
    marker: &'a str,
    current: FieldGroup,
    groups: Vec<FieldGroup>,
}

impl<'a> Segmenter<'a> {
    fn new(marker: &'a str) -> Self {
        Segmenter {
            marker,
            current: FieldGroup::default(),
            groups: Vec::new(),
        }
    }

    fn push(mut self, row: &TableRow) -> Self {
        let Some(title) = row.title().filter(|_| row.cells.len() >= 2) else {
            return self;
        };

        if title == self.marker && !self.current.is_empty() {
            self.groups.push(std::mem::take(&mut self.current));
        }

        if self.current.listing_id.is_none() {
            self.current.listing_id = row.links.iter().find_map(|href| listing_id(href));
        }

        let values = row.cells[1..].iter().map(|c| c.trim().to_string()).collect();
        self.current.insert(title, values);
        self
    }

    fn finish(mut self) -> Vec<FieldGroup> {
        if !self.current.is_empty() {
            self.groups.push(self.current);
        }
        self.groups
    }
}

/// Split a flat row sequence into one group per listing. Every occurrence of
/// `marker` as a row title starts a new group; rows with fewer than two
/// cells are ignored.
pub fn segment(rows: &[TableRow], marker: &str) -> Vec<FieldGroup> {
    rows.iter().fold(Segmenter::new(marker), Segmenter::push).finish()
}

pub fn listing_id(href: &str) -> Option<u64> {
    LISTING_ID_RE.captures(href)?["id"].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::html::{decode_latin1, table_rows};

    const MARKER: &str = "Aktenzeichen";

    fn row(title: &str, value: &str) -> TableRow {
        TableRow::new([title, value])
    }

    #[test]
    fn two_markers_two_groups() {
        let rows = vec![
            row("Aktenzeichen", "K 0001/2022"),
            row("Amtsgericht", "Duisburg"),
            row("Termin", "Montag, 23. Januar 2023, 09:30 Uhr"),
            row("Aktenzeichen:", "K 0002/2022"),
            row("Amtsgericht", "Essen"),
        ];
        let groups = segment(&rows, MARKER);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 3);
        assert_eq!(groups[0].get("Amtsgericht").unwrap(), ["Duisburg"]);
        assert_eq!(groups[1].len(), 2);
        assert_eq!(groups[1].get("Aktenzeichen").unwrap(), ["K 0002/2022"]);
        assert_eq!(groups[1].get("Termin"), None);
    }

    #[test]
    fn leading_rows_form_their_own_group() {
        let rows = vec![
            row("Suchergebnis", "2 Treffer"),
            row("Aktenzeichen", "K 0001/2022"),
        ];
        let groups = segment(&rows, MARKER);
        assert_eq!(groups.len(), 2);
        assert!(groups[0].get("Suchergebnis").is_some());
    }

    #[test]
    fn first_marker_does_not_emit_empty_group() {
        let rows = vec![row("Aktenzeichen", "K 0001/2022"), row("Termin", "x")];
        let groups = segment(&rows, MARKER);
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn short_rows_are_skipped() {
        let rows = vec![
            TableRow::new(["Aktenzeichen"]),
            TableRow::default(),
            row("Amtsgericht", "Duisburg"),
            TableRow::new(["Aktenzeichen"]),
            row("Termin", "x"),
        ];
        let groups = segment(&rows, MARKER);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
    }

    #[test]
    fn empty_input() {
        assert!(segment(&[], MARKER).is_empty());
    }

    #[test]
    fn multiple_value_cells_kept_in_order() {
        let rows = vec![TableRow::new(["Objekt/Lage", " Reihenhaus: ", "Wiesenstraße 1, 52531 Übach-Palenberg"])];
        let groups = segment(&rows, MARKER);
        assert_eq!(
            groups[0].get("Objekt/Lage").unwrap(),
            ["Reihenhaus:", "Wiesenstraße 1, 52531 Übach-Palenberg"]
        );
    }

    #[test]
    fn first_listing_id_wins() {
        let rows = vec![
            row("Aktenzeichen", "K 0001/2022").with_link("index.php?button=showZvg&zvg_id=4711&land_abk=nw"),
            row("Objekt/Lage", "x").with_link("index.php?button=showZvg&zvg_id=9999&land_abk=nw"),
            row("Aktenzeichen", "K 0002/2022").with_link("index.php?button=showZvg&zvg_id=4712&land_abk=nw"),
        ];
        let groups = segment(&rows, MARKER);
        assert_eq!(groups[0].listing_id, Some(4711));
        assert_eq!(groups[1].listing_id, Some(4712));
    }

    #[test]
    fn listing_id_from_href() {
        assert_eq!(listing_id("index.php?button=showZvg&zvg_id=123&land_abk=by"), Some(123));
        assert_eq!(listing_id("index.php?button=Suchen"), None);
        assert_eq!(listing_id("zvg_id=99999999999999999999"), None);
    }

    #[test]
    fn repeated_title_replaces_cells() {
        let mut group = FieldGroup::default();
        group.insert("Hinweis", vec!["a".into()]);
        group.insert("Termin", vec!["b".into()]);
        group.insert("Hinweis", vec!["c".into()]);
        let titles: Vec<&str> = group.iter().map(|(t, _)| t).collect();
        assert_eq!(titles, ["Hinweis", "Termin"]);
        assert_eq!(group.get("Hinweis").unwrap(), ["c"]);
    }

    #[test]
    fn list_fixture() {
        let bytes = std::fs::read("tests/fixtures/list.html").unwrap();
        let rows = table_rows(&decode_latin1(&bytes));
        let groups = segment(&rows, MARKER);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].listing_id, Some(1001));
        assert_eq!(groups[1].listing_id, Some(1002));
        assert_eq!(groups[2].listing_id, None);
    }
}
