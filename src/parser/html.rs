use std::sync::LazyLock;

use encoding_rs::WINDOWS_1252;
use scraper::{ElementRef, Html, Selector};

use crate::model::Jurisdiction;

static TR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static TD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static SELECT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("select").unwrap());
static OPTION: LazyLock<Selector> = LazyLock::new(|| Selector::parse("option").unwrap());

const JURISDICTION_PLACEHOLDER: &str = "Bundesland auswählen";

/// One `<tr>`: trimmed text of every `<td>` plus every link target in it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    pub cells: Vec<String>,
    pub links: Vec<String>,
}

impl TableRow {
    pub fn new<S: Into<String>>(cells: impl IntoIterator<Item = S>) -> Self {
        TableRow {
            cells: cells.into_iter().map(Into::into).collect(),
            links: Vec::new(),
        }
    }

    pub fn with_link(mut self, href: &str) -> Self {
        self.links.push(href.to_string());
        self
    }

    /// First cell without surrounding whitespace or trailing colon.
    pub fn title(&self) -> Option<&str> {
        self.cells.first().map(|c| c.trim().trim_end_matches(':'))
    }
}

/// The portal serves ISO-8859-1 declared pages; decode with the WHATWG
/// superset so `€` in windows-1252 pages survives too.
pub fn decode_latin1(bytes: &[u8]) -> String {
    let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
    text.into_owned()
}

pub fn table_rows(html: &str) -> Vec<TableRow> {
    let doc = Html::parse_document(html);
    doc.select(&TR)
        .map(|tr| TableRow {
            cells: tr.select(&TD).map(|td| element_text(&td)).collect(),
            links: tr
                .select(&LINK)
                .filter_map(|a| a.value().attr("href"))
                .map(str::to_string)
                .collect(),
        })
        .collect()
}

/// Options following the "Bundesland auswählen" placeholder of the first
/// `<select>` that has one.
pub fn parse_jurisdictions(html: &str) -> Vec<Jurisdiction> {
    let doc = Html::parse_document(html);
    for select in doc.select(&SELECT) {
        let options: Vec<ElementRef> = select.select(&OPTION).collect();
        let Some(start) = options
            .iter()
            .position(|o| element_text(o).contains(JURISDICTION_PLACEHOLDER))
        else {
            continue;
        };
        return options[start + 1..]
            .iter()
            .filter_map(|o| {
                Some(Jurisdiction {
                    code: o.value().attr("value")?.to_string(),
                    name: element_text(o),
                })
            })
            .collect();
    }
    Vec::new()
}

fn element_text(el: &ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}
