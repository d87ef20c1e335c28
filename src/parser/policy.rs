use crate::model::ListingRecord;

/// Record attributes that come only from the detail page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailField {
    LandRegistry,
    AuctionType,
    AuctionLocation,
    CreditorInfo,
    Description,
}

impl DetailField {
    pub fn assign(self, record: &mut ListingRecord, value: String) {
        let slot = match self {
            DetailField::LandRegistry => &mut record.land_registry,
            DetailField::AuctionType => &mut record.auction_type,
            DetailField::AuctionLocation => &mut record.auction_location,
            DetailField::CreditorInfo => &mut record.creditor_info,
            DetailField::Description => &mut record.description,
        };
        *slot = Some(value);
    }
}

/// Site-specific titles and phrases. Kept as data so the segmenter and
/// builder stay independent of the portal's wording.
#[derive(Debug, Clone)]
pub struct ListingPolicy {
    pub marker_title: &'static str,
    pub court_title: &'static str,
    pub location_title: &'static str,
    pub value_title: &'static str,
    pub date_title: &'static str,
    pub cancelled_phrase: &'static str,
    pub detail_fields: &'static [(&'static str, DetailField)],
    /// Detail titles known to repeat list data or only carry links.
    pub skip_titles: &'static [&'static str],
    /// Detail titles whose links point at downloadable documents.
    pub attachment_titles: &'static [&'static str],
}

pub const ZVG_PORTAL: ListingPolicy = ListingPolicy {
    marker_title: "Aktenzeichen",
    court_title: "Amtsgericht",
    location_title: "Objekt/Lage",
    value_title: "Verkehrswert in €",
    date_title: "Termin",
    cancelled_phrase: "wurde aufgehoben",
    detail_fields: &[
        ("Grundbuch", DetailField::LandRegistry),
        ("Art der Versteigerung", DetailField::AuctionType),
        ("Ort der Versteigerung", DetailField::AuctionLocation),
        ("Informationen zum Gläubiger", DetailField::CreditorInfo),
        ("Beschreibung", DetailField::Description),
    ],
    skip_titles: &[
        "Aktenzeichen",
        "Amtsgericht",
        "Objekt/Lage",
        "Verkehrswert in €",
        "Termin",
        "Gericht",
        "GeoServer",
        "GoogleMaps",
        "Gutachten",
        "amtliche Bekanntmachung",
        "Exposee",
        "Änderung",
        "Foto",
        "Hinweis",
    ],
    attachment_titles: &["Gutachten", "amtliche Bekanntmachung", "Exposee", "Foto"],
};

impl Default for ListingPolicy {
    fn default() -> Self {
        ZVG_PORTAL
    }
}

impl ListingPolicy {
    pub fn detail_field(&self, title: &str) -> Option<DetailField> {
        self.detail_fields
            .iter()
            .find(|(t, _)| *t == title)
            .map(|(_, f)| *f)
    }

    pub fn is_skipped(&self, title: &str) -> bool {
        self.skip_titles.contains(&title)
    }

    pub fn is_attachment(&self, title: &str) -> bool {
        self.attachment_titles.contains(&title)
    }
}
