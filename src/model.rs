use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::store::content_hash;

/// One regional auction registry, e.g. `nw` / "Nordrhein-Westfalen".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jurisdiction {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    List,
    Detail,
    Attachment,
}

/// Raw bytes as fetched from the portal. The hash is always derived from the
/// content, never carried alongside it.
#[derive(Debug, Clone)]
pub enum RawPayload {
    List(Vec<u8>),
    Detail(Vec<u8>),
    Attachment(Vec<u8>),
}

impl RawPayload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            RawPayload::List(_) => PayloadKind::List,
            RawPayload::Detail(_) => PayloadKind::Detail,
            RawPayload::Attachment(_) => PayloadKind::Attachment,
        }
    }

    pub fn content(&self) -> &[u8] {
        match self {
            RawPayload::List(c) | RawPayload::Detail(c) | RawPayload::Attachment(c) => c,
        }
    }

    pub fn hash(&self) -> String {
        content_hash(self.content())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub postal_code: String,
    pub city: String,
    pub district: Option<String>,
}

/// Aliases accept entries from older `zvg_entries` exports, which carry
/// list data only and may lack the list hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    #[serde(alias = "land_short")]
    pub jurisdiction: String,
    #[serde(default, alias = "raw_list_sha256")]
    pub list_hash: String,
    #[serde(alias = "raw_entry_sha256")]
    pub detail_hash: Option<String>,
    #[serde(default)]
    pub attachment_hashes: Vec<String>,
    #[serde(alias = "zvg_id")]
    pub listing_id: Option<u64>,
    #[serde(alias = "aktenzeichen")]
    pub case_number: Option<String>,
    #[serde(alias = "amtsgericht")]
    pub court: Option<String>,
    #[serde(alias = "objekt_lage")]
    pub location: Option<String>,
    pub address: Option<Address>,
    #[serde(alias = "verkehrswert_in_cent")]
    pub value_cents: Option<i64>,
    #[serde(default, alias = "wurde_aufgehoben")]
    pub cancelled: bool,
    #[serde(alias = "termin_as_str")]
    pub auction_date_text: Option<String>,
    #[serde(alias = "termin_as_date")]
    pub auction_at: Option<NaiveDateTime>,
    pub land_registry: Option<String>,
    pub auction_type: Option<String>,
    pub auction_location: Option<String>,
    pub description: Option<String>,
    pub creditor_info: Option<String>,
    #[serde(alias = "letzte_aktualisierung")]
    pub last_updated: Option<NaiveDateTime>,
}

impl ListingRecord {
    pub fn new(jurisdiction: &str, list_hash: &str) -> Self {
        ListingRecord {
            jurisdiction: jurisdiction.to_string(),
            list_hash: list_hash.to_string(),
            ..Default::default()
        }
    }

    /// A record is worth keeping only if something identifies it.
    pub fn is_meaningful(&self) -> bool {
        self.last_updated.is_some()
            || self.case_number.as_deref().is_some_and(|c| !c.is_empty())
            || self.listing_id.is_some()
    }
}

/// Bookkeeping for one scrape pass.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub list_hashes: Vec<String>,
    pub detail_hashes: Vec<String>,
    pub attachment_hashes: Vec<String>,
    pub started_at: NaiveDateTime,
    pub finished_at: Option<NaiveDateTime>,
    pub scraped_entries: usize,
    pub new_file_count: usize,
    pub new_listing_count: usize,
}

impl RunSummary {
    pub fn start() -> Self {
        let started_at = Local::now().naive_local();
        RunSummary {
            run_id: new_run_id(started_at),
            list_hashes: Vec::new(),
            detail_hashes: Vec::new(),
            attachment_hashes: Vec::new(),
            started_at,
            finished_at: None,
            scraped_entries: 0,
            new_file_count: 0,
            new_listing_count: 0,
        }
    }

    pub fn record_payload(&mut self, kind: PayloadKind, hash: &str, newly_written: bool) {
        if newly_written {
            self.new_file_count += 1;
        }
        let hashes = match kind {
            PayloadKind::List => &mut self.list_hashes,
            PayloadKind::Detail => &mut self.detail_hashes,
            PayloadKind::Attachment => &mut self.attachment_hashes,
        };
        hashes.push(hash.to_string());
    }

    pub fn record_listing(&mut self, newly_stored: bool) {
        self.scraped_entries += 1;
        if newly_stored {
            self.new_listing_count += 1;
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Local::now().naive_local());
    }
}

fn new_run_id(started_at: NaiveDateTime) -> String {
    format!("run-{}", started_at.format("%Y%m%dT%H%M%S%.3f"))
}
