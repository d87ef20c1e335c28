use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use tracing::{debug, warn};

use super::normalize::{cents, parse_address, CalendarLocale, DateNormalizer};
use super::policy::ListingPolicy;
use super::segment::FieldGroup;
use crate::model::ListingRecord;

/// Court-prefixed docket first, bare docket second.
static CASE_NUMBER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"[0-9]{4} K [0-9]{4}/[0-9]{4}").unwrap(),
        Regex::new(r"K [0-9]{4}/[0-9]{4}").unwrap(),
    ]
});

static LAST_UPDATED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"letzte Aktualisierung (?P<day>[0-9]{2})-(?P<month>[0-9]{2})-(?P<year>[0-9]{4}) (?P<hour>[0-9]{2}):(?P<minute>[0-9]{2})",
    )
    .unwrap()
});

static MULTI_SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}").unwrap());

/// Turns segmented field groups into listing records.
pub struct ListingBuilder<'a> {
    policy: &'a ListingPolicy,
    dates: DateNormalizer<'a>,
}

impl<'a> ListingBuilder<'a> {
    pub fn new(policy: &'a ListingPolicy, locale: &'a CalendarLocale) -> Self {
        ListingBuilder {
            policy,
            dates: DateNormalizer::new(locale),
        }
    }

    /// Build a record from its list-page group, optionally merged with the
    /// detail-page group. `None` when nothing identifies the listing.
    pub fn build(
        &self,
        jurisdiction: &str,
        list_hash: &str,
        list: &FieldGroup,
        detail: Option<&FieldGroup>,
    ) -> Option<ListingRecord> {
        let p = self.policy;
        let mut record = ListingRecord::new(jurisdiction, list_hash);
        record.listing_id = list.listing_id;

        record.case_number = list.get(p.marker_title).and_then(|cells| {
            cells
                .iter()
                .find_map(|cell| CASE_NUMBER_PATTERNS.iter().find_map(|re| re.find(cell)))
                .map(|m| m.as_str().to_string())
        });

        if let Some(cells) = list.get(p.court_title) {
            record.court = Some(cells.join(" "));
        }

        if let Some(cells) = list.get(p.location_title) {
            let location = MULTI_SPACE_RE.replace_all(&cells.join(" "), " ").into_owned();
            // a colon may also sit in a trailing note after the address
            record.address = parse_address(after_first_colon(&location))
                .or_else(|| parse_address(&location));
            if record.address.is_none() {
                warn!(location = %location, "could not parse address");
            }
            record.location = Some(location);
        }

        if let Some(first) = list.get(p.value_title).and_then(|cells| cells.first()) {
            record.value_cents = cents(first);
        }

        if let Some(cells) = list.get(p.date_title) {
            let text = cells.join(" ");
            if text.contains(p.cancelled_phrase) {
                record.cancelled = true;
            } else {
                match self.dates.parse(&text) {
                    Ok(at) => record.auction_at = Some(at),
                    Err(e) => warn!(error = %e, "could not parse auction date"),
                }
            }
            record.auction_date_text = Some(text);
        }

        record.last_updated = list
            .iter()
            .flat_map(|(_, cells)| cells)
            .find_map(|cell| last_updated(cell));

        if !record.is_meaningful() {
            debug!(fields = list.len(), "discarding group without identifying fields");
            return None;
        }

        if let Some(detail) = detail {
            self.reconcile(&mut record, detail);
        }
        Some(record)
    }

    /// Copy detail-only fields onto the record. Titles that are neither
    /// mapped, skipped, nor a restatement of the case number are logged.
    pub fn reconcile(&self, record: &mut ListingRecord, detail: &FieldGroup) {
        for (title, cells) in detail.iter() {
            if let Some(field) = self.policy.detail_field(title) {
                if let Some(first) = cells.first() {
                    field.assign(record, first.clone());
                }
                continue;
            }
            if self.policy.is_skipped(title) || is_case_number_title(title, record) {
                continue;
            }
            warn!(
                title = %title,
                case_number = ?record.case_number,
                cells = ?cells,
                "unparsed detail field"
            );
        }
    }
}

/// Detail pages repeat the docket as a row title, sometimes with extra
/// text or a space after the slash.
fn is_case_number_title(title: &str, record: &ListingRecord) -> bool {
    let Some(case_number) = record.case_number.as_deref() else {
        return false;
    };
    let title = title.replace('\u{a0}', " ");
    let before_slash = |s: &str| s.split('/').next().unwrap_or_default().to_string();

    before_slash(&title) == before_slash(case_number) || title.replace("/ ", "/").contains(case_number)
}

fn after_first_colon(text: &str) -> &str {
    text.split_once(':').map_or(text, |(_, rest)| rest).trim()
}

fn last_updated(cell: &str) -> Option<NaiveDateTime> {
    let caps = LAST_UPDATED_RE.captures(cell)?;
    let num = |name: &str| caps[name].parse::<u32>().ok();
    NaiveDate::from_ymd_opt(caps["year"].parse().ok()?, num("month")?, num("day")?)?
        .and_hms_opt(num("hour")?, num("minute")?, 0)
}
