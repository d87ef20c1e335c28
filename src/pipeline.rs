use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use tracing::{debug, error, info, warn};

use crate::db;
use crate::identity::IdentityFactory;
use crate::model::{Jurisdiction, ListingRecord, RawPayload, RunSummary};
use crate::parser::listing::ListingBuilder;
use crate::parser::normalize::CalendarLocale;
use crate::parser::policy::ListingPolicy;
use crate::parser::{is_detail_document, list_groups, parse_detail};
use crate::portal::Portal;
use crate::store::RawStore;

/// One scrape pass: every jurisdiction in form order, every listing in page
/// order. Only store failures abort the run.
pub struct Pipeline<'a> {
    portal: &'a Portal,
    store: &'a RawStore,
    conn: &'a Connection,
    policy: &'a ListingPolicy,
    locale: &'a CalendarLocale,
    keys: IdentityFactory,
    short_ids: IdentityFactory,
    print_entries: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        portal: &'a Portal,
        store: &'a RawStore,
        conn: &'a Connection,
        policy: &'a ListingPolicy,
        locale: &'a CalendarLocale,
    ) -> Self {
        Pipeline {
            portal,
            store,
            conn,
            policy,
            locale,
            keys: IdentityFactory::key(),
            short_ids: IdentityFactory::short(),
            print_entries: false,
        }
    }

    pub fn print_entries(mut self, yes: bool) -> Self {
        self.print_entries = yes;
        self
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let mut run = RunSummary::start();
        info!(run_id = %run.run_id, "starting scrape run");

        let jurisdictions = self.portal.jurisdictions().await?;
        let pb = ProgressBar::new(jurisdictions.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );

        for jurisdiction in &jurisdictions {
            pb.set_message(jurisdiction.name.clone());
            let before = run.scraped_entries;
            match self.portal.list(jurisdiction).await {
                Ok(content) => self.scrape_list(jurisdiction, content, &mut run).await?,
                Err(e) => error!(jurisdiction = %jurisdiction.code, "list fetch failed: {:#}", e),
            }
            info!(
                "{} listings in {}",
                run.scraped_entries - before,
                jurisdiction.name
            );
            pb.inc(1);
        }
        pb.finish_and_clear();

        run.finish();
        db::save_run(self.conn, &run)?;
        info!(
            run_id = %run.run_id,
            entries = run.scraped_entries,
            new_files = run.new_file_count,
            new_listings = run.new_listing_count,
            "run finished"
        );
        Ok(run)
    }

    async fn scrape_list(
        &self,
        jurisdiction: &Jurisdiction,
        content: Vec<u8>,
        run: &mut RunSummary,
    ) -> Result<()> {
        let payload = RawPayload::List(content);
        let list_hash = self.keep(&payload, run)?;
        let builder = ListingBuilder::new(self.policy, self.locale);

        let groups = list_groups(payload.content(), self.policy);
        debug!(jurisdiction = %jurisdiction.code, groups = groups.len(), "segmented list page");

        for group in &groups {
            let Some(mut record) = builder.build(&jurisdiction.code, &list_hash, group, None) else {
                continue;
            };
            if let Some(listing_id) = record.listing_id {
                self.enrich(&builder, jurisdiction, listing_id, &mut record, run)
                    .await?;
            }
            self.emit(&record, run)?;
        }
        Ok(())
    }

    /// Fetch the detail page and its documents. Fetch failures leave the
    /// record as built from the list page.
    async fn enrich(
        &self,
        builder: &ListingBuilder<'_>,
        jurisdiction: &Jurisdiction,
        listing_id: u64,
        record: &mut ListingRecord,
        run: &mut RunSummary,
    ) -> Result<()> {
        let content = match self.portal.detail(jurisdiction, listing_id).await {
            Ok(c) => c,
            Err(e) => {
                warn!(listing_id, "detail fetch failed: {:#}", e);
                return Ok(());
            }
        };
        let payload = RawPayload::Detail(content);
        record.detail_hash = Some(self.keep(&payload, run)?);

        if !is_detail_document(payload.content()) {
            warn!(listing_id, jurisdiction = %jurisdiction.code, "invalid detail page");
            return Ok(());
        }

        let page = parse_detail(payload.content(), self.policy);
        if let Some(group) = &page.group {
            builder.reconcile(record, group);
        }

        for href in &page.attachment_links {
            match self.portal.attachment(href).await {
                Ok(bytes) => {
                    let hash = self.keep(&RawPayload::Attachment(bytes), run)?;
                    record.attachment_hashes.push(hash);
                }
                Err(e) => warn!(listing_id, href = %href, "attachment fetch failed: {:#}", e),
            }
        }
        Ok(())
    }

    fn keep(&self, payload: &RawPayload, run: &mut RunSummary) -> Result<String> {
        let (hash, written) = self.store.store_payload(payload)?;
        run.record_payload(payload.kind(), &hash, written);
        Ok(hash)
    }

    fn emit(&self, record: &ListingRecord, run: &mut RunSummary) -> Result<()> {
        if self.print_entries {
            println!("{}", serde_json::to_string_pretty(record)?);
        }
        let key = self.keys.identity(record)?;
        let inserted = db::insert_listing(self.conn, &key, record)?;
        debug!(
            id = %self.short_ids.identity(record)?,
            case_number = ?record.case_number,
            inserted,
            "listing emitted"
        );
        run.record_listing(inserted);
        Ok(())
    }
}
