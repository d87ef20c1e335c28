use std::io::BufRead;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use crate::identity::IdentityFactory;
use crate::model::{ListingRecord, RunSummary};

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS listings (
            key          TEXT PRIMARY KEY,
            jurisdiction TEXT NOT NULL,
            listing_id   INTEGER,
            case_number  TEXT,
            value_cents  INTEGER,
            auction_at   TEXT,
            cancelled    BOOLEAN NOT NULL DEFAULT 0,
            data         TEXT NOT NULL,
            inserted_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_listings_jurisdiction ON listings(jurisdiction);
        CREATE INDEX IF NOT EXISTS idx_listings_case ON listings(case_number);

        CREATE TABLE IF NOT EXISTS runs (
            run_id          TEXT PRIMARY KEY,
            started_at      TEXT NOT NULL,
            finished_at     TEXT,
            scraped_entries INTEGER NOT NULL,
            new_file_count  INTEGER NOT NULL,
            new_listings    INTEGER NOT NULL,
            data            TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}

// ── Listings ──

/// Insert a record under its identity key. Returns false when the key is
/// already present, which makes re-runs idempotent.
pub fn insert_listing(conn: &Connection, key: &str, record: &ListingRecord) -> Result<bool> {
    let data = serde_json::to_string(record)?;
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO listings
         (key, jurisdiction, listing_id, case_number, value_cents, auction_at, cancelled, data, inserted_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            key,
            record.jurisdiction,
            record.listing_id.and_then(|id| i64::try_from(id).ok()),
            record.case_number,
            record.value_cents,
            record.auction_at.map(|at| at.format("%Y-%m-%dT%H:%M:%S").to_string()),
            record.cancelled,
            data,
            Local::now().naive_local().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        ],
    )?;
    Ok(inserted == 1)
}

pub struct ImportCounts {
    pub read: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub invalid: usize,
}

/// Ingest JSON lines of previously exported records. The key is recomputed
/// from the record itself, so stale keys in the input are ignored.
pub fn import_jsonl(
    conn: &Connection,
    reader: impl BufRead,
    ids: &IdentityFactory,
) -> Result<ImportCounts> {
    let mut counts = ImportCounts {
        read: 0,
        inserted: 0,
        duplicates: 0,
        invalid: 0,
    };
    let tx = conn.unchecked_transaction()?;
    for (n, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", n + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        counts.read += 1;
        let record: ListingRecord = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                warn!(line = n + 1, error = %e, "skipping invalid record");
                counts.invalid += 1;
                continue;
            }
        };
        if !record.is_meaningful() {
            counts.invalid += 1;
            continue;
        }
        let key = ids.identity(&record)?;
        if insert_listing(&tx, &key, &record)? {
            counts.inserted += 1;
        } else {
            counts.duplicates += 1;
        }
    }
    tx.commit()?;
    Ok(counts)
}

// ── Runs ──

pub fn save_run(conn: &Connection, run: &RunSummary) -> Result<()> {
    let fmt = |at: chrono::NaiveDateTime| at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
    conn.execute(
        "INSERT OR REPLACE INTO runs
         (run_id, started_at, finished_at, scraped_entries, new_file_count, new_listings, data)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            run.run_id,
            fmt(run.started_at),
            run.finished_at.map(fmt),
            run.scraped_entries as i64,
            run.new_file_count as i64,
            run.new_listing_count as i64,
            serde_json::to_string(run)?,
        ],
    )?;
    Ok(())
}

// ── Stats ──

pub struct PricedListing {
    pub value_cents: i64,
    pub record: ListingRecord,
}

pub struct JurisdictionStats {
    pub jurisdiction: String,
    pub count: usize,
    pub total_cents: i64,
    pub cheapest: Option<PricedListing>,
    pub most_expensive: Option<PricedListing>,
}

pub fn jurisdiction_stats(conn: &Connection) -> Result<Vec<JurisdictionStats>> {
    let mut stmt = conn.prepare(
        "SELECT jurisdiction, COUNT(*), COALESCE(SUM(value_cents), 0)
         FROM listings
         GROUP BY jurisdiction
         ORDER BY jurisdiction",
    )?;
    let totals = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    totals
        .into_iter()
        .map(|(jurisdiction, count, total_cents)| -> Result<JurisdictionStats> {
            Ok(JurisdictionStats {
                cheapest: priced_listing(conn, &jurisdiction, "ASC")?,
                most_expensive: priced_listing(conn, &jurisdiction, "DESC")?,
                jurisdiction,
                count: count as usize,
                total_cents,
            })
        })
        .collect()
}

fn priced_listing(conn: &Connection, jurisdiction: &str, order: &str) -> Result<Option<PricedListing>> {
    let sql = format!(
        "SELECT value_cents, data FROM listings
         WHERE jurisdiction = ?1 AND value_cents IS NOT NULL
         ORDER BY value_cents {}, key
         LIMIT 1",
        order
    );
    let row: Option<(i64, String)> = conn
        .query_row(&sql, [jurisdiction], |r| Ok((r.get(0)?, r.get(1)?)))
        .optional()?;
    row.map(|(value_cents, data)| -> Result<PricedListing> {
        let record: ListingRecord = serde_json::from_str(&data).context("Corrupt listing data")?;
        Ok(PricedListing { value_cents, record })
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::KEY_LEN;

    fn listing_exists(conn: &Connection, key: &str) -> bool {
        conn.query_row("SELECT 1 FROM listings WHERE key = ?1", [key], |r| r.get::<_, i64>(0))
            .optional()
            .unwrap()
            .is_some()
    }

    fn open() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn record(jurisdiction: &str, case: &str, value: Option<i64>) -> ListingRecord {
        ListingRecord {
            case_number: Some(case.to_string()),
            value_cents: value,
            ..ListingRecord::new(jurisdiction, "listhash")
        }
    }

    #[test]
    fn insert_is_idempotent() {
        let conn = open();
        let r = record("nw", "K 0001/2022", Some(100));
        assert!(insert_listing(&conn, "abc123def456", &r).unwrap());
        assert!(!insert_listing(&conn, "abc123def456", &r).unwrap());
        assert!(listing_exists(&conn, "abc123def456"));
        assert!(!listing_exists(&conn, "000000000000"));
    }

    #[test]
    fn stats_per_jurisdiction() {
        let conn = open();
        let rows = [
            record("nw", "K 0001/2022", Some(10_000)),
            record("nw", "K 0002/2022", Some(250_000)),
            record("nw", "K 0003/2022", None),
            record("by", "K 0004/2022", Some(5_000)),
        ];
        for (i, r) in rows.iter().enumerate() {
            insert_listing(&conn, &format!("key{i:09}"), r).unwrap();
        }

        let stats = jurisdiction_stats(&conn).unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].jurisdiction, "by");
        assert_eq!(stats[0].count, 1);

        let nw = &stats[1];
        assert_eq!(nw.count, 3);
        assert_eq!(nw.total_cents, 260_000);
        let cheapest = nw.cheapest.as_ref().unwrap();
        assert_eq!(cheapest.value_cents, 10_000);
        assert_eq!(cheapest.record.case_number.as_deref(), Some("K 0001/2022"));
        assert_eq!(nw.most_expensive.as_ref().unwrap().value_cents, 250_000);
    }

    #[test]
    fn import_skips_duplicates_and_garbage() {
        let conn = open();
        let r = record("nw", "K 0001/2022", Some(100));
        let line = serde_json::to_string(&r).unwrap();
        let other = serde_json::to_string(&record("nw", "K 0002/2022", None)).unwrap();
        let input = format!("{line}\n\n{line}\nnot json\n{{\"jurisdiction\":\"nw\",\"list_hash\":\"x\"}}\n{other}\n");

        let ids = IdentityFactory::new(KEY_LEN);
        let counts = import_jsonl(&conn, input.as_bytes(), &ids).unwrap();
        assert_eq!(counts.read, 5);
        assert_eq!(counts.inserted, 2);
        assert_eq!(counts.duplicates, 1);
        assert_eq!(counts.invalid, 2);
        assert!(listing_exists(&conn, &ids.identity(&r).unwrap()));
    }

    #[test]
    fn import_reads_older_export_entries() {
        let conn = open();
        let line = r#"{"_key": "0f1e2d3c4b5a", "aktenzeichen": "0023 K 0034/2022", "amtsgericht": "Duisburg", "inserted_at": "2023-01-06T10:00:00.123456", "land_short": "nw", "letzte_aktualisierung": "2023-01-05T14:12:00", "objekt_lage": "Eigentumswohnung: Ehinger Str. 75, 47249 Duisburg", "raw_entry_sha256": null, "termin_as_date": "2023-01-23T09:30:00", "termin_as_str": "Montag, 23. Januar 2023, 09:30 Uhr", "verkehrswert_in_cent": 25600000, "wurde_aufgehoben": false, "zvg_id": 1001}"#;

        let ids = IdentityFactory::new(KEY_LEN);
        let counts = import_jsonl(&conn, format!("{line}\n").as_bytes(), &ids).unwrap();
        assert_eq!(counts.read, 1);
        assert_eq!(counts.inserted, 1);
        assert_eq!(counts.invalid, 0);

        let stats = jurisdiction_stats(&conn).unwrap();
        let r = &stats[0].cheapest.as_ref().unwrap().record;
        assert_eq!(stats[0].jurisdiction, "nw");
        assert_eq!(r.listing_id, Some(1001));
        assert_eq!(r.case_number.as_deref(), Some("0023 K 0034/2022"));
        assert_eq!(r.court.as_deref(), Some("Duisburg"));
        assert_eq!(r.value_cents, Some(25_600_000));
        assert_eq!(r.list_hash, "");
        assert_eq!(r.auction_at.unwrap().to_string(), "2023-01-23 09:30:00");
        assert_eq!(r.last_updated.unwrap().to_string(), "2023-01-05 14:12:00");
    }

    #[test]
    fn runs_are_saved() {
        let conn = open();
        let mut run = RunSummary::start();
        run.record_listing(true);
        run.finish();
        save_run(&conn, &run).unwrap();
        let (entries, data): (i64, String) = conn
            .query_row(
                "SELECT scraped_entries, data FROM runs WHERE run_id = ?1",
                [&run.run_id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(entries, 1);
        assert!(data.contains(&run.run_id));
    }

    #[test]
    fn connect_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("zvg.sqlite");
        let conn = connect(&path).unwrap();
        init_schema(&conn).unwrap();
        assert!(path.exists());
    }
}
