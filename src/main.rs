mod db;
mod error;
mod identity;
mod model;
mod parser;
mod pipeline;
mod portal;
mod settings;
mod store;

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use identity::IdentityFactory;
use parser::normalize::GERMAN;
use parser::policy::ZVG_PORTAL;
use portal::{Endpoints, Portal};
use settings::Settings;
use store::RawStore;

#[derive(Parser)]
#[command(name = "zvg_scraper", about = "Foreclosure auction scraper for zvg-portal.de")]
struct Cli {
    /// Log at debug level regardless of RUST_LOG
    #[arg(long, global = true)]
    debug: bool,
    /// Portal base URL (env: ZVG_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Directory of the content-addressed payload store
    #[arg(long, global = true)]
    raw_data_directory: Option<PathBuf>,
    /// SQLite file receiving listings and runs
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,
    #[arg(long, global = true)]
    user_agent: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape every jurisdiction, store raw pages and new listings
    Run {
        /// Print every listing as JSON while scraping
        #[arg(long)]
        print_entries: bool,
    },
    /// Listing count, value sum, cheapest and most expensive per jurisdiction
    Stats,
    /// Load listings from a JSON-lines export
    Import {
        file: PathBuf,
    },
}

impl Cli {
    fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings = Settings::load()?;
        if let Some(url) = &self.base_url {
            settings.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(dir) = &self.raw_data_directory {
            settings.raw_data_directory = dir.clone();
        }
        if let Some(path) = &self.db_path {
            settings.db_path = path.clone();
        }
        if let Some(agent) = &self.user_agent {
            settings.user_agent = agent.clone();
        }
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let settings = cli.settings()?;

    let result = match cli.command {
        Commands::Run { print_entries } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let store = RawStore::open(&settings.raw_data_directory)?;
            tracing::info!(root = %store.root().display(), "payload store ready");
            let portal = Portal::new(&settings)?;

            let run = pipeline::Pipeline::new(&portal, &store, &conn, &ZVG_PORTAL, &GERMAN)
                .print_entries(print_entries)
                .run()
                .await?;
            println!("{}", serde_json::to_string_pretty(&run)?);
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let stats = db::jurisdiction_stats(&conn)?;
            if stats.is_empty() {
                println!("No listings stored. Run 'run' or 'import' first.");
                return Ok(());
            }

            let endpoints = Endpoints::new(&settings.base_url);
            for s in &stats {
                println!(
                    "{} Zwangsversteigerungen in {}, Verkehrswertsumme: {}",
                    s.count,
                    s.jurisdiction,
                    GERMAN.format_euro(s.total_cents)
                );
                for priced in [&s.cheapest, &s.most_expensive].into_iter().flatten() {
                    println!("{}", serde_json::to_string_pretty(&priced.record)?);
                    match priced.record.listing_id {
                        Some(id) => println!("{}", endpoints.detail_url(id, &s.jurisdiction)),
                        None => println!("({}, no detail page)", GERMAN.format_euro(priced.value_cents)),
                    }
                }
            }
            Ok(())
        }
        Commands::Import { file } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let reader = BufReader::new(
                File::open(&file).with_context(|| format!("Failed to open {}", file.display()))?,
            );
            let counts = db::import_jsonl(&conn, reader, &IdentityFactory::key())?;
            println!(
                "Read {} listings: {} new, {} already stored, {} invalid.",
                counts.read, counts.inserted, counts.duplicates, counts.invalid
            );
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "zvg_scraper",
            "run",
            "--print-entries",
            "--base-url",
            "http://localhost:9000/",
            "--db-path",
            "/tmp/x.sqlite",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Run { print_entries: true }));
        let settings = cli.settings().unwrap();
        assert_eq!(settings.base_url, "http://localhost:9000");
        assert_eq!(settings.db_path, PathBuf::from("/tmp/x.sqlite"));
    }

    #[test]
    fn import_needs_a_file() {
        assert!(Cli::try_parse_from(["zvg_scraper", "import"]).is_err());
        let cli = Cli::try_parse_from(["zvg_scraper", "--debug", "import", "old.jsonl"]).unwrap();
        assert!(cli.debug);
        assert!(matches!(cli.command, Commands::Import { ref file } if file == &PathBuf::from("old.jsonl")));
    }

    #[test]
    fn durations() {
        use std::time::Duration;
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }
}
