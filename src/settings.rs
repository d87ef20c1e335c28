use std::path::PathBuf;

use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment};
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "https://www.zvg-portal.de";
/// Upper bound on retries per request; backoff doubles with each attempt.
pub const MAX_RETRIES: u32 = 10;

/// Runtime settings. Defaults, then `ZVG_*` environment variables, then
/// command-line flags.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub base_url: String,
    pub raw_data_directory: PathBuf,
    pub db_path: PathBuf,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub retries: u32,
}

impl Settings {
    pub fn load() -> Result<Self> {
        let config = defaults()?
            .add_source(Environment::with_prefix("ZVG"))
            .build()
            .context("Failed to read ZVG_* environment")?;
        Self::from_config(config)
    }

    fn from_config(config: Config) -> Result<Self> {
        let mut settings: Settings = config
            .try_deserialize()
            .context("Invalid scraper settings")?;
        settings.base_url = settings.base_url.trim_end_matches('/').to_string();
        if settings.retries > MAX_RETRIES {
            warn!(requested = settings.retries, "capping retries at {}", MAX_RETRIES);
            settings.retries = MAX_RETRIES;
        }
        Ok(settings)
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>> {
    Ok(Config::builder()
        .set_default("base_url", DEFAULT_BASE_URL)?
        .set_default("raw_data_directory", "raw")?
        .set_default("db_path", "data/zvg.sqlite")?
        .set_default("user_agent", default_user_agent())?
        .set_default("timeout_secs", 5_i64)?
        .set_default("retries", 3_i64)?)
}

fn default_user_agent() -> String {
    format!(
        "ZvgPortalScraper/{} (reqwest) {} ({})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_deserialize() {
        let s = Settings::from_config(defaults().unwrap().build().unwrap()).unwrap();
        assert_eq!(s.base_url, DEFAULT_BASE_URL);
        assert_eq!(s.raw_data_directory, PathBuf::from("raw"));
        assert_eq!(s.timeout_secs, 5);
        assert_eq!(s.retries, 3);
        assert!(s.user_agent.starts_with("ZvgPortalScraper/"));
    }

    #[test]
    fn trailing_slash_removed() {
        let config = defaults()
            .unwrap()
            .set_override("base_url", "http://localhost:8080/")
            .unwrap()
            .build()
            .unwrap();
        let s = Settings::from_config(config).unwrap();
        assert_eq!(s.base_url, "http://localhost:8080");
    }

    #[test]
    fn retries_are_capped() {
        let config = defaults()
            .unwrap()
            .set_override("retries", 100_i64)
            .unwrap()
            .build()
            .unwrap();
        let s = Settings::from_config(config).unwrap();
        assert_eq!(s.retries, MAX_RETRIES);
    }
}
