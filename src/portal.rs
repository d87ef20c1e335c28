use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client, RequestBuilder, Url};
use tracing::{debug, info, warn};

use crate::model::Jurisdiction;
use crate::parser::html::{decode_latin1, parse_jurisdictions};
use crate::settings::Settings;

const BASE_BACKOFF_MS: u64 = 300;
const RETRY_STATUSES: [u16; 3] = [500, 502, 504];

/// Portal URLs derived from a base URL without trailing slash.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub index: String,
    pub form: String,
    pub show_details: String,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/');
        Endpoints {
            index: format!("{base_url}/index.php"),
            form: format!("{base_url}/index.php?button=Termine%20suchen"),
            show_details: format!("{base_url}/index.php?button=showZvg"),
        }
    }

    pub fn detail_url(&self, listing_id: u64, jurisdiction_code: &str) -> String {
        format!(
            "{}&zvg_id={}&land_abk={}",
            self.show_details, listing_id, jurisdiction_code
        )
    }

    pub fn search_referer(&self) -> String {
        format!("{}?button=Suchen", self.index)
    }
}

/// Search form body for "all courts of one jurisdiction".
fn search_form(jurisdiction_code: &str) -> Vec<(&'static str, String)> {
    let mut form: Vec<(&'static str, String)> = [
        ("ger_name", "-- Alle Amtsgerichte --"),
        ("order_by", "2"),
        ("ger_id", "0"),
    ]
    .into_iter()
    .map(|(k, v)| (k, v.to_string()))
    .collect();
    form.push(("land_abk", jurisdiction_code.to_string()));
    for key in [
        "az1", "az2", "az3", "az4", "art", "obj", "str", "hnr", "plz", "ort", "ortsteil", "vtermin",
        "btermin",
    ] {
        form.push((key, String::new()));
    }
    form
}

/// Blocking-per-call client for the auction portal. Requests are issued one
/// at a time by the pipeline.
pub struct Portal {
    client: Client,
    endpoints: Endpoints,
    index_url: Url,
    retries: u32,
}

impl Portal {
    pub fn new(settings: &Settings) -> Result<Self> {
        let endpoints = Endpoints::new(&settings.base_url);
        let index_url = Url::parse(&endpoints.index)
            .with_context(|| format!("Invalid base URL {}", settings.base_url))?;
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        debug!(user_agent = %settings.user_agent, "portal client ready");
        Ok(Portal {
            client,
            endpoints,
            index_url,
            retries: settings.retries,
        })
    }

    pub async fn jurisdictions(&self) -> Result<Vec<Jurisdiction>> {
        let page = self
            .fetch("search form", || self.client.get(&self.endpoints.form))
            .await?;
        let found = parse_jurisdictions(&decode_latin1(&page));
        info!("Found {} jurisdictions", found.len());
        Ok(found)
    }

    pub async fn list(&self, jurisdiction: &Jurisdiction) -> Result<Vec<u8>> {
        let form = search_form(&jurisdiction.code);
        self.fetch(&format!("list page {}", jurisdiction.code), || {
            self.client
                .post(&self.endpoints.index)
                .query(&[("button", "Suchen"), ("all", "1")])
                .form(&form)
        })
        .await
    }

    pub async fn detail(&self, jurisdiction: &Jurisdiction, listing_id: u64) -> Result<Vec<u8>> {
        let url = self.endpoints.detail_url(listing_id, &jurisdiction.code);
        let referer = self.endpoints.search_referer();
        self.fetch(&format!("detail page {listing_id}"), || {
            self.client.get(&url).header(header::REFERER, &referer)
        })
        .await
    }

    pub async fn attachment(&self, href: &str) -> Result<Vec<u8>> {
        let url = self.resolve(href)?;
        self.fetch(&format!("attachment {url}"), || self.client.get(url.clone()))
            .await
    }

    /// Attachment links on detail pages are relative to `index.php`.
    pub fn resolve(&self, href: &str) -> Result<Url> {
        self.index_url
            .join(href)
            .with_context(|| format!("Invalid attachment link {href}"))
    }

    /// Send with exponential backoff on connection failures and 500/502/504.
    async fn fetch(&self, what: &str, request: impl Fn() -> RequestBuilder) -> Result<Vec<u8>> {
        let mut attempt = 0;
        loop {
            let outcome = request().send().await;
            let retryable = match &outcome {
                Ok(resp) => RETRY_STATUSES.contains(&resp.status().as_u16()),
                Err(e) => e.is_connect() || e.is_timeout(),
            };

            if !retryable || attempt >= self.retries {
                let response = outcome
                    .with_context(|| format!("Failed to fetch {what}"))?
                    .error_for_status()
                    .with_context(|| format!("Bad status for {what}"))?;
                let body = response
                    .bytes()
                    .await
                    .with_context(|| format!("Failed to read {what}"))?;
                return Ok(body.to_vec());
            }

            let backoff = backoff(attempt);
            warn!(
                "Retrying {} (attempt {}/{}), backing off {:.1}s",
                what,
                attempt + 1,
                self.retries,
                backoff.as_secs_f64()
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(BASE_BACKOFF_MS.saturating_mul(2u64.saturating_pow(attempt)))
}
