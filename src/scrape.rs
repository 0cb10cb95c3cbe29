use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::Client;
use scraper::{Html, Selector};
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::period;

/// A press-release PDF discovered on the listing pages.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfLink {
    pub url: String,
    pub filename: String,
    pub month: Option<u32>,
    pub year: Option<i32>,
}

const MAX_RETRIES: usize = 3;
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Walk every paginated listing page and collect the PDF links, deduplicated
/// by filename. Pages without new links are common in the middle of the
/// listing, so the walk never stops before `max_pages`.
pub async fn fetch_pdf_links(client: &Client, config: &Config) -> Result<Vec<PdfLink>> {
    let selector =
        Selector::parse(r#"a[href*=".pdf"]"#).expect("Invalid CSS selector for .pdf links");
    let base = Url::parse(&config.base_site_url)?;

    let mut seen = BTreeSet::new();
    let mut links = Vec::new();

    for page in 1..=config.max_pages {
        let page_url = format!("{}{}", config.base_page_url, page);
        let html = match fetch_page(client, &page_url).await {
            Ok(html) => html,
            Err(err) => {
                warn!(page, "listing page fetch failed, skipping: {err:#}");
                continue;
            }
        };

        let mut new_on_page = 0usize;
        for href in Html::parse_document(&html)
            .select(&selector)
            .filter_map(|e| e.value().attr("href"))
        {
            let Ok(url) = base.join(href) else { continue };
            let Some(filename) = pdf_filename(&url) else { continue };
            // Only monthly vehicle-retail releases carry a month name; other
            // publications on the same listing are ignored.
            if !period::names_a_month(&filename) {
                continue;
            }
            if !seen.insert(filename.clone()) {
                continue;
            }
            let (month, year) = period::parse_from_filename(&filename);
            links.push(PdfLink {
                url: url.to_string(),
                filename,
                month,
                year,
            });
            new_on_page += 1;
        }

        debug!(page, new_links = new_on_page, "scanned listing page");
    }

    info!(total = links.len(), "collected PDF links");
    Ok(links)
}

async fn fetch_page(client: &Client, url: &str) -> Result<String> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(html) => return Ok(html),
                Err(_) if attempt < MAX_RETRIES => sleep(RETRY_DELAY).await,
                Err(e) => return Err(e.into()),
            },
            Err(_) if attempt < MAX_RETRIES => sleep(RETRY_DELAY).await,
            Ok(resp) => return Err(anyhow!("HTTP error fetching {url}: {}", resp.status())),
            Err(e) => return Err(e.into()),
        }
    }
}

fn pdf_filename(url: &Url) -> Option<String> {
    let name = url.path_segments()?.last()?;
    if name.to_ascii_lowercase().ends_with(".pdf") {
        Some(name.to_string())
    } else {
        None
    }
}

/// Keep only links matching the requested months and years. An empty filter
/// on either axis keeps everything.
pub fn filter_links(links: &[PdfLink], months: &[u32], years: &[i32]) -> Vec<PdfLink> {
    if months.is_empty() || years.is_empty() {
        return links.to_vec();
    }
    links
        .iter()
        .filter(|link| {
            link.month.map(|m| months.contains(&m)).unwrap_or(false)
                && link.year.map(|y| years.contains(&y)).unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// Distinct (year, month) pairs present in the scraped links, newest first.
pub fn available_months(links: &[PdfLink]) -> Vec<(i32, u32)> {
    let pairs: BTreeSet<(i32, u32)> = links
        .iter()
        .filter_map(|l| match (l.year, l.month) {
            (Some(y), Some(m)) => Some((y, m)),
            _ => None,
        })
        .collect();
    pairs.into_iter().rev().collect()
}
