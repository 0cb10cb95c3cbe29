use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

use crate::cache::ProcessingCache;
use crate::config::Config;
use crate::consolidate::{self, Master, PeriodSelection};
use crate::extract::tabula::TabulaExtractor;
use crate::sheets::SheetsClient;
use crate::{extract, fetch, scrape};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Idle,
    Scraping,
    Downloading,
    Extracting,
    Consolidating,
    Syncing,
    Done,
    Failed,
}

/// Point-in-time view of a run, cheap to clone out for status reporting.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ProgressSnapshot {
    pub stage: Stage,
    pub done: usize,
    pub total: usize,
    pub message: String,
    pub artifact: Option<PathBuf>,
}

pub type SharedProgress = Arc<Mutex<ProgressSnapshot>>;

fn set_stage(progress: &SharedProgress, stage: Stage, message: &str) {
    if let Ok(mut p) = progress.lock() {
        p.stage = stage;
        p.done = 0;
        p.total = 0;
        p.message = message.to_string();
    }
}

fn set_counts(progress: &SharedProgress, done: usize, total: usize) {
    if let Ok(mut p) = progress.lock() {
        p.done = done;
        p.total = total;
    }
}

pub fn http_client(config: &Config) -> Result<Client> {
    Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .cookie_store(true)
        .build()
        .context("building HTTP client")
}

/// Run the whole pipeline: scrape the listing, download new PDFs, extract
/// their tables, consolidate into a master report and optionally mirror it
/// to the cloud worksheet. Returns `Ok(None)` when no data was available.
pub async fn run_pipeline(
    config: &Config,
    selection: &PeriodSelection,
    progress: SharedProgress,
) -> Result<Option<Master>> {
    let result = run_inner(config, selection, &progress).await;

    match &result {
        Ok(Some(master)) => {
            if let Ok(mut p) = progress.lock() {
                p.stage = Stage::Done;
                p.message = "master report written".to_string();
                p.artifact = Some(master.artifact.clone());
            }
        }
        Ok(None) => {
            if let Ok(mut p) = progress.lock() {
                p.stage = Stage::Done;
                p.message = "no data to report".to_string();
            }
        }
        Err(err) => {
            if let Ok(mut p) = progress.lock() {
                p.stage = Stage::Failed;
                p.message = format!("{err:#}");
            }
        }
    }
    result
}

async fn run_inner(
    config: &Config,
    selection: &PeriodSelection,
    progress: &SharedProgress,
) -> Result<Option<Master>> {
    config.ensure_dirs()?;
    let client = http_client(config)?;
    let mut cache = ProcessingCache::load(config.cache_file());

    // 1) discover PDFs on the listing pages
    set_stage(progress, Stage::Scraping, "scanning press-release listing");
    let links = scrape::fetch_pdf_links(&client, config).await?;
    let links = scrape::filter_links(&links, &selection.months, &selection.years);
    info!(candidates = links.len(), "links after period filter");

    // 2) download what the cache does not already hold
    let pdf_dir = config.pdf_dir();
    let to_download: Vec<_> = links
        .iter()
        .filter(|l| !cache.is_downloaded(&l.filename) || !pdf_dir.join(&l.filename).exists())
        .cloned()
        .collect();
    let skipped = links.len() - to_download.len();
    if skipped > 0 {
        info!(skipped, "PDFs already downloaded");
    }

    set_stage(progress, Stage::Downloading, "downloading PDFs");
    set_counts(progress, 0, to_download.len());
    let progress_dl = progress.clone();
    let summary = fetch::download_all(&client, to_download, config, move |done, total| {
        set_counts(&progress_dl, done, total);
    })
    .await;

    for (link, path) in &summary.downloaded {
        cache.mark_downloaded(&link.filename, &link.url, path);
    }
    for (link, err) in &summary.failed {
        cache.mark_failed(&link.filename, err);
    }
    cache.save()?;
    if !summary.failed.is_empty() {
        warn!(failed = summary.failed.len(), "some downloads failed");
    }

    // 3) extract tables from every on-disk PDF in scope
    let pdf_paths: Vec<PathBuf> = links
        .iter()
        .map(|l| pdf_dir.join(&l.filename))
        .filter(|p| p.exists())
        .collect();

    set_stage(progress, Stage::Extracting, "extracting tables");
    set_counts(progress, 0, pdf_paths.len());
    if !pdf_paths.is_empty() && !TabulaExtractor::is_available(&config.tabula_program) {
        warn!(program = %config.tabula_program, "table extractor not found on PATH");
    }
    let extractor = TabulaExtractor::new(&config.tabula_program);
    let excel_dir = config.excel_dir();
    let progress_ex = progress.clone();
    let extracted = extract::process_all(
        &extractor,
        &pdf_paths,
        &excel_dir,
        &mut cache,
        move |done, total| set_counts(&progress_ex, done, total),
    )?;
    info!(
        processed = extracted.processed.len(),
        skipped = extracted.skipped,
        failed = extracted.failed.len(),
        "extraction finished"
    );

    // 4) consolidate everything into the master report
    set_stage(progress, Stage::Consolidating, "building master report");
    let master = consolidate::build_master(&excel_dir, &config.output_dir(), Some(selection))?;

    // 5) optional cloud mirror
    if let (Some(master), Some(sheets_cfg)) = (&master, &config.sheets) {
        set_stage(progress, Stage::Syncing, "mirroring to worksheet");
        let sheets = SheetsClient::from_config(client.clone(), sheets_cfg)?;
        sheets.sync(&master.dataset).await?;
    }

    Ok(master)
}
