use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::Client;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::scrape::PdfLink;

/// Responses smaller than this are almost certainly an error page, not a PDF.
const MIN_PDF_BYTES: usize = 1000;

#[derive(Debug, Default)]
pub struct DownloadSummary {
    pub downloaded: Vec<(PdfLink, PathBuf)>,
    pub failed: Vec<(PdfLink, String)>,
}

/// Download a single PDF, retrying transient failures. Returns the saved path.
pub async fn download_pdf(
    client: &Client,
    link: &PdfLink,
    dest_dir: &Path,
    attempts: usize,
    retry_delay: Duration,
) -> Result<PathBuf> {
    let dest_path = dest_dir.join(&link.filename);
    tokio::fs::create_dir_all(dest_dir).await?;

    let mut attempt = 0;
    loop {
        attempt += 1;
        match try_download(client, &link.url, &dest_path).await {
            Ok(()) => return Ok(dest_path),
            Err(_) if attempt < attempts => {
                warn!(name = %link.filename, attempt, "download failed; retrying");
                // linear backoff: 1x, 2x, 3x the base delay
                sleep(retry_delay * attempt as u32).await;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn try_download(client: &Client, url: &str, dest_path: &Path) -> Result<()> {
    let resp = client.get(url).send().await?.error_for_status()?;
    let bytes = resp.bytes().await?;
    if bytes.len() < MIN_PDF_BYTES {
        return Err(anyhow!(
            "response too small ({} bytes), likely not a PDF",
            bytes.len()
        ));
    }
    tokio::fs::write(dest_path, &bytes).await?;
    Ok(())
}

/// Download all links concurrently, bounded by `max_workers`. `on_progress`
/// receives (completed, total) after each finished download.
pub async fn download_all<F>(
    client: &Client,
    links: Vec<PdfLink>,
    config: &Config,
    on_progress: F,
) -> DownloadSummary
where
    F: Fn(usize, usize) + Send + Sync + 'static,
{
    let total = links.len();
    let dest_dir = config.pdf_dir();
    let attempts = config.retry_attempts.max(1);
    let retry_delay = Duration::from_secs(config.retry_delay_secs);

    let (tx, mut rx) = mpsc::channel::<Result<(PdfLink, PathBuf), (PdfLink, String)>>(100);
    let sem = Arc::new(Semaphore::new(config.max_workers.max(1)));
    let mut handles = Vec::with_capacity(total);

    for link in links {
        let client = client.clone();
        let dest_dir = dest_dir.clone();
        let tx = tx.clone();
        let sem = sem.clone();

        handles.push(tokio::spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return;
            };
            info!(name = %link.filename, "downloading");
            let start = Instant::now();
            match download_pdf(&client, &link, &dest_dir, attempts, retry_delay).await {
                Ok(path) => {
                    info!(name = %link.filename, elapsed = ?start.elapsed(), "downloaded");
                    let _ = tx.send(Ok((link, path))).await;
                }
                Err(err) => {
                    error!(name = %link.filename, "download failed: {err:#}");
                    let _ = tx.send(Err((link, err.to_string()))).await;
                }
            }
        }));
    }
    // drop the original sender so recv() ends once all downloads complete
    drop(tx);

    let mut summary = DownloadSummary::default();
    while let Some(msg) = rx.recv().await {
        match msg {
            Ok(done) => summary.downloaded.push(done),
            Err(failed) => summary.failed.push(failed),
        }
        on_progress(summary.downloaded.len() + summary.failed.len(), total);
    }

    for h in handles {
        let _ = h.await;
    }
    summary
}
