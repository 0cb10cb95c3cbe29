use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Per-file processing state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRecord {
    pub downloaded: bool,
    pub processed: bool,
    pub failed: bool,
    pub url: Option<String>,
    pub pdf_path: Option<PathBuf>,
    pub workbook_path: Option<PathBuf>,
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub error: Option<String>,
    pub downloaded_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheData {
    files: BTreeMap<String, FileRecord>,
    last_updated: Option<DateTime<Utc>>,
}

/// JSON-backed record of which source files have been downloaded and
/// processed, so reruns skip finished work.
#[derive(Debug)]
pub struct ProcessingCache {
    path: PathBuf,
    data: CacheData,
}

#[derive(Debug, Default, PartialEq)]
pub struct CacheStats {
    pub total: usize,
    pub downloaded: usize,
    pub processed: usize,
    pub failed: usize,
}

impl ProcessingCache {
    /// Load the cache from `path`; a missing or corrupt file yields an empty
    /// cache rather than an error.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(data) => data,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "cache file corrupt; starting fresh");
                    CacheData::default()
                }
            },
            Err(_) => CacheData::default(),
        };
        ProcessingCache { path, data }
    }

    pub fn save(&mut self) -> Result<()> {
        self.data.last_updated = Some(Utc::now());
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating cache directory {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(&self.data).context("serializing cache")?;
        fs::write(&self.path, raw)
            .with_context(|| format!("writing cache file {}", self.path.display()))?;
        Ok(())
    }

    pub fn is_downloaded(&self, filename: &str) -> bool {
        self.data
            .files
            .get(filename)
            .map(|r| r.downloaded)
            .unwrap_or(false)
    }

    pub fn is_processed(&self, filename: &str) -> bool {
        self.data
            .files
            .get(filename)
            .map(|r| r.processed)
            .unwrap_or(false)
    }

    pub fn get(&self, filename: &str) -> Option<&FileRecord> {
        self.data.files.get(filename)
    }

    pub fn mark_downloaded(&mut self, filename: &str, url: &str, path: &Path) {
        let record = self.data.files.entry(filename.to_string()).or_default();
        record.downloaded = true;
        record.failed = false;
        record.error = None;
        record.url = Some(url.to_string());
        record.pdf_path = Some(path.to_path_buf());
        record.downloaded_at = Some(Utc::now());
    }

    pub fn mark_processed(
        &mut self,
        filename: &str,
        workbook: &Path,
        month: Option<u32>,
        year: Option<i32>,
    ) {
        let record = self.data.files.entry(filename.to_string()).or_default();
        record.processed = true;
        record.failed = false;
        record.error = None;
        record.workbook_path = Some(workbook.to_path_buf());
        record.month = month;
        record.year = year;
        record.processed_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, filename: &str, error: &str) {
        let record = self.data.files.entry(filename.to_string()).or_default();
        record.failed = true;
        record.error = Some(error.to_string());
    }

    pub fn stats(&self) -> CacheStats {
        let files = &self.data.files;
        CacheStats {
            total: files.len(),
            downloaded: files.values().filter(|r| r.downloaded).count(),
            processed: files.values().filter(|r| r.processed).count(),
            failed: files.values().filter(|r| r.failed).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trips_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let mut cache = ProcessingCache::load(&path);
        cache.mark_downloaded("a.pdf", "https://example.com/a.pdf", Path::new("data/a.pdf"));
        cache.mark_processed("a.pdf", Path::new("data/a_tables.xlsx"), Some(1), Some(2024));
        cache.mark_failed("b.pdf", "no tables");
        cache.save().unwrap();

        let reloaded = ProcessingCache::load(&path);
        assert!(reloaded.is_downloaded("a.pdf"));
        assert!(reloaded.is_processed("a.pdf"));
        assert!(!reloaded.is_downloaded("b.pdf"));
        assert_eq!(reloaded.get("a.pdf").unwrap().month, Some(1));
        assert_eq!(
            reloaded.stats(),
            CacheStats {
                total: 2,
                downloaded: 1,
                processed: 1,
                failed: 1,
            }
        );
    }

    #[test]
    fn corrupt_file_starts_fresh() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "{not json").unwrap();

        let cache = ProcessingCache::load(&path);
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn failure_flag_clears_on_success() {
        let dir = tempdir().unwrap();
        let mut cache = ProcessingCache::load(dir.path().join("cache.json"));
        cache.mark_failed("a.pdf", "timeout");
        cache.mark_downloaded("a.pdf", "https://example.com/a.pdf", Path::new("a.pdf"));
        let record = cache.get("a.pdf").unwrap();
        assert!(!record.failed);
        assert!(record.error.is_none());
    }
}
