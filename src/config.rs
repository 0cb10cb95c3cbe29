use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Runtime configuration. Defaults mirror the production deployment; any
/// field can be overridden by a JSON file (`fadascraper.json` next to the
/// binary, or an explicit `--config` path).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root for pdfs/, excel/ and output/ subdirectories.
    pub data_dir: PathBuf,
    pub base_page_url: String,
    pub base_site_url: String,
    /// Press-release listing pages to walk.
    pub max_pages: usize,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Concurrent download workers.
    pub max_workers: usize,
    pub retry_attempts: usize,
    pub retry_delay_secs: u64,
    /// External table-extraction command (tabula-java CLI).
    pub tabula_program: String,
    pub sheets: Option<SheetsConfig>,
}

/// Settings for the optional cloud-spreadsheet mirror. The bearer token is
/// read from the named environment variable at sync time, never stored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    #[serde(default = "default_worksheet")]
    pub worksheet: String,
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

fn default_worksheet() -> String {
    "Master Data".to_string()
}

fn default_token_env() -> String {
    "SHEETS_TOKEN".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from("data"),
            base_page_url: "https://fada.in/press-release-list.php?page=".to_string(),
            base_site_url: "https://fada.in/".to_string(),
            max_pages: 10,
            request_timeout_secs: 30,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            max_workers: 5,
            retry_attempts: 3,
            retry_delay_secs: 2,
            tabula_program: "tabula".to_string(),
            sheets: None,
        }
    }
}

impl Config {
    /// Load from `path` when given, else from `fadascraper.json` if present,
    /// else pure defaults.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let candidate = match path {
            Some(p) => Some(p.to_path_buf()),
            None => {
                let default = PathBuf::from("fadascraper.json");
                default.exists().then_some(default)
            }
        };

        match candidate {
            Some(p) => {
                let raw = fs::read_to_string(&p)
                    .with_context(|| format!("reading config file {}", p.display()))?;
                let cfg: Config = serde_json::from_str(&raw)
                    .with_context(|| format!("parsing config file {}", p.display()))?;
                info!(path = %p.display(), "loaded config overrides");
                Ok(cfg)
            }
            None => Ok(Config::default()),
        }
    }

    pub fn pdf_dir(&self) -> PathBuf {
        self.data_dir.join("pdfs")
    }

    pub fn excel_dir(&self) -> PathBuf {
        self.data_dir.join("excel")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.data_dir.join("output")
    }

    pub fn cache_file(&self) -> PathBuf {
        self.data_dir.join("processed_cache.json")
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            self.data_dir.clone(),
            self.pdf_dir(),
            self.excel_dir(),
            self.output_dir(),
        ] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("creating directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_under_data_dir() {
        let cfg = Config::default();
        assert_eq!(cfg.pdf_dir(), PathBuf::from("data/pdfs"));
        assert_eq!(cfg.excel_dir(), PathBuf::from("data/excel"));
        assert_eq!(cfg.cache_file(), PathBuf::from("data/processed_cache.json"));
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let cfg: Config = serde_json::from_str(r#"{"max_workers": 2}"#).unwrap();
        assert_eq!(cfg.max_workers, 2);
        assert_eq!(cfg.retry_attempts, 3);
        assert!(cfg.base_site_url.contains("fada.in"));
    }
}
