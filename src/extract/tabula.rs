use std::path::Path;
use std::process::Command;

use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("tabula not found. Install tabula-java and put a `tabula` wrapper on PATH")]
    TabulaNotFound,

    #[error("tabula failed with exit code {code}: {stderr}")]
    TabulaFailed { code: i32, stderr: String },

    #[error("failed to parse extracted CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One table pulled out of a PDF: rows of raw string cells, untrimmed.
pub type RawTable = Vec<Vec<String>>;

/// Trait for PDF table extraction backends.
pub trait TableExtractor: Send + Sync {
    /// Extract every table from the PDF at `path`, in page order.
    fn extract_tables(&self, path: &Path) -> Result<Vec<RawTable>, ExtractError>;

    /// Name of this extraction backend (for diagnostics).
    fn backend_name(&self) -> &str;
}

/// Table extraction backend shelling out to the tabula-java CLI.
///
/// Runs `tabula --pages all --lattice --format CSV` and splits the combined
/// CSV stream on fully blank records, which tabula emits between tables.
pub struct TabulaExtractor {
    program: String,
}

impl TabulaExtractor {
    pub fn new(program: impl Into<String>) -> Self {
        TabulaExtractor {
            program: program.into(),
        }
    }

    /// Check if the tabula CLI is available on the system.
    pub fn is_available(program: &str) -> bool {
        Command::new(program)
            .arg("--version")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }
}

impl Default for TabulaExtractor {
    fn default() -> Self {
        Self::new("tabula")
    }
}

impl TableExtractor for TabulaExtractor {
    fn extract_tables(&self, path: &Path) -> Result<Vec<RawTable>, ExtractError> {
        let output = Command::new(&self.program)
            .arg("--pages")
            .arg("all")
            .arg("--lattice")
            .arg("--format")
            .arg("CSV")
            .arg(path)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ExtractError::TabulaNotFound
                } else {
                    ExtractError::Io(e)
                }
            })?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(ExtractError::TabulaFailed { code, stderr });
        }

        let tables = split_csv_tables(&output.stdout)?;
        debug!(pdf = %path.display(), tables = tables.len(), "extracted tables");
        Ok(tables)
    }

    fn backend_name(&self) -> &str {
        "tabula"
    }
}

/// Parse tabula's combined CSV output into separate tables. A record whose
/// cells are all blank marks a table boundary.
fn split_csv_tables(raw: &[u8]) -> Result<Vec<RawTable>, ExtractError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(raw);

    let mut tables = Vec::new();
    let mut current: RawTable = Vec::new();

    for record in reader.records() {
        let record = record?;
        let row: Vec<String> = record.iter().map(|s| s.to_string()).collect();
        if row.iter().all(|c| c.trim().is_empty()) {
            if !current.is_empty() {
                tables.push(std::mem::take(&mut current));
            }
            continue;
        }
        current.push(row);
    }
    if !current.is_empty() {
        tables.push(current);
    }

    Ok(tables)
}
