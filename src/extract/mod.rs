pub mod grid;
pub mod tabula;
pub mod workbook;

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

use crate::cache::ProcessingCache;
use crate::period;
use self::tabula::{RawTable, TableExtractor};

#[derive(Debug, Default)]
pub struct ProcessSummary {
    pub processed: Vec<PathBuf>,
    pub skipped: usize,
    pub failed: Vec<(String, String)>,
}

/// Extract the tables of one PDF into an intermediate `{stem}_tables.xlsx`
/// workbook under `excel_dir`. Returns the workbook path.
pub fn process_pdf(
    extractor: &dyn TableExtractor,
    pdf_path: &Path,
    excel_dir: &Path,
) -> Result<PathBuf> {
    let stem = pdf_path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("PDF path has no usable filename: {}", pdf_path.display()))?;
    let workbook_path = excel_dir.join(format!("{stem}_tables.xlsx"));

    let tables = extractor
        .extract_tables(pdf_path)
        .with_context(|| format!("extracting tables from {}", pdf_path.display()))?;
    let tables: Vec<RawTable> = tables.into_iter().filter_map(clean_table).collect();
    if tables.is_empty() {
        return Err(anyhow!("no tables found in {}", pdf_path.display()));
    }

    std::fs::create_dir_all(excel_dir)
        .with_context(|| format!("creating directory {}", excel_dir.display()))?;
    workbook::write_workbook(&tables, &workbook_path)?;
    Ok(workbook_path)
}

/// Drop rows that are entirely blank and columns whose header is a
/// percentage (growth ratios are derived data, not counts). Returns `None`
/// when nothing useful remains.
fn clean_table(table: RawTable) -> Option<RawTable> {
    let mut table: RawTable = table
        .into_iter()
        .filter(|row| !row.iter().all(|c| c.trim().is_empty()))
        .collect();
    let header = table.first()?.clone();

    let keep: Vec<bool> = header.iter().map(|h| !h.contains('%')).collect();
    if keep.iter().any(|k| !k) {
        for row in &mut table {
            let mut idx = 0;
            row.retain(|_| {
                let kept = keep.get(idx).copied().unwrap_or(true);
                idx += 1;
                kept
            });
        }
    }

    let has_data = table.len() > 1;
    has_data.then_some(table)
}

/// Process every PDF in `pdf_paths`, skipping files the cache already marks
/// processed when their workbook still exists on disk. `on_progress` receives
/// (completed, total).
pub fn process_all<F>(
    extractor: &dyn TableExtractor,
    pdf_paths: &[PathBuf],
    excel_dir: &Path,
    cache: &mut ProcessingCache,
    on_progress: F,
) -> Result<ProcessSummary>
where
    F: Fn(usize, usize),
{
    let total = pdf_paths.len();
    let mut summary = ProcessSummary::default();

    for (done, pdf_path) in pdf_paths.iter().enumerate() {
        let filename = pdf_path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let cached_workbook = cache
            .get(&filename)
            .filter(|r| r.processed)
            .and_then(|r| r.workbook_path.clone());
        if let Some(workbook) = cached_workbook {
            if workbook.exists() {
                summary.skipped += 1;
                on_progress(done + 1, total);
                continue;
            }
        }

        info!(name = %filename, "extracting tables");
        match process_pdf(extractor, pdf_path, excel_dir) {
            Ok(workbook) => {
                let (month, year) = period::parse_from_filename(&filename);
                cache.mark_processed(&filename, &workbook, month, year);
                summary.processed.push(workbook);
            }
            Err(err) => {
                warn!(name = %filename, "extraction failed: {err:#}");
                cache.mark_failed(&filename, &format!("{err:#}"));
                summary.failed.push((filename, err.to_string()));
            }
        }
        on_progress(done + 1, total);
    }

    cache.save()?;
    Ok(summary)
}
