pub mod classify;
pub mod dataset;
pub mod render;
pub mod table;
pub mod timepoint;
pub mod value;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;
use tracing::{debug, info, warn};

use crate::extract::workbook;
use crate::period;
use classify::Section;
use dataset::ConsolidatedDataset;
use table::extract_table;

/// Months/years requested by the caller. Matching is best-effort filename
/// substring matching, not a strict grammar.
#[derive(Debug, Clone, Default)]
pub struct PeriodSelection {
    pub months: Vec<u32>,
    pub years: Vec<i32>,
}

impl PeriodSelection {
    pub fn is_empty(&self) -> bool {
        self.months.is_empty() || self.years.is_empty()
    }

    /// Whether a source filename names any of the selected (month, year)
    /// pairs: the month's short name plus either the 4-digit or 2-digit year.
    pub fn matches_filename(&self, filename: &str) -> bool {
        let lower = filename.to_lowercase();
        for &year in &self.years {
            let year_str = year.to_string();
            let year_short = format!("{:02}", year.rem_euclid(100));
            for &month in &self.months {
                let Some(name) = period::month_short_name(month) else {
                    continue;
                };
                if lower.contains(name) && (lower.contains(&year_str) || lower.contains(&year_short))
                {
                    return true;
                }
            }
        }
        false
    }
}

/// A finished consolidation run: the written artifact plus the dataset it
/// was rendered from (the cloud mirror consumes the latter).
#[derive(Debug)]
pub struct Master {
    pub artifact: PathBuf,
    pub dataset: ConsolidatedDataset,
}

/// Consolidate every intermediate tables workbook under `excel_dir` into one
/// master report in `output_dir`.
///
/// Returns `Ok(None)` when there is nothing to report — no workbooks, or no
/// grid yielded data. That is an expected outcome, not an error; only a
/// failure to write the final artifact propagates as `Err`.
pub fn build_master(
    excel_dir: &Path,
    output_dir: &Path,
    selection: Option<&PeriodSelection>,
) -> Result<Option<Master>> {
    let all_files = list_tables_workbooks(excel_dir)?;
    if all_files.is_empty() {
        warn!(dir = %excel_dir.display(), "no tables workbooks found");
        return Ok(None);
    }

    let files = match selection.filter(|s| !s.is_empty()) {
        Some(sel) => {
            let filtered: Vec<PathBuf> = all_files
                .iter()
                .filter(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .map(|n| sel.matches_filename(n))
                        .unwrap_or(false)
                })
                .cloned()
                .collect();
            if filtered.is_empty() {
                // Deliberate: an unmatched filter falls back to the complete
                // set instead of producing an empty report.
                warn!(
                    total = all_files.len(),
                    "no workbooks matched the selected periods; using all files"
                );
                all_files
            } else {
                info!(matched = filtered.len(), "workbooks matched selected periods");
                filtered
            }
        }
        None => all_files,
    };

    let dataset = consolidate_files(&files);
    if dataset.is_empty() {
        warn!("no data extracted from any workbook");
        return Ok(None);
    }

    info!(
        sections = dataset.section_count(),
        rows = dataset.row_count(),
        timepoints = dataset.sorted_timepoints().len(),
        overwrites = dataset.overwrites(),
        "consolidation complete"
    );

    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating output directory {}", output_dir.display()))?;
    let artifact = output_dir.join(artifact_name(selection));
    let grid = render::layout(&dataset);
    render::write_xlsx(&grid, &artifact)?;

    Ok(Some(Master { artifact, dataset }))
}

/// Merge the given workbooks, in ascending filename order, into one dataset.
/// Unreadable files are logged and skipped; they never abort the run.
pub fn consolidate_files(files: &[PathBuf]) -> ConsolidatedDataset {
    let mut ordered: Vec<&PathBuf> = files.iter().collect();
    ordered.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));

    let mut dataset = ConsolidatedDataset::new();
    for path in ordered {
        let grids = match workbook::read_grids(path) {
            Ok(grids) => grids,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable workbook");
                continue;
            }
        };
        debug!(path = %path.display(), grids = grids.len(), "processing workbook");

        for grid in grids {
            if grid.rows.len() < 2 {
                continue;
            }
            let contribution = extract_table(&grid);
            if contribution.is_empty() {
                continue;
            }
            let section = match contribution.section {
                Some(kind) => Section::Known(kind),
                None => Section::Sheet(grid.sheet.clone()),
            };
            dataset.absorb(section, contribution);
        }
    }
    dataset
}

fn list_tables_workbooks(excel_dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/*_tables.xlsx", excel_dir.display());
    let mut files: Vec<PathBuf> = glob(&pattern)
        .context("invalid glob pattern for tables workbooks")?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    Ok(files)
}

fn artifact_name(selection: Option<&PeriodSelection>) -> String {
    match selection.filter(|s| !s.is_empty()) {
        Some(sel) => {
            let min = sel.years.iter().min().expect("non-empty years");
            let max = sel.years.iter().max().expect("non-empty years");
            format!("Master_FADA_Data_{}_{}.xlsx", min, max)
        }
        None => "Master_FADA_Data.xlsx".to_string(),
    }
}
