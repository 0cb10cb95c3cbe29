use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::consolidate::classify::{self, SectionKind};
use crate::consolidate::timepoint::{self, Timepoint};
use crate::consolidate::value::clean_value;
use crate::extract::grid::{Cell, RawGrid};

/// How many leading rows are scanned for a header row.
const HEADER_SCAN_ROWS: usize = 10;

/// Labels that mark a structural header row rather than a data row.
const STRUCTURAL_LABELS: [&str; 4] = ["OEM NAME", "CATEGORY", "SR NO", "S.NO"];

static NUMBERED_ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.?\s").expect("numbered item regex"));

/// Values for one logical row: the verbatim display label (from the last
/// writer) plus its per-timepoint integers.
#[derive(Debug, Clone, PartialEq)]
pub struct RowValues {
    pub display: String,
    pub values: BTreeMap<Timepoint, i64>,
}

/// Everything one grid contributes to the consolidated dataset. Rows are
/// keyed by the normalized (uppercased, whitespace-collapsed) label.
#[derive(Debug, Default)]
pub struct TableContribution {
    pub section: Option<SectionKind>,
    pub rows: BTreeMap<String, RowValues>,
}

impl TableContribution {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Normalized row identity: uppercased, whitespace collapsed to single
/// spaces.
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Extract one grid into (section, row → timepoint → value).
///
/// The header row is the first of the leading rows carrying at least one
/// timepoint; without one the grid contributes nothing, which is an expected
/// outcome rather than an error. Sub-item rows (indented or numbered) and
/// structural header rows are suppressed, as are rows with no parseable
/// value at all.
pub fn extract_table(grid: &RawGrid) -> TableContribution {
    let header_idx = match find_header_row(grid) {
        Some(idx) => idx,
        None => {
            debug!(sheet = %grid.sheet, "no header row with timepoints; skipping table");
            return TableContribution::default();
        }
    };
    let timepoints = timepoint::header_timepoints(&grid.rows[header_idx]);

    let section = classify::classify(grid, &grid.sheet);
    let mut rows: BTreeMap<String, RowValues> = BTreeMap::new();

    for row in grid.rows.iter().skip(header_idx + 1) {
        let label_cell = match row.first() {
            Some(cell) => cell,
            None => continue,
        };
        let raw_label = match label_cell {
            Cell::Text(s) => s.clone(),
            Cell::Number(_) => label_cell.display(),
            Cell::Empty => continue,
        };

        let normalized = normalize_label(&raw_label);
        if normalized.is_empty() || normalized == "NAN" || normalized == "NONE" {
            continue;
        }
        if STRUCTURAL_LABELS.iter().any(|kw| normalized.contains(kw)) {
            continue;
        }
        // Indentation on the original text marks a sub-item of the previous
        // main row; numbered prefixes ("1. Model") mark the same thing.
        if raw_label.starts_with(' ') || raw_label.starts_with('\t') {
            continue;
        }
        if NUMBERED_ITEM_RE.is_match(raw_label.trim()) {
            continue;
        }

        let mut values = BTreeMap::new();
        for (tp, col_idx) in &timepoints {
            if let Some(cell) = row.get(*col_idx) {
                if let Some(v) = clean_value(cell) {
                    values.insert(*tp, v);
                }
            }
        }
        if values.is_empty() {
            continue;
        }

        rows.insert(
            normalized,
            RowValues {
                display: raw_label.trim().to_string(),
                values,
            },
        );
    }

    TableContribution { section, rows }
}

fn find_header_row(grid: &RawGrid) -> Option<usize> {
    grid.rows
        .iter()
        .take(HEADER_SCAN_ROWS)
        .position(|row| !timepoint::header_timepoints(row).is_empty())
}
