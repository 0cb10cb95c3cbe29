use std::collections::{BTreeMap, BTreeSet};

use crate::consolidate::classify::Section;
use crate::consolidate::table::{RowValues, TableContribution};
use crate::consolidate::timepoint::Timepoint;

/// The merged section → row → timepoint → value structure built by one
/// consolidation run.
///
/// Owned by the run that builds it: callers thread a fresh builder through
/// the file loop and hand the finished value to the renderer, so nothing
/// leaks across runs.
#[derive(Debug, Default)]
pub struct ConsolidatedDataset {
    sections: BTreeMap<Section, BTreeMap<String, RowValues>>,
    timepoints: BTreeSet<Timepoint>,
    overwrites: u64,
}

impl ConsolidatedDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one table's contribution. Values land at
    /// `[section][row][timepoint]`, unconditionally overwriting whatever an
    /// earlier file put there (last writer wins); the display label follows
    /// the last writer too.
    pub fn absorb(&mut self, section: Section, contribution: TableContribution) {
        let section_rows = self.sections.entry(section).or_default();
        for (normalized, incoming) in contribution.rows {
            let entry = section_rows.entry(normalized).or_insert_with(|| RowValues {
                display: incoming.display.clone(),
                values: BTreeMap::new(),
            });
            entry.display = incoming.display;
            for (tp, value) in incoming.values {
                if entry.values.insert(tp, value).is_some() {
                    self.overwrites += 1;
                }
                self.timepoints.insert(tp);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sections.values().all(|rows| rows.is_empty())
    }

    pub fn sections(&self) -> &BTreeMap<Section, BTreeMap<String, RowValues>> {
        &self.sections
    }

    /// The shared column axis: every timepoint observed anywhere, in the
    /// canonical order (fiscal years first, then months chronologically).
    pub fn sorted_timepoints(&self) -> Vec<Timepoint> {
        self.timepoints.iter().copied().collect()
    }

    /// Count of (section, row, timepoint) triples that were written more than
    /// once. Diagnostic only; the merged values are unaffected.
    pub fn overwrites(&self) -> u64 {
        self.overwrites
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn row_count(&self) -> usize {
        self.sections.values().map(|rows| rows.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consolidate::classify::SectionKind;
    use crate::consolidate::table::extract_table;
    use crate::extract::grid::{Cell, RawGrid};

    fn grid(rows: &[&[&str]]) -> RawGrid {
        RawGrid::new(
            "Table_1",
            rows.iter()
                .map(|r| r.iter().map(|c| Cell::from_raw(c)).collect())
                .collect(),
        )
    }

    fn absorb_grid(ds: &mut ConsolidatedDataset, g: &RawGrid) {
        let contribution = extract_table(g);
        let section = match contribution.section {
            Some(kind) => Section::Known(kind),
            None => Section::Sheet(g.sheet.clone()),
        };
        ds.absorb(section, contribution);
    }

    #[test]
    fn later_file_overwrites_same_triple() {
        let file_a = grid(&[
            &["Two Wheeler OEM", ""],
            &["OEM", "FY'23", "Jan'24"],
            &["2W", "1000", "200"],
        ]);
        let file_b = grid(&[
            &["Two Wheeler OEM", ""],
            &["OEM", "Jan'24", "Feb'24"],
            &["2W", "250", "300"],
        ]);

        let mut ds = ConsolidatedDataset::new();
        absorb_grid(&mut ds, &file_a);
        absorb_grid(&mut ds, &file_b);

        let rows = &ds.sections()[&Section::Known(SectionKind::TwoWheeler)];
        let values = &rows["2W"].values;
        assert_eq!(values[&Timepoint::FiscalYear(2023)], 1000);
        assert_eq!(values[&Timepoint::Month { year: 2024, month: 1 }], 250);
        assert_eq!(values[&Timepoint::Month { year: 2024, month: 2 }], 300);
        assert_eq!(ds.overwrites(), 1);

        let labels: Vec<String> = ds
            .sorted_timepoints()
            .iter()
            .map(|t| t.to_string())
            .collect();
        assert_eq!(labels, ["FY'23", "Jan'24", "Feb'24"]);
    }

    #[test]
    fn display_label_follows_last_writer() {
        let file_a = grid(&[
            &["Inventory Days", ""],
            &["Item", "Jan'24"],
            &["Two wheeler", "25"],
        ]);
        let file_b = grid(&[
            &["Inventory Days", ""],
            &["Item", "Feb'24"],
            &["TWO WHEELER", "30"],
        ]);

        let mut ds = ConsolidatedDataset::new();
        absorb_grid(&mut ds, &file_a);
        absorb_grid(&mut ds, &file_b);

        let rows = &ds.sections()[&Section::Known(SectionKind::InventoryDays)];
        // one logical row under the normalized key, display from file B
        assert_eq!(rows.len(), 1);
        let row = &rows["TWO WHEELER"];
        assert_eq!(row.display, "TWO WHEELER");
        assert_eq!(row.values.len(), 2);
    }

    #[test]
    fn distinct_sheet_fallbacks_stay_distinct() {
        let mut a = grid(&[&["Header", "Jan'24"], &["Metric", "5"]]);
        a.sheet = "Table_3".into();
        let mut b = grid(&[&["Header", "Jan'24"], &["Metric", "7"]]);
        b.sheet = "Table_4".into();

        let mut ds = ConsolidatedDataset::new();
        absorb_grid(&mut ds, &a);
        absorb_grid(&mut ds, &b);

        assert_eq!(ds.section_count(), 2);
        assert!(ds.sections().contains_key(&Section::Sheet("Table_3".into())));
        assert!(ds.sections().contains_key(&Section::Sheet("Table_4".into())));
    }

    #[test]
    fn same_sheet_fallbacks_merge() {
        let mut a = grid(&[&["Header", "Jan'24"], &["Metric", "5"]]);
        a.sheet = "Table_3".into();
        let mut b = grid(&[&["Header", "Feb'24"], &["Other", "7"]]);
        b.sheet = "Table_3".into();

        let mut ds = ConsolidatedDataset::new();
        absorb_grid(&mut ds, &a);
        absorb_grid(&mut ds, &b);

        assert_eq!(ds.section_count(), 1);
        let rows = &ds.sections()[&Section::Sheet("Table_3".into())];
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn empty_dataset_reports_empty() {
        let ds = ConsolidatedDataset::new();
        assert!(ds.is_empty());
        assert!(ds.sorted_timepoints().is_empty());
    }
}
