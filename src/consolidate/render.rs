use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::consolidate::classify::{Section, SectionKind};
use crate::consolidate::dataset::ConsolidatedDataset;
use crate::consolidate::table::RowValues;

/// Curated emission order for the master report. Sections not listed here
/// (sheet-keyed fallbacks) follow alphabetically by title.
const SECTION_ORDER: [SectionKind; 18] = [
    SectionKind::RetailSummary,
    SectionKind::InventoryDays,
    SectionKind::TwoWheeler,
    SectionKind::TwoWheelerEv,
    SectionKind::ThreeWheeler,
    SectionKind::ThreeWheelerEv,
    SectionKind::ThreeWheelerSub,
    SectionKind::PassengerVehicle,
    SectionKind::PassengerVehicleEv,
    SectionKind::CommercialVehicle,
    SectionKind::CommercialVehicleEv,
    SectionKind::Tractor,
    SectionKind::ConstructionEquipment,
    SectionKind::RetailStrengthUrban,
    SectionKind::RetailStrengthRural,
    SectionKind::RoadTax,
    SectionKind::EvPenetration,
    SectionKind::FuelMarketShare,
];

const SHEET_NAME: &str = "Master Data";
const LABEL_COLUMN_WIDTH: f64 = 45.0;
const DATA_COLUMN_WIDTH: f64 = 12.0;

#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    Text(String),
    Number(i64),
    Blank,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridCell {
    pub content: CellContent,
    pub bold: bool,
}

impl GridCell {
    fn text(s: impl Into<String>) -> Self {
        GridCell {
            content: CellContent::Text(s.into()),
            bold: false,
        }
    }

    fn bold_text(s: impl Into<String>) -> Self {
        GridCell {
            content: CellContent::Text(s.into()),
            bold: true,
        }
    }

    fn number(n: i64) -> Self {
        GridCell {
            content: CellContent::Number(n),
            bold: false,
        }
    }

    fn blank() -> Self {
        GridCell {
            content: CellContent::Blank,
            bold: false,
        }
    }
}

/// The fully laid-out report: rows of styled cells sharing one column axis.
#[derive(Debug)]
pub struct ReportGrid {
    pub rows: Vec<Vec<GridCell>>,
    /// Total column count: row label plus one per timepoint.
    pub columns: usize,
}

/// Lay the consolidated dataset out as a styled grid: per section a bold
/// title row, a bold header row ("Item" + every sorted timepoint), the data
/// rows, then one blank separator row. The column axis is identical for
/// every section.
pub fn layout(dataset: &ConsolidatedDataset) -> ReportGrid {
    let timepoints = dataset.sorted_timepoints();
    let columns = timepoints.len() + 1;
    let mut rows: Vec<Vec<GridCell>> = Vec::new();

    let mut emit_section = |title: &str, section_rows: &std::collections::BTreeMap<String, RowValues>| {
        rows.push(vec![GridCell::bold_text(title)]);

        let mut header = Vec::with_capacity(columns);
        header.push(GridCell::bold_text("Item"));
        header.extend(
            timepoints
                .iter()
                .map(|tp| GridCell::bold_text(tp.to_string())),
        );
        rows.push(header);

        let mut labels: Vec<&RowValues> = section_rows.values().collect();
        labels.sort_by(|a, b| {
            let a_total = is_total_label(&a.display);
            let b_total = is_total_label(&b.display);
            a_total.cmp(&b_total).then_with(|| a.display.cmp(&b.display))
        });

        for row in labels {
            let mut cells = Vec::with_capacity(columns);
            cells.push(GridCell::text(row.display.clone()));
            for tp in &timepoints {
                match row.values.get(tp) {
                    Some(v) => cells.push(GridCell::number(*v)),
                    None => cells.push(GridCell::blank()),
                }
            }
            rows.push(cells);
        }

        rows.push(vec![GridCell::blank()]);
    };

    let mut written: Vec<&Section> = Vec::new();
    for kind in SECTION_ORDER {
        let section = Section::Known(kind);
        if let Some((key, section_rows)) = dataset.sections().get_key_value(&section) {
            emit_section(kind.title(), section_rows);
            written.push(key);
        }
    }

    // Whatever the curated order missed, alphabetically by title.
    let mut remaining: Vec<(&Section, &std::collections::BTreeMap<String, RowValues>)> = dataset
        .sections()
        .iter()
        .filter(|(section, _)| !written.contains(section))
        .collect();
    remaining.sort_by_key(|(section, _)| section.title());
    for (section, section_rows) in remaining {
        emit_section(&section.title(), section_rows);
    }

    ReportGrid { rows, columns }
}

pub(crate) fn is_total_label(display: &str) -> bool {
    let upper = display.to_uppercase();
    upper == "TOTAL" || upper == "TOTALS"
}

/// Serialize a laid-out grid to an xlsx workbook at `path`. Any I/O or
/// serialization failure here is fatal to the run and propagates.
pub fn write_xlsx(grid: &ReportGrid, path: &Path) -> Result<()> {
    let mut book = umya_spreadsheet::new_file();
    let sheet = book
        .get_sheet_mut(&0)
        .context("new workbook has no first sheet")?;
    sheet.set_name(SHEET_NAME);

    for (row_idx, row) in grid.rows.iter().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            let coord = ((col_idx + 1) as u32, (row_idx + 1) as u32);
            match &cell.content {
                CellContent::Text(s) => {
                    sheet.get_cell_mut(coord).set_value(s.clone());
                }
                CellContent::Number(n) => {
                    sheet.get_cell_mut(coord).set_value_number(*n as f64);
                }
                CellContent::Blank => continue,
            }
            if cell.bold {
                sheet
                    .get_cell_mut(coord)
                    .get_style_mut()
                    .get_font_mut()
                    .set_bold(true);
            }
        }
    }

    sheet
        .get_column_dimension_mut("A")
        .set_width(LABEL_COLUMN_WIDTH);
    for col in 2..=grid.columns {
        sheet
            .get_column_dimension_mut(&column_letter(col))
            .set_width(DATA_COLUMN_WIDTH);
    }

    umya_spreadsheet::writer::xlsx::write(&book, path)
        .with_context(|| format!("writing master workbook {}", path.display()))?;
    info!(path = %path.display(), rows = grid.rows.len(), "master workbook written");
    Ok(())
}

/// 1-indexed column number to spreadsheet letters ("A", "B", .. "AA").
pub fn column_letter(mut n: usize) -> String {
    let mut out = String::new();
    while n > 0 {
        n -= 1;
        out.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consolidate::classify::SectionKind;
    use crate::consolidate::table::extract_table;
    use crate::extract::grid::{Cell, RawGrid};

    fn dataset_with(rows: &[&[&str]], sheet: &str) -> ConsolidatedDataset {
        let grid = RawGrid::new(
            sheet,
            rows.iter()
                .map(|r| r.iter().map(|c| Cell::from_raw(c)).collect())
                .collect(),
        );
        let mut ds = ConsolidatedDataset::new();
        let contribution = extract_table(&grid);
        let section = match contribution.section {
            Some(kind) => Section::Known(kind),
            None => Section::Sheet(sheet.to_string()),
        };
        ds.absorb(section, contribution);
        ds
    }

    fn cell_text(cell: &GridCell) -> String {
        match &cell.content {
            CellContent::Text(s) => s.clone(),
            CellContent::Number(n) => n.to_string(),
            CellContent::Blank => String::new(),
        }
    }

    #[test]
    fn section_layout_title_header_rows_separator() {
        let ds = dataset_with(
            &[
                &["Inventory Days", ""],
                &["Item", "FY'24", "Jan'24"],
                &["PV", "12", "14"],
                &["2W", "20", ""],
            ],
            "Table_1",
        );
        let grid = layout(&ds);

        assert_eq!(cell_text(&grid.rows[0][0]), "Inventory Days");
        assert!(grid.rows[0][0].bold);

        let header: Vec<String> = grid.rows[1].iter().map(cell_text).collect();
        assert_eq!(header, ["Item", "FY'24", "Jan'24"]);
        assert!(grid.rows[1].iter().all(|c| c.bold));

        // alphabetical data rows, then one blank separator row
        assert_eq!(cell_text(&grid.rows[2][0]), "2W");
        assert_eq!(grid.rows[2][1].content, CellContent::Number(20));
        assert_eq!(grid.rows[2][2].content, CellContent::Blank);
        assert_eq!(cell_text(&grid.rows[3][0]), "PV");
        assert_eq!(grid.rows[4][0].content, CellContent::Blank);
        assert_eq!(grid.rows.len(), 5);
    }

    #[test]
    fn total_rows_sort_last_in_their_section() {
        let ds = dataset_with(
            &[
                &["Retail Data Summary by category", ""],
                &["Category", "Jan'24"],
                &["TOTAL", "100"],
                &["2W", "60"],
                &["ZZ Motors", "40"],
            ],
            "Table_1",
        );
        let grid = layout(&ds);
        let labels: Vec<String> = grid.rows[2..5].iter().map(|r| cell_text(&r[0])).collect();
        assert_eq!(labels, ["2W", "ZZ Motors", "TOTAL"]);
    }

    #[test]
    fn curated_sections_precede_fallback_sections() {
        let mut ds = dataset_with(
            &[
                &["Inventory Days", ""],
                &["Item", "Jan'24"],
                &["PV", "12"],
            ],
            "Table_1",
        );
        // an unclassified sheet-keyed section merged into the same dataset
        let fallback = RawGrid::new(
            "Table_9",
            vec![
                vec![Cell::from_raw("Something"), Cell::from_raw("Jan'24")],
                vec![Cell::from_raw("Metric"), Cell::from_raw("7")],
            ],
        );
        let contribution = extract_table(&fallback);
        assert!(contribution.section.is_none());
        ds.absorb(Section::Sheet("Table_9".into()), contribution);

        let grid = layout(&ds);
        let titles: Vec<String> = grid
            .rows
            .iter()
            .filter(|r| r.len() == 1 && r[0].bold)
            .map(|r| cell_text(&r[0]))
            .collect();
        assert_eq!(titles, ["Inventory Days", "Sheet: Table_9"]);
        assert_eq!(ds.section_count(), 2);
    }

    #[test]
    fn shared_column_axis_across_sections() {
        let mut ds = dataset_with(
            &[
                &["Inventory Days", ""],
                &["Item", "FY'23"],
                &["PV", "12"],
            ],
            "Table_1",
        );
        let other = RawGrid::new(
            "Table_2",
            vec![
                vec![Cell::from_raw("EV Penetration"), Cell::from_raw("")],
                vec![Cell::from_raw("Item"), Cell::from_raw("Feb'24")],
                vec![Cell::from_raw("2W"), Cell::from_raw("5")],
            ],
        );
        let contribution = extract_table(&other);
        ds.absorb(Section::Known(SectionKind::EvPenetration), contribution);

        let grid = layout(&ds);
        let headers: Vec<Vec<String>> = grid
            .rows
            .iter()
            .filter(|r| r.first().map(cell_text).as_deref() == Some("Item"))
            .map(|r| r.iter().map(cell_text).collect())
            .collect();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0], headers[1]);
        assert_eq!(headers[0], ["Item", "FY'23", "Feb'24"]);
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(52), "AZ");
    }
}
