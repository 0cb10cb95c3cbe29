use std::fmt;

use crate::extract::grid::RawGrid;

/// The closed set of report sections a table can be classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionKind {
    TwoWheeler,
    TwoWheelerEv,
    ThreeWheeler,
    ThreeWheelerEv,
    PassengerVehicle,
    PassengerVehicleEv,
    Tractor,
    CommercialVehicle,
    CommercialVehicleEv,
    ConstructionEquipment,
    RetailSummary,
    InventoryDays,
    RetailStrengthUrban,
    RetailStrengthRural,
    RoadTax,
    EvPenetration,
    FuelMarketShare,
    ThreeWheelerSub,
}

impl SectionKind {
    pub fn title(&self) -> &'static str {
        match self {
            SectionKind::TwoWheeler => "Two Wheeler (2W)",
            SectionKind::TwoWheelerEv => "Two-Wheeler EV OEM",
            SectionKind::ThreeWheeler => "Three Wheeler (3W)",
            SectionKind::ThreeWheelerEv => "Three-Wheeler EV OEM",
            SectionKind::PassengerVehicle => "Passenger Vehicle (PV)",
            SectionKind::PassengerVehicleEv => "PV EV OEM",
            SectionKind::Tractor => "Tractor (TRAC)",
            SectionKind::CommercialVehicle => "Commercial Vehicle (CV)",
            SectionKind::CommercialVehicleEv => "Commercial Vehicle EV OEM",
            SectionKind::ConstructionEquipment => "Construction Equipment",
            SectionKind::RetailSummary => "Retail Data Summary",
            SectionKind::InventoryDays => "Inventory Days",
            SectionKind::RetailStrengthUrban => "Retail Strength Urban",
            SectionKind::RetailStrengthRural => "Retail Strength Rural",
            SectionKind::RoadTax => "Road Tax Collection",
            SectionKind::EvPenetration => "EV Penetration",
            SectionKind::FuelMarketShare => "Fuel Wise Market Share",
            SectionKind::ThreeWheelerSub => "3W Subcategories",
        }
    }
}

/// Keyword patterns per section, in declaration order.
///
/// Order is load-bearing: classification returns the first section with a
/// matching pattern, so e.g. "retail strength" tables with an "urban rto"
/// marker resolve to Urban before Rural gets a look.
pub static SECTION_TABLE: &[(SectionKind, &[&str])] = &[
    (
        SectionKind::TwoWheeler,
        &["two wheeler oem", "two-wheeler oem", "2w oem"],
    ),
    (
        SectionKind::TwoWheelerEv,
        &["two wheeler ev", "two-wheeler ev", "electric two-wheeler", "2w ev"],
    ),
    (
        SectionKind::ThreeWheeler,
        &["three wheeler oem", "three-wheeler oem", "3w oem"],
    ),
    (
        SectionKind::ThreeWheelerEv,
        &["three wheeler ev", "three-wheeler ev", "electric three-wheeler", "3w ev"],
    ),
    (
        SectionKind::PassengerVehicle,
        &["passenger vehicle oem", "pv oem", "passenger car"],
    ),
    (
        SectionKind::PassengerVehicleEv,
        &["pv ev", "passenger vehicle ev", "electric passenger"],
    ),
    (SectionKind::Tractor, &["tractor oem", "tractor"]),
    (
        SectionKind::CommercialVehicle,
        &["commercial vehicle oem", "cv oem"],
    ),
    (
        SectionKind::CommercialVehicleEv,
        &["commercial vehicle ev", "cv ev", "electric commercial"],
    ),
    (
        SectionKind::ConstructionEquipment,
        &["construction equipment", "ce oem"],
    ),
    (SectionKind::RetailSummary, &["category", "retail data"]),
    (SectionKind::InventoryDays, &["inventory days", "inventory"]),
    (
        SectionKind::RetailStrengthUrban,
        &["retail strength", "urban rto"],
    ),
    (
        SectionKind::RetailStrengthRural,
        &["retail strength", "rural rto"],
    ),
    (
        SectionKind::RoadTax,
        &["road tax", "motor vehicle road tax"],
    ),
    (
        SectionKind::EvPenetration,
        &["ev penetration", "electric vehicle penetration"],
    ),
    (
        SectionKind::FuelMarketShare,
        &["fuel wise", "fuel type", "market share"],
    ),
    (
        SectionKind::ThreeWheelerSub,
        &["three-wheeler (passenger)", "three-wheeler (goods)", "e-rickshaw"],
    ),
];

/// Identity of a section in the consolidated dataset: a classified kind, or
/// an unclassified bucket keyed by the sheet the grid came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    Known(SectionKind),
    Sheet(String),
}

impl Section {
    pub fn title(&self) -> String {
        match self {
            Section::Known(kind) => kind.title().to_string(),
            Section::Sheet(name) => format!("Sheet: {}", name),
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title())
    }
}

/// Classify a raw grid by substring-matching its sheet label plus the text of
/// its first five rows against the section keyword table. First match wins;
/// no match means the caller falls back to a sheet-keyed section.
pub fn classify(grid: &RawGrid, sheet_label: &str) -> Option<SectionKind> {
    let mut corpus = sheet_label.to_lowercase();
    for row in grid.rows.iter().take(5) {
        for cell in row {
            corpus.push(' ');
            corpus.push_str(&cell.display().to_lowercase());
        }
    }

    for (kind, patterns) in SECTION_TABLE {
        if patterns.iter().any(|p| corpus.contains(p)) {
            return Some(*kind);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::grid::Cell;

    fn grid_of(lines: &[&str]) -> RawGrid {
        RawGrid::new(
            "Table_1",
            lines
                .iter()
                .map(|l| vec![Cell::Text((*l).to_string())])
                .collect(),
        )
    }

    #[test]
    fn classifies_from_row_text() {
        let grid = grid_of(&["Two Wheeler OEM Retail", "OEM", "Hero"]);
        assert_eq!(classify(&grid, ""), Some(SectionKind::TwoWheeler));
    }

    #[test]
    fn classifies_from_sheet_label() {
        let grid = grid_of(&["OEM", "Hero"]);
        assert_eq!(
            classify(&grid, "EV Penetration"),
            Some(SectionKind::EvPenetration)
        );
    }

    #[test]
    fn first_declared_section_wins_ties() {
        // a corpus carrying both markers resolves to the earlier declaration
        let grid = grid_of(&["Two Wheeler OEM and Two Wheeler EV data"]);
        assert_eq!(classify(&grid, ""), Some(SectionKind::TwoWheeler));
    }

    #[test]
    fn category_header_outranks_inventory_marker() {
        // "category" belongs to the summary section, declared earlier than
        // the inventory patterns, so it wins even under an inventory title
        let grid = grid_of(&["Inventory Days", "Category"]);
        assert_eq!(classify(&grid, ""), Some(SectionKind::RetailSummary));
    }

    #[test]
    fn only_first_five_rows_are_searched() {
        let mut lines = vec!["x"; 5];
        lines.push("inventory days");
        let grid = grid_of(&lines);
        assert_eq!(classify(&grid, ""), None);
    }

    #[test]
    fn unknown_content_is_unclassified() {
        let grid = grid_of(&["Something unrelated", "entirely"]);
        assert_eq!(classify(&grid, "Table_3"), None);
    }

    #[test]
    fn section_titles_are_stable() {
        assert_eq!(
            Section::Known(SectionKind::RetailSummary).title(),
            "Retail Data Summary"
        );
        assert_eq!(Section::Sheet("Table_7".into()).title(), "Sheet: Table_7");
    }
}
