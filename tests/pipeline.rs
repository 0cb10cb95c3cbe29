use std::path::Path;

use fadascraper::consolidate::classify::{Section, SectionKind};
use fadascraper::consolidate::render::{self, CellContent};
use fadascraper::consolidate::timepoint::Timepoint;
use fadascraper::consolidate::{build_master, PeriodSelection};
use fadascraper::extract::workbook::write_workbook;

type Table = Vec<Vec<String>>;

fn table(rows: &[&[&str]]) -> Table {
    rows.iter()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect()
}

fn write_tables(dir: &Path, filename: &str, tables: &[Table]) {
    std::fs::create_dir_all(dir).unwrap();
    write_workbook(tables, &dir.join(filename)).unwrap();
}

fn two_wheeler_table(fy23: &str, extra_header: &str, extra_value: &str) -> Table {
    table(&[
        &["Two Wheeler OEM Retail Comparison", "", ""],
        &["OEM Name", "FY'23", extra_header],
        &["Hero MotoCorp", fy23, extra_value],
        &["TOTAL", fy23, extra_value],
    ])
}

#[test]
fn later_file_wins_and_timepoints_share_one_axis() {
    let tmp = tempfile::tempdir().unwrap();
    let excel = tmp.path().join("excel");
    let out = tmp.path().join("output");

    // Sorted filename order: Feb before Jan, so the Jan file is merged last
    // and its FY'23 figure must win the conflict.
    write_tables(
        &excel,
        "FADA-Feb-2024_tables.xlsx",
        &[two_wheeler_table("999", "FEB'24", "12")],
    );
    write_tables(
        &excel,
        "FADA-Jan-2024_tables.xlsx",
        &[two_wheeler_table("100", "JAN'24", "10")],
    );

    let master = build_master(&excel, &out, None).unwrap().expect("data");
    assert!(master.artifact.ends_with("Master_FADA_Data.xlsx"));
    assert!(master.artifact.exists());

    assert_eq!(
        master.dataset.sorted_timepoints(),
        vec![
            Timepoint::FiscalYear(2023),
            Timepoint::Month {
                year: 2024,
                month: 1
            },
            Timepoint::Month {
                year: 2024,
                month: 2
            },
        ]
    );

    let section = Section::Known(SectionKind::TwoWheeler);
    let rows = master.dataset.sections().get(&section).expect("section");
    let hero = rows.get("HERO MOTOCORP").expect("row");
    assert_eq!(hero.values.get(&Timepoint::FiscalYear(2023)), Some(&100));
    assert_eq!(
        hero.values
            .get(&Timepoint::Month {
                year: 2024,
                month: 1
            }),
        Some(&10)
    );
    assert_eq!(
        hero.values
            .get(&Timepoint::Month {
                year: 2024,
                month: 2
            }),
        Some(&12)
    );
    assert_eq!(master.dataset.overwrites(), 2);
}

#[test]
fn rendered_header_follows_timepoint_order_and_totals_sink() {
    let tmp = tempfile::tempdir().unwrap();
    let excel = tmp.path().join("excel");

    write_tables(
        &excel,
        "FADA-Jan-2024_tables.xlsx",
        &[table(&[
            &["Two Wheeler OEM Retail Comparison", "", "", ""],
            &["OEM Name", "JAN'24", "FY'23", "FEB'24"],
            &["TOTAL", "30", "300", "33"],
            &["Bajaj", "20", "200", "22"],
            &["Hero MotoCorp", "10", "100", "11"],
        ])],
    );

    let master = build_master(&excel, &tmp.path().join("out"), None)
        .unwrap()
        .expect("data");
    let grid = render::layout(&master.dataset);

    let header: Vec<String> = grid.rows[1]
        .iter()
        .map(|c| match &c.content {
            CellContent::Text(s) => s.clone(),
            other => panic!("unexpected header cell {other:?}"),
        })
        .collect();
    assert_eq!(header, vec!["Item", "FY'23", "Jan'24", "Feb'24"]);

    let labels: Vec<String> = grid.rows[2..5]
        .iter()
        .map(|row| match &row[0].content {
            CellContent::Text(s) => s.clone(),
            other => panic!("unexpected label cell {other:?}"),
        })
        .collect();
    assert_eq!(labels, vec!["Bajaj", "Hero MotoCorp", "TOTAL"]);
}

#[test]
fn unclassified_table_lands_in_a_sheet_section() {
    let tmp = tempfile::tempdir().unwrap();
    let excel = tmp.path().join("excel");

    write_tables(
        &excel,
        "FADA-Jan-2024_tables.xlsx",
        &[table(&[
            &["Mystery Numbers", ""],
            &["Item Name", "FY'23"],
            &["Widgets", "42"],
        ])],
    );

    let master = build_master(&excel, &tmp.path().join("out"), None)
        .unwrap()
        .expect("data");
    let section = Section::Sheet("Table_1".to_string());
    assert!(master.dataset.sections().contains_key(&section));

    let grid = render::layout(&master.dataset);
    let has_title = grid.rows.iter().any(|row| {
        matches!(&row[0].content, CellContent::Text(s) if s == "Sheet: Table_1") && row[0].bold
    });
    assert!(has_title);
}

#[test]
fn empty_excel_dir_yields_no_master() {
    let tmp = tempfile::tempdir().unwrap();
    let excel = tmp.path().join("excel");
    std::fs::create_dir_all(&excel).unwrap();

    let master = build_master(&excel, &tmp.path().join("out"), None).unwrap();
    assert!(master.is_none());
}

#[test]
fn unmatched_period_filter_falls_back_to_all_files() {
    let tmp = tempfile::tempdir().unwrap();
    let excel = tmp.path().join("excel");

    write_tables(
        &excel,
        "FADA-Jan-2024_tables.xlsx",
        &[two_wheeler_table("100", "JAN'24", "10")],
    );

    let selection = PeriodSelection {
        months: vec![6],
        years: vec![1999],
    };
    let master = build_master(&excel, &tmp.path().join("out"), Some(&selection))
        .unwrap()
        .expect("fallback should still produce a report");
    assert!(master.artifact.ends_with("Master_FADA_Data_1999_1999.xlsx"));
    assert!(!master.dataset.is_empty());
}

#[test]
fn matching_period_filter_restricts_the_input_set() {
    let tmp = tempfile::tempdir().unwrap();
    let excel = tmp.path().join("excel");

    write_tables(
        &excel,
        "FADA-Jan-2024_tables.xlsx",
        &[two_wheeler_table("100", "JAN'24", "10")],
    );
    write_tables(
        &excel,
        "FADA-Feb-2024_tables.xlsx",
        &[two_wheeler_table("999", "FEB'24", "12")],
    );

    let selection = PeriodSelection {
        months: vec![1],
        years: vec![2024],
    };
    let master = build_master(&excel, &tmp.path().join("out"), Some(&selection))
        .unwrap()
        .expect("data");

    let feb = Timepoint::Month {
        year: 2024,
        month: 2,
    };
    assert!(!master.dataset.sorted_timepoints().contains(&feb));

    let section = Section::Known(SectionKind::TwoWheeler);
    let rows = master.dataset.sections().get(&section).expect("section");
    assert_eq!(
        rows.get("HERO MOTOCORP")
            .unwrap()
            .values
            .get(&Timepoint::FiscalYear(2023)),
        Some(&100)
    );
}
