use std::path::Path;

use anyhow::{Context, Result};
use calamine::{open_workbook, Data, Reader, Xlsx};

use crate::extract::grid::{Cell, RawGrid};
use crate::extract::tabula::RawTable;

/// Write extracted tables to an intermediate workbook, one `Table_N` sheet
/// per table in extraction order.
pub fn write_workbook(tables: &[RawTable], path: &Path) -> Result<()> {
    let mut book = umya_spreadsheet::new_file();

    for (i, table) in tables.iter().enumerate() {
        let name = format!("Table_{}", i + 1);
        let sheet = if i == 0 {
            let sheet = book
                .get_sheet_mut(&0)
                .context("workbook has no initial sheet")?;
            sheet.set_name(&name);
            sheet
        } else {
            book.new_sheet(&name)
                .map_err(|e| anyhow::anyhow!("adding sheet {name}: {e}"))?
        };

        for (r, row) in table.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                sheet
                    .get_cell_mut(((c + 1) as u32, (r + 1) as u32))
                    .set_value(value);
            }
        }
    }

    umya_spreadsheet::writer::xlsx::write(&book, path)
        .with_context(|| format!("writing workbook {}", path.display()))?;
    Ok(())
}

/// Read every sheet of an intermediate workbook back as raw grids. String
/// cells are kept untrimmed so indentation survives the round trip.
pub fn read_grids(path: &Path) -> Result<Vec<RawGrid>> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .with_context(|| format!("opening workbook {}", path.display()))?;

    let mut grids = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .with_context(|| format!("reading sheet {name} of {}", path.display()))?;
        let rows: Vec<Vec<Cell>> = range
            .rows()
            .map(|row| row.iter().map(convert).collect())
            .collect();
        grids.push(RawGrid::new(name, rows));
    }
    Ok(grids)
}

fn convert(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::String(s) => Cell::from_raw(s),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) => Cell::Empty,
    }
}
