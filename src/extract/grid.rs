/// A single cell of a raw extracted table.
///
/// Table sources hand over numbers, text and blanks intermixed in one column,
/// so the variant is made explicit here at the boundary instead of being
/// re-checked downstream.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Empty,
}

impl Cell {
    /// Parse a raw string the way table sources produce them: blank becomes
    /// `Empty`, a clean float becomes `Number`, everything else stays `Text`.
    ///
    /// Leading whitespace is preserved on text cells; indentation carries
    /// meaning later on (sub-item rows).
    pub fn from_raw(s: &str) -> Cell {
        if s.trim().is_empty() {
            return Cell::Empty;
        }
        match s.trim().parse::<f64>() {
            Ok(n) => Cell::Number(n),
            Err(_) => Cell::Text(s.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Display text of the cell, untrimmed for `Text`.
    pub fn display(&self) -> String {
        match self {
            Cell::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Cell::Text(s) => s.clone(),
            Cell::Empty => String::new(),
        }
    }
}

/// One table region extracted from a source document: ordered rows of cells,
/// tagged with the sheet it came from.
#[derive(Debug, Clone)]
pub struct RawGrid {
    pub sheet: String,
    pub rows: Vec<Vec<Cell>>,
}

impl RawGrid {
    pub fn new(sheet: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        RawGrid {
            sheet: sheet.into(),
            rows,
        }
    }
}
