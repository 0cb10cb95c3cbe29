use once_cell::sync::Lazy;
use regex::Regex;

use crate::extract::grid::Cell;

static INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+$").expect("integer regex"));

/// Normalize a raw cell to an integer value, or nothing.
///
/// Numbers truncate toward zero; strings lose thousands separators (commas
/// and internal whitespace) and must then be an optionally signed digit run.
/// Everything else ("N/A", percentages, decimals-as-text) is absent, never an
/// error and never zero.
pub fn clean_value(cell: &Cell) -> Option<i64> {
    match cell {
        Cell::Empty => None,
        Cell::Number(n) => {
            if n.is_finite() {
                Some(n.trunc() as i64)
            } else {
                None
            }
        }
        Cell::Text(s) => {
            let stripped: String = s
                .trim()
                .chars()
                .filter(|c| *c != ',' && !c.is_whitespace())
                .collect();
            if INT_RE.is_match(&stripped) {
                stripped.parse().ok()
            } else {
                None
            }
        }
    }
}
