use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::extract::grid::Cell;

/// Canonical period label used as the shared column axis of the master
/// report: either a fiscal year (`FY'24`) or a calendar month (`Jan'24`).
///
/// Ordering is total and deliberate: every fiscal year sorts before every
/// month, fiscal years ascend by year, months ascend chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timepoint {
    FiscalYear(u16),
    Month { year: u16, month: u8 },
}

const MONTH_ABBRS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

const MONTH_DISPLAY: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Header cells that are never timepoints, whatever else they contain.
const SKIP_KEYWORDS: [&str; 9] = [
    "%",
    "YOY",
    "MOM",
    "GROWTH",
    "MARKET SHARE",
    "OEM",
    "NAME",
    "CATEGORY",
    "TOTAL",
];

static FY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"FY[\s']*(\d{2,4})").expect("fiscal year regex"));

static MONTH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(JAN|FEB|MAR|APR|MAY|JUN|JUL|AUG|SEP|OCT|NOV|DEC)[A-Z]*['\s\-]*(\d{2,4})")
        .expect("month regex")
});

impl Timepoint {
    /// Parse a single header cell into a timepoint, if it is one.
    ///
    /// Recognized variants: `FY'24`, `FY24`, `FY 2024`, `Jan'24`,
    /// `JANUARY 2024`, `Jan-24`. Growth/share/label columns are rejected via
    /// the skip list. Anything else is simply not a timepoint.
    pub fn parse(text: &str) -> Option<Timepoint> {
        let upper = text.trim().to_uppercase();
        if upper.is_empty() {
            return None;
        }
        if SKIP_KEYWORDS.iter().any(|kw| upper.contains(kw)) {
            return None;
        }

        if let Some(caps) = FY_RE.captures(&upper) {
            let year = normalize_year(&caps[1])?;
            return Some(Timepoint::FiscalYear(year));
        }

        if let Some(caps) = MONTH_RE.captures(&upper) {
            let month = MONTH_ABBRS.iter().position(|m| *m == &caps[1])? as u8 + 1;
            let year = normalize_year(&caps[2])?;
            return Some(Timepoint::Month { year, month });
        }

        None
    }

}

/// Collapse 2- or 4-digit year text into a full year (2-digit years are
/// anchored to the 2000s, matching the report corpus).
fn normalize_year(digits: &str) -> Option<u16> {
    let n: u16 = digits.parse().ok()?;
    Some(match digits.len() {
        2 => 2000 + n,
        4 => 2000 + n % 100,
        // 3-digit years fall out of both grammars' real-world inputs; treat
        // the trailing two digits as the year like the 4-digit case.
        _ => 2000 + n % 100,
    })
}

impl fmt::Display for Timepoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timepoint::FiscalYear(year) => write!(f, "FY'{:02}", year % 100),
            Timepoint::Month { year, month } => write!(
                f,
                "{}'{:02}",
                MONTH_DISPLAY[(*month - 1) as usize],
                year % 100
            ),
        }
    }
}

impl Ord for Timepoint {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Timepoint::FiscalYear(a), Timepoint::FiscalYear(b)) => a.cmp(b),
            (Timepoint::FiscalYear(_), Timepoint::Month { .. }) => Ordering::Less,
            (Timepoint::Month { .. }, Timepoint::FiscalYear(_)) => Ordering::Greater,
            (
                Timepoint::Month { year: ya, month: ma },
                Timepoint::Month { year: yb, month: mb },
            ) => (ya, ma).cmp(&(yb, mb)),
        }
    }
}

impl PartialOrd for Timepoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Scan a header row and map every timepoint found to its column index.
///
/// Two columns normalizing to the same label collapse to one entry; the later
/// column wins.
pub fn header_timepoints(row: &[Cell]) -> BTreeMap<Timepoint, usize> {
    let mut out = BTreeMap::new();
    for (idx, cell) in row.iter().enumerate() {
        if cell.is_empty() {
            continue;
        }
        if let Some(tp) = Timepoint::parse(&cell.display()) {
            out.insert(tp, idx);
        }
    }
    out
}
