use once_cell::sync::Lazy;
use regex::Regex;

/// Month-name tokens in match order; full names come first so "january"
/// resolves before the bare "jan" is tried (both map to the same month).
static MONTH_TOKENS: &[(&str, u32)] = &[
    ("january", 1),
    ("jan", 1),
    ("february", 2),
    ("feb", 2),
    ("march", 3),
    ("mar", 3),
    ("april", 4),
    ("apr", 4),
    ("may", 5),
    ("june", 6),
    ("jun", 6),
    ("july", 7),
    ("jul", 7),
    ("august", 8),
    ("aug", 8),
    ("september", 9),
    ("sep", 9),
    ("october", 10),
    ("oct", 10),
    ("november", 11),
    ("nov", 11),
    ("december", 12),
    ("dec", 12),
];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Plausible press-release years only; avoids picking up stray digit runs.
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(20[1-3][0-9])").expect("year regex"));

/// Best-effort month/year extraction from a source filename. Either side may
/// be missing; this is substring matching, not a filename grammar.
pub fn parse_from_filename(filename: &str) -> (Option<u32>, Option<i32>) {
    let lower = filename.to_lowercase();

    let month = MONTH_TOKENS
        .iter()
        .find(|(name, _)| lower.contains(name))
        .map(|(_, num)| *num);

    let year = YEAR_RE
        .captures(filename)
        .and_then(|caps| caps[1].parse().ok());

    (month, year)
}

/// Whether a filename names any month at all (used to keep only vehicle
/// retail releases when scraping).
pub fn names_a_month(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    MONTH_TOKENS.iter().any(|(name, _)| lower.contains(name))
}

pub fn month_name(month: u32) -> Option<&'static str> {
    MONTH_NAMES.get(month.checked_sub(1)? as usize).copied()
}

/// Lowercase 3-letter month name used in filename matching.
pub fn month_short_name(month: u32) -> Option<&'static str> {
    Some(match month {
        1 => "jan",
        2 => "feb",
        3 => "mar",
        4 => "apr",
        5 => "may",
        6 => "jun",
        7 => "jul",
        8 => "aug",
        9 => "sep",
        10 => "oct",
        11 => "nov",
        12 => "dec",
        _ => return None,
    })
}

/// Display form, e.g. "January 2024".
pub fn format_month_year(month: u32, year: i32) -> String {
    match month_name(month) {
        Some(name) => format!("{} {}", name, year),
        None => format!("{}/{}", month, year),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_month_name_and_year() {
        let (m, y) = parse_from_filename("FADA releases January 2024 Vehicle Retail Data.pdf");
        assert_eq!(m, Some(1));
        assert_eq!(y, Some(2024));
    }

    #[test]
    fn parses_short_month_name() {
        let (m, y) = parse_from_filename("sep_2023_release.pdf");
        assert_eq!(m, Some(9));
        assert_eq!(y, Some(2023));
    }

    #[test]
    fn missing_parts_come_back_none() {
        assert_eq!(parse_from_filename("press_release.pdf"), (None, None));
        assert_eq!(parse_from_filename("march_update.pdf"), (Some(3), None));
        // out-of-range years are ignored
        assert_eq!(parse_from_filename("retail_1999.pdf").1, None);
    }

    #[test]
    fn month_detection_for_scraper_filtering() {
        assert!(names_a_month("fada-august-2024.pdf"));
        assert!(!names_a_month("annual-report.pdf"));
    }

    #[test]
    fn display_formatting() {
        assert_eq!(format_month_year(1, 2024), "January 2024");
        assert_eq!(format_month_year(13, 2024), "13/2024");
        assert_eq!(month_short_name(12), Some("dec"));
        assert_eq!(month_short_name(0), None);
    }
}
