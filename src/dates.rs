//! Layered date-expression recognition and conversion to ISO 8601.
//!
//! Grounded on `table_extractor.py`'s `CreateRegexes`/`ExtractDate`. The
//! combined regex purely enumerates literal alternatives and word
//! boundaries, both of which `regex` supports directly, so it ports
//! without the lookaround workarounds `units.rs`/`filter.rs` needed.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

const MONTH_NAMES_EN: [&str; 24] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September", "October", "November",
    "December", "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const MONTH_NAMES_FR: [&str; 12] = [
    "Janvier", "Février", "Mars", "Avril", "Mai", "Juin", "Juillet", "Aout", "Septembre", "Octobre", "Novembre",
    "Décembre",
];

static MONTH_LOOKUP: Lazy<HashMap<String, u32>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for (idx, name) in MONTH_NAMES_EN.iter().enumerate() {
        map.insert(name.to_lowercase(), (idx % 12) as u32 + 1);
    }
    for (idx, name) in MONTH_NAMES_FR.iter().enumerate() {
        map.insert(name.to_lowercase(), idx as u32 + 1);
    }
    map
});

fn month_alternation() -> String {
    MONTH_NAMES_EN.iter().chain(MONTH_NAMES_FR.iter()).cloned().collect::<Vec<_>>().join("|")
}

/// The composite date regex (spec §4.9's "layered date regex").
pub static DATE_REGEX: Lazy<Regex> = Lazy::new(|| {
    let months = month_alternation();
    let parts = [
        r"(?:1er|2[eè]me)\s+semestre\s+20\d{2}".to_string(),
        r"20\d{2}\s+(?:1er|2[eè]me)\s+semestre".to_string(),
        r"(?:1st|first|2nd|second)\s+half[-\s]+year\s+20\d{2}".to_string(),
        r"20\d{2}\s+(?:1st|first|2nd|second)\s+half[-\s]+year".to_string(),
        r"[SHQ]\d\s+20\d{2}".to_string(),
        r"20\d{2}\s+[SHQ]\d".to_string(),
        r"20\d{2}[/.-]\d{1,2}[/.-]\d{1,2}".to_string(),
        r"\d{1,2}[/.-]\d{1,2}[/.-]20\d{2}".to_string(),
        format!(r"\d{{2}}[\s,]+(?:{months})[\s,]+20\d{{2}}"),
        format!(r"(?:{months})[\s,]+\d{{2}}[\s,]+20\d{{2}}"),
        format!(r"20\d{{2}}[\s,]+(?:{months})[\s,]+\d{{2}}"),
        r"\d{1,2}/\d{1,2}/\d{2}".to_string(),
        r"20\d{2}[/.-]\d{2}".to_string(),
        r"\d{2}[/.-]20\d{2}".to_string(),
        r"20\d{2}".to_string(),
    ];
    let pattern = parts.iter().map(|p| format!(r"\b{p}\b")).collect::<Vec<_>>().join("|");
    Regex::new(&format!("(?i){pattern}")).unwrap()
});

static PERIOD_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:1er|2[eè]me)\s+semestre|(?:1st|first|2nd|second)\s+half[-\s]+year|[SHQ]\d").unwrap()
});
static BARE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^20\d{2}$").unwrap());
static SHORT_YM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(20\d{2}[/.-]\d{2}|\d{2}[/.-]20\d{2})$").unwrap());
static YMD_FULL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(20\d{2})[/.-](\d{1,2})[/.-](\d{1,2})$").unwrap());
static MDY_FULL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{1,2})[/.-](\d{1,2})[/.-](20\d{2})$").unwrap());
static DAY_MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)^(\d{{2}})[\s,]+({})[\s,]+(20\d{{2}})$", month_alternation())).unwrap()
});
static MONTH_DAY_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)^({})[\s,]+(\d{{2}})[\s,]+(20\d{{2}})$", month_alternation())).unwrap()
});
static YEAR_MONTH_DAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)^(20\d{{2}})[\s,]+({})[\s,]+(\d{{2}})$", month_alternation())).unwrap()
});

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

fn end_of_period(year: i32, month: u32) -> Option<NaiveDate> {
    last_day_of_month(year, month)
}

/// Parse a single date-expression match into an ISO `YYYY-MM-DD` string.
/// Returns `None` if the expression is ambiguous (two-digit year short
/// forms) or otherwise unparseable.
pub fn extract_date(text: &str) -> Option<String> {
    let date = DATE_REGEX.find(text)?.as_str().to_string();
    parse_date_expression(&date).map(|d| d.format("%Y-%m-%d").to_string())
}

fn parse_date_expression(date: &str) -> Option<NaiveDate> {
    if let Some(period_match) = PERIOD_MARKER.find(date) {
        let period = period_match.as_str();
        let year_text = date.replacen(period, "", 1);
        let year_text = year_text.trim();
        let year: i32 = year_text.parse().ok()?;

        let month = if period.chars().count() == 2 {
            let mut chars = period.chars();
            let letter = chars.next()?;
            let digit: u32 = chars.next()?.to_digit(10)?;
            digit * if letter.eq_ignore_ascii_case(&'Q') { 3 } else { 6 }
        } else {
            let lower = period.to_lowercase();
            if lower.contains('1') || lower.contains("first") || lower.contains("1er") {
                6
            } else {
                12
            }
        };
        return end_of_period(year, month);
    }

    if BARE_YEAR.is_match(date) {
        let year: i32 = date.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 12, 31);
    }

    if SHORT_YM.is_match(date) {
        let numbers: Vec<i32> = date.split(|c| c == '/' || c == '.' || c == '-').filter_map(|p| p.parse().ok()).collect();
        if numbers.len() != 2 {
            return None;
        }
        let (year, month) = if numbers[0] > numbers[1] { (numbers[0], numbers[1]) } else { (numbers[1], numbers[0]) };
        return end_of_period(year, month as u32);
    }

    if let Some(caps) = DAY_MONTH_YEAR.captures(date) {
        let day: u32 = caps[1].parse().ok()?;
        let month = *MONTH_LOOKUP.get(&caps[2].to_lowercase())?;
        let year: i32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    if let Some(caps) = MONTH_DAY_YEAR.captures(date) {
        let month = *MONTH_LOOKUP.get(&caps[1].to_lowercase())?;
        let day: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    if let Some(caps) = YEAR_MONTH_DAY.captures(date) {
        let year: i32 = caps[1].parse().ok()?;
        let month = *MONTH_LOOKUP.get(&caps[2].to_lowercase())?;
        let day: u32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    if let Some(caps) = YMD_FULL.captures(date) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    if let Some(caps) = MDY_FULL.captures(date) {
        let month: u32 = caps[1].parse().ok()?;
        let day: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    // Two-digit-year short forms (`D/M/YY`) are genuinely ambiguous
    // between day-first and month-first reading; per the resolved open
    // question this returns None rather than guess.
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_year_is_december_31() {
        assert_eq!(extract_date("FY 2023").unwrap(), "2023-12-31");
    }

    #[test]
    fn quarter_code_computes_end_of_quarter() {
        assert_eq!(extract_date("Q1 2023").unwrap(), "2023-03-31");
        assert_eq!(extract_date("Q4 2023").unwrap(), "2023-12-31");
    }

    #[test]
    fn half_year_phrase_computes_end_of_half() {
        assert_eq!(extract_date("first half-year 2023").unwrap(), "2023-06-30");
        assert_eq!(extract_date("second half-year 2023").unwrap(), "2023-12-31");
    }

    #[test]
    fn explicit_ymd_date_parses() {
        assert_eq!(extract_date("2023/03/15").unwrap(), "2023-03-15");
    }

    #[test]
    fn month_name_date_parses() {
        assert_eq!(extract_date("31 December 2023").unwrap(), "2023-12-31");
    }

    #[test]
    fn short_year_month_computes_end_of_month() {
        assert_eq!(extract_date("2023/06").unwrap(), "2023-06-30");
    }

    #[test]
    fn two_digit_year_short_form_is_unparseable() {
        assert!(extract_date("05/23").is_none());
    }
}
