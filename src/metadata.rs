//! Fiscal period, year-end date, and auditor-name extraction from free
//! text.
//!
//! Grounded on `metadata_extractor.py`'s `MetadataExtractor`. Two of its
//! regexes rely on negative lookbehind, which the `regex` crate doesn't
//! support; those are ported as lookbehind-free alternatives plus a
//! manual prefix check on the match, the same pattern used in
//! `reconstruct::filter`.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September", "October", "November",
    "December",
];

fn month_alternation() -> String {
    MONTH_NAMES.join("|")
}

static ANNUAL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(a\s?n\s?n\s?u\s?[ae]\s?l)|(year\s+end(?:ed|ing))|((?:12|twelve)\s+months\s+end(?:ed|ing))|(31\s+december)|(december\s+31)|(full(?:\s+|-)year)|\b(årsrapport)|\b(jaarverslag)|(fy)",
    )
    .unwrap()
});

static HALFYEAR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)half(?:\s+|-)year|semi(?:\s+|-)annual|(?:6|six)\s+months\s+end(?:ed|ing)|six-month\s+period\s+ended|30\s+june|june\s+30|semestriel|halvårsrapport|halfjaarverslag|[12]h|h[12]",
    )
    .unwrap()
});

static QUARTER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)quarter|(?:3|three)\s+months\s+end(?:ed|ing)|trimestriel|kvartalsrapport|kwartaalrapport|[1234]q|q[1234]").unwrap()
});

static YEAR_END_REGEX: Lazy<Regex> = Lazy::new(|| {
    let months = month_alternation();
    Regex::new(&format!(
        r"(?i)(?:year|12\s+months?|twelve(?:\s+|-)months?)(?:\s+period)?\s+end(?:ed|ing)(?:\s+on|\s+as\s+of)?[\s:]+(\d{{1,2}})\s+({months})|(?:year|12\s+months?|twelve(?:\s+|-)months?)(?:\s+period)?\s+end(?:ed|ing)(?:\s+on|\s+as\s+of)?[\s:]+({months})\s+(\d{{1,2}})|year(?:\s+|-)end\s+(\d{{1,2}})[/\-](\d{{1,2}})"
    ))
    .unwrap()
});

static AUDITOR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Ernst\s+&\s+Young|EY\s+Bedrijfsrevisoren|KPMG|Deloitte|PricewaterhouseCoopers|PwC|Grant\s+Thornton").unwrap());

/// The annual-report alternation's plain-spelling and "year end(ed/ing)"
/// branches must not be preceded by a hyphen (rules out "semi-annual").
fn annual_excluded(text: &str, start: usize) -> bool {
    text[..start].chars().last() == Some('-')
}

fn find_annual(text: &str) -> Option<usize> {
    ANNUAL_REGEX.captures_iter(text).find_map(|caps| {
        let m = caps.get(0)?;
        let needs_check = caps.get(1).is_some() || caps.get(2).is_some();
        if needs_check && annual_excluded(text, m.start()) {
            None
        } else {
            Some(m.start())
        }
    })
}

/// The year-end "year end(ed/ing)"/"12 months end(ed/ing)" branches must
/// not be preceded by "half " or "half-" (e.g. "half year ended").
fn half_prefixed(text: &str, start: usize) -> bool {
    let prefix = &text[..start];
    let lower = prefix.to_lowercase();
    lower.ends_with("half ") || lower.ends_with("half-")
}

fn find_year_end(text: &str) -> Option<String> {
    YEAR_END_REGEX.captures_iter(text).find_map(|caps| {
        let m = caps.get(0)?;
        let is_named_branch = caps.get(1).is_some() || caps.get(3).is_some();
        if is_named_branch && half_prefixed(text, m.start()) {
            return None;
        }

        if let (Some(day), Some(month)) = (caps.get(1), caps.get(2)) {
            return Some(format!("{} {}", title_case(month.as_str()), day.as_str()));
        }
        if let (Some(month), Some(day)) = (caps.get(3), caps.get(4)) {
            return Some(format!("{} {}", title_case(month.as_str()), day.as_str()));
        }
        if let (Some(a), Some(b)) = (caps.get(5), caps.get(6)) {
            let a: u32 = a.as_str().parse().ok()?;
            let b: u32 = b.as_str().parse().ok()?;
            if (1..=12).contains(&a) {
                return Some(format!("{} {}", MONTH_NAMES[(a - 1) as usize], b));
            }
            if (1..=12).contains(&b) {
                return Some(format!("{} {}", MONTH_NAMES[(b - 1) as usize], a));
            }
            return None;
        }
        None
    })
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeriodData {
    pub is_annual: bool,
    pub fiscal_year: String,
    pub period: String,
}

/// Pick the earliest-position match across the annual/half-year/quarter
/// regexes (priority on tie: annual, then half-year, then quarter), and
/// classify the target `reporting_date`'s day-of-year into a period
/// label.
pub fn extract_period_data(reporting_date: &str, text: &str) -> Option<PeriodData> {
    let candidates: [(usize, Option<usize>); 3] =
        [(0, find_annual(text)), (1, HALFYEAR_REGEX.find(text).map(|m| m.start())), (2, QUARTER_REGEX.find(text).map(|m| m.start()))];

    let mut best: Option<(usize, usize)> = None;
    for (idx, pos) in candidates {
        if let Some(pos) = pos {
            if best.map(|(_, best_pos)| pos < best_pos).unwrap_or(true) {
                best = Some((idx, pos));
            }
        }
    }
    let (report_type, _) = best?;

    let date = NaiveDate::parse_from_str(reporting_date, "%Y-%m-%d").ok()?;
    let year = date.format("%Y").to_string();
    let days_elapsed = date.ordinal0();

    let data = match report_type {
        0 => PeriodData { is_annual: true, fiscal_year: year, period: "FY".to_string() },
        1 => {
            let period = if (91..=273).contains(&days_elapsed) { "H1" } else { "H2" };
            PeriodData { is_annual: false, fiscal_year: year, period: period.to_string() }
        }
        _ => {
            let period = if (45..=136).contains(&days_elapsed) {
                "Q1"
            } else if (137..=228).contains(&days_elapsed) {
                "Q2"
            } else if (229..=319).contains(&days_elapsed) {
                "Q3"
            } else {
                "Q4"
            };
            PeriodData { is_annual: false, fiscal_year: year, period: period.to_string() }
        }
    };
    Some(data)
}

#[derive(Debug, Clone, Default)]
pub struct ReportMetadata {
    pub is_annual: Option<bool>,
    pub fiscal_year: Option<String>,
    pub period: Option<String>,
    pub year_end: Option<String>,
    pub auditor: Option<String>,
}

impl ReportMetadata {
    fn is_complete(&self) -> bool {
        self.is_annual.is_some() && self.year_end.is_some() && self.auditor.is_some()
    }
}

/// Scan `page_texts` in order, filling in each metadata field the first
/// time it is found; stop early once all are filled. Falls back to
/// `source_url` for the period fields if no page text yielded one.
pub fn extract_metadata(reporting_date: &str, page_texts: &[String], source_url: &str) -> ReportMetadata {
    let mut metadata = ReportMetadata::default();

    for text in page_texts {
        if metadata.is_annual.is_none() {
            if let Some(period) = extract_period_data(reporting_date, text) {
                metadata.is_annual = Some(period.is_annual);
                metadata.fiscal_year = Some(period.fiscal_year);
                metadata.period = Some(period.period);
            }
        }
        if metadata.year_end.is_none() {
            metadata.year_end = find_year_end(text);
        }
        if metadata.auditor.is_none() {
            metadata.auditor = AUDITOR_REGEX.find(text).map(|m| m.as_str().to_string());
        }
        if metadata.is_complete() {
            break;
        }
    }

    if metadata.is_annual.is_none() {
        if let Some(period) = extract_period_data(reporting_date, source_url) {
            metadata.is_annual = Some(period.is_annual);
            metadata.fiscal_year = Some(period.fiscal_year);
            metadata.period = Some(period.period);
        }
    }

    metadata
}
