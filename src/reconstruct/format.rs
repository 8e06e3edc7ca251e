//! Converts a clean, headered table into dated, unit-normalized rows.
//!
//! Grounded on `table_extractor.py`'s `FormatRows`/`FormatTables`/
//! `ExtractUnits`/`ParseNumber`.

use crate::dates::extract_date;
use crate::units::UnitsTable;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

/// A single cell in a formatted row: a text field (`date`/`units`), a
/// parsed (possibly unparseable) number, or one of the raw source
/// payload fields (`raw_data`/`json_data`) carried alongside the
/// standardized values.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(Option<f64>),
    Raw(Vec<Vec<String>>),
}

pub type FormattedRow = IndexMap<String, CellValue>;

static PER_SHARE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)per\s+share|par\s+action").unwrap());
static PARENTHESIZED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([\d.,]+)\)").unwrap());

/// Drop a comma/dot immediately followed by 3+ digits (a group
/// separator). The original used a lookahead (`(?=\d{3})`), which the
/// `regex` crate can't express since it never consumes the digits; this
/// scans manually instead, which gets the same non-overlapping behavior
/// without a consuming match eating the next separator.
fn strip_group_separators(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if (c == ',' || c == '.') && chars[i + 1..].iter().take(3).filter(|c| c.is_ascii_digit()).count() == 3 {
            i += 1;
            continue;
        }
        out.push(c);
        i += 1;
    }
    out
}

/// Strip spaces and a leading `+`, rewrite `(X)` as `-X`, drop group
/// separators, normalize the decimal comma, then parse as `f64`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed: String = raw.chars().filter(|c| !c.is_whitespace() && *c != '+').collect();
    if trimmed.is_empty() {
        return None;
    }
    let negated = PARENTHESIZED.replace_all(&trimmed, "-$1").to_string();
    let no_groups = strip_group_separators(&negated);
    let dotted = no_groups.replace(',', ".");
    dotted.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Pick the unit pair from a table: inspect the title (its constituent
/// lines joined in reverse top-to-bottom order, so the line closest to
/// the table is searched first) plus the labels of rows that are NOT
/// per-share/par-action, and prefer the match with the larger
/// multiplier, then lexical priority on currency code.
fn select_units(title_lines: &[String], labels: &[&str], units: &UnitsTable) -> (String, f64) {
    let reversed_title: String = title_lines.iter().rev().cloned().collect::<Vec<_>>().join(" ");
    let keys = labels.iter().filter(|label| !PER_SHARE.is_match(label)).copied().collect::<Vec<_>>().join(" ");

    vec![units.extract(&reversed_title), units.extract(&keys)]
        .into_iter()
        .filter(|(code, _)| !code.is_empty())
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap().then_with(|| a.0.cmp(&b.0)))
        .unwrap_or((String::new(), 1.0))
}

/// Format one clean table (header row + value rows) into one
/// `FormattedRow` per date column.
///
/// `rows[0]` is the collapsed header row (label column empty, each
/// subsequent cell a date-bearing header); `rows[1..]` are value rows
/// whose first cell is the item label. `title_lines` are the verbatim
/// lines between the previous table's end and this table's header
/// start, top-to-bottom.
pub fn format_rows(title_lines: &[String], rows: &[Vec<String>], units: &UnitsTable) -> Vec<FormattedRow> {
    if rows.len() < 2 {
        return Vec::new();
    }
    let header = &rows[0];
    let value_rows = &rows[1..];

    let mut dates: Vec<(usize, String)> = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for (col, cell) in header.iter().enumerate().skip(1) {
        if let Some(date) = extract_date(cell) {
            if seen.insert(date.clone()) {
                dates.push((col, date));
            }
        }
    }
    if dates.is_empty() {
        return Vec::new();
    }

    let labels: Vec<&str> = value_rows.iter().map(|r| r[0].as_str()).collect();
    let (unit_code, multiplier) = select_units(title_lines, &labels, units);

    dates
        .into_iter()
        .filter_map(|(col, date)| {
            let mut row: FormattedRow = IndexMap::new();
            row.insert("date".to_string(), CellValue::Text(date));
            row.insert("units".to_string(), CellValue::Text(unit_code.clone()));

            let mut any_numeric = false;
            for value_row in value_rows {
                let label = value_row[0].trim().to_string();
                let raw = value_row.get(col).map(String::as_str).unwrap_or("");
                let parsed = parse_number(raw);
                let scaled = if PER_SHARE.is_match(&label) { parsed } else { parsed.map(|v| v * multiplier) };
                if scaled.is_some() {
                    any_numeric = true;
                }
                row.insert(label, CellValue::Number(scaled));
            }

            if any_numeric {
                // The original carries the page's rendered HTML as a
                // fallback payload; this reader has no HTML renderer, so
                // the table title stands in for it (see DESIGN.md).
                row.insert("html_data".to_string(), CellValue::Text(title_lines.join(" ")));
                row.insert("raw_data".to_string(), CellValue::Raw(rows.to_vec()));
            }

            any_numeric.then_some(row)
        })
        .collect()
}

/// Document-wide unit fallback: when a formatted row has no recognized
/// `units`, fill it with the majority unit extracted from every page's
/// plain text.
pub fn apply_document_unit_fallback(rows: &mut [FormattedRow], page_texts: &[String], units: &UnitsTable) {
    let majority = majority_unit(page_texts, units);
    let Some(majority) = majority else { return };
    for row in rows.iter_mut() {
        if let Some(CellValue::Text(code)) = row.get("units") {
            if code.is_empty() {
                row.insert("units".to_string(), CellValue::Text(majority.clone()));
            }
        }
    }
}

fn majority_unit(page_texts: &[String], units: &UnitsTable) -> Option<String> {
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for text in page_texts {
        let (code, _) = units.extract(text);
        if !code.is_empty() {
            *counts.entry(code).or_insert(0) += 1;
        }
    }
    counts.into_iter().max_by_key(|(_, count)| *count).map(|(code, _)| code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn units() -> UnitsTable {
        let mut u = HashMap::new();
        u.insert("eur".to_string(), "EUR".to_string());
        u.insert("euros".to_string(), "EUR".to_string());
        let mut m = HashMap::new();
        m.insert("million".to_string(), 1e6);
        m.insert("millions".to_string(), 1e6);
        m.insert("thousand".to_string(), 1e3);
        m.insert("thousands".to_string(), 1e3);
        UnitsTable::new(u, m).unwrap()
    }

    #[test]
    fn parses_parenthesized_negative_number() {
        assert_eq!(parse_number("(45.2)"), Some(-45.2));
    }

    #[test]
    fn parses_group_separated_comma_thousands() {
        assert_eq!(parse_number("1,234.56"), Some(1234.56));
    }

    #[test]
    fn parses_group_separated_dot_thousands_with_decimal_comma() {
        assert_eq!(parse_number("1.234,56"), Some(1234.56));
    }

    #[test]
    fn parses_space_grouped_number() {
        assert_eq!(parse_number("1 234,56"), Some(1234.56));
    }

    #[test]
    fn unparseable_number_is_none() {
        assert_eq!(parse_number("n/a"), None);
    }

    #[test]
    fn formats_rows_per_date_column_scaled_by_multiplier() {
        let rows = vec![
            vec!["".to_string(), "2022".to_string(), "2021".to_string()],
            vec!["Revenue".to_string(), "1,234.5".to_string(), "1,100.0".to_string()],
        ];
        let formatted = format_rows(&["in millions of euros".to_string()], &rows, &units());
        assert_eq!(formatted.len(), 2);
        assert_eq!(formatted[0]["date"], CellValue::Text("2022-12-31".to_string()));
        assert_eq!(formatted[0]["units"], CellValue::Text("EUR".to_string()));
        assert_eq!(formatted[0]["Revenue"], CellValue::Number(Some(1_234_500_000.0)));
    }

    #[test]
    fn per_share_rows_are_not_multiplied() {
        let rows = vec![
            vec!["".to_string(), "2022".to_string()],
            vec!["Earnings per share".to_string(), "1.5".to_string()],
        ];
        let formatted = format_rows(&["in millions of euros".to_string()], &rows, &units());
        assert_eq!(formatted[0]["Earnings per share"], CellValue::Number(Some(1.5)));
    }

    #[test]
    fn rows_with_no_numeric_cells_are_dropped() {
        let rows = vec![
            vec!["".to_string(), "2022".to_string()],
            vec!["Notes".to_string(), "n/a".to_string()],
        ];
        assert!(format_rows(&["in millions of euros".to_string()], &rows, &units()).is_empty());
    }

    #[test]
    fn document_wide_fallback_fills_missing_units_by_majority() {
        let mut rows = vec![{
            let mut row: FormattedRow = IndexMap::new();
            row.insert("date".to_string(), CellValue::Text("2022-12-31".to_string()));
            row.insert("units".to_string(), CellValue::Text(String::new()));
            row
        }];
        let page_texts = vec!["amounts in EUR".to_string(), "amounts in EUR".to_string(), "see note 3".to_string()];
        apply_document_unit_fallback(&mut rows, &page_texts, &units());
        assert_eq!(rows[0]["units"], CellValue::Text("EUR".to_string()));
    }
}
