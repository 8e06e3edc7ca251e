//! Splits a filtered table into header rows and value rows.
//!
//! Grounded on `table_extractor.py`'s `IdentifyHeader`.

use once_cell::sync::Lazy;
use regex::Regex;

static LETTERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]").unwrap());
static VALUES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[\s\d.,\-+%()]+$|^\s*(?:-|n\.a)?\s*$").unwrap());

/// Split `rows` into `(header_rows, value_rows)`, or `None` if no row
/// contains a date match (nothing to anchor the split on) or the split
/// would leave either half empty.
pub fn split_header(rows: &[Vec<String>], date_regex: &Regex, units_regex: &Regex) -> Option<(Vec<Vec<String>>, Vec<Vec<String>>)> {
    let date_idx = rows.iter().position(|row| date_regex.is_match(&row[1..].join(" ")))?;

    let mut header_idx = date_idx;
    for row in &rows[date_idx + 1..] {
        let has_letters = LETTERS.is_match(&row[0]);
        let has_units = units_regex.is_match(&row[0]) || row.get(1).map(|c| units_regex.is_match(c)).unwrap_or(false);
        let has_values = row.get(1).map(|c| VALUES.is_match(c)).unwrap_or(false);

        if has_letters && !has_units && has_values {
            break;
        }
        header_idx += 1;
    }

    let header_rows = rows[..=header_idx].to_vec();
    let value_rows = rows[header_idx + 1..].to_vec();
    if header_rows.is_empty() || value_rows.is_empty() {
        return None;
    }
    Some((header_rows, value_rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date_regex() -> Regex {
        Regex::new(r"20\d{2}").unwrap()
    }
    fn units_regex() -> Regex {
        Regex::new(r"(?i)eur").unwrap()
    }

    #[test]
    fn splits_on_first_value_row_after_date() {
        let rows = vec![
            vec!["Label".to_string(), "2023".to_string()],
            vec!["in EUR millions".to_string(), "".to_string()],
            vec!["Revenue".to_string(), "100".to_string()],
            vec!["Costs".to_string(), "50".to_string()],
        ];
        let (header, value) = split_header(&rows, &date_regex(), &units_regex()).unwrap();
        assert_eq!(header.len(), 2);
        assert_eq!(value.len(), 2);
    }

    #[test]
    fn returns_none_when_no_date_row() {
        let rows = vec![
            vec!["Label".to_string(), "n/a".to_string()],
            vec!["Revenue".to_string(), "100".to_string()],
        ];
        assert!(split_header(&rows, &date_regex(), &units_regex()).is_none());
    }
}
