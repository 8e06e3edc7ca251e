//! Rejects non-tabular matches and caps admitted numeric columns.
//!
//! Grounded on `table_extractor.py`'s `FilterTables`.

use once_cell::sync::Lazy;
use regex::Regex;

const MAX_NUMERIC_COLUMNS: usize = 4;

static NUMBERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\s\d.,\-+%()]+$").unwrap());
// The original used a lookbehind/lookahead pair; the `regex` crate has no
// backtracking engine, so this is expressed with capture groups instead.
static NUMBER_GAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d)\s(\d/)").unwrap());
static REPEATING_YEAR_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)[SHQ]\d\s+20\d\d").unwrap());
static ELLIPSIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\d\s.,]+$").unwrap());

/// Strips a duplicated trailing year digit, e.g. "Q1 20202020" -> "Q1 2020".
/// The original regex used a backreference (`\1+`) to find the repeat; the
/// `regex` crate doesn't support those, so the repeat run is found by a
/// manual character scan after a backreference-free prefix match.
fn strip_repeating_year(cell: &str) -> String {
    if let Some(m) = REPEATING_YEAR_PREFIX.find(cell) {
        let last_digit = cell[..m.end()].chars().last().unwrap();
        let rest = &cell[m.end()..];
        let repeat_len = rest.chars().take_while(|c| *c == last_digit).count();
        if repeat_len > 0 {
            let repeat: String = std::iter::repeat(last_digit).take(repeat_len).collect();
            return cell.replace(&repeat, "");
        }
    }
    cell.to_string()
}

fn normalize_cell(cell: &str) -> String {
    let no_gap = NUMBER_GAP.replace_all(cell, "$1$2");
    strip_repeating_year(&no_gap)
}

/// Transpose rows into admitted columns (label column always kept; a
/// numeric column is admitted only if its first third holds a date and,
/// below that, at least one plain-number cell).
pub fn filter_table(rows: &[Vec<String>], date_regex: &Regex) -> Option<Vec<Vec<String>>> {
    if rows.len() < 3 {
        return None;
    }
    let column_count = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    if column_count == 0 {
        return None;
    }

    let mut columns: Vec<Vec<String>> = (0..column_count)
        .map(|c| rows.iter().map(|r| r.get(c).cloned().unwrap_or_default()).collect())
        .collect();

    let label_column = columns[0].clone();
    let mut admitted = vec![label_column];

    for column in columns.drain(1..) {
        let normalized: Vec<String> = column.iter().map(|cell| normalize_cell(cell)).collect();
        let first_third = normalized.len() / 3;
        let date_idx = normalized[..first_third.max(0).min(normalized.len())]
            .iter()
            .position(|cell| date_regex.is_match(cell));
        if let Some(date_idx) = date_idx {
            let has_number = normalized[date_idx + 1..].iter().any(|cell| NUMBERS.is_match(cell));
            if has_number {
                admitted.push(normalized);
            }
        }
    }

    if admitted.len() <= 1 {
        return None;
    }
    admitted.truncate(MAX_NUMERIC_COLUMNS);
    admitted[0] = admitted[0].iter().map(|cell| ELLIPSIS.replace(cell, "").to_string()).collect();

    let row_count = admitted[0].len();
    let rows: Vec<Vec<String>> = (0..row_count)
        .map(|r| admitted.iter().map(|col| col[r].clone()).collect())
        .collect();
    Some(rows)
}
