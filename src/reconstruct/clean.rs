//! Drops ragged trailing rows, merges continuation-line labels, and
//! collapses multi-row headers into one.
//!
//! Grounded on `table_extractor.py`'s `CleanRows`/`MergeRows`.

use once_cell::sync::Lazy;
use regex::Regex;

static LETTERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]").unwrap());
static UPPERCASE_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[A-Z]").unwrap());
static TRAILING_COLON: Lazy<Regex> = Lazy::new(|| Regex::new(r":\s*$").unwrap());

fn row_valid(row: &[String]) -> bool {
    LETTERS.is_match(&row[0]) && row[1..].iter().all(|c| !c.is_empty())
}

fn uppercase_ratio(text: &str) -> f32 {
    let letters: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.is_empty() {
        return 0.0;
    }
    letters.iter().filter(|c| c.is_uppercase()).count() as f32 / letters.len() as f32
}

/// Merge `rows[idx]` into a neighbor if all its non-label cells are
/// empty and the capitalization rules allow it. Returns `true` if a
/// merge happened (the caller should re-examine the same index).
fn merge_row(rows: &mut Vec<Vec<String>>, idx: usize) -> bool {
    if !rows[idx][1..].iter().all(|c| c.is_empty()) {
        return false;
    }

    let next_not_capitalized = rows.get(idx + 1).map(|r| !UPPERCASE_START.is_match(&r[0])).unwrap_or(false);
    let current_not_capitalized = !UPPERCASE_START.is_match(&rows[idx][0]);
    let prev_no_colon = idx > 0 && !TRAILING_COLON.is_match(&rows[idx - 1][0]);

    if next_not_capitalized {
        if uppercase_ratio(&rows[idx][0]) < 0.5 && uppercase_ratio(&rows[idx + 1][0]) < 0.5 {
            let merged = format!("{} {}", rows[idx][0], rows[idx + 1][0]);
            rows[idx + 1][0] = merged;
            rows.remove(idx);
            return true;
        }
    } else if current_not_capitalized && prev_no_colon {
        if uppercase_ratio(&rows[idx - 1][0]) < 0.5 && uppercase_ratio(&rows[idx][0]) < 0.5 {
            let merged = format!("{} {}", rows[idx - 1][0], rows[idx][0]);
            rows[idx - 1][0] = merged;
            rows.remove(idx);
            return true;
        }
    }
    false
}

/// Drop ragged trailing rows, merge continuation-line labels, and
/// collapse `header_rows` into a single header row prepended to the
/// cleaned value rows. Returns `None` if nothing survives.
pub fn clean_table(header_rows: &[Vec<String>], value_rows: &[Vec<String>]) -> Option<Vec<Vec<String>>> {
    let mut value_rows = value_rows.to_vec();

    let drop_from = value_rows.iter().rposition(|row| row_valid(row)).map(|i| i + 1).unwrap_or(0);
    value_rows.truncate(drop_from);

    let mut idx = 0;
    while idx < value_rows.len() {
        if !merge_row(&mut value_rows, idx) {
            idx += 1;
        }
    }

    value_rows.retain(|row| row_valid(row));
    if value_rows.is_empty() {
        return None;
    }

    let column_count = header_rows.first().map(|r| r.len()).unwrap_or(0);
    let mut header_row = Vec::with_capacity(column_count);
    for c in 0..column_count {
        let mut seen = Vec::new();
        for row in header_rows {
            let cell = row.get(c).cloned().unwrap_or_default();
            if !seen.contains(&cell) {
                seen.push(cell);
            }
        }
        header_row.push(seen.join(" ").trim().to_string());
    }

    let mut rows = vec![header_row];
    rows.extend(value_rows);
    Some(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn drops_trailing_ragged_rows() {
        let header = vec![row(&["Label", "2023"])];
        let value = vec![row(&["Revenue", "100"]), row(&["Notes", ""])];
        let cleaned = clean_table(&header, &value).unwrap();
        assert_eq!(cleaned.len(), 2);
    }

    #[test]
    fn merges_continuation_label_into_next_row() {
        let header = vec![row(&["Label", "2023"])];
        let value = vec![row(&["other operating", ""]), row(&["income", "100"])];
        let cleaned = clean_table(&header, &value).unwrap();
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned[1][0], "other operating income");
    }

    #[test]
    fn collapses_duplicate_header_cells() {
        let header = vec![row(&["Label", "2023"]), row(&["Label", "in EUR"])];
        let value = vec![row(&["Revenue", "100"]), row(&["Costs", "50"]), row(&["Profit", "50"])];
        let cleaned = clean_table(&header, &value).unwrap();
        assert_eq!(cleaned[0][0], "Label");
        assert_eq!(cleaned[0][1], "2023 in EUR");
    }

    #[test]
    fn all_invalid_rows_yields_none() {
        let header = vec![row(&["Label", "2023"])];
        let value = vec![row(&["123", ""])];
        assert!(clean_table(&header, &value).is_none());
    }
}
