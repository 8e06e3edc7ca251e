//! Maps formatted tables to the three canonical statements and their
//! fixed line-item taxonomy.
//!
//! Grounded on `item_standardizer.py`'s `ExtractStatements`/`__call__`.

use super::{FormattedTable, StatementSet};
use crate::reconstruct::format::{CellValue, FormattedRow};
use crate::statements::repair;
use crate::taxonomy::{Statement, Taxonomy};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

fn build_title_regex(titles: &[String]) -> Regex {
    let alternatives: Vec<String> = titles
        .iter()
        .map(|title| title.split_whitespace().map(regex::escape).collect::<Vec<_>>().join(r"\s+"))
        .collect();
    Regex::new(&format!("(?i){}", alternatives.join("|"))).unwrap_or_else(|_| Regex::new("$^").unwrap())
}

fn non_null_count(row: &FormattedRow) -> usize {
    row.values().filter(|v| !matches!(v, CellValue::Number(None))).count()
}

/// Map every value row of `table` to `statement`'s canonical items,
/// applying accounting-identity repair to each row independently.
fn extract_statement_rows(statement: Statement, table: &FormattedTable, taxonomy: &Taxonomy) -> Vec<FormattedRow> {
    table
        .rows
        .iter()
        .map(|row| {
            let keys: Vec<&str> = row.keys().filter(|k| *k != "date" && *k != "units").map(String::as_str).collect();
            let mapped = taxonomy.map_row(statement, &keys);

            let mut mapped_row: FormattedRow = IndexMap::new();
            mapped_row.insert("date".to_string(), row["date"].clone());
            mapped_row.insert("units".to_string(), row["units"].clone());
            for (item, key) in mapped {
                let value = key.and_then(|k| row.get(k).cloned()).unwrap_or(CellValue::Number(None));
                mapped_row.insert(item.to_string(), value);
            }

            repair::repair_row(statement, &mut mapped_row);

            if let Some(html_data) = row.get("html_data") {
                mapped_row.insert("html_data".to_string(), html_data.clone());
            }
            if let Some(raw_data) = row.get("raw_data") {
                mapped_row.insert("raw_data".to_string(), raw_data.clone());
                mapped_row.insert("json_data".to_string(), raw_data.clone());
            }
            mapped_row
        })
        .collect()
}

/// For each of the three statements: pick the highest-scoring table
/// (max per-row non-null field count) among those whose title matches,
/// map its rows, then intersect dates across all three and sort
/// ascending.
pub fn map_statements(tables: &[FormattedTable], taxonomy: &Taxonomy) -> StatementSet {
    let mut statement_set: StatementSet = IndexMap::new();

    for statement in taxonomy.all_statements() {
        let title_regex = build_title_regex(&taxonomy.statement_titles(statement));
        let best = tables
            .iter()
            .filter(|table| title_regex.is_match(&table.title))
            .map(|table| extract_statement_rows(statement, table, taxonomy))
            .filter(|rows| !rows.is_empty())
            .max_by_key(|rows| rows.iter().map(non_null_count).max().unwrap_or(0));

        statement_set.insert(statement, best.unwrap_or_default());
    }

    let common_dates: Option<std::collections::HashSet<String>> =
        statement_set.values().map(|rows| rows.iter().filter_map(|r| date_of(r)).collect::<std::collections::HashSet<_>>()).fold(
            None,
            |acc, dates| match acc {
                None => Some(dates),
                Some(acc) => Some(acc.intersection(&dates).cloned().collect()),
            },
        );
    let Some(common_dates) = common_dates else { return statement_set };

    for rows in statement_set.values_mut() {
        rows.retain(|row| date_of(row).map(|d| common_dates.contains(&d)).unwrap_or(false));
        rows.sort_by(|a, b| date_of(a).cmp(&date_of(b)));
    }

    statement_set
}

fn date_of(row: &FormattedRow) -> Option<String> {
    match row.get("date") {
        Some(CellValue::Text(d)) => Some(d.clone()),
        _ => None,
    }
}
