//! Scans a document's pages for the three canonical statement titles and
//! discards every page that matches none of them.
//!
//! Grounded on `item_standardizer.py`'s `GetKeyPages`.

use crate::error::Result;
use crate::pdf::{self, PdfAccess, PdfDocument};
use crate::taxonomy::{Statement, Taxonomy};
use once_cell::sync::Lazy;
use regex::Regex;

fn build_title_regex(titles: &[String]) -> Regex {
    let alternatives: Vec<String> = titles
        .iter()
        .map(|title| title.split_whitespace().map(regex::escape).collect::<Vec<_>>().join(r"\s+"))
        .collect();
    Regex::new(&format!("(?i){}", alternatives.join("|"))).unwrap_or_else(|_| Regex::new("$^").unwrap())
}

static STATEMENTS: Lazy<[Statement; 3]> = Lazy::new(|| [Statement::Income, Statement::Balance, Statement::CashFlow]);

/// Retain only pages that match at least one of the three statements'
/// title regexes, returning the rewritten PDF bytes. Returns `Ok(None)`
/// if not all three statement types were found anywhere in the
/// document (the document is then dropped, per `Error::NoKeyPages` at
/// the pipeline boundary).
pub fn filter_key_pages(doc: &mut PdfDocument, taxonomy: &Taxonomy) -> Result<Option<Vec<u8>>> {
    let title_regexes: Vec<(Statement, Regex)> =
        STATEMENTS.iter().map(|s| (*s, build_title_regex(&taxonomy.statement_titles(*s)))).collect();

    let mut found = [false; 3];
    let mut key_pages = Vec::new();

    for page_index in 0..doc.page_count() {
        let text = doc.page_text(page_index)?;
        let mut is_key = false;
        for (idx, (_, regex)) in title_regexes.iter().enumerate() {
            if regex.is_match(&text) {
                found[idx] = true;
                is_key = true;
            }
        }
        if is_key {
            key_pages.push(page_index);
        }
    }

    if !found.iter().all(|f| *f) {
        return Ok(None);
    }
    pdf::write_subset(doc, &key_pages).map(Some)
}
