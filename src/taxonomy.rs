//! Canonical line-item taxonomy and fuzzy name matching.
//!
//! Grounded on `item_standardizer.py`'s `CreateRegexes`/`MapItems`. Each
//! canonical item carries a list of known surface names (multilingual);
//! those names are split on whitespace and rejoined as `.+?`-separated
//! capture groups so a label matches even when extra words are
//! interleaved between the name's tokens.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statement {
    Income,
    Balance,
    CashFlow,
}

pub struct CanonicalItem {
    pub name: String,
    regexes: Vec<Regex>,
}

impl CanonicalItem {
    fn build(name: &str, surface_forms: &[String]) -> Result<Self> {
        let regexes = surface_forms
            .iter()
            .map(|form| {
                let tokens: Vec<String> =
                    form.split_whitespace().map(|t| format!("({})", regex::escape(t))).collect();
                Regex::new(&format!("(?i){}", tokens.join(r".+?"))).map_err(Error::from)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { name: name.to_string(), regexes })
    }

    /// First surface-form regex that matches `label`, reconstructed as
    /// the space-joined captured tokens (mirrors `match.groups()` in the
    /// Python standardizer, used there to compute a similarity ratio
    /// against the original key).
    fn match_tokens(&self, label: &str) -> Option<String> {
        self.regexes.iter().find_map(|re| {
            let caps = re.captures(label)?;
            let tokens: Vec<&str> = caps.iter().skip(1).filter_map(|g| g.map(|m| m.as_str())).collect();
            Some(tokens.join(" "))
        })
    }
}

#[derive(serde::Deserialize)]
pub struct TaxonomyResource {
    pub statements: HashMap<String, Vec<String>>,
    pub items: HashMap<String, HashMap<String, Vec<String>>>,
}

/// Canonical items grouped by statement, each with its compiled
/// surface-form regexes.
pub struct Taxonomy {
    items: HashMap<Statement, Vec<CanonicalItem>>,
    titles: HashMap<String, Vec<String>>,
}

static STATEMENT_KEYS: Lazy<[(&str, Statement); 3]> =
    Lazy::new(|| [("income_statement", Statement::Income), ("balance_sheet", Statement::Balance), ("cash_flow_statement", Statement::CashFlow)]);

impl Taxonomy {
    pub fn load() -> Result<Self> {
        let resource: TaxonomyResource = serde_json::from_str(crate::STRUCTURES_JSON)
            .map_err(|e| Error::InvalidConfig(format!("structures.json: {e}")))?;
        Self::from_resource(resource)
    }

    pub fn from_resource(resource: TaxonomyResource) -> Result<Self> {
        let mut items = HashMap::new();
        for (key, statement) in STATEMENT_KEYS.iter() {
            let Some(item_map) = resource.items.get(*key) else { continue };
            let mut canonical = Vec::with_capacity(item_map.len());
            for (name, forms) in item_map {
                canonical.push(CanonicalItem::build(name, forms)?);
            }
            items.insert(*statement, canonical);
        }
        Ok(Self { items, titles: resource.statements })
    }

    pub fn statement_titles(&self, statement: Statement) -> Vec<String> {
        let key = STATEMENT_KEYS.iter().find(|(_, s)| *s == statement).map(|(k, _)| *k).unwrap_or("");
        self.titles.get(key).cloned().unwrap_or_default()
    }

    pub fn all_statements(&self) -> [Statement; 3] {
        [Statement::Income, Statement::Balance, Statement::CashFlow]
    }

    /// For every canonical item of `statement`, find the best-matching
    /// key among `keys` (by `similarity_ratio` against the item's
    /// reconstructed matched tokens). Returns `(item_name, Option<key>)`
    /// pairs in taxonomy order, a `None` key meaning no candidate key
    /// matched that item's regexes at all.
    pub fn map_row<'a>(&self, statement: Statement, keys: &[&'a str]) -> Vec<(&str, Option<&'a str>)> {
        let Some(candidates) = self.items.get(&statement) else { return Vec::new() };
        candidates
            .iter()
            .map(|item| {
                let best = keys
                    .iter()
                    .filter_map(|key| item.match_tokens(key).map(|tokens| (*key, similarity_ratio(key, &tokens))))
                    .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
                (item.name.as_str(), best.map(|(key, _)| key))
            })
            .collect()
    }
}

/// Ratcliff/Obershelp-style similarity ratio, for disambiguating between
/// near-tied canonical matches. No crate in the dependency set provides
/// `difflib.SequenceMatcher`-equivalent behavior, so this is a direct,
/// deliberate port rather than a crate wrapper.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let matches = matching_blocks(&a, &b);
    2.0 * matches as f64 / (a.len() + b.len()) as f64
}

fn matching_blocks(a: &[char], b: &[char]) -> usize {
    fn longest_match(a: &[char], b: &[char]) -> (usize, usize, usize) {
        let mut best = (0, 0, 0);
        for ai in 0..a.len() {
            for bi in 0..b.len() {
                let mut len = 0;
                while ai + len < a.len() && bi + len < b.len() && a[ai + len] == b[bi + len] {
                    len += 1;
                }
                if len > best.2 {
                    best = (ai, bi, len);
                }
            }
        }
        best
    }

    fn recurse(a: &[char], b: &[char]) -> usize {
        let (ai, bi, len) = longest_match(a, b);
        if len == 0 {
            return 0;
        }
        recurse(&a[..ai], &b[..bi]) + len + recurse(&a[ai + len..], &b[bi + len..])
    }

    recurse(a, b)
}
