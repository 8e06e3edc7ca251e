//! Currency/magnitude surface-form recognition (spec §6's units map).
//!
//! Grounded on `table_extractor.py`'s `units_map`/`multipliers_map`/
//! `ExtractUnits`. The map is data, not code — per spec §9 ("adding a
//! new currency or phrasing must not require code changes") it is loaded
//! from `resources/structures.json` rather than hardcoded here.

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::HashMap;

/// Resolved units regex plus the surface-form lookup tables it was built
/// from.
pub struct UnitsTable {
    units_map: HashMap<String, String>,
    multipliers_map: HashMap<String, f64>,
    regex: Regex,
}

#[derive(serde::Deserialize)]
struct UnitsResource {
    units_map: HashMap<String, String>,
    multipliers_map: HashMap<String, f64>,
}

impl UnitsTable {
    /// Build from raw units/multipliers maps, compiling the combined
    /// regex once.
    pub fn new(units_map: HashMap<String, String>, multipliers_map: HashMap<String, f64>) -> Result<Self> {
        let units_alt = alternation(units_map.keys());
        let multipliers_alt = alternation(multipliers_map.keys());
        let pattern = format!(
            r"(?i)(?:\W|^)({multipliers_alt})(?:\s*of)?\s*({units_alt})(?:\W|$)|(?:\W|^)({units_alt})(?:\)|\s+x|\s+in)?\s*({multipliers_alt})(?:\W|$)|(?:\W|^)({units_alt})(?:\W|$)"
        );
        let regex = Regex::new(&pattern)?;
        Ok(Self { units_map, multipliers_map, regex })
    }

    /// Load the units table from the embedded `structures.json` resource.
    pub fn load() -> Result<Self> {
        let resource: UnitsResource = serde_json::from_str(crate::STRUCTURES_JSON)
            .map_err(|e| Error::InvalidConfig(format!("structures.json: {e}")))?;
        Self::new(resource.units_map, resource.multipliers_map)
    }

    /// The combined units/multiplier regex, for callers (table growth,
    /// header splitting) that only need a yes/no units match rather than
    /// the resolved currency code.
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Resolve the first units/multiplier match in `text`, defaulting to
    /// `("", 1.0)` when nothing matches.
    pub fn extract(&self, text: &str) -> (String, f64) {
        let Some(caps) = self.regex.captures(text) else {
            return (String::new(), 1.0);
        };

        if let (Some(mult), Some(unit)) = (caps.get(1), caps.get(2)) {
            return self.resolve(unit.as_str(), mult.as_str());
        }
        if let (Some(unit), Some(mult)) = (caps.get(3), caps.get(4)) {
            return self.resolve(unit.as_str(), mult.as_str());
        }
        if let Some(unit) = caps.get(5) {
            let code = self.units_map.get(&unit.as_str().to_lowercase()).cloned().unwrap_or_default();
            return (code, 1.0);
        }
        (String::new(), 1.0)
    }

    fn resolve(&self, unit: &str, multiplier: &str) -> (String, f64) {
        let code = self.units_map.get(&unit.to_lowercase()).cloned().unwrap_or_default();
        let scale = self.multipliers_map.get(&multiplier.to_lowercase()).copied().unwrap_or(1.0);
        (code, scale)
    }
}

fn alternation<'a>(keys: impl Iterator<Item = &'a String>) -> String {
    let mut sorted: Vec<&str> = keys.map(String::as_str).collect();
    // Longest-first so e.g. "us dollars" matches before "dollars".
    sorted.sort_by_key(|k| std::cmp::Reverse(k.len()));
    sorted.iter().map(|k| regex::escape(k)).collect::<Vec<_>>().join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> UnitsTable {
        let mut units = HashMap::new();
        units.insert("eur".to_string(), "EUR".to_string());
        units.insert("€".to_string(), "EUR".to_string());
        let mut multipliers = HashMap::new();
        multipliers.insert("million".to_string(), 1e6);
        multipliers.insert("thousand".to_string(), 1e3);
        UnitsTable::new(units, multipliers).unwrap()
    }

    #[test]
    fn extracts_multiplier_then_units() {
        let (code, scale) = table().extract("in EUR million");
        assert_eq!(code, "EUR");
        assert_eq!(scale, 1e6);
    }

    #[test]
    fn extracts_units_then_multiplier() {
        let (code, scale) = table().extract("(€ thousand)");
        assert_eq!(code, "EUR");
        assert_eq!(scale, 1e3);
    }

    #[test]
    fn extracts_units_alone_with_default_multiplier() {
        let (code, scale) = table().extract("amounts in EUR");
        assert_eq!(code, "EUR");
        assert_eq!(scale, 1.0);
    }

    #[test]
    fn no_match_returns_empty_default() {
        let (code, scale) = table().extract("no currency here");
        assert_eq!(code, "");
        assert_eq!(scale, 1.0);
    }
}
