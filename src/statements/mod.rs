//! Statement-level assembly: picking key pages, mapping tables to the
//! canonical taxonomy, and repairing missing items via accounting
//! identities.
//!
//! Grounded on `item_standardizer.py`'s `ItemStandardizer`.

pub mod keypages;
pub mod mapper;
pub mod repair;

use crate::reconstruct::format::FormattedRow;
use crate::taxonomy::Statement;
use indexmap::IndexMap;

/// One formatted table as seen by the statement mapper: its title (used
/// to match against a statement's title regex) and its rows.
pub struct FormattedTable {
    pub title: String,
    pub rows: Vec<FormattedRow>,
}

/// Final per-document output: one row list per canonical statement,
/// sharing the same set of report dates.
pub type StatementSet = IndexMap<Statement, Vec<FormattedRow>>;
