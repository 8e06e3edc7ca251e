//! Financial-statement extraction from PDF annual/interim reports.
//!
//! Given a report's raw PDF bytes, [`pipeline::StatementPipeline`] locates
//! the income statement, balance sheet, and cash flow statement, maps
//! their line items onto a fixed multilingual taxonomy, repairs gaps via
//! accounting identities, and resolves fiscal period metadata — all
//! without any prior knowledge of the document's layout.
//!
//! ```text
//! PdfDocument::open
//!   -> statements::keypages::filter_key_pages   (discard non-statement pages)
//!   -> reconstruct::line::build_lines            (per page)
//!   -> reconstruct::table::build_tables
//!   -> reconstruct::filter::filter_table
//!   -> reconstruct::header::split_header
//!   -> reconstruct::clean::clean_table
//!   -> reconstruct::format::format_rows
//!   -> statements::mapper::map_statements
//!   -> metadata::extract_metadata
//! ```

pub mod config;
pub mod dates;
pub mod error;
pub mod geometry;
pub mod metadata;
pub mod pdf;
pub mod pipeline;
pub mod reconstruct;
pub mod statements;
pub mod taxonomy;
pub mod units;

pub use config::{DocumentContext, PipelineConfig};
pub use error::{Error, Result};
pub use pipeline::{PipelineOutput, StatementPipeline};
pub use statements::StatementSet;

/// Embedded units/multiplier and taxonomy data (spec §9: recognizing a
/// new currency, phrasing, or line-item name is a data change here, not
/// a code change).
pub(crate) const STRUCTURES_JSON: &str = include_str!("../resources/structures.json");
