//! Top-level orchestration: PDF bytes in, canonical statements and
//! report metadata out.
//!
//! Grounded on `international_financials.py`'s `InternationalFinancials.
//! ParseStatement` and `table_extractor.py`'s `TableExtractor.__call__`,
//! which this module's `run` method chains together stage by stage.

use crate::config::{DocumentContext, PipelineConfig};
use crate::dates::DATE_REGEX;
use crate::error::{Error, Result};
use crate::metadata::{self, ReportMetadata};
use crate::pdf::{PdfAccess, PdfDocument};
use crate::reconstruct::{clean, filter, format, header, line, table};
use crate::statements::{self, mapper, FormattedTable};
use crate::taxonomy::Taxonomy;
use crate::units::UnitsTable;

/// One document's extracted output: the three canonical statements,
/// date-aligned, plus the report-level metadata five-tuple.
#[derive(Debug)]
pub struct PipelineOutput {
    pub statements: statements::StatementSet,
    pub metadata: ReportMetadata,
}

/// Holds the taxonomy, units table, and tuning knobs built once and
/// reused across documents.
pub struct StatementPipeline {
    taxonomy: Taxonomy,
    units: UnitsTable,
    config: PipelineConfig,
}

impl StatementPipeline {
    /// Load the embedded taxonomy/units resources with default tuning.
    pub fn new() -> Result<Self> {
        Ok(Self { taxonomy: Taxonomy::load()?, units: UnitsTable::load()?, config: PipelineConfig::default() })
    }

    /// Build from already-loaded resources and an explicit configuration.
    pub fn with_resources(taxonomy: Taxonomy, units: UnitsTable, config: PipelineConfig) -> Self {
        Self { taxonomy, units, config }
    }

    /// Run the full pipeline on one document's bytes.
    ///
    /// Only `Error::PdfOpenError` ever surfaces here. A document missing
    /// one of the three canonical statement titles is a content defect,
    /// not a programming error (spec §7's propagation policy, and §8's
    /// S5 boundary scenario, both call for an empty result with no
    /// `Err`) — it yields an empty `StatementSet` rather than
    /// `Error::NoKeyPages`, which remains available to direct callers of
    /// [`crate::statements::keypages::filter_key_pages`] who want to
    /// distinguish "no key pages" from "zero matching rows" themselves.
    /// Every other content-level defect (an unparseable date, a
    /// misaligned row, an unrecognized unit) degrades silently into a
    /// `None` cell or an empty statement the same way.
    pub fn run(&self, bytes: &[u8], context: &DocumentContext) -> Result<PipelineOutput> {
        let mut full_doc = PdfDocument::open(bytes)?;

        let full_page_texts: Vec<String> =
            (0..full_doc.page_count()).map(|i| full_doc.page_text(i).unwrap_or_default()).collect();

        let empty_statements: statements::StatementSet =
            self.taxonomy.all_statements().into_iter().map(|s| (s, Vec::new())).collect();

        let statement_set = match statements::keypages::filter_key_pages(&mut full_doc, &self.taxonomy)? {
            None => empty_statements,
            Some(subset_bytes) => {
                let mut doc = PdfDocument::open(&subset_bytes)?;

                let units_regex = self.units.regex().clone();
                let mut tables = Vec::new();
                let mut key_page_texts = Vec::new();

                for page_index in 0..doc.page_count() {
                    let glyphs = doc.page_glyphs(page_index)?;
                    let fills = doc.page_fills(page_index)?;
                    key_page_texts.push(doc.page_text(page_index)?);

                    let lines = line::build_lines(&glyphs);
                    let raw_tables = table::build_tables(&lines, &fills, &DATE_REGEX, &units_regex, &self.config);

                    let mut previous_last_line = None;
                    for raw_table in &raw_tables {
                        let string_rows = raw_table.to_string_rows();
                        let Some(filtered) = filter::filter_table(&string_rows, &DATE_REGEX) else { continue };
                        let Some((header_rows, value_rows)) =
                            header::split_header(&filtered, &DATE_REGEX, &units_regex)
                        else {
                            continue;
                        };
                        let Some(cleaned) = clean::clean_table(&header_rows, &value_rows) else { continue };

                        let header_end_line = raw_table.first_line_index + header_rows.len() - 1;
                        let title_start_line = previous_last_line.map(|l| l + 1).unwrap_or(0);
                        let title_end_line = header_end_line.min(lines.len().saturating_sub(1));
                        let title_lines: Vec<String> = if title_start_line <= title_end_line {
                            lines[title_start_line..=title_end_line].iter().map(|l| l.text()).collect()
                        } else {
                            Vec::new()
                        };
                        previous_last_line = Some(raw_table.last_line_index);

                        let rows = format::format_rows(&title_lines, &cleaned, &self.units);
                        if rows.is_empty() {
                            continue;
                        }
                        tables.push(FormattedTable { title: title_lines.join(" "), rows });
                    }
                }

                let mut statement_set = mapper::map_statements(&tables, &self.taxonomy);
                for rows in statement_set.values_mut() {
                    format::apply_document_unit_fallback(rows, &key_page_texts, &self.units);
                }
                statement_set
            }
        };

        let report_metadata = metadata::extract_metadata(&context.reporting_date, &full_page_texts, &context.source_url);

        Ok(PipelineOutput { statements: statement_set, metadata: report_metadata })
    }
}
