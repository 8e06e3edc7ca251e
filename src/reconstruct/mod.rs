//! Table reconstruction: turns a page's glyph runs and filled rectangles
//! into formatted rows, with no prior knowledge of where a table begins
//! or how many columns it has.
//!
//! The pipeline is a chain of independent stages, each consuming the
//! previous stage's output: [`line`] groups glyphs into text lines,
//! [`block`] segments a line into blocks by gap width and separators,
//! [`align`] aligns a row's blocks onto a reference column grid,
//! [`table`] grows tables line-by-line and extends them upward into
//! their header, [`filter`] rejects non-tabular matches, [`header`]
//! splits header rows from value rows, [`clean`] drops ragged trailing
//! rows and merges continuation lines, and [`format`] turns the result
//! into dated, unit-converted numeric rows.

pub mod align;
pub mod block;
pub mod clean;
pub mod filter;
pub mod format;
pub mod header;
pub mod line;
pub mod table;

use crate::pdf::content::GlyphRun;

/// A glyph run, as produced by the content-stream interpreter.
pub type Glyph = GlyphRun;

/// A de-duplicated, position-sorted word within a [`Line`].
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    /// Left edge.
    pub x0: f32,
    /// Right edge.
    pub x1: f32,
    /// Word text.
    pub text: String,
}

/// A horizontal text line, the unit [`block::segment_line`] operates on.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// Top edge of the line's bounding box.
    pub y0: f32,
    /// Bottom edge of the line's bounding box.
    pub y1: f32,
    /// Words, sorted by `x0` ascending.
    pub words: Vec<Word>,
}

impl Line {
    /// Line height, used by separator and line-merge overlap checks.
    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Space-joined text of every word in the line.
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A filled rectangle considered as a column-separator hint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Separator {
    /// Left edge.
    pub x0: f32,
    /// Right edge.
    pub x1: f32,
    /// Top edge.
    pub y0: f32,
    /// Bottom edge.
    pub y1: f32,
    /// Fill opacity, already filtered to be `> 0.9` by the caller.
    pub opacity: f32,
}

/// A contiguous horizontal run of words within a line, not split by a
/// wide gap or a separator.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Left edge.
    pub x0: f32,
    /// Right edge.
    pub x1: f32,
    /// Space-joined text of the block's constituent words.
    pub text: String,
}

/// A table before header/value-row splitting: rows of blocks aligned
/// onto a shared column grid, plus the line-index span they came from.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// Rows, aligned onto the most-blocks row's column count.
    pub rows: Vec<Vec<Option<Block>>>,
    /// Index (into the page's line list) of the table's first row.
    pub first_line_index: usize,
    /// Index of the table's last row.
    pub last_line_index: usize,
}

impl RawTable {
    /// Render `rows` as plain text, `None` slots becoming empty strings.
    pub fn to_string_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.as_ref().map(|b| b.text.clone()).unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}

/// A table split into header and value rows, with its extracted title.
#[derive(Debug, Clone, Default)]
pub struct HeaderedTable {
    /// Rows that describe columns (dates, units, sub-headers).
    pub header_rows: Vec<Vec<String>>,
    /// Data rows.
    pub value_rows: Vec<Vec<String>>,
    /// Verbatim text of the lines between the previous table and this
    /// one's header, in original top-to-bottom order.
    pub title: Vec<String>,
    /// Index of the table's header-region start (post header-extension).
    pub first_line_index: usize,
    /// Index of the table's last row.
    pub last_line_index: usize,
}
