//! Cross-reference table parsing, with a brute-force reconstruction
//! fallback for malformed or missing `xref` tables.
//!
//! Financial-statement PDFs are produced by a long tail of issuer
//! printing pipelines; a meaningful fraction have a broken or truncated
//! `startxref` offset. Rather than fail the whole document, we fall back
//! to scanning the byte stream for `N G obj` markers, the same recovery
//! strategy the teacher's `xref_reconstruction.rs` uses.

use super::lexer::{parse_indirect_object, parse_object};
use super::object::{Object, ObjectRef};
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Maps object number to its byte offset within the file.
#[derive(Debug, Default, Clone)]
pub struct CrossRefTable {
    offsets: HashMap<u32, usize>,
}

impl CrossRefTable {
    /// Number of entries in the table.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Look up the byte offset of an object number.
    pub fn offset(&self, number: u32) -> Option<usize> {
        self.offsets.get(&number).copied()
    }

    fn insert(&mut self, number: u32, offset: usize) {
        self.offsets.entry(number).or_insert(offset);
    }
}

fn find_last(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .rev()
        .find(|&i| &haystack[i..i + needle.len()] == needle)
}

/// Locate the byte offset of the cross-reference table via the trailing
/// `startxref` keyword.
pub fn find_xref_offset(bytes: &[u8]) -> Option<usize> {
    let pos = find_last(bytes, b"startxref")?;
    let rest = &bytes[pos + b"startxref".len()..];
    let text: String = rest
        .iter()
        .copied()
        .skip_while(|b| b.is_ascii_whitespace())
        .take_while(|b| b.is_ascii_digit())
        .map(|b| b as char)
        .collect();
    text.parse::<usize>().ok()
}

/// Parse a classic (non-stream) `xref` table starting at `offset`,
/// returning the table and the trailer dictionary.
pub fn parse_xref(bytes: &[u8], offset: usize) -> Result<(CrossRefTable, HashMap<String, Object>)> {
    let mut table = CrossRefTable::default();
    if offset >= bytes.len() || !bytes[offset..].starts_with(b"xref") {
        return reconstruct_xref(bytes);
    }

    let mut cursor = offset + b"xref".len();
    loop {
        let slice = &bytes[cursor..];
        let trimmed_start = slice
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(slice.len());
        let slice = &slice[trimmed_start..];
        cursor += trimmed_start;

        if slice.starts_with(b"trailer") {
            cursor += b"trailer".len();
            break;
        }

        let header: String = slice
            .iter()
            .take_while(|b| !b.is_ascii_whitespace() || b.is_ascii_digit())
            .take_while(|b| b.is_ascii_digit() || **b == b' ')
            .map(|b| *b as char)
            .collect();
        let mut parts = header.split_whitespace();
        let start: u32 = match parts.next().and_then(|p| p.parse().ok()) {
            Some(v) => v,
            None => break,
        };
        let count: u32 = match parts.next().and_then(|p| p.parse().ok()) {
            Some(v) => v,
            None => break,
        };
        cursor += header.len();

        for i in 0..count {
            let entry_slice = &bytes[cursor..(cursor + 20).min(bytes.len())];
            let entry = String::from_utf8_lossy(entry_slice);
            let mut fields = entry.split_whitespace();
            if let (Some(offset_str), Some(_gen), Some(kind)) =
                (fields.next(), fields.next(), fields.next())
            {
                if kind == "n" {
                    if let Ok(entry_offset) = offset_str.parse::<usize>() {
                        table.insert(start + i, entry_offset);
                    }
                }
            }
            cursor += 20;
        }
    }

    let (_, trailer) = parse_object(&bytes[cursor..])
        .map_err(|_| Error::PdfOpenError("malformed trailer".into()))?;
    let trailer = trailer.as_dict().cloned().unwrap_or_default();

    if table.is_empty() {
        return reconstruct_xref(bytes);
    }

    Ok((table, trailer))
}

/// Brute-force reconstruction: scan the whole byte stream for
/// `N G obj` markers and rebuild the offset table from them. Used when
/// `startxref`/`xref` are missing, truncated or internally inconsistent.
pub fn reconstruct_xref(bytes: &[u8]) -> Result<(CrossRefTable, HashMap<String, Object>)> {
    let mut table = CrossRefTable::default();
    let mut cursor = 0;
    while cursor < bytes.len() {
        if let Some((reference, _object)) = parse_indirect_object(&bytes[cursor..])
            .ok()
            .map(|(_, parsed)| parsed)
        {
            table.insert(reference.number, cursor);
        }
        cursor += 1;
        if let Some(next) = find_next_obj_marker(&bytes[cursor..]) {
            cursor += next;
        } else {
            break;
        }
    }

    let trailer = find_last(bytes, b"trailer")
        .and_then(|pos| parse_object(&bytes[pos + b"trailer".len()..]).ok())
        .map(|(_, obj)| obj.as_dict().cloned().unwrap_or_default())
        .unwrap_or_else(|| synthesize_trailer(&table, bytes));

    if table.is_empty() {
        return Err(Error::PdfOpenError("no objects found in document".into()));
    }

    Ok((table, trailer))
}

fn find_next_obj_marker(bytes: &[u8]) -> Option<usize> {
    (0..bytes.len().saturating_sub(3)).find(|&i| &bytes[i..i + 3] == b"obj")
}

fn synthesize_trailer(table: &CrossRefTable, bytes: &[u8]) -> HashMap<String, Object> {
    // Without a trailer we cannot know the root object number; fall back
    // to the highest object number whose dict has /Type /Catalog.
    let mut trailer = HashMap::new();
    for number in table.offsets.keys() {
        if let Some(offset) = table.offset(*number) {
            if let Ok((_, (reference, object))) = parse_indirect_object(&bytes[offset..]) {
                if object
                    .as_dict()
                    .and_then(|d| d.get("Type"))
                    .and_then(Object::as_name)
                    == Some("Catalog")
                {
                    trailer.insert("Root".to_string(), Object::Reference(reference));
                    break;
                }
            }
        }
    }
    trailer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_xref_offset_from_startxref() {
        let bytes = b"...garbage...\nstartxref\n1234\n%%EOF";
        assert_eq!(find_xref_offset(bytes), Some(1234));
    }

    #[test]
    fn reconstructs_from_obj_markers_when_xref_missing() {
        let bytes = b"1 0 obj\n<< /Type /Catalog >>\nendobj\n2 0 obj\n42\nendobj\n";
        let (table, trailer) = reconstruct_xref(bytes).unwrap();
        assert_eq!(table.len(), 2);
        assert!(trailer.contains_key("Root"));
    }

    #[test]
    fn reference_round_trips_through_reconstruction() {
        let bytes = b"5 0 obj\n(hello)\nendobj\n";
        let (table, _) = reconstruct_xref(bytes).unwrap();
        let offset = table.offset(5).unwrap();
        let (_, (reference, object)) = parse_indirect_object(&bytes[offset..]).unwrap();
        assert_eq!(reference, ObjectRef { number: 5, generation: 0 });
        assert_eq!(object, Object::String(b"hello".to_vec()));
    }
}
