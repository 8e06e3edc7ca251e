//! Content-stream interpreter: decodes `Tj`/`TJ` text-showing operators
//! into glyph runs and `re` + fill operators into filled rectangles.
//!
//! This is not a full graphics-state machine — financial-statement PDFs
//! are laid out with axis-aligned, non-rotated text and simple rectangle
//! separators, so we track only translation (not full matrix rotation)
//! and the most recently set fill alpha. Anything this simplification
//! gets wrong degrades to a slightly-off glyph bounding box, which the
//! line/block/table stages already tolerate via their gap tolerances.

use super::lexer::parse_object;
use super::object::Object;
use std::collections::HashMap;

/// A single `Tj`/`TJ`/`'`/`"`-emitted text run with its page-space bbox.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphRun {
    /// Left edge.
    pub x0: f32,
    /// Bottom edge (baseline).
    pub y0: f32,
    /// Right edge.
    pub x1: f32,
    /// Top edge.
    pub y1: f32,
    /// Decoded text (control characters already dropped, whitespace runs
    /// already collapsed to a single space per spec §3).
    pub text: String,
}

/// A filled rectangle, a candidate column separator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilledRect {
    /// Left edge.
    pub x0: f32,
    /// Bottom edge.
    pub y0: f32,
    /// Right edge.
    pub x1: f32,
    /// Top edge.
    pub y1: f32,
    /// Fill opacity in `[0, 1]`.
    pub opacity: f32,
}

#[derive(Debug, Clone, Copy)]
struct TextState {
    x: f32,
    y: f32,
    line_x: f32,
    line_y: f32,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    h_scale: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            line_x: 0.0,
            line_y: 0.0,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scale: 100.0,
            leading: 0.0,
        }
    }
}

/// Average advance width per character, as a fraction of font size.
/// Proportional serif/sans text in annual reports averages close to this
/// figure; it is a stand-in for true per-glyph metrics from an embedded
/// font program, which this crate does not parse.
const AVG_CHAR_WIDTH_FRACTION: f32 = 0.5;

fn advance_for(text: &str, state: &TextState) -> f32 {
    let scale = state.h_scale / 100.0;
    let glyph_width = text.chars().count() as f32 * AVG_CHAR_WIDTH_FRACTION * state.font_size;
    let spacing = text.chars().count() as f32 * state.char_spacing
        + text.chars().filter(|c| *c == ' ').count() as f32 * state.word_spacing;
    (glyph_width + spacing) * scale
}

fn clean_text(raw: &[u8]) -> String {
    let decoded = String::from_utf8_lossy(raw);
    let mut out = String::with_capacity(decoded.len());
    let mut last_was_space = false;
    for ch in decoded.chars() {
        if ch.is_control() {
            continue;
        }
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

enum Operand {
    Object(Object),
    Operator(String),
}

fn next_token(input: &[u8]) -> nom::IResult<&[u8], Operand> {
    let trimmed = skip_ws(input);
    if trimmed.is_empty() {
        return Err(nom::Err::Error(nom::error::Error::new(
            trimmed,
            nom::error::ErrorKind::Eof,
        )));
    }
    if let Ok((rest, object)) = parse_object(trimmed) {
        if rest.len() < trimmed.len() {
            return Ok((rest, Operand::Object(object)));
        }
    }
    let end = trimmed
        .iter()
        .position(|b| b.is_ascii_whitespace() || matches!(b, b'(' | b'<' | b'[' | b'/'))
        .unwrap_or(trimmed.len())
        .max(1);
    let (op, rest) = trimmed.split_at(end);
    Ok((rest, Operand::Operator(String::from_utf8_lossy(op).to_string())))
}

fn skip_ws(mut input: &[u8]) -> &[u8] {
    loop {
        while !input.is_empty() && input[0].is_ascii_whitespace() {
            input = &input[1..];
        }
        if input.first() == Some(&b'%') {
            while !input.is_empty() && input[0] != b'\n' {
                input = &input[1..];
            }
        } else {
            break;
        }
    }
    input
}

fn f32_of(obj: &Object) -> f32 {
    obj.as_f64().unwrap_or(0.0) as f32
}

/// Interpret a decoded (already filter-decoded) content stream, returning
/// the glyph runs and filled rectangles it produced.
///
/// `ext_gstate_alpha` maps `/ExtGState` resource names to the fill alpha
/// (`/ca`) they carry; the caller resolves this once per page from the
/// page's resource dictionary.
pub fn interpret(content: &[u8], ext_gstate_alpha: &HashMap<String, f32>) -> (Vec<GlyphRun>, Vec<FilledRect>) {
    let mut operands: Vec<Object> = Vec::new();
    let mut glyphs = Vec::new();
    let mut fills = Vec::new();
    let mut text = TextState::default();
    let mut in_text = false;
    let mut fill_alpha = 1.0f32;
    let mut pending_rect: Option<(f32, f32, f32, f32)> = None;

    let mut cursor = content;
    while let Ok((rest, token)) = next_token(cursor) {
        cursor = rest;
        match token {
            Operand::Object(obj) => operands.push(obj),
            Operand::Operator(op) => {
                match op.as_str() {
                    "BT" => {
                        in_text = true;
                        text.x = 0.0;
                        text.y = 0.0;
                        text.line_x = 0.0;
                        text.line_y = 0.0;
                    }
                    "ET" => in_text = false,
                    "Tf" => {
                        if operands.len() >= 2 {
                            text.font_size = f32_of(&operands[operands.len() - 1]);
                        }
                    }
                    "Tc" => {
                        if let Some(last) = operands.last() {
                            text.char_spacing = f32_of(last);
                        }
                    }
                    "Tw" => {
                        if let Some(last) = operands.last() {
                            text.word_spacing = f32_of(last);
                        }
                    }
                    "Tz" => {
                        if let Some(last) = operands.last() {
                            text.h_scale = f32_of(last);
                        }
                    }
                    "TL" => {
                        if let Some(last) = operands.last() {
                            text.leading = f32_of(last);
                        }
                    }
                    "Td" | "TD" => {
                        if operands.len() >= 2 {
                            let ty = f32_of(&operands[operands.len() - 1]);
                            let tx = f32_of(&operands[operands.len() - 2]);
                            if op == "TD" {
                                text.leading = -ty;
                            }
                            text.line_x += tx;
                            text.line_y += ty;
                            text.x = text.line_x;
                            text.y = text.line_y;
                        }
                    }
                    "Tm" => {
                        if operands.len() >= 6 {
                            let e = f32_of(&operands[operands.len() - 2]);
                            let f = f32_of(&operands[operands.len() - 1]);
                            text.line_x = e;
                            text.line_y = f;
                            text.x = e;
                            text.y = f;
                        }
                    }
                    "T*" => {
                        text.line_y -= text.leading;
                        text.x = text.line_x;
                        text.y = text.line_y;
                    }
                    "Tj" | "'" | "\"" => {
                        if op != "Tj" {
                            text.line_y -= text.leading;
                            text.x = text.line_x;
                            text.y = text.line_y;
                        }
                        if let Some(Object::String(bytes)) = operands.last() {
                            emit_glyph_run(&mut glyphs, &mut text, bytes, in_text);
                        }
                    }
                    "TJ" => {
                        if let Some(Object::Array(items)) = operands.last() {
                            for item in items {
                                match item {
                                    Object::String(bytes) => {
                                        emit_glyph_run(&mut glyphs, &mut text, bytes, in_text)
                                    }
                                    Object::Integer(_) | Object::Real(_) => {
                                        let adjustment = item.as_f64().unwrap_or(0.0) as f32;
                                        text.x -= adjustment / 1000.0 * text.font_size
                                            * (text.h_scale / 100.0);
                                    }
                                    _ => {}
                                }
                            }
                        }
                    }
                    "re" => {
                        if operands.len() >= 4 {
                            let h = f32_of(&operands[operands.len() - 1]);
                            let w = f32_of(&operands[operands.len() - 2]);
                            let y = f32_of(&operands[operands.len() - 3]);
                            let x = f32_of(&operands[operands.len() - 4]);
                            pending_rect = Some((x, y, x + w, y + h));
                        }
                    }
                    "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" => {
                        if let Some((x0, y0, x1, y1)) = pending_rect.take() {
                            fills.push(FilledRect {
                                x0,
                                y0,
                                x1,
                                y1,
                                opacity: fill_alpha,
                            });
                        }
                    }
                    "n" => {
                        pending_rect = None;
                    }
                    "gs" => {
                        if let Some(Object::Name(name)) = operands.last() {
                            if let Some(alpha) = ext_gstate_alpha.get(name) {
                                fill_alpha = *alpha;
                            }
                        }
                    }
                    _ => {}
                }
                operands.clear();
            }
        }
    }

    (glyphs, fills)
}

fn emit_glyph_run(glyphs: &mut Vec<GlyphRun>, text: &mut TextState, bytes: &[u8], in_text: bool) {
    if !in_text {
        return;
    }
    let cleaned = clean_text(bytes);
    let advance = advance_for(&cleaned, text);
    if !cleaned.is_empty() {
        glyphs.push(GlyphRun {
            x0: text.x,
            y0: text.y,
            x1: text.x + advance,
            y1: text.y + text.font_size,
            text: cleaned,
        });
    }
    text.x += advance;
}
