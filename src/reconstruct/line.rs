//! Groups glyph runs into lines, merges lines whose boxes nest or overlap,
//! and cleans up the resulting word lists.
//!
//! Grounded on `table_extractor.py`'s `ExtractLines`/`MergeLines`/
//! `RemoveOverlappingWords`/`MergeWords`.

use super::{Glyph, Line, Word};
use crate::geometry::{overlap_ratio, Rect};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\d.,]+").unwrap());

/// Build sorted, merged, de-duplicated lines from a page's glyph runs.
pub fn build_lines(glyphs: &[Glyph]) -> Vec<Line> {
    let grouped = group_by_rounded_y(glyphs);
    let mut lines: Vec<Line> = grouped.into_values().collect();
    lines.sort_by(|a, b| a.y0.partial_cmp(&b.y0).unwrap_or(std::cmp::Ordering::Equal));

    merge_lines(&mut lines);
    for line in &mut lines {
        remove_overlapping_words(line);
    }
    for line in &mut lines {
        merge_negative_numbers(line);
    }
    lines
}

fn group_by_rounded_y(glyphs: &[Glyph]) -> HashMap<(i32, i32), Line> {
    let mut groups: HashMap<(i32, i32), Line> = HashMap::new();
    for glyph in glyphs {
        let cleaned = normalize_text(&glyph.text);
        if cleaned.is_empty() {
            continue;
        }
        let y0 = Rect::round1(glyph.y0);
        let y1 = Rect::round1(glyph.y1);
        let key = ((y0 * 10.0).round() as i32, (y1 * 10.0).round() as i32);
        let word = Word {
            x0: Rect::round1(glyph.x0),
            x1: Rect::round1(glyph.x1),
            text: cleaned,
        };
        groups
            .entry(key)
            .and_modify(|line| line.words.push(word.clone()))
            .or_insert_with(|| Line {
                y0,
                y1,
                words: vec![word],
            });
    }
    groups
}

fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for ch in text.chars() {
        if unicode_is_private_use(ch) {
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

fn unicode_is_private_use(ch: char) -> bool {
    matches!(ch as u32, 0xE000..=0xF8FF | 0xF0000..=0xFFFFD | 0x100000..=0x10FFFD)
}

fn merge_lines(lines: &mut Vec<Line>) {
    let mut idx = 1;
    while idx < lines.len() {
        let prev_height = lines[idx - 1].height();
        let height = lines[idx].height();
        let line_height = (prev_height + height) / 2.0;
        let nested = lines[idx - 1].y0 <= lines[idx].y0 && lines[idx].y1 <= lines[idx - 1].y1;
        let overlap = (lines[idx - 1].y1 - lines[idx].y0).max(0.0);
        let overlap_ratio = if line_height > 0.0 { overlap / line_height } else { 0.0 };

        if nested || overlap_ratio > 0.5 {
            let merged_y0 = lines[idx - 1].y0.min(lines[idx].y0);
            let merged_y1 = lines[idx - 1].y1.max(lines[idx].y1);
            let mut words = std::mem::take(&mut lines[idx - 1].words);
            words.append(&mut lines[idx].words);
            lines[idx - 1] = Line {
                y0: merged_y0,
                y1: merged_y1,
                words,
            };
            lines.remove(idx);
        } else {
            idx += 1;
        }
    }
}

fn remove_overlapping_words(line: &mut Line) {
    line.words.sort_by(|a, b| a.x0.partial_cmp(&b.x0).unwrap_or(std::cmp::Ordering::Equal));

    // Pass 1: same text, >90% x-overlap -> drop the later duplicate.
    let mut keep = vec![true; line.words.len()];
    for i in 0..line.words.len() {
        if !keep[i] {
            continue;
        }
        for j in (i + 1)..line.words.len() {
            if !keep[j] {
                continue;
            }
            if line.words[i].text == line.words[j].text {
                let ratio = overlap_ratio(line.words[i].x0, line.words[i].x1, line.words[j].x0, line.words[j].x1);
                if ratio > 0.9 {
                    keep[j] = false;
                }
            }
        }
    }
    line.words = line
        .words
        .iter()
        .zip(keep.iter())
        .filter(|(_, k)| **k)
        .map(|(w, _)| w.clone())
        .collect();

    // Pass 2: same x0, one word's text is a prefix of the other -> drop the shorter-context one.
    let mut keep = vec![true; line.words.len()];
    for i in 0..line.words.len() {
        if !keep[i] {
            continue;
        }
        for j in (i + 1)..line.words.len() {
            if !keep[j] {
                continue;
            }
            if line.words[i].x0 == line.words[j].x0 {
                if line.words[i].text.starts_with(&line.words[j].text) {
                    keep[j] = false;
                } else if line.words[j].text.starts_with(&line.words[i].text) {
                    keep[i] = false;
                }
            }
        }
    }
    line.words = line
        .words
        .iter()
        .zip(keep.iter())
        .filter(|(_, k)| **k)
        .map(|(w, _)| w.clone())
        .collect();
}

fn merge_negative_numbers(line: &mut Line) {
    let mut idx = 1;
    while idx < line.words.len() {
        let prev = line.words[idx - 1].clone();
        let current = line.words[idx].clone();
        let gap = current.x0 - prev.x1;
        if prev.text == "-" && LEADING_NUMBER.is_match(&current.text) && gap > 0.0 && gap < 5.0 {
            line.words[idx - 1] = Word {
                x0: prev.x0,
                x1: current.x1,
                text: format!("{}{}", prev.text, current.text),
            };
            line.words.remove(idx);
        } else {
            idx += 1;
        }
    }
}
