//! Grows tables line-by-line and extends them upward into their header.
//!
//! Grounded on `table_extractor.py`'s `ExtractBlocks`/`CorrectBlocks`/
//! `CorrectTable`/`ExtractTables`.

use super::align::align_blocks;
use super::block::{extract_separators, segment_line};
use super::{Block, Line, RawTable, Separator};
use crate::config::PipelineConfig;
use once_cell::sync::Lazy;
use regex::Regex;

static HALF_YEAR_PHRASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:1st|first|2nd|second)\s+half[-\s]+year").unwrap());
static SENTENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^.+[.:]\s*$").unwrap());

/// Reassign a multi-word header phrase (split apart by block segmentation)
/// to the nearest column of the most-blocks row, by proportional x-position.
pub fn correct_blocks(blocks: &[Block], most_blocks: &[Block]) -> Vec<Block> {
    if blocks.is_empty() {
        return blocks.to_vec();
    }
    let x0 = blocks[0].x0;
    let x1 = blocks[blocks.len() - 1].x1;
    let text: String = blocks.iter().map(|b| b.text.as_str()).collect();

    let matches: Vec<_> = HALF_YEAR_PHRASE.find_iter(&text).collect();
    if matches.is_empty() {
        return blocks.to_vec();
    }

    let width = x1 - x0;
    let text_len = text.chars().count().max(1) as f32;
    let mut assignments: Vec<(usize, String)> = Vec::new();
    for m in matches {
        let start_chars = text[..m.start()].chars().count() as f32;
        let end_chars = text[..m.end()].chars().count() as f32;
        let new_x0 = x0 + start_chars / text_len * width;
        let new_x1 = x0 + end_chars / text_len * width;
        let mid = new_x0 + (new_x1 - new_x0) / 2.0;

        let idx = most_blocks
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                let mid_a = a.x0 + (a.x1 - a.x0) / 2.0;
                let mid_b = b.x0 + (b.x1 - b.x0) / 2.0;
                (mid - mid_a).abs().partial_cmp(&(mid - mid_b).abs()).unwrap()
            })
            .map(|(i, _)| i)
            .unwrap();
        assignments.push((idx, m.as_str().to_string()));
    }

    // Preserve first-wins semantics of Python's dict insertion (later
    // assignments to the same column are dropped).
    let mut seen = std::collections::HashSet::new();
    let mut result = Vec::new();
    for (idx, text) in assignments {
        if seen.insert(idx) {
            let reference = &most_blocks[idx];
            result.push(Block { x0: reference.x0, x1: reference.x1, text });
        }
    }
    result
}

fn most_blocks(table: &[Vec<Block>]) -> Vec<Block> {
    table.iter().max_by_key(|row| row.len()).cloned().unwrap_or_default()
}

fn units_match(text: &str, units_regex: &Regex) -> bool {
    units_regex.is_match(text)
}

fn date_match(text: &str, date_regex: &Regex) -> bool {
    date_regex.is_match(text)
}

/// Extend `table` upward: prepend earlier lines that align onto the
/// table's column grid and pass the header-sentence/consistency checks.
fn correct_table(
    table: &mut Vec<Vec<Block>>,
    first_idx: usize,
    lines: &[Line],
    separators_by_line: &[Vec<Separator>],
    date_regex: &Regex,
    units_regex: &Regex,
    config: &PipelineConfig,
) -> usize {
    let reference = most_blocks(table);
    let mut prev_aligned: Vec<Option<Block>> = align_blocks(&table[0], &reference)
        .unwrap_or_else(|| vec![None; reference.len()]);

    let mut extension: Vec<Vec<Block>> = Vec::new();
    let mut new_first_idx = first_idx;

    for candidate_idx in (0..first_idx).rev() {
        let line = &lines[candidate_idx];
        let separators = &separators_by_line[candidate_idx];
        let raw_blocks = segment_line(line, separators, config);
        let blocks = correct_blocks(&raw_blocks, &reference);
        let aligned = align_blocks(&blocks, &reference);

        let valid = match &aligned {
            None => false,
            Some(aligned) if aligned.len() != prev_aligned.len() => false,
            Some(aligned) => {
                let is_sentence = aligned[0].as_ref().map(|b| SENTENCE.is_match(&b.text)).unwrap_or(false);
                let other_empty = aligned[1..].iter().all(Option::is_none);
                if is_sentence && other_empty {
                    false
                } else {
                    let occupied: Vec<usize> =
                        aligned.iter().enumerate().filter(|(_, b)| b.is_some()).map(|(i, _)| i).collect();
                    let mut ok = occupied.iter().all(|&i| prev_aligned[i].is_some());
                    if !ok {
                        let text = aligned
                            .iter()
                            .filter_map(|b| b.as_ref().map(|b| b.text.as_str()))
                            .collect::<Vec<_>>()
                            .join(" ");
                        if units_match(&text, units_regex) && date_match(&text, date_regex) {
                            let first_third_count =
                                (table.len() as f32 * config.header_reconsideration_fraction) as usize;
                            let mut combined: Vec<&Vec<Block>> = extension.iter().rev().collect();
                            combined.extend(table.iter().take(first_third_count));
                            let has_previous_dates = combined.iter().any(|row| {
                                let joined = row
                                    .iter()
                                    .skip(1)
                                    .map(|b| b.text.as_str())
                                    .collect::<Vec<_>>()
                                    .join(" ");
                                date_regex.is_match(&joined)
                            });
                            if !has_previous_dates {
                                ok = true;
                            }
                        }
                    }
                    ok
                }
            }
        };

        if valid {
            extension.push(blocks);
            new_first_idx = candidate_idx;
            prev_aligned = aligned.unwrap();
        } else {
            break;
        }
    }

    extension.reverse();
    extension.append(table);
    *table = extension;
    new_first_idx
}

/// Scan a page's lines top-to-bottom, building tables as runs of
/// mutually-alignable multi-block lines, then extend each one upward.
pub fn build_tables(
    lines: &[Line],
    page_fills: &[crate::pdf::content::FilledRect],
    date_regex: &Regex,
    units_regex: &Regex,
    config: &PipelineConfig,
) -> Vec<RawTable> {
    let separators = extract_separators(page_fills, config);
    let separators_by_line: Vec<Vec<Separator>> = lines
        .iter()
        .map(|line| {
            separators
                .iter()
                .filter(|s| {
                    let overlap = (line.y1.min(s.y1) - line.y0.max(s.y0)).max(0.0);
                    let ratio = if line.height() > 0.0 { overlap / line.height() } else { 0.0 };
                    ratio > config.separator_overlap_fraction
                })
                .cloned()
                .collect()
        })
        .collect();

    let mut runs: Vec<Vec<(usize, Vec<Block>)>> = vec![Vec::new()];
    for (idx, line) in lines.iter().enumerate() {
        let blocks = segment_line(line, &separators_by_line[idx], config);
        if let Some(current) = runs.last() {
            if !current.is_empty() {
                let reference = most_blocks(&current.iter().map(|(_, b)| b.clone()).collect::<Vec<_>>());
                let aligned = align_blocks(&blocks, &reference);
                if aligned.is_none() {
                    let next_run = if blocks.len() > 1 { vec![(idx, blocks)] } else { Vec::new() };
                    runs.push(next_run);
                } else {
                    runs.last_mut().unwrap().push((idx, blocks));
                }
            } else if blocks.len() > 1 {
                runs.last_mut().unwrap().push((idx, blocks));
            }
        }
    }
    if runs.last().map(|r| r.is_empty()).unwrap_or(true) {
        runs.pop();
    }

    let mut tables = Vec::new();
    for run in runs {
        if run.is_empty() {
            continue;
        }
        let first_idx = run[0].0;
        let last_idx = run[run.len() - 1].0;
        let mut table: Vec<Vec<Block>> = run.into_iter().map(|(_, b)| b).collect();
        let new_first_idx =
            correct_table(&mut table, first_idx, lines, &separators_by_line, date_regex, units_regex, config);

        let reference = most_blocks(&table);
        let rows: Vec<Vec<Option<Block>>> = table
            .iter()
            .map(|row| align_blocks(row, &reference).unwrap_or_else(|| vec![None; reference.len()]))
            .collect();

        tables.push(RawTable { rows, first_line_index: new_first_idx, last_line_index: last_idx });
    }
    tables
}
