//! Segments a line into blocks by gap width and separator hints, and
//! derives separator x-coordinates from a page's filled rectangles.
//!
//! Grounded on `table_extractor.py`'s `ExtractSeparators`/`ExtractBlocks`.

use super::{Block, Line, Separator};
use crate::config::PipelineConfig;
use crate::pdf::content::FilledRect;

/// Turn page fills into separator candidates (no line association yet).
pub fn extract_separators(fills: &[FilledRect], config: &PipelineConfig) -> Vec<Separator> {
    fills
        .iter()
        .filter(|f| f.opacity > config.separator_min_opacity)
        .map(|f| Separator { x0: f.x0, x1: f.x1, y0: f.y0, y1: f.y1, opacity: f.opacity })
        .collect()
}

/// x-coordinates (both edges of each qualifying separator) whose
/// y-overlap with `line` exceeds `config.separator_overlap_fraction` of
/// the line's height.
fn separator_xs_for_line(separators: &[Separator], line: &Line, config: &PipelineConfig) -> Vec<f32> {
    let line_height = line.height();
    let mut xs = Vec::new();
    for sep in separators {
        let top = line.y0.max(sep.y0);
        let bottom = line.y1.min(sep.y1);
        let overlap = (bottom - top).max(0.0);
        let ratio = if line_height > 0.0 { overlap / line_height } else { 0.0 };
        if ratio > config.separator_overlap_fraction {
            xs.push(sep.x0);
            xs.push(sep.x1);
        }
    }
    xs
}

/// Segment a line's words into blocks, splitting on wide gaps or a
/// separator x-coordinate strictly between two adjacent words.
pub fn segment_line(line: &Line, separators: &[Separator], config: &PipelineConfig) -> Vec<Block> {
    if line.words.is_empty() {
        return Vec::new();
    }
    let separator_xs = separator_xs_for_line(separators, line, config);

    let total_width: f32 = line.words.iter().map(|w| w.x1 - w.x0).sum();
    let total_chars: usize = line.words.iter().map(|w| w.text.chars().count()).sum();
    let avg_char_width = if total_chars > 0 { total_width / total_chars as f32 } else { 1e5 };
    let double_char_width = config.block_gap_multiplier * avg_char_width;

    let mut groups: Vec<Vec<&super::Word>> = vec![vec![]];
    for (idx, word) in line.words.iter().enumerate() {
        groups.last_mut().unwrap().push(word);
        let is_last = idx == line.words.len() - 1;
        let (gap, has_separator) = if is_last {
            (0.0, false)
        } else {
            let next = &line.words[idx + 1];
            let gap = next.x0 - word.x1;
            let has_separator = separator_xs.iter().any(|&s| word.x1 < s && s < next.x0);
            (gap, has_separator)
        };
        if gap > double_char_width || has_separator {
            groups.push(Vec::new());
        }
    }

    groups
        .into_iter()
        .filter(|g| !g.is_empty())
        .map(|group| {
            let x0 = group.first().unwrap().x0;
            let x1 = group.last().unwrap().x1;
            let text = group.iter().map(|w| w.text.as_str()).collect::<Vec<_>>().join(" ");
            Block { x0, x1, text }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::Word;

    fn line_of(words: Vec<(f32, f32, &str)>) -> Line {
        Line {
            y0: 0.0,
            y1: 10.0,
            words: words.into_iter().map(|(x0, x1, t)| Word { x0, x1, text: t.to_string() }).collect(),
        }
    }

    #[test]
    fn adjacent_words_form_one_block() {
        let line = line_of(vec![(0.0, 10.0, "Total"), (11.0, 20.0, "Assets")]);
        let blocks = segment_line(&line, &[], &PipelineConfig::default());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "Total Assets");
    }

    #[test]
    fn wide_gap_splits_into_two_blocks() {
        let line = line_of(vec![(0.0, 10.0, "Label"), (200.0, 210.0, "100")]);
        let blocks = segment_line(&line, &[], &PipelineConfig::default());
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn separator_between_words_splits_block() {
        let line = line_of(vec![(0.0, 10.0, "100"), (12.0, 20.0, "200")]);
        let separators = vec![Separator { x0: 11.0, x1: 11.0, y0: 0.0, y1: 10.0, opacity: 1.0 }];
        let blocks = segment_line(&line, &separators, &PipelineConfig::default());
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn low_opacity_fill_is_not_a_separator() {
        let fills = vec![FilledRect { x0: 5.0, y0: 0.0, x1: 6.0, y1: 10.0, opacity: 0.2 }];
        assert!(extract_separators(&fills, &PipelineConfig::default()).is_empty());
    }
}
