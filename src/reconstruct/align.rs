//! Aligns a row's blocks onto a reference column grid.
//!
//! Grounded on `table_extractor.py`'s `AlignSingleBlock`/
//! `AlignMultipleBlocks`/`AlignBlocks`. Alignment failure is communicated
//! as `None`, never a panic or `Result::Err` — a line that doesn't align
//! just means "start a new table" or "stop extending upward", a routine
//! outcome, not an error condition.

use super::Block;

fn gaps(blocks: &[Block]) -> Vec<(f32, f32)> {
    blocks.windows(2).map(|w| (w[0].x1, w[1].x0)).collect()
}

/// Align a single block onto the reference row's column grid.
fn align_single(block: &Block, reference_gaps: &[(f32, f32)]) -> Option<Vec<Option<Block>>> {
    let (x0, x1) = (block.x0, block.x1);
    let non_aligned = |gap: &(f32, f32)| (x0 < gap.0 && gap.1 < x1) || (gap.0 < x0 && x1 < gap.1);
    if reference_gaps.iter().any(non_aligned) {
        return None;
    }

    let mut aligned = vec![None; reference_gaps.len() + 1];
    let mut end_found = false;
    for (idx, gap) in reference_gaps.iter().enumerate() {
        if x0 < gap.0 {
            aligned[idx] = Some(block.clone());
        }
        if x1 < gap.1 {
            end_found = true;
            break;
        }
    }
    if !end_found {
        let last = aligned.len() - 1;
        aligned[last] = Some(block.clone());
    }
    Some(aligned)
}

/// Align the (fewer) `less_blocks` row onto the (more) `more_blocks` grid.
fn align_multiple(
    less_blocks: &[Block],
    more_blocks: &[Block],
    less_gaps: &[(f32, f32)],
    more_gaps: &[(f32, f32)],
) -> Option<Vec<Option<Block>>> {
    let mut start_idx = 0usize;
    let mut indices = Vec::new();
    for &(x0, x1) in less_gaps {
        let mut best: Option<(usize, f32)> = None;
        for (offset, &(other_x0, other_x1)) in more_gaps[start_idx..].iter().enumerate() {
            let overlap = (x1.min(other_x1) - x0.max(other_x0)).max(0.0);
            if best.map(|(_, best_overlap)| overlap > best_overlap).unwrap_or(true) {
                best = Some((offset, overlap));
            }
        }
        if let Some((offset, overlap)) = best {
            if overlap > 0.0 {
                indices.push(start_idx + offset);
                start_idx += offset + 1;
            }
        }
    }

    if indices.len() != less_gaps.len() {
        return None;
    }

    let mut aligned: Vec<Option<Block>> = vec![None; more_blocks.len()];
    let mut prev_other_idx = 0usize;
    let run_bounds: Vec<Option<usize>> = indices.iter().map(|&i| Some(i)).chain(std::iter::once(None)).collect();

    for (idx, other_idx) in run_bounds.iter().enumerate() {
        let block = &less_blocks[idx];
        let (x0, x1) = (block.x0, block.x1);
        let other_blocks: &[Block] = match other_idx {
            Some(end) => &more_blocks[prev_other_idx..=*end],
            None => &more_blocks[prev_other_idx..],
        };

        if other_blocks.len() == 1 {
            aligned[prev_other_idx] = Some(block.clone());
        } else {
            let start_offset = other_blocks
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| (x0 - a.x0).abs().partial_cmp(&(x0 - b.x0).abs()).unwrap())
                .map(|(i, _)| i)
                .unwrap_or(0);
            let end_offset = other_blocks[start_offset..]
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| (x1 - a.x1).abs().partial_cmp(&(x1 - b.x1).abs()).unwrap())
                .map(|(i, _)| i)
                .unwrap_or(0);

            let start = prev_other_idx + start_offset;
            let end = prev_other_idx + start_offset + end_offset;
            let new_blocks_count = end - start + 1;
            let new_block_length = (x1 - x0) / new_blocks_count as f32;
            for (slot, target) in aligned[start..=end].iter_mut().enumerate() {
                let sub_x0 = x0 + slot as f32 * new_block_length;
                let sub_x1 = sub_x0 + new_block_length;
                *target = Some(Block { x0: sub_x0, x1: sub_x1, text: block.text.clone() });
            }
        }

        prev_other_idx = other_idx.map(|end| end + 1).unwrap_or(prev_other_idx);
    }

    Some(aligned)
}

/// Align `blocks` onto `reference`, returning a vector the length of
/// whichever of the two has more blocks. Returns `None` on failure.
pub fn align_blocks(blocks: &[Block], reference: &[Block]) -> Option<Vec<Option<Block>>> {
    if blocks.is_empty() || reference.is_empty() {
        return None;
    }
    let block_gaps = gaps(blocks);
    let reference_gaps = gaps(reference);

    let (less, more, less_gaps, more_gaps) = if blocks.len() <= reference.len() {
        (blocks, reference, &block_gaps, &reference_gaps)
    } else {
        (reference, blocks, &reference_gaps, &block_gaps)
    };

    if less.len() == 1 {
        align_single(&less[0], more_gaps)
    } else {
        align_multiple(less, more, less_gaps, more_gaps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(x0: f32, x1: f32, text: &str) -> Block {
        Block { x0, x1, text: text.to_string() }
    }

    #[test]
    fn single_block_placed_into_matching_column() {
        let reference = vec![block(0.0, 10.0, "Label"), block(100.0, 120.0, "2023"), block(150.0, 170.0, "2022")];
        let row = vec![block(98.0, 122.0, "2023")];
        let aligned = align_blocks(&row, &reference).unwrap();
        assert_eq!(aligned.len(), 3);
        assert!(aligned[0].is_none());
        assert!(aligned[1].is_some());
        assert!(aligned[2].is_none());
    }

    #[test]
    fn single_block_straddling_a_gap_fails() {
        let reference = vec![block(0.0, 10.0, "Label"), block(100.0, 120.0, "2023"), block(150.0, 170.0, "2022")];
        let row = vec![block(5.0, 105.0, "weird")];
        assert!(align_blocks(&row, &reference).is_none());
    }

    #[test]
    fn multi_block_row_aligns_onto_wider_reference() {
        let reference = vec![block(0.0, 10.0, "Label"), block(100.0, 120.0, "2023"), block(150.0, 170.0, "2022")];
        let row = vec![block(0.0, 10.0, "Revenue"), block(99.0, 121.0, "500"), block(149.0, 171.0, "480")];
        let aligned = align_blocks(&row, &reference).unwrap();
        assert_eq!(aligned.len(), 3);
        assert!(aligned.iter().all(Option::is_some));
    }

    #[test]
    fn equal_length_rows_align_one_to_one() {
        let reference = vec![block(0.0, 10.0, "Label"), block(100.0, 120.0, "2023")];
        let row = vec![block(1.0, 9.0, "Revenue"), block(101.0, 119.0, "500")];
        let aligned = align_blocks(&row, &reference).unwrap();
        assert_eq!(aligned.len(), 2);
        assert_eq!(aligned[0].as_ref().unwrap().text, "Revenue");
    }
}
