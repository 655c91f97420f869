//! Font-aware Unicode normalization: decompose, reorder, recompose
//! (spec.md §4.8).

use crate::buffer::{Buffer, GlyphInfo};
use crate::complex::ComplexShaper;
use crate::face::Face;
use crate::plan::ShapePlan;

use super::CharExt;

/// Whether recomposition is attempted after decomposition + reorder.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NormalizationMode {
    Auto,
    Decomposed,
    ComposedDiacritics,
    ComposedDiacriticsNoShortCircuit,
}

pub(crate) fn normalize(plan: &ShapePlan, face: &Face, buffer: &mut Buffer) {
    let mode = plan.shaper.normalization_preference();

    decompose_pass(plan, face, buffer, mode);
    reorder_pass(plan, buffer);
    if mode != NormalizationMode::Decomposed {
        recompose_pass(plan, face, buffer);
    }

    unhide_default_ignorables_between_marks(buffer);
}

fn decompose_pass(plan: &ShapePlan, face: &Face, buffer: &mut Buffer, mode: NormalizationMode) {
    buffer.clear_output();

    while buffer.idx < buffer.len() {
        let c = buffer.info()[buffer.idx].as_char();

        // First try the shaper's own decomposition (e.g. Khmer splitting a
        // two-part vowel sign) before falling back to canonical Unicode
        // decomposition.
        if let Some((a, b)) = plan.shaper.decompose(c) {
            if try_decompose_two(face, buffer, a, b) {
                continue;
            }
        }

        if let Some(decomposed) = canonical_decompose(c) {
            if try_decompose_two(face, buffer, decomposed[0], decomposed[1]) {
                continue;
            }
        }

        let _ = mode;
        buffer.next_glyph();
    }

    buffer.sync();
}

fn try_decompose_two(face: &Face, buffer: &mut Buffer, a: char, b: char) -> bool {
    if !face.has_glyph_for_char(a) || !face.has_glyph_for_char(b) {
        return false;
    }

    let start = buffer.out_len();
    let orig = buffer.info()[buffer.idx];

    let mut info_a = orig;
    info_a.codepoint = a as u32;
    info_a.set_modified_combining_class(a.modified_combining_class());
    buffer.output_info(info_a);

    let mut info_b = orig;
    info_b.codepoint = b as u32;
    info_b.set_modified_combining_class(b.modified_combining_class());
    buffer.output_info(info_b);

    buffer.idx += 1;
    buffer.merge_clusters(start, buffer.out_len());
    true
}

/// Canonical decomposition via `unic-ucd-normal`'s one-step pairwise
/// decomposition. Longer decompositions are reached by the caller
/// re-invoking decomposition on the resulting parts in a later pass, the
/// same recursive structure HarfBuzz's `normalize.hh` uses.
fn canonical_decompose(c: char) -> Option<Vec<char>> {
    let (a, b) = unic_ucd_normal::decompose_canonical(c)?;
    Some(vec![a, b])
}

fn reorder_pass(plan: &ShapePlan, buffer: &mut Buffer) {
    let len = buffer.len();
    let mut start = 0;
    while start < len {
        if buffer.info()[start].modified_combining_class() == 0 {
            start += 1;
            continue;
        }

        let mut end = start;
        while end < len && buffer.info()[end].modified_combining_class() != 0 && end - start < 32 {
            end += 1;
        }

        stable_sort_by_ccc(buffer, start, end);
        plan.shaper.reorder_marks(buffer, start, end);
        buffer.merge_clusters(start, end);

        start = end;
    }
}

fn stable_sort_by_ccc(buffer: &mut Buffer, start: usize, end: usize) {
    // Insertion sort: runs are capped at 32 entries (spec.md §4.8), so O(n^2)
    // is fine and keeps the sort stable, which is required (ties must
    // preserve input order).
    for i in start + 1..end {
        let mut j = i;
        while j > start
            && buffer.info()[j - 1].modified_combining_class() > buffer.info()[j].modified_combining_class()
        {
            buffer.info.swap(j - 1, j);
            buffer.pos.swap(j - 1, j);
            j -= 1;
        }
    }
}

fn recompose_pass(plan: &ShapePlan, face: &Face, buffer: &mut Buffer) {
    if buffer.len() < 2 {
        return;
    }

    buffer.clear_output();
    buffer.next_glyph(); // Always keep the first position as a starter candidate.

    while buffer.idx < buffer.len() {
        let starter_out_idx = buffer.out_len() - 1;
        let starter = buffer.out_info[starter_out_idx];
        let current = buffer.info()[buffer.idx];

        let blocked = (starter_out_idx + 1..buffer.out_len())
            .any(|i| buffer.out_info[i].modified_combining_class() >= current.modified_combining_class());

        let a = starter.as_char();
        let b = current.as_char();

        if !blocked && current.modified_combining_class() != 0 {
            // The shaper gets first say (e.g. to provide a non-standard
            // composition); falling through to `unic_ucd_normal::compose`,
            // which already enforces the full-composition-exclusion list,
            // covers every shaper with no override.
            let composed = plan.shaper.compose(a, b).or_else(|| unic_ucd_normal::compose(a, b));

            if let Some(composed) = composed {
                if face.has_glyph_for_char(composed) {
                    buffer.out_info[starter_out_idx].codepoint = composed as u32;
                    buffer.merge_clusters(starter_out_idx, buffer.out_len().max(starter_out_idx + 1));
                    buffer.idx += 1;
                    continue;
                }
            }
        }

        buffer.next_glyph();
    }

    buffer.sync();
}

/// After the reorder + recompose passes, a CGJ (U+034F) sitting between two
/// marks whose modified CCCs are already correctly ordered is allowed to
/// become transparent to later context matching (spec.md §4.8, final
/// paragraph).
fn unhide_default_ignorables_between_marks(buffer: &mut Buffer) {
    let len = buffer.len();
    for i in 0..len {
        if buffer.info()[i].codepoint == 0x034F && buffer.info()[i].is_hidden() {
            let prev_ccc = if i > 0 { buffer.info()[i - 1].modified_combining_class() } else { 0 };
            let next_ccc = if i + 1 < len { buffer.info()[i + 1].modified_combining_class() } else { 0 };
            if prev_ccc != 0 && next_ccc != 0 && prev_ccc <= next_ccc {
                buffer.info_mut()[i].set_hidden(false);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_sort_preserves_tie_order() {
        let mut buffer = Buffer::new();
        buffer.add(0x0041, 0);
        buffer.add(0x0300, 0); // combining grave, ccc=230
        buffer.add(0x0301, 0); // combining acute, ccc=230
        for info in buffer.info.iter_mut() {
            info.set_modified_combining_class(info.as_char().modified_combining_class());
        }
        stable_sort_by_ccc(&mut buffer, 1, 3);
        assert_eq!(buffer.info()[1].codepoint, 0x0300);
        assert_eq!(buffer.info()[2].codepoint, 0x0301);
    }
}
