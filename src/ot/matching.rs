//! The skipping iterator (spec.md §4.3): decides which buffer positions a
//! lookup's `LookupFlags` make invisible to context/backtrack/lookahead
//! matching, and walks backtrack/input/lookahead glyph sequences against a
//! match predicate.

use crate::buffer::{Buffer, GlyphInfo};
use crate::face::Face;
use crate::ot::layout::{GlyphClass, LookupFlags};
use crate::Mask;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum SkipDecision {
    Yes,
    Maybe,
    No,
}

/// Whether `info` is ignored by a lookup with these flags (spec.md §4.3's
/// SKIP_YES/SKIP_MAYBE/SKIP_NO table, collapsed to a boolean: "maybe" only
/// matters for lookups that match zero-width insertions, which this crate
/// doesn't implement, so it's treated the same as "yes, skip").
fn skip_decision(face: &Face, info: &GlyphInfo, flags: LookupFlags, mark_filtering_set: Option<u16>) -> SkipDecision {
    let glyph = ttf_parser::GlyphId(info.glyph_id as u16);
    let class = face.glyph_class(glyph);

    if flags.contains(LookupFlags::IGNORE_BASE_GLYPHS) && class == GlyphClass::Base {
        return SkipDecision::Yes;
    }
    if flags.contains(LookupFlags::IGNORE_LIGATURES) && class == GlyphClass::Ligature {
        return SkipDecision::Yes;
    }
    if flags.contains(LookupFlags::IGNORE_MARKS) && class == GlyphClass::Mark {
        return SkipDecision::Yes;
    }

    if class == GlyphClass::Mark {
        if flags.contains(LookupFlags::USE_MARK_FILTERING_SET) {
            if let Some(set) = mark_filtering_set {
                if !face.mark_glyph_set_contains(set, glyph) {
                    return SkipDecision::Yes;
                }
            }
        } else {
            let wanted = flags.mark_attachment_class();
            if wanted != 0 && face.mark_attachment_class(glyph) != wanted as u16 {
                return SkipDecision::Yes;
            }
        }
    }

    SkipDecision::No
}

fn should_skip(
    face: &Face,
    buffer: &Buffer,
    pos: usize,
    flags: LookupFlags,
    mark_filtering_set: Option<u16>,
    effective_mask: Mask,
) -> bool {
    let info = buffer.matcher_info(pos);
    if effective_mask != 0 && info.mask & effective_mask == 0 {
        return true;
    }
    skip_decision(face, info, flags, mark_filtering_set) != SkipDecision::No
}

/// Walks forward from `start` (exclusive), skipping ignored positions,
/// collecting exactly `want` positions that satisfy `matches`. Returns the
/// matched indices, or `None` if the buffer runs out first.
pub(crate) fn match_input(
    face: &Face,
    buffer: &Buffer,
    start: usize,
    want: usize,
    flags: LookupFlags,
    mark_filtering_set: Option<u16>,
    effective_mask: Mask,
    mut matches: impl FnMut(usize, &GlyphInfo) -> bool,
) -> Option<Vec<usize>> {
    let len = buffer.len();
    let mut out = Vec::with_capacity(want);
    let mut pos = start;

    while out.len() < want {
        if pos >= len {
            return None;
        }
        if should_skip(face, buffer, pos, flags, mark_filtering_set, effective_mask) {
            pos += 1;
            continue;
        }
        if !matches(pos, buffer.matcher_info(pos)) {
            return None;
        }
        out.push(pos);
        pos += 1;
    }

    Some(out)
}

/// Walks backward from `start` (exclusive), the backtrack half of a chaining
/// context lookup.
pub(crate) fn match_backtrack(
    face: &Face,
    buffer: &Buffer,
    start: usize,
    want: usize,
    flags: LookupFlags,
    mark_filtering_set: Option<u16>,
    mut matches: impl FnMut(usize, &GlyphInfo) -> bool,
) -> bool {
    if start < want {
        // Still allow a short buffer if everything that exists matches and
        // we simply run out of backtrack context to check further.
    }

    let mut pos = start;
    let mut remaining = want;

    while remaining > 0 {
        if pos == 0 {
            return false;
        }
        pos -= 1;
        if should_skip(face, buffer, pos, flags, mark_filtering_set, 0) {
            continue;
        }
        if !matches(pos, buffer.matcher_info(pos)) {
            return false;
        }
        remaining -= 1;
    }

    true
}

/// Walks forward from `start` (exclusive of the input run), the lookahead
/// half of a chaining context lookup.
pub(crate) fn match_lookahead(
    face: &Face,
    buffer: &Buffer,
    start: usize,
    want: usize,
    flags: LookupFlags,
    mark_filtering_set: Option<u16>,
    mut matches: impl FnMut(usize, &GlyphInfo) -> bool,
) -> bool {
    let len = buffer.len();
    let mut pos = start;
    let mut remaining = want;

    while remaining > 0 {
        if pos >= len {
            return false;
        }
        if should_skip(face, buffer, pos, flags, mark_filtering_set, 0) {
            pos += 1;
            continue;
        }
        if !matches(pos, buffer.matcher_info(pos)) {
            return false;
        }
        pos += 1;
        remaining -= 1;
    }

    true
}
