//! Top-level shaping pipeline (spec.md §2): buffer init, normalization, mask
//! setup, cmap mapping, GDEF classification, GSUB/GPOS lookup application,
//! and the mark-positioning fallback, in that order.

use crate::buffer::{Buffer, BufferFlags, BufferScratchFlags, GlyphBuffer, UnicodeBuffer};
use crate::face::Face;
use crate::fallback;
use crate::ot::apply::{ApplyContext, TableKind};
use crate::ot::layout::{GlyphClass, LayoutTable, LookupHeader, LookupIndex};
use crate::ot::layout_gpos::GposLookup;
use crate::ot::layout_gsub::GsubLookup;
use crate::ot::map::MapLookup;
use crate::parser::{Offset32, Stream};
use crate::plan::ShapePlan;
use crate::unicode::{self, normalize::normalize, CharExt};
use crate::Feature;

/// GSUB lookup type 7 and GPOS lookup type 9 both mean "Extension": escape
/// hatch for a subtable that needs a 32-bit offset (spec.md §4.1).
const EXTENSION_GSUB: u16 = 7;
const EXTENSION_GPOS: u16 = 9;

/// Shapes `buffer` against `face`'s GSUB/GPOS/GDEF/cmap tables, honoring
/// `features` as caller-requested toggles layered over the active script's
/// default feature list (spec.md §2's full pipeline).
pub fn shape(face: &Face, features: &[Feature], buffer: UnicodeBuffer) -> GlyphBuffer {
    let mut buffer = buffer.buffer;
    buffer.guess_segment_properties();
    set_unicode_properties(&mut buffer);

    let plan = ShapePlan::new(face, buffer.direction(), buffer.script, buffer.language.as_ref(), features);

    normalize(&plan, face, &mut buffer);
    buffer.reset_masks(crate::ot::map::GLOBAL_BIT);
    plan.shaper.setup_masks(&mut buffer, &plan.map);

    map_to_glyphs(face, &mut buffer);
    classify_glyphs(face, &mut buffer);

    apply_gsub(face, &plan, &mut buffer);
    if face.gsub.is_none() {
        plan.shaper.fallback_shape(face, &mut buffer);
    }

    set_base_advances(face, &mut buffer);
    hide_default_ignorables(&mut buffer);

    apply_gpos(face, &plan, &mut buffer);

    if plan.shaper.zero_width_marks() {
        buffer.zero_mark_widths_by_gdef(face);
    }

    if plan.shaper.fallback_position() && !buffer.scratch_flags().contains(BufferScratchFlags::HAS_GPOS_ATTACHMENT) {
        fallback::position_marks(face, &mut buffer);
    }

    plan.shaper.postprocess_glyphs(face, &mut buffer);

    if plan.direction.is_backward() {
        buffer.reverse_clusters();
    }

    log::debug!("shaped {} glyphs (script={:?}, direction={:?})", buffer.len(), plan.script, plan.direction);

    GlyphBuffer { buffer }
}

/// Buffer init's per-codepoint Unicode-property annotation: general
/// category, modified combining class, and the default-ignorable flag, all
/// consulted by the normalizer's reorder pass and the later hide pass before
/// anything has had a chance to set them.
fn set_unicode_properties(buffer: &mut Buffer) {
    let mut scratch = BufferScratchFlags::empty();

    for info in buffer.info_mut() {
        if info.codepoint > 0x7f {
            scratch.insert(BufferScratchFlags::HAS_NON_ASCII);
        }

        if let Some(c) = char::from_u32(info.codepoint) {
            info.set_general_category(unicode::GeneralCategory::of(c));
            info.set_modified_combining_class(c.modified_combining_class());
        }

        if unicode::is_default_ignorable(info.codepoint) {
            info.set_default_ignorable(true);
            scratch.insert(BufferScratchFlags::HAS_DEFAULT_IGNORABLES);
        }

        if info.codepoint == 0x034F {
            scratch.insert(BufferScratchFlags::HAS_CGJ);
            info.set_hidden(true);
        }
    }

    buffer.set_scratch_flags(buffer.scratch_flags() | scratch);
}

fn map_to_glyphs(face: &Face, buffer: &mut Buffer) {
    for info in buffer.info_mut() {
        let glyph = face.glyph_index(info.as_char()).map(|g| g.0 as u32).unwrap_or(0);
        info.glyph_id = glyph;
    }
}

fn classify_glyphs(face: &Face, buffer: &mut Buffer) {
    for info in buffer.info_mut() {
        let glyph = ttf_parser::GlyphId(info.glyph_id as u16);
        let props = match face.glyph_class(glyph) {
            GlyphClass::Base => crate::buffer::GlyphPropsFlags::BASE_GLYPH,
            GlyphClass::Ligature => crate::buffer::GlyphPropsFlags::LIGATURE,
            GlyphClass::Mark => crate::buffer::GlyphPropsFlags::MARK,
            GlyphClass::Component => crate::buffer::GlyphPropsFlags::COMPONENT,
            GlyphClass::Unclassified => crate::buffer::GlyphPropsFlags::empty(),
        };
        info.set_glyph_props(props);
    }
}

fn set_base_advances(face: &Face, buffer: &mut Buffer) {
    let vertical = buffer.direction().is_vertical();
    for i in 0..buffer.len() {
        let glyph_id = buffer.info()[i].glyph_id;
        let pos = &mut buffer.pos_mut()[i];
        if vertical {
            pos.y_advance = face.glyph_v_advance(glyph_id);
        } else {
            pos.x_advance = face.glyph_h_advance(glyph_id);
        }
    }
}

/// Zeroes the advance of every default-ignorable position (a variation
/// selector, Mongolian FVS, CGJ, or similar invisible codepoint) that
/// survived GSUB unsubstituted, unless the caller asked to preserve or
/// physically remove them (spec.md's buffer-flags entity, SPEC_FULL §B).
fn hide_default_ignorables(buffer: &mut Buffer) {
    let flags = buffer.flags;
    if flags.contains(BufferFlags::PRESERVE_DEFAULT_IGNORABLES) {
        return;
    }

    if flags.contains(BufferFlags::REMOVE_DEFAULT_IGNORABLES) {
        buffer.delete_glyphs_inplace(|info| !info.is_default_ignorable());
        return;
    }

    for i in 0..buffer.len() {
        if buffer.info()[i].is_default_ignorable() {
            buffer.info_mut()[i].set_hidden(true);
            let pos = &mut buffer.pos_mut()[i];
            pos.x_advance = 0;
            pos.y_advance = 0;
        }
    }
}

/// Unwraps GSUB type 7 / GPOS type 9 Extension subtables, which exist only
/// to relocate a real subtable past the 16-bit offset limit (spec.md §4.1).
/// Returns the real lookup type and the real subtable's bytes.
fn resolve_subtable<'a>(lookup_kind: u16, table: TableKind, data: &'a [u8]) -> Option<(u16, &'a [u8])> {
    let extension_kind = match table {
        TableKind::Gsub => EXTENSION_GSUB,
        TableKind::Gpos => EXTENSION_GPOS,
    };

    if lookup_kind != extension_kind {
        return Some((lookup_kind, data));
    }

    let mut s = Stream::new(data);
    let format: u16 = s.read()?;
    if format != 1 {
        return None;
    }
    let real_kind: u16 = s.read()?;
    let real_offset: Offset32 = s.read()?;
    let real_data = data.get(real_offset.to_usize()..)?;
    Some((real_kind, real_data))
}

fn apply_gsub(face: &Face, plan: &ShapePlan, buffer: &mut Buffer) {
    let table = match face.gsub {
        Some(t) => t,
        None => return,
    };

    for stage in &plan.map.gsub_stages {
        for map_lookup in stage {
            apply_gsub_lookup(face, &table, map_lookup, buffer);
        }
        plan.shaper.post_gsub_stage(buffer);
    }
}

fn apply_gsub_lookup(face: &Face, table: &LayoutTable, map_lookup: &MapLookup, buffer: &mut Buffer) {
    let header = match table.lookup_at(map_lookup.index) {
        Some(h) => h,
        None => return,
    };

    if lookup_is_reverse(&header) {
        apply_gsub_reverse(face, table, &header, map_lookup, buffer);
        return;
    }

    buffer.clear_output();
    while buffer.idx < buffer.len() {
        if !position_is_gated(buffer, buffer.idx, map_lookup.mask) {
            buffer.next_glyph();
            continue;
        }

        let before = buffer.idx;
        let applied = try_subtables_gsub(face, table, &header, map_lookup, buffer);

        if !applied {
            buffer.next_glyph();
        } else if buffer.idx == before {
            // Context/chaining lookups don't self-advance; the caller must.
            buffer.next_glyph();
        }
    }
    buffer.sync();
}

fn apply_gsub_reverse(face: &Face, table: &LayoutTable, header: &LookupHeader, map_lookup: &MapLookup, buffer: &mut Buffer) {
    let len = buffer.len();
    for i in (0..len).rev() {
        if !position_is_gated(buffer, i, map_lookup.mask) {
            continue;
        }

        for si in 0..header.subtable_count() {
            let data = match header.subtable_data(si) {
                Some(d) => d,
                None => continue,
            };
            let (kind, data) = match resolve_subtable(header.kind, TableKind::Gsub, data) {
                Some(v) => v,
                None => continue,
            };
            let lookup = match GsubLookup::parse(kind, data) {
                Some(l) => l,
                None => continue,
            };

            let mut ctx = ApplyContext::new(face, buffer, TableKind::Gsub);
            ctx.lookup_flags = header.flags;
            ctx.mark_filtering_set = header.mark_filtering_set;
            ctx.feature_mask = map_lookup.mask;
            if lookup.apply_reverse(&mut ctx, i) {
                break;
            }
        }
    }
}

fn try_subtables_gsub(face: &Face, table: &LayoutTable, header: &LookupHeader, map_lookup: &MapLookup, buffer: &mut Buffer) -> bool {
    for si in 0..header.subtable_count() {
        let data = match header.subtable_data(si) {
            Some(d) => d,
            None => continue,
        };
        let (kind, data) = match resolve_subtable(header.kind, TableKind::Gsub, data) {
            Some(v) => v,
            None => continue,
        };
        let lookup = match GsubLookup::parse(kind, data) {
            Some(l) => l,
            None => continue,
        };

        let mut ctx = ApplyContext::new(face, buffer, TableKind::Gsub);
        ctx.lookup_flags = header.flags;
        ctx.mark_filtering_set = header.mark_filtering_set;
        ctx.feature_mask = map_lookup.mask;

        let mut nested = |ctx: &mut ApplyContext, idx: LookupIndex, pos: usize| {
            apply_nested_lookup(table, TableKind::Gsub, ctx, idx, pos)
        };

        if lookup.apply(&mut ctx, &mut nested) {
            return true;
        }
    }
    false
}

fn apply_gpos(face: &Face, plan: &ShapePlan, buffer: &mut Buffer) {
    let table = match face.gpos {
        Some(t) => t,
        None => return,
    };

    for map_lookup in &plan.map.gpos_lookups {
        apply_gpos_lookup(face, &table, map_lookup, buffer);
    }
}

fn apply_gpos_lookup(face: &Face, table: &LayoutTable, map_lookup: &MapLookup, buffer: &mut Buffer) {
    let header = match table.lookup_at(map_lookup.index) {
        Some(h) => h,
        None => return,
    };

    buffer.idx = 0;
    while buffer.idx < buffer.len() {
        if !position_is_gated(buffer, buffer.idx, map_lookup.mask) {
            buffer.idx += 1;
            continue;
        }

        let before = buffer.idx;
        let applied = try_subtables_gpos(face, table, &header, map_lookup, buffer);

        if !applied || buffer.idx == before {
            buffer.idx = before + 1;
        }
    }
}

fn try_subtables_gpos(face: &Face, table: &LayoutTable, header: &LookupHeader, map_lookup: &MapLookup, buffer: &mut Buffer) -> bool {
    for si in 0..header.subtable_count() {
        let data = match header.subtable_data(si) {
            Some(d) => d,
            None => continue,
        };
        let (kind, data) = match resolve_subtable(header.kind, TableKind::Gpos, data) {
            Some(v) => v,
            None => continue,
        };
        let lookup = match GposLookup::parse(kind, data) {
            Some(l) => l,
            None => continue,
        };

        let mut ctx = ApplyContext::new(face, buffer, TableKind::Gpos);
        ctx.lookup_flags = header.flags;
        ctx.mark_filtering_set = header.mark_filtering_set;
        ctx.feature_mask = map_lookup.mask;

        let mut nested = |ctx: &mut ApplyContext, idx: LookupIndex, pos: usize| {
            apply_nested_lookup(table, TableKind::Gpos, ctx, idx, pos)
        };

        if lookup.apply(&mut ctx, &mut nested) {
            return true;
        }
    }
    false
}

/// Applies one nested (context/chaining-recursed) lookup at `pos`, honoring
/// that lookup's own flags/mark-filtering-set rather than the parent's
/// (spec.md §4.4). Recursion always stays within the table it started in.
fn apply_nested_lookup(table: &LayoutTable, kind: TableKind, ctx: &mut ApplyContext, index: LookupIndex, pos: usize) -> bool {
    if ctx.recursing() {
        return false;
    }

    let header = match table.lookup_at(index) {
        Some(h) => h,
        None => return false,
    };

    let saved_idx = ctx.buffer.idx;
    let saved_flags = ctx.lookup_flags;
    let saved_filter = ctx.mark_filtering_set;
    let saved_nesting = ctx.nesting_level;

    ctx.buffer.idx = pos;
    ctx.lookup_flags = header.flags;
    ctx.mark_filtering_set = header.mark_filtering_set;
    ctx.nesting_level += 1;

    let mut applied = false;
    for si in 0..header.subtable_count() {
        let data = match header.subtable_data(si) {
            Some(d) => d,
            None => continue,
        };
        let (real_kind, real_data) = match resolve_subtable(header.kind, kind, data) {
            Some(v) => v,
            None => continue,
        };

        let hit = match kind {
            TableKind::Gsub => match GsubLookup::parse(real_kind, real_data) {
                Some(lookup) => {
                    let mut nested = |ctx: &mut ApplyContext, idx: LookupIndex, pos: usize| {
                        apply_nested_lookup(table, TableKind::Gsub, ctx, idx, pos)
                    };
                    lookup.apply(ctx, &mut nested)
                }
                None => false,
            },
            TableKind::Gpos => match GposLookup::parse(real_kind, real_data) {
                Some(lookup) => {
                    let mut nested = |ctx: &mut ApplyContext, idx: LookupIndex, pos: usize| {
                        apply_nested_lookup(table, TableKind::Gpos, ctx, idx, pos)
                    };
                    lookup.apply(ctx, &mut nested)
                }
                None => false,
            },
        };

        if hit {
            applied = true;
            break;
        }
    }

    ctx.buffer.idx = saved_idx;
    ctx.lookup_flags = saved_flags;
    ctx.mark_filtering_set = saved_filter;
    ctx.nesting_level = saved_nesting;

    applied
}

/// Whether `buffer`'s position at `pos` carries this lookup's feature mask
/// bit; a position with none of the bits set is invisible to the lookup
/// (spec.md §4.3).
fn position_is_gated(buffer: &Buffer, pos: usize, mask: crate::Mask) -> bool {
    buffer.info()[pos].mask & mask != 0
}

/// A lookup is reverse-chaining (GSUB type 8) uniformly across all of its
/// subtables, so the first parseable one settles it.
fn lookup_is_reverse(header: &LookupHeader) -> bool {
    for si in 0..header.subtable_count() {
        let data = match header.subtable_data(si) {
            Some(d) => d,
            None => continue,
        };
        if let Some((kind, data)) = resolve_subtable(header.kind, TableKind::Gsub, data) {
            if let Some(lookup) = GsubLookup::parse(kind, data) {
                return lookup.is_reverse();
            }
        }
    }
    false
}
