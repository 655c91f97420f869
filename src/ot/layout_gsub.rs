//! GSUB lookup-type subtable bodies and their `apply()` (spec.md §4.1 item
//! 4, §4.5 for the application algorithm).

use crate::buffer::GlyphPropsFlags;
use crate::ot::apply::ApplyContext;
use crate::ot::context::{ChainContextLookup, ContextLookup};
use crate::ot::layout::{Coverage, GlyphId, LookupIndex};
use crate::parser::{LazyArray16, Offset16, Stream};

pub enum GsubLookup<'a> {
    SingleFormat1 { coverage: Coverage<'a>, delta: i16 },
    SingleFormat2 { coverage: Coverage<'a>, substitutes: LazyArray16<'a, GlyphId> },
    Multiple { coverage: Coverage<'a>, sequences: LazyArray16<'a, Offset16>, base: &'a [u8] },
    Alternate { coverage: Coverage<'a>, alt_sets: LazyArray16<'a, Offset16>, base: &'a [u8] },
    Ligature { coverage: Coverage<'a>, lig_sets: LazyArray16<'a, Offset16>, base: &'a [u8] },
    Context(ContextLookup<'a>),
    Chaining(ChainContextLookup<'a>),
    ReverseChainSingle {
        coverage: Coverage<'a>,
        backtrack_coverages: Vec<Coverage<'a>>,
        lookahead_coverages: Vec<Coverage<'a>>,
        substitutes: LazyArray16<'a, GlyphId>,
    },
}

impl<'a> GsubLookup<'a> {
    pub fn parse(kind: u16, data: &'a [u8]) -> Option<Self> {
        match kind {
            1 => {
                let mut s = Stream::new(data);
                let format: u16 = s.read()?;
                let cov_off: Offset16 = s.read()?;
                let coverage = Coverage::parse(data.get(cov_off.to_usize()..)?)?;
                match format {
                    1 => Some(GsubLookup::SingleFormat1 { coverage, delta: s.read()? }),
                    2 => Some(GsubLookup::SingleFormat2 { coverage, substitutes: s.read_array16()? }),
                    _ => None,
                }
            }
            2 => {
                let mut s = Stream::new(data);
                s.skip::<u16>();
                let cov_off: Offset16 = s.read()?;
                let sequences = s.read_array16()?;
                Some(GsubLookup::Multiple {
                    coverage: Coverage::parse(data.get(cov_off.to_usize()..)?)?,
                    sequences,
                    base: data,
                })
            }
            3 => {
                let mut s = Stream::new(data);
                s.skip::<u16>();
                let cov_off: Offset16 = s.read()?;
                let alt_sets = s.read_array16()?;
                Some(GsubLookup::Alternate {
                    coverage: Coverage::parse(data.get(cov_off.to_usize()..)?)?,
                    alt_sets,
                    base: data,
                })
            }
            4 => {
                let mut s = Stream::new(data);
                s.skip::<u16>();
                let cov_off: Offset16 = s.read()?;
                let lig_sets = s.read_array16()?;
                Some(GsubLookup::Ligature {
                    coverage: Coverage::parse(data.get(cov_off.to_usize()..)?)?,
                    lig_sets,
                    base: data,
                })
            }
            5 => ContextLookup::parse(data).map(GsubLookup::Context),
            6 => ChainContextLookup::parse(data).map(GsubLookup::Chaining),
            8 => {
                let mut s = Stream::new(data);
                s.skip::<u16>();
                let cov_off: Offset16 = s.read()?;
                let coverage = Coverage::parse(data.get(cov_off.to_usize()..)?)?;
                let backtrack_count: u16 = s.read()?;
                let mut backtrack_coverages = Vec::with_capacity(backtrack_count as usize);
                for _ in 0..backtrack_count {
                    let off: Offset16 = s.read()?;
                    backtrack_coverages.push(Coverage::parse(data.get(off.to_usize()..)?)?);
                }
                let lookahead_count: u16 = s.read()?;
                let mut lookahead_coverages = Vec::with_capacity(lookahead_count as usize);
                for _ in 0..lookahead_count {
                    let off: Offset16 = s.read()?;
                    lookahead_coverages.push(Coverage::parse(data.get(off.to_usize()..)?)?);
                }
                let substitutes = s.read_array16()?;
                Some(GsubLookup::ReverseChainSingle {
                    coverage,
                    backtrack_coverages,
                    lookahead_coverages,
                    substitutes,
                })
            }
            // Type 7 (Extension) is unwrapped by the caller before `parse` runs.
            _ => None,
        }
    }

    /// Reverse single substitution (type 8) walks the buffer back-to-front
    /// and is dispatched separately from the forward pass; every other type
    /// is applied at `ctx.buffer.idx` by the forward driver.
    pub fn is_reverse(&self) -> bool {
        matches!(self, GsubLookup::ReverseChainSingle { .. })
    }

    pub fn apply(
        &self,
        ctx: &mut ApplyContext,
        apply_nested: &mut dyn FnMut(&mut ApplyContext, LookupIndex, usize) -> bool,
    ) -> bool {
        let idx = ctx.buffer.idx;
        let glyph = GlyphId(ctx.buffer.info()[idx].glyph_id as u16);

        match self {
            GsubLookup::SingleFormat1 { coverage, delta } => {
                if coverage.get(glyph).is_none() {
                    return false;
                }
                let new_glyph = (glyph.0 as i32 + *delta as i32) as u16;
                ctx.buffer.replace_glyph(new_glyph as u32);
                true
            }
            GsubLookup::SingleFormat2 { coverage, substitutes } => {
                let cov_idx = match coverage.get(glyph) {
                    Some(i) => i,
                    None => return false,
                };
                let new_glyph = match substitutes.get(cov_idx) {
                    Some(g) => g,
                    None => return false,
                };
                ctx.buffer.replace_glyph(new_glyph.0 as u32);
                true
            }
            GsubLookup::Multiple { coverage, sequences, base } => {
                let cov_idx = match coverage.get(glyph) {
                    Some(i) => i,
                    None => return false,
                };
                let seq_off = match sequences.get(cov_idx) {
                    Some(o) if !o.is_null() => o,
                    _ => return false,
                };
                let seq_data = match base.get(seq_off.to_usize()..) {
                    Some(d) => d,
                    None => return false,
                };
                let glyphs = match Stream::new(seq_data).read_array16::<GlyphId>() {
                    Some(g) => g,
                    None => return false,
                };
                if glyphs.len() == 0 {
                    // An empty sequence deletes the input glyph entirely.
                    ctx.buffer.delete_glyph();
                    return true;
                }
                let ids: Vec<u32> = glyphs.iter().map(|g| g.0 as u32).collect();
                ctx.buffer.replace_glyphs(1, &ids);
                true
            }
            GsubLookup::Alternate { coverage, alt_sets, base } => {
                let cov_idx = match coverage.get(glyph) {
                    Some(i) => i,
                    None => return false,
                };
                let set_off = match alt_sets.get(cov_idx) {
                    Some(o) if !o.is_null() => o,
                    _ => return false,
                };
                let set_data = match base.get(set_off.to_usize()..) {
                    Some(d) => d,
                    None => return false,
                };
                let alts = match Stream::new(set_data).read_array16::<GlyphId>() {
                    Some(a) => a,
                    None => return false,
                };
                // No UI feature index is plumbed through shaping, so the
                // first alternate is the default, matching most shaping
                // engines absent an explicit selector.
                let chosen = match alts.get(0) {
                    Some(g) => g,
                    None => return false,
                };
                ctx.buffer.replace_glyph(chosen.0 as u32);
                true
            }
            GsubLookup::Ligature { coverage, lig_sets, base } => {
                let cov_idx = match coverage.get(glyph) {
                    Some(i) => i,
                    None => return false,
                };
                let set_off = match lig_sets.get(cov_idx) {
                    Some(o) if !o.is_null() => o,
                    _ => return false,
                };
                let set_data = match base.get(set_off.to_usize()..) {
                    Some(d) => d,
                    None => return false,
                };
                apply_ligature_set(ctx, set_data)
            }
            GsubLookup::Context(c) => c.apply(ctx, apply_nested),
            GsubLookup::Chaining(c) => c.apply(ctx, apply_nested),
            GsubLookup::ReverseChainSingle { .. } => false, // handled by `apply_reverse`
        }
    }

    pub fn apply_reverse(&self, ctx: &mut ApplyContext, idx: usize) -> bool {
        match self {
            GsubLookup::ReverseChainSingle { coverage, backtrack_coverages, lookahead_coverages, substitutes } => {
                let glyph = GlyphId(ctx.buffer.info()[idx].glyph_id as u16);
                let cov_idx = match coverage.get(glyph) {
                    Some(i) => i,
                    None => return false,
                };

                use crate::ot::matching::{match_backtrack, match_lookahead};
                if !match_backtrack(
                    ctx.face,
                    ctx.buffer,
                    idx,
                    backtrack_coverages.len(),
                    ctx.lookup_flags,
                    ctx.mark_filtering_set,
                    |i, info| backtrack_coverages[i].contains(GlyphId(info.glyph_id as u16)),
                ) {
                    return false;
                }
                if !match_lookahead(
                    ctx.face,
                    ctx.buffer,
                    idx + 1,
                    lookahead_coverages.len(),
                    ctx.lookup_flags,
                    ctx.mark_filtering_set,
                    |i, info| lookahead_coverages[i].contains(GlyphId(info.glyph_id as u16)),
                ) {
                    return false;
                }

                let new_glyph = match substitutes.get(cov_idx) {
                    Some(g) => g,
                    None => return false,
                };
                ctx.buffer.info_mut()[idx].glyph_id = new_glyph.0 as u32;
                true
            }
            _ => false,
        }
    }
}

fn apply_ligature_set(ctx: &mut ApplyContext, set_data: &[u8]) -> bool {
    let ligatures = match Stream::new(set_data).read_array16::<Offset16>() {
        Some(l) => l,
        None => return false,
    };

    let start = ctx.buffer.idx;

    for lig_off in ligatures.iter() {
        let lig_data = match set_data.get(lig_off.to_usize()..) {
            Some(d) => d,
            None => continue,
        };
        let mut s = Stream::new(lig_data);
        let lig_glyph: GlyphId = match s.read() { Some(v) => v, None => continue };
        let component_count: u16 = match s.read() { Some(v) => v, None => continue };
        if component_count == 0 {
            continue;
        }
        let components = match s.read_array_of_count16::<GlyphId>(component_count - 1) {
            Some(c) => c,
            None => continue,
        };

        let mut it = components.iter();
        let positions = crate::ot::matching::match_input(
            ctx.face,
            ctx.buffer,
            start,
            component_count as usize,
            ctx.lookup_flags,
            ctx.mark_filtering_set,
            ctx.feature_mask,
            |i, info| {
                if i == start {
                    return true;
                }
                match it.next() {
                    Some(g) => g.0 == info.glyph_id as u16,
                    None => false,
                }
            },
        );

        if let Some(positions) = positions {
            let lig_id = ctx.buffer.allocate_lig_id();
            let last = *positions.last().unwrap();
            let out_start = ctx.buffer.out_len();

            // Walk every input glyph (matched or skipped) from start..=last,
            // tagging marks that rode along as ligature components so later
            // GPOS mark attachment can still find the right anchor.
            let mut comp = 1u8;
            for i in start..=last {
                if i == start {
                    ctx.buffer.output_glyph(lig_glyph.0 as u32);
                    let out_idx = ctx.buffer.out_len() - 1;
                    let lig_info = &mut ctx.buffer.out_info_mut()[out_idx];
                    lig_info.set_lig_props_for_ligature(lig_id, (positions.len() - 1) as u8);
                    lig_info.glyph_props.insert(GlyphPropsFlags::LIGATED);
                    ctx.buffer.idx += 1;
                } else if positions.contains(&i) {
                    ctx.buffer.skip_glyph();
                    comp += 1;
                } else {
                    // A glyph the lookup flags skipped over (e.g. a mark):
                    // carried through, tagged as belonging to this ligature.
                    let mut info = ctx.buffer.info()[i];
                    info.set_lig_props_for_mark(lig_id, comp.saturating_sub(1));
                    ctx.buffer.output_info(info);
                    ctx.buffer.idx += 1;
                }
            }

            ctx.buffer.merge_clusters(out_start, ctx.buffer.out_len());
            return true;
        }
    }

    false
}
