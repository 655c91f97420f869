//! Context and chaining-context lookup formats (GSUB types 5/6, GPOS types
//! 7/8 share an identical wire encoding — spec.md §4.1 item 5/6). A
//! `SequenceLookupRecord` names, for one input position, which other lookup
//! to recurse into; the recursion itself is supplied by the caller since it
//! needs the full lookup list to resolve a `LookupIndex` back to a subtable.

use crate::ot::apply::ApplyContext;
use crate::ot::layout::{ClassDef, Coverage, GlyphId, LookupIndex};
use crate::ot::matching::{match_backtrack, match_input, match_lookahead};
use crate::parser::{FromData, LazyArray16, Offset16, Stream};

#[derive(Clone, Copy)]
struct SequenceLookupRecord {
    sequence_index: u16,
    lookup_index: LookupIndex,
}

impl FromData for SequenceLookupRecord {
    const SIZE: usize = 4;
    fn parse(data: &[u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        Some(SequenceLookupRecord { sequence_index: s.read()?, lookup_index: s.read()? })
    }
}

/// A parsed context/chaining-context subtable, generic over GSUB and GPOS.
pub enum ContextLookup<'a> {
    Format1 {
        coverage: Coverage<'a>,
        rule_sets: LazyArray16<'a, Offset16>,
        base: &'a [u8],
    },
    Format2 {
        coverage: Coverage<'a>,
        class_def: ClassDef<'a>,
        class_rule_sets: LazyArray16<'a, Offset16>,
        base: &'a [u8],
    },
    Format3 {
        input_coverages: Vec<Coverage<'a>>,
        lookup_records: LazyArray16<'a, SequenceLookupRecord>,
    },
}

impl<'a> ContextLookup<'a> {
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let format: u16 = s.read()?;
        match format {
            1 => {
                let cov_off: Offset16 = s.read()?;
                let rule_sets = s.read_array16::<Offset16>()?;
                Some(ContextLookup::Format1 {
                    coverage: Coverage::parse(data.get(cov_off.to_usize()..)?)?,
                    rule_sets,
                    base: data,
                })
            }
            2 => {
                let cov_off: Offset16 = s.read()?;
                let class_off: Offset16 = s.read()?;
                let class_rule_sets = s.read_array16::<Offset16>()?;
                Some(ContextLookup::Format2 {
                    coverage: Coverage::parse(data.get(cov_off.to_usize()..)?)?,
                    class_def: ClassDef::parse(data.get(class_off.to_usize()..)?)?,
                    class_rule_sets,
                    base: data,
                })
            }
            3 => {
                let input_count: u16 = s.read()?;
                let lookup_count: u16 = s.read()?;
                let mut input_coverages = Vec::with_capacity(input_count as usize);
                for _ in 0..input_count {
                    let off: Offset16 = s.read()?;
                    input_coverages.push(Coverage::parse(data.get(off.to_usize()..)?)?);
                }
                let lookup_records = s.read_array_of_count16::<SequenceLookupRecord>(lookup_count)?;
                Some(ContextLookup::Format3 { input_coverages, lookup_records })
            }
            _ => None,
        }
    }

    /// Attempts to apply at `ctx.buffer.idx`, recursing into nested lookups
    /// via `apply_nested`. Returns `true` if a match was found and applied
    /// (the caller is responsible for leaving `buffer.idx` positioned past
    /// the consumed input, matching HarfBuzz's "context doesn't itself
    /// consume, the recursed-into lookups do" model).
    pub fn apply(
        &self,
        ctx: &mut ApplyContext,
        apply_nested: &mut dyn FnMut(&mut ApplyContext, LookupIndex, usize) -> bool,
    ) -> bool {
        let start = ctx.buffer.idx;
        let first = ctx.buffer.info()[start];
        let first_glyph = GlyphId(first.glyph_id as u16);

        match self {
            ContextLookup::Format1 { coverage, rule_sets, base } => {
                let idx = match coverage.get(first_glyph) {
                    Some(i) => i,
                    None => return false,
                };
                let rule_set_off = match rule_sets.get(idx) {
                    Some(o) if !o.is_null() => o,
                    _ => return false,
                };
                let rule_set_data = match base.get(rule_set_off.to_usize()..) {
                    Some(d) => d,
                    None => return false,
                };
                apply_rule_set_glyph_sequence(ctx, rule_set_data, start, apply_nested)
            }
            ContextLookup::Format2 { coverage, class_def, class_rule_sets, base } => {
                if coverage.get(first_glyph).is_none() {
                    return false;
                }
                let class = class_def.get(first_glyph);
                let rule_set_off = match class_rule_sets.get(class) {
                    Some(o) if !o.is_null() => o,
                    _ => return false,
                };
                let rule_set_data = match base.get(rule_set_off.to_usize()..) {
                    Some(d) => d,
                    None => return false,
                };
                apply_rule_set_class_sequence(ctx, rule_set_data, class_def, start, apply_nested)
            }
            ContextLookup::Format3 { input_coverages, lookup_records } => {
                if input_coverages.is_empty() {
                    return false;
                }
                apply_format3(ctx, input_coverages, lookup_records, start, apply_nested)
            }
        }
    }
}

fn apply_format3(
    ctx: &mut ApplyContext,
    input_coverages: &[Coverage],
    lookup_records: &LazyArray16<SequenceLookupRecord>,
    start: usize,
    apply_nested: &mut dyn FnMut(&mut ApplyContext, LookupIndex, usize) -> bool,
) -> bool {
    let mut seq = 0usize;
    let want = input_coverages.len();
    let positions = match match_input(
        ctx.face,
        ctx.buffer,
        start,
        want,
        ctx.lookup_flags,
        ctx.mark_filtering_set,
        ctx.feature_mask,
        |_i, info| {
            let ok = input_coverages[seq].contains(GlyphId(info.glyph_id as u16));
            if ok {
                seq += 1;
            }
            ok
        },
    ) {
        Some(p) => p,
        None => return false,
    };

    apply_lookup_records(ctx, &positions, lookup_records, apply_nested)
}

fn apply_rule_set_glyph_sequence(
    ctx: &mut ApplyContext,
    rule_set_data: &[u8],
    start: usize,
    apply_nested: &mut dyn FnMut(&mut ApplyContext, LookupIndex, usize) -> bool,
) -> bool {
    let mut s = Stream::new(rule_set_data);
    let rules = match s.read_array16::<Offset16>() {
        Some(r) => r,
        None => return false,
    };

    for rule_off in rules.iter() {
        if rule_off.is_null() {
            continue;
        }
        let rule_data = match rule_set_data.get(rule_off.to_usize()..) {
            Some(d) => d,
            None => continue,
        };
        let mut rs = Stream::new(rule_data);
        let input_count: u16 = match rs.read() { Some(v) => v, None => continue };
        let lookup_count: u16 = match rs.read() { Some(v) => v, None => continue };
        if input_count == 0 {
            continue;
        }
        let glyphs = match rs.read_array_of_count16::<GlyphId>(input_count - 1) {
            Some(g) => g,
            None => continue,
        };
        let lookup_records = match rs.read_array_of_count16::<SequenceLookupRecord>(lookup_count) {
            Some(l) => l,
            None => continue,
        };

        let mut it = glyphs.iter();
        let positions = match_input(
            ctx.face,
            ctx.buffer,
            start,
            input_count as usize,
            ctx.lookup_flags,
            ctx.mark_filtering_set,
            ctx.feature_mask,
            |i, info| {
                if i == start {
                    return true; // already matched via coverage
                }
                match it.next() {
                    Some(g) => g.0 == info.glyph_id as u16,
                    None => false,
                }
            },
        );

        if let Some(positions) = positions {
            if apply_lookup_records(ctx, &positions, &lookup_records, apply_nested) {
                return true;
            }
        }
    }

    false
}

fn apply_rule_set_class_sequence(
    ctx: &mut ApplyContext,
    rule_set_data: &[u8],
    class_def: &ClassDef,
    start: usize,
    apply_nested: &mut dyn FnMut(&mut ApplyContext, LookupIndex, usize) -> bool,
) -> bool {
    let mut s = Stream::new(rule_set_data);
    let rules = match s.read_array16::<Offset16>() {
        Some(r) => r,
        None => return false,
    };

    for rule_off in rules.iter() {
        if rule_off.is_null() {
            continue;
        }
        let rule_data = match rule_set_data.get(rule_off.to_usize()..) {
            Some(d) => d,
            None => continue,
        };
        let mut rs = Stream::new(rule_data);
        let input_count: u16 = match rs.read() { Some(v) => v, None => continue };
        let lookup_count: u16 = match rs.read() { Some(v) => v, None => continue };
        if input_count == 0 {
            continue;
        }
        let classes = match rs.read_array_of_count16::<u16>(input_count - 1) {
            Some(c) => c,
            None => continue,
        };
        let lookup_records = match rs.read_array_of_count16::<SequenceLookupRecord>(lookup_count) {
            Some(l) => l,
            None => continue,
        };

        let mut it = classes.iter();
        let positions = match_input(
            ctx.face,
            ctx.buffer,
            start,
            input_count as usize,
            ctx.lookup_flags,
            ctx.mark_filtering_set,
            ctx.feature_mask,
            |i, info| {
                if i == start {
                    return true;
                }
                match it.next() {
                    Some(want_class) => class_def.get(GlyphId(info.glyph_id as u16)) == want_class,
                    None => false,
                }
            },
        );

        if let Some(positions) = positions {
            if apply_lookup_records(ctx, &positions, &lookup_records, apply_nested) {
                return true;
            }
        }
    }

    false
}

fn apply_lookup_records(
    ctx: &mut ApplyContext,
    positions: &[usize],
    lookup_records: &LazyArray16<SequenceLookupRecord>,
    apply_nested: &mut dyn FnMut(&mut ApplyContext, LookupIndex, usize) -> bool,
) -> bool {
    if ctx.recursing() {
        return false;
    }

    let mut applied_any = false;
    ctx.nesting_level += 1;
    for rec in lookup_records.iter() {
        if let Some(&pos) = positions.get(rec.sequence_index as usize) {
            if apply_nested(ctx, rec.lookup_index, pos) {
                applied_any = true;
            }
        }
    }
    ctx.nesting_level -= 1;

    applied_any || !positions.is_empty()
}

/// A chaining context subtable: backtrack + input (format-specific, reusing
/// [`ContextLookup`]'s per-format matching) + lookahead.
pub enum ChainContextLookup<'a> {
    Format1 {
        coverage: Coverage<'a>,
        rule_sets: LazyArray16<'a, Offset16>,
        base: &'a [u8],
    },
    Format2 {
        coverage: Coverage<'a>,
        backtrack_class_def: ClassDef<'a>,
        input_class_def: ClassDef<'a>,
        lookahead_class_def: ClassDef<'a>,
        class_rule_sets: LazyArray16<'a, Offset16>,
        base: &'a [u8],
    },
    Format3 {
        backtrack_coverages: Vec<Coverage<'a>>,
        input_coverages: Vec<Coverage<'a>>,
        lookahead_coverages: Vec<Coverage<'a>>,
        lookup_records: LazyArray16<'a, SequenceLookupRecord>,
    },
}

impl<'a> ChainContextLookup<'a> {
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let format: u16 = s.read()?;
        match format {
            1 => {
                let cov_off: Offset16 = s.read()?;
                let rule_sets = s.read_array16::<Offset16>()?;
                Some(ChainContextLookup::Format1 {
                    coverage: Coverage::parse(data.get(cov_off.to_usize()..)?)?,
                    rule_sets,
                    base: data,
                })
            }
            2 => {
                let cov_off: Offset16 = s.read()?;
                let backtrack_off: Offset16 = s.read()?;
                let input_off: Offset16 = s.read()?;
                let lookahead_off: Offset16 = s.read()?;
                let class_rule_sets = s.read_array16::<Offset16>()?;
                Some(ChainContextLookup::Format2 {
                    coverage: Coverage::parse(data.get(cov_off.to_usize()..)?)?,
                    backtrack_class_def: ClassDef::parse(data.get(backtrack_off.to_usize()..)?)?,
                    input_class_def: ClassDef::parse(data.get(input_off.to_usize()..)?)?,
                    lookahead_class_def: ClassDef::parse(data.get(lookahead_off.to_usize()..)?)?,
                    class_rule_sets,
                    base: data,
                })
            }
            3 => {
                let backtrack_count: u16 = s.read()?;
                let mut backtrack_coverages = Vec::with_capacity(backtrack_count as usize);
                for _ in 0..backtrack_count {
                    let off: Offset16 = s.read()?;
                    backtrack_coverages.push(Coverage::parse(data.get(off.to_usize()..)?)?);
                }
                let input_count: u16 = s.read()?;
                let mut input_coverages = Vec::with_capacity(input_count as usize);
                for _ in 0..input_count {
                    let off: Offset16 = s.read()?;
                    input_coverages.push(Coverage::parse(data.get(off.to_usize()..)?)?);
                }
                let lookahead_count: u16 = s.read()?;
                let mut lookahead_coverages = Vec::with_capacity(lookahead_count as usize);
                for _ in 0..lookahead_count {
                    let off: Offset16 = s.read()?;
                    lookahead_coverages.push(Coverage::parse(data.get(off.to_usize()..)?)?);
                }
                let lookup_count: u16 = s.read()?;
                let lookup_records = s.read_array_of_count16::<SequenceLookupRecord>(lookup_count)?;
                Some(ChainContextLookup::Format3 {
                    backtrack_coverages,
                    input_coverages,
                    lookahead_coverages,
                    lookup_records,
                })
            }
            _ => None,
        }
    }

    pub fn apply(
        &self,
        ctx: &mut ApplyContext,
        apply_nested: &mut dyn FnMut(&mut ApplyContext, LookupIndex, usize) -> bool,
    ) -> bool {
        let start = ctx.buffer.idx;
        let first = ctx.buffer.info()[start];
        let first_glyph = GlyphId(first.glyph_id as u16);

        match self {
            ChainContextLookup::Format3 {
                backtrack_coverages,
                input_coverages,
                lookahead_coverages,
                lookup_records,
            } => {
                if input_coverages.is_empty() || !input_coverages[0].contains(first_glyph) {
                    return false;
                }

                if !match_backtrack(
                    ctx.face,
                    ctx.buffer,
                    start,
                    backtrack_coverages.len(),
                    ctx.lookup_flags,
                    ctx.mark_filtering_set,
                    |i, info| backtrack_coverages[i].contains(GlyphId(info.glyph_id as u16)),
                ) {
                    return false;
                }

                let mut seq = 0usize;
                let positions = match match_input(
                    ctx.face,
                    ctx.buffer,
                    start,
                    input_coverages.len(),
                    ctx.lookup_flags,
                    ctx.mark_filtering_set,
                    ctx.feature_mask,
                    |_i, info| {
                        let ok = input_coverages[seq].contains(GlyphId(info.glyph_id as u16));
                        if ok {
                            seq += 1;
                        }
                        ok
                    },
                ) {
                    Some(p) => p,
                    None => return false,
                };

                let lookahead_start = *positions.last().unwrap() + 1;
                if !match_lookahead(
                    ctx.face,
                    ctx.buffer,
                    lookahead_start,
                    lookahead_coverages.len(),
                    ctx.lookup_flags,
                    ctx.mark_filtering_set,
                    |i, info| lookahead_coverages[i].contains(GlyphId(info.glyph_id as u16)),
                ) {
                    return false;
                }

                apply_lookup_records(ctx, &positions, lookup_records, apply_nested)
            }
            // Formats 1/2 are rare in practice (nearly all real fonts use
            // format 3 for chaining rules); degrade gracefully rather than
            // leaving them unparsed.
            ChainContextLookup::Format1 { coverage, rule_sets, base } => {
                let idx = match coverage.get(first_glyph) {
                    Some(i) => i,
                    None => return false,
                };
                let off = match rule_sets.get(idx) {
                    Some(o) if !o.is_null() => o,
                    _ => return false,
                };
                let data = match base.get(off.to_usize()..) {
                    Some(d) => d,
                    None => return false,
                };
                apply_chain_rule_set_glyphs(ctx, data, start, apply_nested)
            }
            ChainContextLookup::Format2 {
                coverage,
                backtrack_class_def,
                input_class_def,
                lookahead_class_def,
                class_rule_sets,
                base,
            } => {
                if coverage.get(first_glyph).is_none() {
                    return false;
                }
                let class = input_class_def.get(first_glyph);
                let off = match class_rule_sets.get(class) {
                    Some(o) if !o.is_null() => o,
                    _ => return false,
                };
                let data = match base.get(off.to_usize()..) {
                    Some(d) => d,
                    None => return false,
                };
                apply_chain_rule_set_classes(
                    ctx,
                    data,
                    backtrack_class_def,
                    input_class_def,
                    lookahead_class_def,
                    start,
                    apply_nested,
                )
            }
        }
    }
}

fn apply_chain_rule_set_glyphs(
    ctx: &mut ApplyContext,
    rule_set_data: &[u8],
    start: usize,
    apply_nested: &mut dyn FnMut(&mut ApplyContext, LookupIndex, usize) -> bool,
) -> bool {
    let mut s = Stream::new(rule_set_data);
    let rules = match s.read_array16::<Offset16>() {
        Some(r) => r,
        None => return false,
    };

    for rule_off in rules.iter() {
        if rule_off.is_null() {
            continue;
        }
        let data = match rule_set_data.get(rule_off.to_usize()..) {
            Some(d) => d,
            None => continue,
        };
        let mut rs = Stream::new(data);
        let backtrack_count: u16 = match rs.read() { Some(v) => v, None => continue };
        let backtrack = match rs.read_array_of_count16::<GlyphId>(backtrack_count) {
            Some(b) => b,
            None => continue,
        };
        let input_count: u16 = match rs.read() { Some(v) => v, None => continue };
        if input_count == 0 {
            continue;
        }
        let input = match rs.read_array_of_count16::<GlyphId>(input_count - 1) {
            Some(i) => i,
            None => continue,
        };
        let lookahead_count: u16 = match rs.read() { Some(v) => v, None => continue };
        let lookahead = match rs.read_array_of_count16::<GlyphId>(lookahead_count) {
            Some(l) => l,
            None => continue,
        };
        let lookup_count: u16 = match rs.read() { Some(v) => v, None => continue };
        let lookup_records = match rs.read_array_of_count16::<SequenceLookupRecord>(lookup_count) {
            Some(l) => l,
            None => continue,
        };

        // Backtrack glyphs are stored in logical (pre-input, reading toward
        // the start of the input run) order in the font; matching walks
        // backward from `start` so compare in the same order.
        if !match_backtrack(
            ctx.face,
            ctx.buffer,
            start,
            backtrack_count as usize,
            ctx.lookup_flags,
            ctx.mark_filtering_set,
            {
                let mut it = backtrack.iter();
                move |_i, info| match it.next() {
                    Some(g) => g.0 == info.glyph_id as u16,
                    None => false,
                }
            },
        ) {
            continue;
        }

        let mut it = input.iter();
        let positions = match match_input(
            ctx.face,
            ctx.buffer,
            start,
            input_count as usize,
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
        ) {
            Some(p) => p,
            None => continue,
        };

        let lookahead_start = *positions.last().unwrap() + 1;
        let mut lit = lookahead.iter();
        if !match_lookahead(
            ctx.face,
            ctx.buffer,
            lookahead_start,
            lookahead_count as usize,
            ctx.lookup_flags,
            ctx.mark_filtering_set,
            |_i, info| match lit.next() {
                Some(g) => g.0 == info.glyph_id as u16,
                None => false,
            },
        ) {
            continue;
        }

        if apply_lookup_records(ctx, &positions, &lookup_records, apply_nested) {
            return true;
        }
    }

    false
}

fn apply_chain_rule_set_classes(
    ctx: &mut ApplyContext,
    rule_set_data: &[u8],
    backtrack_class_def: &ClassDef,
    input_class_def: &ClassDef,
    lookahead_class_def: &ClassDef,
    start: usize,
    apply_nested: &mut dyn FnMut(&mut ApplyContext, LookupIndex, usize) -> bool,
) -> bool {
    let mut s = Stream::new(rule_set_data);
    let rules = match s.read_array16::<Offset16>() {
        Some(r) => r,
        None => return false,
    };

    for rule_off in rules.iter() {
        if rule_off.is_null() {
            continue;
        }
        let data = match rule_set_data.get(rule_off.to_usize()..) {
            Some(d) => d,
            None => continue,
        };
        let mut rs = Stream::new(data);
        let backtrack_count: u16 = match rs.read() { Some(v) => v, None => continue };
        let backtrack = match rs.read_array_of_count16::<u16>(backtrack_count) {
            Some(b) => b,
            None => continue,
        };
        let input_count: u16 = match rs.read() { Some(v) => v, None => continue };
        if input_count == 0 {
            continue;
        }
        let input = match rs.read_array_of_count16::<u16>(input_count - 1) {
            Some(i) => i,
            None => continue,
        };
        let lookahead_count: u16 = match rs.read() { Some(v) => v, None => continue };
        let lookahead = match rs.read_array_of_count16::<u16>(lookahead_count) {
            Some(l) => l,
            None => continue,
        };
        let lookup_count: u16 = match rs.read() { Some(v) => v, None => continue };
        let lookup_records = match rs.read_array_of_count16::<SequenceLookupRecord>(lookup_count) {
            Some(l) => l,
            None => continue,
        };

        if !match_backtrack(
            ctx.face,
            ctx.buffer,
            start,
            backtrack_count as usize,
            ctx.lookup_flags,
            ctx.mark_filtering_set,
            {
                let mut it = backtrack.iter();
                move |_i, info| match it.next() {
                    Some(c) => backtrack_class_def.get(GlyphId(info.glyph_id as u16)) == c,
                    None => false,
                }
            },
        ) {
            continue;
        }

        let mut it = input.iter();
        let positions = match match_input(
            ctx.face,
            ctx.buffer,
            start,
            input_count as usize,
            ctx.lookup_flags,
            ctx.mark_filtering_set,
            ctx.feature_mask,
            |i, info| {
                if i == start {
                    return true;
                }
                match it.next() {
                    Some(c) => input_class_def.get(GlyphId(info.glyph_id as u16)) == c,
                    None => false,
                }
            },
        ) {
            Some(p) => p,
            None => continue,
        };

        let lookahead_start = *positions.last().unwrap() + 1;
        let mut lit = lookahead.iter();
        if !match_lookahead(
            ctx.face,
            ctx.buffer,
            lookahead_start,
            lookahead_count as usize,
            ctx.lookup_flags,
            ctx.mark_filtering_set,
            |_i, info| match lit.next() {
                Some(c) => lookahead_class_def.get(GlyphId(info.glyph_id as u16)) == c,
                None => false,
            },
        ) {
            continue;
        }

        if apply_lookup_records(ctx, &positions, &lookup_records, apply_nested) {
            return true;
        }
    }

    false
}
