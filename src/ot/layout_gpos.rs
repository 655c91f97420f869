//! GPOS lookup-type subtable bodies, `apply()`, and the post-pass that turns
//! attachment records into absolute offsets (spec.md §4.1 item 4, §4.6 items
//! 4-6 for mark/cursive attachment chains).

use crate::buffer::AttachType;
use crate::ot::apply::ApplyContext;
use crate::ot::context::{ChainContextLookup, ContextLookup};
use crate::ot::layout::{Anchor, ClassDef, Coverage, GlyphId, LookupIndex, ValueFormatFlags, ValueRecord};
use crate::parser::{LazyArray16, Offset16, Stream};

pub enum GposLookup<'a> {
    Single { coverage: Coverage<'a>, format: u16, base: &'a [u8], value_format: ValueFormatFlags },
    Pair(PairPos<'a>),
    Cursive { coverage: Coverage<'a>, entry_exit: LazyArray16<'a, EntryExitRecord>, base: &'a [u8] },
    MarkToBase(MarkAttach<'a>),
    MarkToLigature(MarkToLigature<'a>),
    MarkToMark(MarkAttach<'a>),
    Context(ContextLookup<'a>),
    Chaining(ChainContextLookup<'a>),
}

impl<'a> GposLookup<'a> {
    pub fn parse(kind: u16, data: &'a [u8]) -> Option<Self> {
        match kind {
            1 => {
                let mut s = Stream::new(data);
                let format: u16 = s.read()?;
                let cov_off: Offset16 = s.read()?;
                let value_format = ValueFormatFlags::from_bits_truncate(s.read::<u16>()?);
                Some(GposLookup::Single {
                    coverage: Coverage::parse(data.get(cov_off.to_usize()..)?)?,
                    format,
                    base: data.get(s.offset()..)?,
                    value_format,
                })
            }
            2 => PairPos::parse(data).map(GposLookup::Pair),
            3 => {
                let mut s = Stream::new(data);
                s.skip::<u16>();
                let cov_off: Offset16 = s.read()?;
                let entry_exit = s.read_array16()?;
                Some(GposLookup::Cursive {
                    coverage: Coverage::parse(data.get(cov_off.to_usize()..)?)?,
                    entry_exit,
                    base: data,
                })
            }
            4 => MarkAttach::parse(data, true).map(GposLookup::MarkToBase),
            5 => MarkToLigature::parse(data).map(GposLookup::MarkToLigature),
            6 => MarkAttach::parse(data, false).map(GposLookup::MarkToMark),
            7 => ContextLookup::parse(data).map(GposLookup::Context),
            8 => ChainContextLookup::parse(data).map(GposLookup::Chaining),
            _ => None,
        }
    }

    pub fn apply(
        &self,
        ctx: &mut ApplyContext,
        apply_nested: &mut dyn FnMut(&mut ApplyContext, LookupIndex, usize) -> bool,
    ) -> bool {
        let idx = ctx.buffer.idx;
        let glyph = GlyphId(ctx.buffer.info()[idx].glyph_id as u16);

        match self {
            GposLookup::Single { coverage, format, base, value_format } => {
                if coverage.get(glyph).is_none() {
                    return false;
                }
                let record_size = value_format.record_size();
                let data = if *format == 2 {
                    let cov_idx = coverage.get(glyph).unwrap() as usize;
                    base.get(cov_idx * record_size..)
                } else {
                    Some(*base)
                };
                let data = match data {
                    Some(d) => d,
                    None => return false,
                };
                let mut s = Stream::new(data);
                let value = match ValueRecord::parse(&mut s, *value_format) {
                    Some(v) => v,
                    None => return false,
                };
                apply_value_record(ctx, idx, &value);
                ctx.buffer.next_glyph();
                true
            }
            GposLookup::Pair(pair) => pair.apply(ctx),
            GposLookup::Cursive { coverage, entry_exit, base } => {
                apply_cursive(ctx, coverage, entry_exit, base, idx)
            }
            GposLookup::MarkToBase(m) => m.apply(ctx, idx, true),
            GposLookup::MarkToMark(m) => m.apply(ctx, idx, false),
            GposLookup::MarkToLigature(m) => m.apply(ctx, idx),
            GposLookup::Context(c) => c.apply(ctx, apply_nested),
            GposLookup::Chaining(c) => c.apply(ctx, apply_nested),
        }
    }
}

fn apply_value_record(ctx: &mut ApplyContext, idx: usize, value: &ValueRecord) {
    let pos = &mut ctx.buffer.pos_mut()[idx];
    pos.x_offset += value.x_placement;
    pos.y_offset += value.y_placement;
    pos.x_advance += value.x_advance;
    pos.y_advance += value.y_advance;
}

// ---- Pair adjustment (type 2) ----

pub struct PairPos<'a> {
    coverage: Coverage<'a>,
    format: u16,
    value_format1: ValueFormatFlags,
    value_format2: ValueFormatFlags,
    // Format 1: pair sets keyed by first-glyph coverage index.
    pair_sets: Option<LazyArray16<'a, Offset16>>,
    // Format 2: class-based.
    class_def1: Option<ClassDef<'a>>,
    class_def2: Option<ClassDef<'a>>,
    class1_count: u16,
    class2_count: u16,
    base: &'a [u8],
}

impl<'a> PairPos<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let format: u16 = s.read()?;
        let cov_off: Offset16 = s.read()?;
        let value_format1 = ValueFormatFlags::from_bits_truncate(s.read::<u16>()?);
        let value_format2 = ValueFormatFlags::from_bits_truncate(s.read::<u16>()?);
        let coverage = Coverage::parse(data.get(cov_off.to_usize()..)?)?;

        match format {
            1 => {
                let pair_sets = s.read_array16()?;
                Some(PairPos {
                    coverage,
                    format,
                    value_format1,
                    value_format2,
                    pair_sets: Some(pair_sets),
                    class_def1: None,
                    class_def2: None,
                    class1_count: 0,
                    class2_count: 0,
                    base: data,
                })
            }
            2 => {
                let class_def1_off: Offset16 = s.read()?;
                let class_def2_off: Offset16 = s.read()?;
                let class1_count: u16 = s.read()?;
                let class2_count: u16 = s.read()?;
                Some(PairPos {
                    coverage,
                    format,
                    value_format1,
                    value_format2,
                    pair_sets: None,
                    class_def1: Some(ClassDef::parse(data.get(class_def1_off.to_usize()..)?)?),
                    class_def2: Some(ClassDef::parse(data.get(class_def2_off.to_usize()..)?)?),
                    class1_count,
                    class2_count,
                    base: data.get(s.offset()..)?,
                })
            }
            _ => None,
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> bool {
        let idx = ctx.buffer.idx;
        let first = GlyphId(ctx.buffer.info()[idx].glyph_id as u16);
        let cov_idx = match self.coverage.get(first) {
            Some(i) => i,
            None => return false,
        };

        // The second glyph of the pair is the next unskipped position.
        let second_idx = match find_next_unskipped(ctx, idx + 1) {
            Some(i) => i,
            None => return false,
        };

        let second = GlyphId(ctx.buffer.info()[second_idx].glyph_id as u16);

        let (rec1, rec2) = match self.format {
            1 => {
                let pair_sets = match &self.pair_sets {
                    Some(p) => p,
                    None => return false,
                };
                let set_off = match pair_sets.get(cov_idx) {
                    Some(o) if !o.is_null() => o,
                    _ => return false,
                };
                let set_data = match self.base.get(set_off.to_usize()..) {
                    Some(d) => d,
                    None => return false,
                };
                let record_size = 2 + self.value_format1.record_size() + self.value_format2.record_size();
                let mut s = Stream::new(set_data);
                let pair_count: u16 = match s.read() { Some(v) => v, None => return false };
                let mut found = None;
                for i in 0..pair_count {
                    let rec_data = match set_data.get(2 + i as usize * record_size..) {
                        Some(d) => d,
                        None => break,
                    };
                    let mut rs = Stream::new(rec_data);
                    let second_glyph: GlyphId = match rs.read() { Some(v) => v, None => break };
                    if second_glyph.0 == second.0 {
                        let v1 = ValueRecord::parse(&mut rs, self.value_format1);
                        let v2 = ValueRecord::parse(&mut rs, self.value_format2);
                        found = Some((v1.unwrap_or_default(), v2.unwrap_or_default()));
                        break;
                    }
                }
                match found {
                    Some(v) => v,
                    None => return false,
                }
            }
            2 => {
                let class_def1 = match &self.class_def1 {
                    Some(c) => c,
                    None => return false,
                };
                let class_def2 = match &self.class_def2 {
                    Some(c) => c,
                    None => return false,
                };
                let c1 = class_def1.get(first);
                if c1 >= self.class1_count {
                    return false;
                }
                let c2 = class_def2.get(second);
                if c2 >= self.class2_count {
                    return false;
                }
                let record_size = self.value_format1.record_size() + self.value_format2.record_size();
                let row_size = self.class2_count as usize * record_size;
                let offset = c1 as usize * row_size + c2 as usize * record_size;
                let rec_data = match self.base.get(offset..) {
                    Some(d) => d,
                    None => return false,
                };
                let mut rs = Stream::new(rec_data);
                let v1 = ValueRecord::parse(&mut rs, self.value_format1).unwrap_or_default();
                let v2 = ValueRecord::parse(&mut rs, self.value_format2).unwrap_or_default();
                (v1, v2)
            }
            _ => return false,
        };

        apply_value_record(ctx, idx, &rec1);
        if !self.value_format2.is_empty() {
            apply_value_record(ctx, second_idx, &rec2);
        }

        ctx.buffer.unsafe_to_break(idx, second_idx + 1);
        ctx.buffer.next_glyph();
        true
    }
}

fn find_next_unskipped(ctx: &ApplyContext, from: usize) -> Option<usize> {
    let mut pos = from;
    while pos < ctx.buffer.len() {
        let info = &ctx.buffer.info()[pos];
        let glyph = GlyphId(info.glyph_id as u16);
        let class = ctx.face.glyph_class(glyph);
        let skip = (ctx.lookup_flags.contains(crate::ot::layout::LookupFlags::IGNORE_MARKS)
            && class == crate::ot::layout::GlyphClass::Mark)
            || (ctx.lookup_flags.contains(crate::ot::layout::LookupFlags::IGNORE_BASE_GLYPHS)
                && class == crate::ot::layout::GlyphClass::Base)
            || (ctx.lookup_flags.contains(crate::ot::layout::LookupFlags::IGNORE_LIGATURES)
                && class == crate::ot::layout::GlyphClass::Ligature);
        if !skip {
            return Some(pos);
        }
        pos += 1;
    }
    None
}

// ---- Cursive attachment (type 3) ----

#[derive(Clone, Copy)]
pub struct EntryExitRecord {
    entry: Offset16,
    exit: Offset16,
}

impl crate::parser::FromData for EntryExitRecord {
    const SIZE: usize = 4;
    fn parse(data: &[u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        Some(EntryExitRecord { entry: s.read()?, exit: s.read()? })
    }
}

fn apply_cursive(
    ctx: &mut ApplyContext,
    coverage: &Coverage,
    entry_exit: &LazyArray16<EntryExitRecord>,
    base: &[u8],
    idx: usize,
) -> bool {
    let this_glyph = GlyphId(ctx.buffer.info()[idx].glyph_id as u16);
    let this_cov = match coverage.get(this_glyph) {
        Some(i) => i,
        None => return false,
    };
    let this_rec = match entry_exit.get(this_cov) {
        Some(r) => r,
        None => return false,
    };
    let this_entry = if this_rec.entry.is_null() {
        None
    } else {
        Anchor::parse(base.get(this_rec.entry.to_usize()..).unwrap_or(&[]))
    };
    let this_entry = match this_entry {
        Some(a) => a,
        None => return false,
    };

    let prev_idx = match find_prev_unskipped(ctx, idx) {
        Some(i) => i,
        None => return false,
    };
    let prev_glyph = GlyphId(ctx.buffer.info()[prev_idx].glyph_id as u16);
    let prev_cov = match coverage.get(prev_glyph) {
        Some(i) => i,
        None => return false,
    };
    let prev_rec = match entry_exit.get(prev_cov) {
        Some(r) => r,
        None => return false,
    };
    if prev_rec.exit.is_null() {
        return false;
    }
    let prev_exit = match Anchor::parse(base.get(prev_rec.exit.to_usize()..).unwrap_or(&[])) {
        Some(a) => a,
        None => return false,
    };

    // Align this glyph's entry anchor to the previous glyph's exit anchor:
    // the classic cursive-attachment y-alignment, x stays at natural advance.
    let dy = prev_exit.y - this_entry.y;
    ctx.buffer.pos_mut()[idx].y_offset += dy;
    ctx.buffer.pos_mut()[idx].attach_type = AttachType::Cursive;
    ctx.buffer.pos_mut()[idx].attach_chain = -((idx - prev_idx) as i16);

    ctx.buffer.scratch_flags.insert(crate::buffer::BufferScratchFlags::HAS_GPOS_ATTACHMENT);
    ctx.buffer.next_glyph();
    true
}

fn find_prev_unskipped(ctx: &ApplyContext, idx: usize) -> Option<usize> {
    if idx == 0 {
        return None;
    }
    let mut pos = idx;
    while pos > 0 {
        pos -= 1;
        let info = &ctx.buffer.info()[pos];
        let glyph = GlyphId(info.glyph_id as u16);
        let class = ctx.face.glyph_class(glyph);
        let skip = (ctx.lookup_flags.contains(crate::ot::layout::LookupFlags::IGNORE_MARKS)
            && class == crate::ot::layout::GlyphClass::Mark)
            || (ctx.lookup_flags.contains(crate::ot::layout::LookupFlags::IGNORE_BASE_GLYPHS)
                && class == crate::ot::layout::GlyphClass::Base)
            || (ctx.lookup_flags.contains(crate::ot::layout::LookupFlags::IGNORE_LIGATURES)
                && class == crate::ot::layout::GlyphClass::Ligature);
        if !skip {
            return Some(pos);
        }
    }
    None
}

// ---- Mark-to-base / mark-to-mark (types 4 and 6 share a shape) ----

pub struct MarkAttach<'a> {
    mark_coverage: Coverage<'a>,
    base_coverage: Coverage<'a>,
    mark_array: &'a [u8],
    base_array: &'a [u8],
    class_count: u16,
}

impl<'a> MarkAttach<'a> {
    fn parse(data: &'a [u8], _is_base: bool) -> Option<Self> {
        let mut s = Stream::new(data);
        s.skip::<u16>();
        let mark_cov_off: Offset16 = s.read()?;
        let base_cov_off: Offset16 = s.read()?;
        let class_count: u16 = s.read()?;
        let mark_array_off: Offset16 = s.read()?;
        let base_array_off: Offset16 = s.read()?;
        Some(MarkAttach {
            mark_coverage: Coverage::parse(data.get(mark_cov_off.to_usize()..)?)?,
            base_coverage: Coverage::parse(data.get(base_cov_off.to_usize()..)?)?,
            mark_array: data.get(mark_array_off.to_usize()..)?,
            base_array: data.get(base_array_off.to_usize()..)?,
            class_count,
        })
    }

    fn apply(&self, ctx: &mut ApplyContext, idx: usize, attach_to_base: bool) -> bool {
        let mark_glyph = GlyphId(ctx.buffer.info()[idx].glyph_id as u16);
        let mark_cov_idx = match self.mark_coverage.get(mark_glyph) {
            Some(i) => i,
            None => return false,
        };

        let (mark_class, mark_anchor) = match mark_array_entry(self.mark_array, mark_cov_idx) {
            Some(v) => v,
            None => return false,
        };
        if mark_class >= self.class_count {
            return false;
        }

        let base_idx = match find_prev_unskipped(ctx, idx) {
            Some(i) => i,
            None => return false,
        };
        let base_glyph = GlyphId(ctx.buffer.info()[base_idx].glyph_id as u16);

        // Mark-to-mark requires the attachment target to actually be a mark
        // (GDEF class), so a base glyph never gets treated as one.
        if !attach_to_base {
            if ctx.face.glyph_class(base_glyph) != crate::ot::layout::GlyphClass::Mark {
                return false;
            }
        }

        let base_cov_idx = match self.base_coverage.get(base_glyph) {
            Some(i) => i,
            None => return false,
        };

        let base_anchor = match base_array_entry(self.base_array, base_cov_idx, mark_class, self.class_count) {
            Some(a) => a,
            None => return false,
        };

        ctx.buffer.pos_mut()[idx].x_offset += base_anchor.x - mark_anchor.x;
        ctx.buffer.pos_mut()[idx].y_offset += base_anchor.y - mark_anchor.y;
        ctx.buffer.pos_mut()[idx].attach_type = AttachType::Mark;
        ctx.buffer.pos_mut()[idx].attach_chain = -((idx - base_idx) as i16);

        ctx.buffer.scratch_flags.insert(crate::buffer::BufferScratchFlags::HAS_GPOS_ATTACHMENT);
        ctx.buffer.next_glyph();
        true
    }
}

fn mark_array_entry(mark_array: &[u8], index: u16) -> Option<(u16, Anchor)> {
    // MarkArray = uint16 markCount, MarkRecord[markCount].
    let mark_count: u16 = Stream::new(mark_array).read()?;
    if index >= mark_count {
        return None;
    }
    let record_offset = 2 + index as usize * 4;
    let rec_data = mark_array.get(record_offset..)?;
    let mut rs = Stream::new(rec_data);
    let class: u16 = rs.read()?;
    let anchor_off: Offset16 = rs.read()?;
    let anchor = Anchor::parse(mark_array.get(anchor_off.to_usize()..)?)?;
    Some((class, anchor))
}

fn base_array_entry(base_array: &[u8], base_index: u16, mark_class: u16, class_count: u16) -> Option<Anchor> {
    let mut s = Stream::new(base_array);
    let base_count: u16 = s.read()?;
    if base_index >= base_count {
        return None;
    }
    let row_offset = 2 + base_index as usize * class_count as usize * 2;
    let anchor_off_pos = row_offset + mark_class as usize * 2;
    let anchor_off: Offset16 = crate::parser::Stream::read_at(base_array, anchor_off_pos)?;
    if anchor_off.is_null() {
        return None;
    }
    Anchor::parse(base_array.get(anchor_off.to_usize()..)?)
}

// ---- Mark-to-ligature (type 5) ----

pub struct MarkToLigature<'a> {
    mark_coverage: Coverage<'a>,
    ligature_coverage: Coverage<'a>,
    mark_array: &'a [u8],
    ligature_array: &'a [u8],
    class_count: u16,
}

impl<'a> MarkToLigature<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        s.skip::<u16>();
        let mark_cov_off: Offset16 = s.read()?;
        let lig_cov_off: Offset16 = s.read()?;
        let class_count: u16 = s.read()?;
        let mark_array_off: Offset16 = s.read()?;
        let lig_array_off: Offset16 = s.read()?;
        Some(MarkToLigature {
            mark_coverage: Coverage::parse(data.get(mark_cov_off.to_usize()..)?)?,
            ligature_coverage: Coverage::parse(data.get(lig_cov_off.to_usize()..)?)?,
            mark_array: data.get(mark_array_off.to_usize()..)?,
            ligature_array: data.get(lig_array_off.to_usize()..)?,
            class_count,
        })
    }

    fn apply(&self, ctx: &mut ApplyContext, idx: usize) -> bool {
        let mark_glyph = GlyphId(ctx.buffer.info()[idx].glyph_id as u16);
        let mark_cov_idx = match self.mark_coverage.get(mark_glyph) {
            Some(i) => i,
            None => return false,
        };
        let (mark_class, mark_anchor) = match mark_array_entry(self.mark_array, mark_cov_idx) {
            Some(v) => v,
            None => return false,
        };

        let lig_idx = match find_prev_unskipped(ctx, idx) {
            Some(i) => i,
            None => return false,
        };
        let lig_glyph = GlyphId(ctx.buffer.info()[lig_idx].glyph_id as u16);
        let lig_cov_idx = match self.ligature_coverage.get(lig_glyph) {
            Some(i) => i,
            None => return false,
        };

        // The mark's ligature component to attach to is whichever component
        // it rode along with during ligature substitution (spec.md §4.6
        // item 5's "components" rule).
        let comp = ctx.buffer.info()[idx].lig_comp() as u16;

        let anchor = match ligature_array_entry(
            self.ligature_array,
            lig_cov_idx,
            comp,
            mark_class,
            self.class_count,
        ) {
            Some(a) => a,
            None => return false,
        };

        ctx.buffer.pos_mut()[idx].x_offset += anchor.x - mark_anchor.x;
        ctx.buffer.pos_mut()[idx].y_offset += anchor.y - mark_anchor.y;
        ctx.buffer.pos_mut()[idx].attach_type = AttachType::Mark;
        ctx.buffer.pos_mut()[idx].attach_chain = -((idx - lig_idx) as i16);

        ctx.buffer.scratch_flags.insert(crate::buffer::BufferScratchFlags::HAS_GPOS_ATTACHMENT);
        ctx.buffer.next_glyph();
        true
    }
}

fn ligature_array_entry(
    ligature_array: &[u8],
    lig_index: u16,
    component: u16,
    mark_class: u16,
    class_count: u16,
) -> Option<Anchor> {
    let mut s = Stream::new(ligature_array);
    let lig_count: u16 = s.read()?;
    if lig_index >= lig_count {
        return None;
    }
    let attach_off: Offset16 = crate::parser::Stream::read_at(ligature_array, 2 + lig_index as usize * 2)?;
    let attach_data = ligature_array.get(attach_off.to_usize()..)?;

    let row_offset = component as usize * class_count as usize * 2;
    let anchor_off_pos = row_offset + mark_class as usize * 2;
    let anchor_off: Offset16 = crate::parser::Stream::read_at(attach_data, anchor_off_pos)?;
    if anchor_off.is_null() {
        return None;
    }
    Anchor::parse(attach_data.get(anchor_off.to_usize()..)?)
}
