//! The binary table reader for GDEF/GSUB/GPOS (spec.md §4.1): script/feature/
//! lookup list headers, `Coverage`, `ClassDef`, `FeatureVariations`, and the
//! GDEF table. Lookup-type-specific subtable bodies live in
//! `layout_gsub.rs`/`layout_gpos.rs`.

use crate::common::Tag;
use crate::parser::{FromData, LazyArray16, LazyArray32, Offset16, Offset32, Stream};

pub type GlyphId = ttf_parser::GlyphId;

impl FromData for GlyphId {
    const SIZE: usize = 2;

    fn parse(data: &[u8]) -> Option<Self> {
        u16::parse(data).map(GlyphId)
    }
}

#[derive(Clone, Copy)]
struct TagRecord {
    tag: Tag,
    offset: Offset16,
}

impl FromData for TagRecord {
    const SIZE: usize = 6;

    fn parse(data: &[u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        Some(TagRecord { tag: s.read()?, offset: s.read()? })
    }
}

impl FromData for Tag {
    const SIZE: usize = 4;

    fn parse(data: &[u8]) -> Option<Self> {
        u32::parse(data).map(Tag)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ScriptIndex(pub u16);
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LanguageIndex(pub u16);
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct FeatureIndex(pub u16);
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LookupIndex(pub u16);

impl FromData for FeatureIndex {
    const SIZE: usize = 2;
    fn parse(data: &[u8]) -> Option<Self> {
        u16::parse(data).map(FeatureIndex)
    }
}

impl FromData for LookupIndex {
    const SIZE: usize = 2;
    fn parse(data: &[u8]) -> Option<Self> {
        u16::parse(data).map(LookupIndex)
    }
}

/// A parsed GSUB or GPOS top-level table.
#[derive(Clone, Copy)]
pub struct LayoutTable<'a> {
    data: &'a [u8],
    script_list: &'a [u8],
    feature_list: &'a [u8],
    lookup_list: &'a [u8],
    feature_variations: Option<&'a [u8]>,
}

impl<'a> LayoutTable<'a> {
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let major: u16 = s.read()?;
        let minor: u16 = s.read()?;
        if major != 1 || (minor != 0 && minor != 1) {
            return None;
        }

        let script_list_offset: Offset16 = s.read()?;
        let feature_list_offset: Offset16 = s.read()?;
        let lookup_list_offset: Offset16 = s.read()?;

        let mut feature_variations = None;
        if minor == 1 {
            let offset: Offset32 = s.read()?;
            if !offset.is_null() {
                feature_variations = data.get(offset.to_usize()..);
            }
        }

        Some(LayoutTable {
            data,
            script_list: data.get(script_list_offset.to_usize()..)?,
            feature_list: data.get(feature_list_offset.to_usize()..)?,
            lookup_list: data.get(lookup_list_offset.to_usize()..)?,
            feature_variations,
        })
    }

    pub fn scripts(&self) -> ScriptListIter<'a> {
        let mut s = Stream::new(self.script_list);
        let records = s.read_array16::<TagRecord>().unwrap_or_default();
        ScriptListIter { base: self.script_list, records, index: 0 }
    }

    pub fn script_by_tag(&self, tag: Tag) -> Option<Script<'a>> {
        let mut s = Stream::new(self.script_list);
        let records = s.read_array16::<TagRecord>()?;
        let (_, rec) = records.binary_search_by(|r| r.tag.0.cmp(&tag.0))?;
        Script::parse(self.script_list.get(rec.offset.to_usize()..)?)
    }

    pub fn feature_at(&self, index: FeatureIndex) -> Option<Feature<'a>> {
        let mut s = Stream::new(self.feature_list);
        let records = s.read_array16::<TagRecord>()?;
        let rec = records.get(index.0)?;
        Feature::parse(rec.tag, self.feature_list.get(rec.offset.to_usize()..)?)
    }

    pub fn lookup_at(&self, index: LookupIndex) -> Option<LookupHeader<'a>> {
        let mut s = Stream::new(self.lookup_list);
        let offsets = s.read_array16::<Offset16>()?;
        let off = offsets.get(index.0)?;
        LookupHeader::parse(self.lookup_list.get(off.to_usize()..)?)
    }

    pub fn lookup_count(&self) -> u16 {
        Stream::new(self.lookup_list).read::<u16>().unwrap_or(0)
    }

    pub fn feature_variations(&self) -> FeatureVariationsIter<'a> {
        match self.feature_variations {
            None => FeatureVariationsIter { base: &[], records: LazyArray32::default(), index: 0 },
            Some(data) => {
                let mut s = Stream::new(data);
                s.skip::<u16>();
                s.skip::<u16>();
                let records = s.read_array32::<FeatureVariationRecordRaw>().unwrap_or_default();
                FeatureVariationsIter { base: data, records, index: 0 }
            }
        }
    }

    pub(crate) fn data(&self) -> &'a [u8] {
        self.data
    }
}

pub struct ScriptListIter<'a> {
    base: &'a [u8],
    records: LazyArray16<'a, TagRecord>,
    index: u16,
}

impl<'a> Iterator for ScriptListIter<'a> {
    type Item = (Tag, Script<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let rec = self.records.get(self.index)?;
        self.index += 1;
        let script = Script::parse(self.base.get(rec.offset.to_usize()..)?)?;
        Some((rec.tag, script))
    }
}

#[derive(Clone, Copy)]
pub struct Script<'a> {
    data: &'a [u8],
    default_lang: Option<Offset16>,
    lang_records: LazyArray16<'a, TagRecord>,
}

impl<'a> Script<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let default_lang: Offset16 = s.read()?;
        let lang_records = s.read_array16::<TagRecord>()?;
        Some(Script {
            data,
            default_lang: if default_lang.is_null() { None } else { Some(default_lang) },
            lang_records,
        })
    }

    pub fn default_language(&self) -> Option<LangSys<'a>> {
        LangSys::parse(self.data.get(self.default_lang?.to_usize()..)?)
    }

    pub fn language_by_tag(&self, tag: Tag) -> Option<LangSys<'a>> {
        let (_, rec) = self.lang_records.binary_search_by(|r| r.tag.0.cmp(&tag.0))?;
        LangSys::parse(self.data.get(rec.offset.to_usize()..)?)
    }
}

#[derive(Clone, Copy)]
pub struct LangSys<'a> {
    pub required_feature_index: Option<FeatureIndex>,
    pub feature_indices: LazyArray16<'a, FeatureIndex>,
}

impl<'a> LangSys<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        s.skip::<u16>(); // lookupOrder, reserved
        let required: u16 = s.read()?;
        let count: u16 = s.read()?;
        Some(LangSys {
            required_feature_index: if required == 0xFFFF { None } else { Some(FeatureIndex(required)) },
            feature_indices: s.read_array_of_count16(count)?,
        })
    }
}

#[derive(Clone, Copy)]
pub struct Feature<'a> {
    pub tag: Tag,
    pub lookup_indices: LazyArray16<'a, LookupIndex>,
}

impl<'a> Feature<'a> {
    fn parse(tag: Tag, data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        s.skip::<Offset16>(); // featureParams
        let count: u16 = s.read()?;
        Some(Feature { tag, lookup_indices: s.read_array_of_count16(count)? })
    }
}

bitflags::bitflags! {
    pub struct LookupFlags: u16 {
        const RIGHT_TO_LEFT          = 0x0001;
        const IGNORE_BASE_GLYPHS     = 0x0002;
        const IGNORE_LIGATURES       = 0x0004;
        const IGNORE_MARKS           = 0x0008;
        const USE_MARK_FILTERING_SET = 0x0010;
        const MARK_ATTACHMENT_TYPE_MASK = 0xFF00;
    }
}

impl LookupFlags {
    pub fn mark_attachment_class(self) -> u8 {
        (self.bits() >> 8) as u8
    }
}

#[derive(Clone, Copy)]
pub struct LookupHeader<'a> {
    pub kind: u16,
    pub flags: LookupFlags,
    pub mark_filtering_set: Option<u16>,
    subtable_offsets: LazyArray16<'a, Offset16>,
    data: &'a [u8],
}

impl<'a> LookupHeader<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let kind: u16 = s.read()?;
        let flags_raw: u16 = s.read()?;
        let flags = LookupFlags::from_bits_truncate(flags_raw);
        let count: u16 = s.read()?;
        let subtable_offsets = s.read_array_of_count16(count)?;
        let mark_filtering_set = if flags.contains(LookupFlags::USE_MARK_FILTERING_SET) {
            Some(s.read::<u16>()?)
        } else {
            None
        };
        Some(LookupHeader { kind, flags, mark_filtering_set, subtable_offsets, data })
    }

    pub fn subtable_count(&self) -> u16 {
        self.subtable_offsets.len()
    }

    pub fn subtable_data(&self, index: u16) -> Option<&'a [u8]> {
        let off = self.subtable_offsets.get(index)?;
        self.data.get(off.to_usize()..)
    }
}

/// A [Coverage Table](https://learn.microsoft.com/typography/opentype/spec/chapter2#coverage-table).
#[derive(Clone, Copy)]
pub struct Coverage<'a> {
    data: &'a [u8],
}

impl<'a> Coverage<'a> {
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        // Validate eagerly so a malformed format degrades to "empty" (spec.md §7).
        let format = Stream::new(data).read::<u16>()?;
        if format != 1 && format != 2 {
            return None;
        }
        Some(Coverage { data })
    }

    /// Binary-search lookup, returning the dense 0-based coverage index.
    pub fn get(&self, glyph: GlyphId) -> Option<u16> {
        let mut s = Stream::new(self.data);
        let format: u16 = s.read()?;
        match format {
            1 => {
                let glyphs = s.read_array16::<GlyphId>()?;
                let (idx, _) = glyphs.binary_search_by(|g| g.0.cmp(&glyph.0))?;
                Some(idx)
            }
            2 => {
                let ranges = s.read_array16::<RangeRecord>()?;
                for r in ranges.iter() {
                    if glyph.0 >= r.start.0 && glyph.0 <= r.end.0 {
                        return Some(r.start_coverage_index + (glyph.0 - r.start.0));
                    }
                }
                None
            }
            _ => None,
        }
    }

    pub fn contains(&self, glyph: GlyphId) -> bool {
        self.get(glyph).is_some()
    }

    pub fn len(&self) -> u16 {
        let mut s = Stream::new(self.data);
        match s.read::<u16>() {
            Some(1) => s.read_array16::<GlyphId>().map(|a| a.len()).unwrap_or(0),
            Some(2) => {
                s.read_array16::<RangeRecord>()
                    .map(|a| a.iter().map(|r| r.end.0 - r.start.0 + 1).sum())
                    .unwrap_or(0)
            }
            _ => 0,
        }
    }
}

#[derive(Clone, Copy)]
struct RangeRecord {
    start: GlyphId,
    end: GlyphId,
    start_coverage_index: u16,
}

impl FromData for RangeRecord {
    const SIZE: usize = 6;
    fn parse(data: &[u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        Some(RangeRecord { start: s.read()?, end: s.read()?, start_coverage_index: s.read()? })
    }
}

/// A [Class Definition Table](https://learn.microsoft.com/typography/opentype/spec/chapter2#class-definition-table).
#[derive(Clone, Copy)]
pub struct ClassDef<'a> {
    data: &'a [u8],
}

impl<'a> ClassDef<'a> {
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let format = Stream::new(data).read::<u16>()?;
        if format != 1 && format != 2 {
            return None;
        }
        Some(ClassDef { data })
    }

    /// Any glyph not covered belongs to class 0.
    pub fn get(&self, glyph: GlyphId) -> u16 {
        self.get_impl(glyph).unwrap_or(0)
    }

    fn get_impl(&self, glyph: GlyphId) -> Option<u16> {
        let mut s = Stream::new(self.data);
        let format: u16 = s.read()?;
        match format {
            1 => {
                let start: GlyphId = s.read()?;
                if glyph.0 < start.0 {
                    return None;
                }
                let classes = s.read_array16::<u16>()?;
                classes.get(glyph.0 - start.0)
            }
            2 => {
                let ranges = s.read_array16::<ClassRangeRecord>()?;
                for r in ranges.iter() {
                    if glyph.0 >= r.start.0 && glyph.0 <= r.end.0 {
                        return Some(r.class);
                    }
                }
                None
            }
            _ => None,
        }
    }
}

#[derive(Clone, Copy)]
struct ClassRangeRecord {
    start: GlyphId,
    end: GlyphId,
    class: u16,
}

impl FromData for ClassRangeRecord {
    const SIZE: usize = 6;
    fn parse(data: &[u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        Some(ClassRangeRecord { start: s.read()?, end: s.read()?, class: s.read()? })
    }
}

// ---- Feature variations (spec.md §4.6 item 6) ----

#[derive(Clone, Copy)]
struct FeatureVariationRecordRaw {
    condition_set_offset: Offset32,
    feature_table_substitution_offset: Offset32,
}

impl FromData for FeatureVariationRecordRaw {
    const SIZE: usize = 8;
    fn parse(data: &[u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        Some(FeatureVariationRecordRaw {
            condition_set_offset: s.read()?,
            feature_table_substitution_offset: s.read()?,
        })
    }
}

pub struct FeatureVariationsIter<'a> {
    base: &'a [u8],
    records: LazyArray32<'a, FeatureVariationRecordRaw>,
    index: u32,
}

impl<'a> Iterator for FeatureVariationsIter<'a> {
    type Item = FeatureVariation<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rec = self.records.get(self.index)?;
        self.index += 1;
        Some(FeatureVariation { base: self.base, rec })
    }
}

#[derive(Clone, Copy)]
pub struct FeatureVariation<'a> {
    base: &'a [u8],
    rec: FeatureVariationRecordRaw,
}

impl<'a> FeatureVariation<'a> {
    /// Evaluates the AND of every condition in this record's `ConditionSet`
    /// against normalized (F2.14, scaled to i32) variation coordinates.
    pub fn evaluate(&self, coords: &[i32]) -> bool {
        if self.rec.condition_set_offset.is_null() {
            return true;
        }

        let data = match self.base.get(self.rec.condition_set_offset.to_usize()..) {
            Some(d) => d,
            None => return false,
        };

        let offsets = match Stream::new(data).read_array16::<Offset32>() {
            Some(o) => o,
            None => return false,
        };

        for off in offsets.iter() {
            let cond_data = match data.get(off.to_usize()..) {
                Some(d) => d,
                None => return false,
            };
            if !evaluate_condition(cond_data, coords) {
                return false;
            }
        }

        true
    }

    pub fn substitutions(&self) -> FeatureSubstitutionsIter<'a> {
        if self.rec.feature_table_substitution_offset.is_null() {
            return FeatureSubstitutionsIter { base: &[], records: LazyArray16::default(), index: 0 };
        }

        match self.base.get(self.rec.feature_table_substitution_offset.to_usize()..) {
            Some(data) => {
                let mut s = Stream::new(data);
                s.skip::<u16>();
                s.skip::<u16>();
                let records = s.read_array16::<FeatureTableSubstitutionRecord>().unwrap_or_default();
                FeatureSubstitutionsIter { base: data, records, index: 0 }
            }
            None => FeatureSubstitutionsIter { base: &[], records: LazyArray16::default(), index: 0 },
        }
    }
}

fn evaluate_condition(data: &[u8], coords: &[i32]) -> bool {
    let mut s = Stream::new(data);
    let format: u16 = match s.read() { Some(v) => v, None => return false };
    if format != 1 {
        // Only the Format-1 axis-range condition exists in OpenType 1.8; an
        // unrecognized future format degrades to "no constraint" per the
        // InvalidFormat policy.
        return true;
    }

    let axis_index: u16 = match s.read() { Some(v) => v, None => return false };
    let min: i16 = match s.read() { Some(v) => v, None => return false };
    let max: i16 = match s.read() { Some(v) => v, None => return false };
    let coord = coords.get(axis_index as usize).copied().unwrap_or(0);
    (min as i32) <= coord && coord <= (max as i32)
}

#[derive(Clone, Copy)]
struct FeatureTableSubstitutionRecord {
    index: FeatureIndex,
    table_offset: Offset32,
}

impl FromData for FeatureTableSubstitutionRecord {
    const SIZE: usize = 6;
    fn parse(data: &[u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        Some(FeatureTableSubstitutionRecord { index: s.read()?, table_offset: s.read()? })
    }
}

pub struct FeatureSubstitutionsIter<'a> {
    base: &'a [u8],
    records: LazyArray16<'a, FeatureTableSubstitutionRecord>,
    index: u16,
}

impl<'a> Iterator for FeatureSubstitutionsIter<'a> {
    type Item = (FeatureIndex, Feature<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let rec = self.records.get(self.index)?;
        self.index += 1;
        let data = self.base.get(rec.table_offset.to_usize()..)?;
        let feature = Feature::parse(Tag(0), data)?;
        Some((rec.index, feature))
    }
}

// ---- GDEF ----

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GlyphClass {
    Unclassified,
    Base,
    Ligature,
    Mark,
    Component,
}

pub struct Gdef<'a> {
    glyph_class_def: Option<ClassDef<'a>>,
    mark_attach_class_def: Option<ClassDef<'a>>,
    mark_glyph_sets: Option<MarkGlyphSets<'a>>,
}

impl<'a> Gdef<'a> {
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let major: u16 = s.read()?;
        let minor: u16 = s.read()?;
        if major != 1 {
            return None;
        }

        let glyph_class_def_offset: Offset16 = s.read()?;
        s.skip::<Offset16>(); // AttachListOffset, not consumed by shaping.
        s.skip::<Offset16>(); // LigCaretListOffset, not consumed by shaping.
        let mark_attach_class_def_offset: Offset16 = s.read()?;

        let mut mark_glyph_sets_offset: Option<Offset16> = None;
        if minor >= 2 {
            mark_glyph_sets_offset = s.read();
        }
        if minor >= 3 {
            s.skip::<Offset32>(); // ItemVarStore: variable-font GDEF value deltas, out of scope.
        }

        Some(Gdef {
            glyph_class_def: if glyph_class_def_offset.is_null() {
                None
            } else {
                data.get(glyph_class_def_offset.to_usize()..).and_then(ClassDef::parse)
            },
            mark_attach_class_def: if mark_attach_class_def_offset.is_null() {
                None
            } else {
                data.get(mark_attach_class_def_offset.to_usize()..).and_then(ClassDef::parse)
            },
            mark_glyph_sets: mark_glyph_sets_offset
                .filter(|o| !o.is_null())
                .and_then(|o| data.get(o.to_usize()..))
                .and_then(MarkGlyphSets::parse),
        })
    }

    pub fn glyph_class(&self, glyph: GlyphId) -> GlyphClass {
        match self.glyph_class_def.as_ref().map(|c| c.get(glyph)).unwrap_or(0) {
            1 => GlyphClass::Base,
            2 => GlyphClass::Ligature,
            3 => GlyphClass::Mark,
            4 => GlyphClass::Component,
            _ => GlyphClass::Unclassified,
        }
    }

    pub fn mark_attachment_class(&self, glyph: GlyphId) -> u16 {
        self.mark_attach_class_def.as_ref().map(|c| c.get(glyph)).unwrap_or(0)
    }

    pub fn mark_glyph_set_contains(&self, set_index: u16, glyph: GlyphId) -> bool {
        self.mark_glyph_sets
            .as_ref()
            .and_then(|s| s.coverage_at(set_index))
            .map(|c| c.contains(glyph))
            .unwrap_or(false)
    }
}

// ---- GPOS value records and anchors ----

bitflags::bitflags! {
    pub struct ValueFormatFlags: u16 {
        const X_PLACEMENT = 0x0001;
        const Y_PLACEMENT = 0x0002;
        const X_ADVANCE   = 0x0004;
        const Y_ADVANCE   = 0x0008;
        const X_PLACEMENT_DEVICE = 0x0010;
        const Y_PLACEMENT_DEVICE = 0x0020;
        const X_ADVANCE_DEVICE   = 0x0040;
        const Y_ADVANCE_DEVICE   = 0x0080;
    }
}

impl ValueFormatFlags {
    /// Byte length of a `ValueRecord` in this format (device-table offsets
    /// included; the device tables themselves are variable-font hinting
    /// deltas, out of scope here, so their offsets are read and discarded).
    pub fn record_size(self) -> usize {
        self.bits().count_ones() as usize * 2
    }
}

#[derive(Clone, Copy, Default, Debug)]
pub struct ValueRecord {
    pub x_placement: i32,
    pub y_placement: i32,
    pub x_advance: i32,
    pub y_advance: i32,
}

impl ValueRecord {
    pub fn parse(s: &mut Stream, format: ValueFormatFlags) -> Option<Self> {
        let mut v = ValueRecord::default();
        if format.contains(ValueFormatFlags::X_PLACEMENT) {
            v.x_placement = s.read::<i16>()? as i32;
        }
        if format.contains(ValueFormatFlags::Y_PLACEMENT) {
            v.y_placement = s.read::<i16>()? as i32;
        }
        if format.contains(ValueFormatFlags::X_ADVANCE) {
            v.x_advance = s.read::<i16>()? as i32;
        }
        if format.contains(ValueFormatFlags::Y_ADVANCE) {
            v.y_advance = s.read::<i16>()? as i32;
        }
        if format.contains(ValueFormatFlags::X_PLACEMENT_DEVICE) {
            s.skip::<Offset16>();
        }
        if format.contains(ValueFormatFlags::Y_PLACEMENT_DEVICE) {
            s.skip::<Offset16>();
        }
        if format.contains(ValueFormatFlags::X_ADVANCE_DEVICE) {
            s.skip::<Offset16>();
        }
        if format.contains(ValueFormatFlags::Y_ADVANCE_DEVICE) {
            s.skip::<Offset16>();
        }
        Some(v)
    }
}

#[derive(Clone, Copy, Default, Debug)]
pub struct Anchor {
    pub x: i32,
    pub y: i32,
}

impl Anchor {
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let format: u16 = s.read()?;
        if format == 0 {
            return None;
        }
        let x: i16 = s.read()?;
        let y: i16 = s.read()?;
        // Formats 2 (contour-point hinting) and 3 (device-table deltas) carry
        // extra fields after x/y that shaping doesn't need.
        Some(Anchor { x: x as i32, y: y as i32 })
    }
}

struct MarkGlyphSets<'a> {
    data: &'a [u8],
    offsets: LazyArray16<'a, Offset32>,
}

impl<'a> MarkGlyphSets<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        s.skip::<u16>(); // format
        let offsets = s.read_array16::<Offset32>()?;
        Some(MarkGlyphSets { data, offsets })
    }

    fn coverage_at(&self, index: u16) -> Option<Coverage<'a>> {
        let off = self.offsets.get(index)?;
        Coverage::parse(self.data.get(off.to_usize()..)?)
    }
}
