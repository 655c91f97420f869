//! The glyph buffer: the mutable object threaded through every shaping phase.

use std::ops::Range;

use crate::common::{Direction, Language, Script};
use crate::unicode;

bitflags::bitflags! {
    /// Per-position flags on [`GlyphInfo`], preserved across substitutions
    /// so later passes can see a position's history.
    #[derive(Default)]
    pub struct GlyphPropsFlags: u16 {
        // GDEF classes, mirrored here so masks survive substitution even
        // when a glyph's GDEF class can no longer be looked up (e.g. a
        // synthesized glyph with no font entry).
        const BASE_GLYPH    = 0x0001;
        const LIGATURE      = 0x0002;
        const MARK          = 0x0004;
        const COMPONENT     = 0x0008;

        const CLASS_MASK = Self::BASE_GLYPH.bits | Self::LIGATURE.bits
            | Self::MARK.bits | Self::COMPONENT.bits;

        // The following don't touch the class mask.
        const SUBSTITUTED   = 0x0010;
        const LIGATED       = 0x0020;
        const MULTIPLIED    = 0x0040;

        const PRESERVE = Self::SUBSTITUTED.bits | Self::LIGATED.bits | Self::MULTIPLIED.bits;
    }
}

bitflags::bitflags! {
    #[derive(Default)]
    pub struct BufferScratchFlags: u32 {
        const HAS_NON_ASCII            = 0x0000_0001;
        const HAS_DEFAULT_IGNORABLES   = 0x0000_0002;
        const HAS_SPACE_FALLBACK       = 0x0000_0004;
        const HAS_GPOS_ATTACHMENT      = 0x0000_0008;
        const HAS_UNSAFE_TO_BREAK      = 0x0000_0010;
        const HAS_CGJ                  = 0x0000_0020;

        // Reserved for complex shapers to use freely (one bit each).
        const COMPLEX0 = 0x0100_0000;
        const COMPLEX1 = 0x0200_0000;
        const COMPLEX2 = 0x0400_0000;
        const COMPLEX3 = 0x0800_0000;
    }
}

bitflags::bitflags! {
    /// Flags the caller attaches to the whole buffer.
    #[derive(Default)]
    pub struct BufferFlags: u32 {
        const BEGINNING_OF_TEXT = 0x0000_0001;
        const END_OF_TEXT       = 0x0000_0002;
        const PRESERVE_DEFAULT_IGNORABLES = 0x0000_0004;
        const REMOVE_DEFAULT_IGNORABLES   = 0x0000_0008;
        const DO_NOT_INSERT_DOTTED_CIRCLE = 0x0000_0010;
    }
}

/// Controls how aggressively `merge_clusters` is allowed to widen a cluster range.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BufferClusterLevel {
    MonotoneGraphemes,
    MonotoneCharacters,
    Characters,
}

impl Default for BufferClusterLevel {
    fn default() -> Self {
        BufferClusterLevel::MonotoneGraphemes
    }
}

/// Packed `(lig_id, lig_component)`-style payload identifying which ligature
/// (if any) a position belongs to, and which component of it.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct LigatureProps {
    pub lig_id: u8,
    pub lig_comp: u8,
}

/// One syllable tag: `(serial, syllable_type)` packed as the spec requires,
/// kept unpacked here for ergonomics.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct SyllableInfo {
    pub serial: u8,
    pub kind: u8,
}

/// One glyph-info entry: everything about a buffer position except its final
/// placement (see [`GlyphPosition`]).
#[derive(Clone, Copy, Debug)]
pub struct GlyphInfo {
    /// Before cmap mapping: a Unicode scalar value. After mapping: the
    /// original codepoint is retained for shapers and the normalizer that
    /// still need it (e.g. Arabic joining, stch measurement).
    pub codepoint: u32,
    pub mask: crate::Mask,
    /// Monotone non-decreasing cluster index (invariant 2, spec.md §3).
    pub cluster: u32,

    pub(crate) glyph_props: GlyphPropsFlags,
    pub(crate) lig_props: LigatureProps,
    pub(crate) syllable: SyllableInfo,
    pub(crate) modified_combining_class: u8,
    pub(crate) unicode_props: u16,
    /// Free scratch byte complex shapers use for their own per-position
    /// state between `setup_masks` and later passes (Arabic's joining
    /// action, USE's category, etc.) — cleared implicitly by whichever
    /// shaper owns the run, never read across shapers.
    pub(crate) complex_aux: u8,

    /// The resolved `GlyphId`. Zero (.notdef) until cmap mapping runs, and
    /// the active glyph thereafter.
    pub glyph_id: u32,
}

impl Default for GlyphInfo {
    fn default() -> Self {
        GlyphInfo {
            codepoint: 0,
            mask: 0,
            cluster: 0,
            glyph_props: GlyphPropsFlags::empty(),
            lig_props: LigatureProps::default(),
            syllable: SyllableInfo::default(),
            modified_combining_class: 0,
            unicode_props: 0,
            complex_aux: 0,
            glyph_id: 0,
        }
    }
}

// Bits within `unicode_props`, mirroring HarfBuzz's `hb_buffer_t::unicode_props`
// packing: low byte mirrors `GeneralCategory`, remaining bits are single flags.
mod unicode_props_bits {
    pub const GENERAL_CATEGORY_BITS: u16 = 0x00ff;
    pub const IGNORABLE: u16 = 0x0100;
    pub const HIDDEN: u16 = 0x0200;
    pub const CONTINUATION: u16 = 0x0400; // diacritic or non-starter: not safe to break before.
}

impl GlyphInfo {
    #[inline]
    pub fn as_char(&self) -> char {
        char::from_u32(self.codepoint).unwrap_or('\u{FFFD}')
    }

    #[inline]
    pub fn general_category(&self) -> unicode::GeneralCategory {
        unicode::GeneralCategory::from_hb(
            (self.unicode_props & unicode_props_bits::GENERAL_CATEGORY_BITS) as u8,
        )
    }

    #[inline]
    pub(crate) fn set_general_category(&mut self, gc: unicode::GeneralCategory) {
        self.unicode_props = (self.unicode_props & !unicode_props_bits::GENERAL_CATEGORY_BITS)
            | (gc.to_hb() as u16);
    }

    #[inline]
    pub fn modified_combining_class(&self) -> u8 {
        self.modified_combining_class
    }

    #[inline]
    pub fn set_modified_combining_class(&mut self, ccc: u8) {
        self.modified_combining_class = ccc;
    }

    #[inline]
    pub fn is_default_ignorable(&self) -> bool {
        self.unicode_props & unicode_props_bits::IGNORABLE != 0
            && !self.is_ligated_and_didnt_multiply()
    }

    pub(crate) fn set_default_ignorable(&mut self, v: bool) {
        if v {
            self.unicode_props |= unicode_props_bits::IGNORABLE;
        } else {
            self.unicode_props &= !unicode_props_bits::IGNORABLE;
        }
    }

    #[inline]
    pub fn is_hidden(&self) -> bool {
        self.unicode_props & unicode_props_bits::HIDDEN != 0
    }

    pub(crate) fn set_hidden(&mut self, v: bool) {
        if v {
            self.unicode_props |= unicode_props_bits::HIDDEN;
        } else {
            self.unicode_props &= !unicode_props_bits::HIDDEN;
        }
    }

    #[inline]
    pub(crate) fn is_continuation(&self) -> bool {
        self.unicode_props & unicode_props_bits::CONTINUATION != 0
    }

    #[inline]
    pub fn is_mark(&self) -> bool {
        self.glyph_props.contains(GlyphPropsFlags::MARK)
    }

    #[inline]
    pub fn is_base_glyph(&self) -> bool {
        self.glyph_props.contains(GlyphPropsFlags::BASE_GLYPH)
    }

    #[inline]
    pub fn is_ligature(&self) -> bool {
        self.glyph_props.contains(GlyphPropsFlags::LIGATURE)
    }

    #[inline]
    pub fn is_substituted(&self) -> bool {
        self.glyph_props.contains(GlyphPropsFlags::SUBSTITUTED)
    }

    #[inline]
    pub fn is_ligated(&self) -> bool {
        self.glyph_props.contains(GlyphPropsFlags::LIGATED)
    }

    #[inline]
    pub fn is_multiplied(&self) -> bool {
        self.glyph_props.contains(GlyphPropsFlags::MULTIPLIED)
    }

    #[inline]
    fn is_ligated_and_didnt_multiply(&self) -> bool {
        self.is_ligated() && !self.is_multiplied()
    }

    #[inline]
    pub fn lig_comp(&self) -> u8 {
        if self.is_ligated() {
            0
        } else {
            self.lig_props.lig_comp
        }
    }

    #[inline]
    pub fn lig_id(&self) -> u8 {
        self.lig_props.lig_id
    }

    pub(crate) fn set_glyph_props(&mut self, props: GlyphPropsFlags) {
        self.glyph_props = props;
    }

    pub(crate) fn glyph_props(&self) -> GlyphPropsFlags {
        self.glyph_props
    }

    pub(crate) fn set_lig_props_for_ligature(&mut self, lig_id: u8, comp_count: u8) {
        self.lig_props = LigatureProps { lig_id, lig_comp: comp_count };
    }

    pub(crate) fn set_lig_props_for_mark(&mut self, lig_id: u8, lig_comp: u8) {
        self.lig_props = LigatureProps { lig_id, lig_comp };
    }

    pub(crate) fn set_lig_props_for_component(&mut self, comp: u8) {
        self.lig_props = LigatureProps { lig_id: 0, lig_comp: comp };
    }

    pub(crate) fn syllable_serial(&self) -> u8 {
        self.syllable.serial
    }

    pub(crate) fn set_syllable(&mut self, serial: u8, kind: u8) {
        self.syllable = SyllableInfo { serial, kind };
    }

    pub(crate) fn syllable_kind(&self) -> u8 {
        self.syllable.kind
    }

    pub(crate) fn complex_aux(&self) -> u8 {
        self.complex_aux
    }

    pub(crate) fn set_complex_aux(&mut self, v: u8) {
        self.complex_aux = v;
    }
}

/// One glyph-position entry: final or in-progress placement.
#[derive(Clone, Copy, Default, Debug, PartialEq)]
pub struct GlyphPosition {
    pub x_advance: i32,
    pub y_advance: i32,
    pub x_offset: i32,
    pub y_offset: i32,

    /// Signed index offset (in buffer positions) to the glyph this position
    /// attaches to, used by cursive and mark-attachment chains. Zero means
    /// "not attached".
    pub(crate) attach_chain: i16,
    pub(crate) attach_type: AttachType,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum AttachType {
    None,
    Mark,
    Cursive,
}

impl Default for AttachType {
    fn default() -> Self {
        AttachType::None
    }
}

/// Positions pending glyph-id assignment: the caller-facing intake object.
#[derive(Clone, Default, Debug)]
pub struct UnicodeBuffer {
    pub(crate) buffer: Buffer,
}

impl UnicodeBuffer {
    pub fn new() -> Self {
        UnicodeBuffer { buffer: Buffer::new() }
    }

    pub fn push_str(&mut self, text: &str) -> &mut Self {
        self.buffer.add_str(text);
        self
    }

    pub fn add(&mut self, codepoint: char, cluster: u32) -> &mut Self {
        self.buffer.add(codepoint as u32, cluster);
        self
    }

    pub fn set_direction(&mut self, direction: Direction) -> &mut Self {
        self.buffer.direction = direction;
        self
    }

    pub fn set_script(&mut self, script: Script) -> &mut Self {
        self.buffer.script = Some(script);
        self
    }

    pub fn set_language(&mut self, lang: Language) -> &mut Self {
        self.buffer.language = Some(lang);
        self
    }

    pub fn set_cluster_level(&mut self, level: BufferClusterLevel) -> &mut Self {
        self.buffer.cluster_level = level;
        self
    }

    pub fn set_flags(&mut self, flags: BufferFlags) -> &mut Self {
        self.buffer.flags = flags;
        self
    }

    /// Infers script/direction/language the same way HarfBuzz's
    /// `hb_buffer_guess_segment_properties` does: scan for the first
    /// codepoint whose Unicode `Script` property isn't Common/Inherited.
    pub fn guess_segment_properties(&mut self) {
        self.buffer.guess_segment_properties();
    }

    pub(crate) fn clear(mut self) -> Self {
        self.buffer.clear();
        self
    }
}

/// The output of a shape call: positioned glyphs.
#[derive(Clone, Default, Debug)]
pub struct GlyphBuffer {
    pub(crate) buffer: Buffer,
}

impl GlyphBuffer {
    pub fn len(&self) -> usize {
        self.buffer.info.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.info.is_empty()
    }

    pub fn glyph_infos(&self) -> &[GlyphInfo] {
        &self.buffer.info
    }

    pub fn glyph_positions(&self) -> &[GlyphPosition] {
        &self.buffer.pos
    }

    /// Releases the underlying storage so it can be reused for another
    /// `UnicodeBuffer`, avoiding reallocation across repeated shape calls —
    /// the allocation-reuse pattern spec.md §5 calls out for the buffer's
    /// auxiliary vectors.
    pub fn clear(self) -> UnicodeBuffer {
        UnicodeBuffer { buffer: self.buffer }.clear()
    }
}

/// The buffer threaded through every phase. See spec.md §3 "Buffer".
#[derive(Clone, Debug)]
pub struct Buffer {
    pub(crate) info: Vec<GlyphInfo>,
    pub(crate) pos: Vec<GlyphPosition>,

    // Output-sync model (spec.md §4.2).
    pub(crate) out_info: Vec<GlyphInfo>,
    pub(crate) out_pos: Vec<GlyphPosition>,
    pub(crate) idx: usize,
    pub(crate) have_output: bool,

    pub(crate) direction: Direction,
    pub(crate) script: Option<Script>,
    pub(crate) language: Option<Language>,
    pub(crate) cluster_level: BufferClusterLevel,
    pub(crate) flags: BufferFlags,
    pub(crate) scratch_flags: BufferScratchFlags,

    pub(crate) max_ops: i32,
    serial: u8,
    // Up to 5 codepoints of text that existed immediately before/after the
    // segment, never shaped but consulted by context-sensitive passes like
    // Arabic joining. Index 0 = before, index 1 = after.
    pub(crate) context: [[char; 5]; 2],
    pub(crate) context_len: [usize; 2],
}

impl Default for Buffer {
    fn default() -> Self {
        Buffer::new()
    }
}

const MAX_OPS_FACTOR: i32 = 1024;

impl Buffer {
    pub fn new() -> Self {
        Buffer {
            info: Vec::new(),
            pos: Vec::new(),
            out_info: Vec::new(),
            out_pos: Vec::new(),
            idx: 0,
            have_output: false,
            direction: Direction::Invalid,
            script: None,
            language: None,
            cluster_level: BufferClusterLevel::default(),
            flags: BufferFlags::empty(),
            scratch_flags: BufferScratchFlags::empty(),
            max_ops: 0,
            serial: 0,
            context: [[char::default(); 5]; 2],
            context_len: [0; 2],
        }
    }

    pub(crate) fn clear(&mut self) {
        self.info.clear();
        self.pos.clear();
        self.out_info.clear();
        self.out_pos.clear();
        self.idx = 0;
        self.have_output = false;
        self.direction = Direction::Invalid;
        self.script = None;
        self.language = None;
        self.scratch_flags = BufferScratchFlags::empty();
        self.serial = 0;
        self.context = [[char::default(); 5]; 2];
        self.context_len = [0; 2];
    }

    pub(crate) fn add_str(&mut self, text: &str) {
        for (i, c) in text.char_indices() {
            self.add(c as u32, i as u32);
        }
    }

    pub(crate) fn add(&mut self, codepoint: u32, cluster: u32) {
        let mut info = GlyphInfo::default();
        info.codepoint = codepoint;
        info.cluster = cluster;
        self.info.push(info);
        self.pos.push(GlyphPosition::default());
    }

    pub fn len(&self) -> usize {
        self.info.len()
    }

    pub fn is_empty(&self) -> bool {
        self.info.is_empty()
    }

    pub fn info(&self) -> &[GlyphInfo] {
        &self.info
    }

    pub fn info_mut(&mut self) -> &mut [GlyphInfo] {
        &mut self.info
    }

    pub(crate) fn out_info_mut(&mut self) -> &mut [GlyphInfo] {
        &mut self.out_info
    }

    /// `pos` as the matcher should see it: once a lookup has started
    /// producing output, positions left of `idx` live in `out_info`
    /// (already-substituted), not `info` (pre-substitution input).
    pub(crate) fn matcher_info(&self, pos: usize) -> &GlyphInfo {
        if self.have_output && pos < self.out_info.len() {
            &self.out_info[pos]
        } else {
            &self.info[pos]
        }
    }

    pub fn pos(&self) -> &[GlyphPosition] {
        &self.pos
    }

    pub fn pos_mut(&mut self) -> &mut [GlyphPosition] {
        &mut self.pos
    }

    pub fn scratch_flags(&self) -> BufferScratchFlags {
        self.scratch_flags
    }

    pub fn set_scratch_flags(&mut self, flags: BufferScratchFlags) {
        self.scratch_flags = flags;
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn context(&self, side: usize, i: usize) -> char {
        self.context[side][i]
    }

    pub fn context_len(&self, side: usize) -> usize {
        self.context_len[side]
    }

    fn next_serial(&mut self) -> u8 {
        self.serial = self.serial.wrapping_add(1);
        self.serial
    }

    pub(crate) fn allocate_lig_id(&mut self) -> u8 {
        self.next_serial()
    }

    // ---- Output-sync model (spec.md §4.2) ----

    pub(crate) fn clear_output(&mut self) {
        self.idx = 0;
        self.out_info.clear();
        self.have_output = true;
    }

    pub(crate) fn out_len(&self) -> usize {
        self.out_info.len()
    }

    pub(crate) fn next_glyph(&mut self) {
        if self.have_output {
            let info = self.info[self.idx];
            self.out_info.push(info);
        }
        self.idx += 1;
    }

    pub(crate) fn next_glyphs(&mut self, n: usize) {
        for _ in 0..n {
            self.next_glyph();
        }
    }

    pub(crate) fn skip_glyph(&mut self) {
        self.idx += 1;
    }

    /// Appends a new entry, inheriting properties from the current input
    /// position but with a replaced glyph id, without consuming input.
    pub(crate) fn output_glyph(&mut self, glyph_id: u32) -> GlyphInfo {
        if !self.have_output {
            self.clear_output();
            // Copy everything processed so far.
            self.out_info.extend_from_slice(&self.info[..self.idx]);
        }

        let mut info = if self.idx < self.info.len() {
            self.info[self.idx]
        } else if let Some(last) = self.out_info.last() {
            *last
        } else {
            GlyphInfo::default()
        };

        info.glyph_id = glyph_id;
        self.out_info.push(info);
        info
    }

    pub(crate) fn output_info(&mut self, info: GlyphInfo) {
        if !self.have_output {
            self.clear_output();
            self.out_info.extend_from_slice(&self.info[..self.idx]);
        }

        self.out_info.push(info);
    }

    pub(crate) fn replace_glyph(&mut self, glyph_id: u32) {
        self.output_glyph(glyph_id);
        self.idx += 1;
    }

    pub(crate) fn replace_glyphs(&mut self, num_in: usize, replacements: &[u32]) {
        if !self.have_output {
            self.clear_output();
            self.out_info.extend_from_slice(&self.info[..self.idx]);
        }

        self.merge_clusters(self.idx, self.idx + num_in);

        let orig = self.info[self.idx];
        for (i, &gid) in replacements.iter().enumerate() {
            let mut info = orig;
            info.glyph_id = gid;
            info.glyph_props.insert(GlyphPropsFlags::MULTIPLIED);
            info.set_lig_props_for_component(i as u8);
            self.out_info.push(info);
        }

        self.idx += num_in;
    }

    pub(crate) fn delete_glyph(&mut self) {
        // Merge the deleted position's cluster into a neighbor so we never
        // lose cluster coverage for the deleted text.
        let cluster = self.info[self.idx].cluster;
        if self.out_len() > 0 {
            let last = self.out_len() - 1;
            if self.out_info[last].cluster == cluster {
                self.idx += 1;
                return;
            }
        } else if self.idx + 1 < self.info.len() && self.info[self.idx + 1].cluster == cluster {
            self.idx += 1;
            return;
        }

        self.idx += 1;
    }

    pub(crate) fn delete_glyphs_inplace(&mut self, mut keep: impl FnMut(&GlyphInfo) -> bool) {
        let mut j = 0;
        for i in 0..self.info.len() {
            if keep(&self.info[i]) {
                if i != j {
                    self.info[j] = self.info[i];
                    self.pos[j] = self.pos[i];
                }
                j += 1;
            } else if j > 0 {
                // Merge a deleted glyph's cluster into its predecessor so
                // cluster values stay monotone and no source text is lost.
                self.merge_clusters(j - 1, j);
            }
        }
        self.info.truncate(j);
        self.pos.truncate(j);
    }

    /// Relocates the split point so the output half has exactly `target` entries.
    pub(crate) fn move_to(&mut self, target: usize) {
        if !self.have_output {
            if target > self.idx {
                return;
            }
            self.idx = target;
            return;
        }

        if target < self.out_len() {
            // Move excess output back to be reprocessed as input: shrink
            // out_info and rewind idx to match.
            let excess = self.out_len() - target;
            self.idx -= excess.min(self.idx);
            self.out_info.truncate(target);
        } else if target > self.out_len() && target <= self.idx {
            let start = self.out_len();
            for i in start..target {
                let info = self.info[i];
                self.out_info.push(info);
            }
        }
    }

    pub(crate) fn sync(&mut self) {
        if !self.have_output {
            self.have_output = false;
            return;
        }

        if self.idx < self.info.len() {
            self.out_info.extend_from_slice(&self.info[self.idx..]);
        }

        std::mem::swap(&mut self.info, &mut self.out_info);
        // Rebuild `pos` at the new length; positions are recomputed by the
        // phase that follows substitution (base advances, then GPOS), so a
        // fresh zeroed vector is correct here.
        self.pos = vec![GlyphPosition::default(); self.info.len()];
        self.out_info.clear();
        self.out_pos.clear();
        self.idx = 0;
        self.have_output = false;
    }

    /// Expands the range outward while adjacent positions share an endpoint's
    /// cluster value, then assigns the minimum cluster to everything inside.
    pub(crate) fn merge_clusters(&mut self, start: usize, end: usize) {
        if end - start < 2 {
            return;
        }
        self.merge_clusters_impl(start, end)
    }

    fn target_slice_mut(&mut self) -> &mut [GlyphInfo] {
        if self.have_output {
            &mut self.out_info
        } else {
            &mut self.info
        }
    }

    fn merge_clusters_impl(&mut self, mut start: usize, mut end: usize) {
        if self.cluster_level == BufferClusterLevel::Characters {
            // No merging at all: every character keeps its own cluster.
            return;
        }

        {
            let slice = self.target_slice_mut();
            if end > slice.len() || start >= end {
                return;
            }

            let mut cluster = slice[start].cluster;
            for i in start + 1..end {
                cluster = cluster.min(slice[i].cluster);
            }

            // Extend backward/forward while a neighbor shares an endpoint cluster.
            while start > 0 && slice[start - 1].cluster == slice[start].cluster {
                start -= 1;
            }
            while end < slice.len() && slice[end - 1].cluster == slice[end].cluster {
                end += 1;
            }

            for i in start..end {
                slice[i].cluster = cluster;
            }
        }
    }

    pub(crate) fn unsafe_to_break(&mut self, start: usize, end: usize) {
        if end - start < 2 {
            return;
        }
        self.scratch_flags.insert(BufferScratchFlags::HAS_UNSAFE_TO_BREAK);
        self.merge_clusters(start, end);
    }

    pub(crate) fn ensure(&mut self, size: usize) {
        if self.info.len() < size {
            self.info.resize(size, GlyphInfo::default());
            self.pos.resize(size, GlyphPosition::default());
        }
    }

    pub(crate) fn set_len(&mut self, len: usize) {
        self.info.truncate(len);
        self.pos.truncate(len);
    }

    pub(crate) fn reverse(&mut self) {
        self.info.reverse();
        self.pos.reverse();
    }

    pub(crate) fn reverse_range(&mut self, range: Range<usize>) {
        self.info[range.clone()].reverse();
        self.pos[range].reverse();
    }

    /// Reverses the glyph order cluster-by-cluster (not glyph-by-glyph):
    /// used for RTL output so that multi-glyph clusters (ligatures, marks)
    /// keep their internal glyph order while cluster order flips.
    pub(crate) fn reverse_clusters(&mut self) {
        if self.info.is_empty() {
            return;
        }

        let mut start = 0;
        let n = self.info.len();
        let mut ranges = Vec::new();
        for i in 1..=n {
            if i == n || self.info[i].cluster != self.info[start].cluster {
                ranges.push(start..i);
                start = i;
            }
        }

        for r in &ranges {
            self.reverse_range(r.clone());
        }
        ranges.reverse();

        let mut new_info = Vec::with_capacity(n);
        let mut new_pos = Vec::with_capacity(n);
        for r in ranges {
            new_info.extend_from_slice(&self.info[r.clone()]);
            new_pos.extend_from_slice(&self.pos[r]);
        }
        self.info = new_info;
        self.pos = new_pos;
    }

    pub(crate) fn guess_segment_properties(&mut self) {
        if self.script.is_none() {
            let mut found = None;
            for info in &self.info {
                if let Some(c) = char::from_u32(info.codepoint) {
                    if let Some(script) = unicode::script_for_char(c) {
                        found = Some(script);
                        break;
                    }
                }
            }
            self.script = found;
        }

        if self.direction == Direction::Invalid {
            self.direction = self
                .script
                .map(Script::horizontal_direction)
                .unwrap_or(Direction::LeftToRight);
        }

        if self.language.is_none() {
            self.language = Language::from_str("en");
        }
    }

    /// Sets every position's mask to `mask`, the starting point complex
    /// shapers' `setup_masks` then OR additional per-feature bits onto
    /// (spec.md §4.6 item 2's global bit, reserved at bit 0).
    pub(crate) fn reset_masks(&mut self, mask: crate::Mask) {
        for info in &mut self.info {
            info.mask = mask;
        }
    }

    /// Zeroes the width (and optionally offsets) of every position flagged
    /// as a mark; used by the default zero-mark-advance policy.
    pub(crate) fn zero_mark_widths_by_gdef(&mut self, face: &crate::face::Face) {
        for (info, pos) in self.info.iter().zip(self.pos.iter_mut()) {
            if face.glyph_class(ttf_parser::GlyphId(info.glyph_id as u16))
                == crate::ot::layout::GlyphClass::Mark
            {
                pos.x_advance = 0;
                pos.y_advance = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_arabic_script_and_rtl_direction() {
        let mut buffer = Buffer::new();
        buffer.add_str("\u{0627}\u{0644}"); // Arabic "al"
        buffer.guess_segment_properties();
        assert_eq!(buffer.script, Script::from_iso15924_tag(crate::common::Tag::from_bytes(b"Arab")));
        assert_eq!(buffer.direction, Direction::RightToLeft);
    }

    #[test]
    fn reset_masks_overwrites_every_position() {
        let mut buffer = Buffer::new();
        buffer.add(0x0041, 0);
        buffer.add(0x0042, 1);
        buffer.info[0].mask = 0;
        buffer.info[1].mask = 7;
        buffer.reset_masks(1);
        assert!(buffer.info.iter().all(|i| i.mask == 1));
    }
}
