//! `ApplyContext` (spec.md §4.4): the state threaded through a single
//! lookup's application, including the recursion guard for nested (context)
//! lookups.

use crate::buffer::Buffer;
use crate::face::Face;
use crate::ot::layout::LookupFlags;
use crate::Mask;

/// OpenType lookups nest through context/chaining-context subtables; this
/// caps recursion depth the same way HarfBuzz's `MAX_NESTING_LEVEL` does, to
/// bound pathological fonts rather than blow the call stack.
pub const MAX_NESTING_LEVEL: u32 = 64;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TableKind {
    Gsub,
    Gpos,
}

pub struct ApplyContext<'a, 'b> {
    pub face: &'a Face<'a>,
    pub buffer: &'b mut Buffer,
    pub table: TableKind,
    pub lookup_flags: LookupFlags,
    pub mark_filtering_set: Option<u16>,
    /// The feature mask this lookup is gated behind; a position whose mask
    /// doesn't include this bit is invisible to matching (spec.md §4.3).
    pub feature_mask: Mask,
    pub auto_zwj: bool,
    pub auto_zwnj: bool,
    pub nesting_level: u32,
    /// Set by a complex shaper's `setup_masks` to confine a context lookup's
    /// input run to a single syllable (spec.md §4.6 item "per-syllable
    /// constraint").
    pub syllable: Option<u8>,
}

impl<'a, 'b> ApplyContext<'a, 'b> {
    pub fn new(face: &'a Face<'a>, buffer: &'b mut Buffer, table: TableKind) -> Self {
        ApplyContext {
            face,
            buffer,
            table,
            lookup_flags: LookupFlags::empty(),
            mark_filtering_set: None,
            feature_mask: !0,
            auto_zwj: true,
            auto_zwnj: true,
            nesting_level: 0,
            syllable: None,
        }
    }

    pub fn recursing(&self) -> bool {
        self.nesting_level >= MAX_NESTING_LEVEL
    }

    /// A syllable-constrained lookup must see a uniform syllable serial on
    /// every position it touches, so a context match can't reach across a
    /// syllable boundary.
    pub fn syllable_matches(&self, pos: usize) -> bool {
        match self.syllable {
            None => true,
            Some(serial) => self.buffer.info()[pos].syllable_serial() == serial,
        }
    }
}
