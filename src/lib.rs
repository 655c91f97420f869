//! A font-aware OpenType text shaping engine: given a font and a run of
//! Unicode text, produces positioned glyphs ready for rendering.
//!
//! ```no_run
//! use oxishape::{shape, Face, UnicodeBuffer};
//!
//! let data = std::fs::read("font.ttf").unwrap();
//! let face = Face::from_slice(&data, 0).unwrap();
//!
//! let mut buffer = UnicodeBuffer::new();
//! buffer.push_str("Hello");
//! buffer.guess_segment_properties();
//!
//! let glyph_buffer = shape(&face, &[], buffer);
//! for (info, pos) in glyph_buffer.glyph_infos().iter().zip(glyph_buffer.glyph_positions()) {
//!     let _ = (info.glyph_id, pos.x_advance);
//! }
//! ```

mod buffer;
mod common;
mod complex;
mod face;
mod fallback;
mod ot;
mod parser;
mod plan;
mod shape;
mod unicode;

pub use buffer::{BufferClusterLevel, BufferFlags, GlyphBuffer, GlyphInfo, GlyphPosition, UnicodeBuffer};
pub use common::{Direction, Language, Script, Tag};
pub use face::{Face, FaceParsingError, GlyphExtents};
pub use shape::shape;

/// A bitmask gating which buffer positions a lookup is allowed to touch,
/// one bit per concurrently-tracked feature (spec.md §4.6 item 2).
pub type Mask = u32;

/// One caller-requested feature toggle, optionally confined to a character range.
#[derive(Clone, Copy, Debug)]
pub struct Feature {
    pub tag: Tag,
    pub value: u32,
    pub start: u32,
    pub end: u32,
}

impl Feature {
    pub fn new(tag: Tag, value: u32, range: Option<std::ops::Range<u32>>) -> Self {
        match range {
            Some(r) => Feature { tag, value, start: r.start, end: r.end },
            None => Feature { tag, value, start: 0, end: u32::MAX },
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.value != 0
    }

    pub(crate) fn range(&self) -> Option<(u32, u32)> {
        if self.start == 0 && self.end == u32::MAX {
            None
        } else {
            Some((self.start, self.end))
        }
    }
}

/// A single designspace-axis coordinate for variable-font feature variation
/// selection. Outline interpolation from the coordinate is out of scope.
#[derive(Clone, Copy, Debug)]
pub struct Variation {
    pub tag: Tag,
    pub value: f32,
}
