//! Font-side collaborators (spec.md §6): cmap lookup, advances, outline
//! extents, upem, and the parsed GDEF/GSUB/GPOS layout tables this crate's
//! own `ot::layout` reader understands.

use std::fmt;

use ttf_parser::GlyphId;

use crate::ot::layout::{Gdef, GlyphClass, LayoutTable};

/// Mirrors spec.md §7's error taxonomy for the font-parse boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaceParsingError {
    InvalidFont,
    InvalidTable,
    ZeroGlyphsOrUpem,
}

impl fmt::Display for FaceParsingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FaceParsingError::InvalidFont => write!(f, "the font data is not a valid sfnt/OpenType font"),
            FaceParsingError::InvalidTable => write!(f, "a required table has an invalid structure"),
            FaceParsingError::ZeroGlyphsOrUpem => write!(f, "the font has zero glyphs or a zero units-per-em value"),
        }
    }
}

impl std::error::Error for FaceParsingError {}

/// A parsed font face: the sfnt container and basic metrics are delegated to
/// `ttf_parser::Face` (out of scope per spec.md §1); GDEF/GSUB/GPOS are
/// parsed by this crate's own reader (`ot::layout`, in scope per spec.md §4.1).
pub struct Face<'a> {
    pub(crate) ttf: ttf_parser::Face<'a>,
    pub(crate) gdef: Option<Gdef<'a>>,
    pub(crate) gsub: Option<LayoutTable<'a>>,
    pub(crate) gpos: Option<LayoutTable<'a>>,
    variation_coords: Vec<i32>,
}

impl<'a> Face<'a> {
    pub fn from_slice(data: &'a [u8], index: u32) -> Result<Self, FaceParsingError> {
        let ttf = ttf_parser::Face::parse(data, index).map_err(|_| FaceParsingError::InvalidFont)?;

        if ttf.units_per_em() == 0 || ttf.number_of_glyphs() == 0 {
            return Err(FaceParsingError::ZeroGlyphsOrUpem);
        }

        let raw = ttf.raw_face();

        let gdef = raw.table(ttf_parser::Tag::from_bytes(b"GDEF")).and_then(Gdef::parse);
        let gsub = raw.table(ttf_parser::Tag::from_bytes(b"GSUB")).and_then(LayoutTable::parse);
        let gpos = raw.table(ttf_parser::Tag::from_bytes(b"GPOS")).and_then(LayoutTable::parse);

        log::debug!(
            "face loaded: gdef={} gsub={} gpos={}",
            gdef.is_some(),
            gsub.is_some(),
            gpos.is_some()
        );

        Ok(Face { ttf, gdef, gsub, gpos, variation_coords: Vec::new() })
    }

    pub fn upem(&self) -> u16 {
        self.ttf.units_per_em()
    }

    pub fn has_glyph(&self, c: char) -> bool {
        self.ttf.glyph_index(c).is_some()
    }

    pub(crate) fn has_glyph_for_char(&self, c: char) -> bool {
        self.has_glyph(c)
    }

    pub fn glyph_index(&self, c: char) -> Option<GlyphId> {
        self.ttf.glyph_index(c)
    }

    pub fn glyph_h_advance(&self, glyph: u32) -> i32 {
        self.ttf.glyph_hor_advance(GlyphId(glyph as u16)).unwrap_or(0) as i32
    }

    pub fn glyph_v_advance(&self, glyph: u32) -> i32 {
        // HarfBuzz's vertical advance is negative-down; ttf-parser already
        // returns a magnitude, so match the sign convention shaping expects.
        -(self.ttf.glyph_ver_advance(GlyphId(glyph as u16)).unwrap_or(0) as i32)
    }

    pub fn glyph_extents(&self, glyph: u32) -> Option<GlyphExtents> {
        let bbox = self.ttf.glyph_bounding_box(GlyphId(glyph as u16))?;
        Some(GlyphExtents {
            x_bearing: bbox.x_min as i32,
            y_bearing: bbox.y_max as i32,
            width: (bbox.x_max - bbox.x_min) as i32,
            height: (bbox.y_min - bbox.y_max) as i32,
        })
    }

    pub fn has_table(&self, tag: crate::common::Tag) -> bool {
        self.ttf.raw_face().table(tag.to_ttf_parser()).is_some()
    }

    pub(crate) fn glyph_class(&self, glyph: GlyphId) -> GlyphClass {
        self.gdef.as_ref().map(|g| g.glyph_class(glyph)).unwrap_or(GlyphClass::Unclassified)
    }

    pub(crate) fn mark_attachment_class(&self, glyph: GlyphId) -> u16 {
        self.gdef.as_ref().map(|g| g.mark_attachment_class(glyph)).unwrap_or(0)
    }

    pub(crate) fn mark_glyph_set_contains(&self, set_index: u16, glyph: GlyphId) -> bool {
        self.gdef.as_ref().map(|g| g.mark_glyph_set_contains(set_index, glyph)).unwrap_or(false)
    }

    pub fn variation_coords(&self) -> &[i32] {
        &self.variation_coords
    }

    /// Sets the normalized variation-coordinate vector (F2.14 scaled to i32
    /// by multiplying by 16384) consumed by `FeatureVariations` resolution.
    /// Outline interpolation from these coordinates remains out of scope
    /// (spec.md §1).
    pub fn set_variation_coords(&mut self, coords: Vec<i32>) {
        self.variation_coords = coords;
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct GlyphExtents {
    pub x_bearing: i32,
    pub y_bearing: i32,
    pub width: i32,
    pub height: i32,
}
