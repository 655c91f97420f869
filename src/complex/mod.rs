//! Script-specific shapers (spec.md §4.6): each implements [`ComplexShaper`]
//! to hook feature collection, mask setup, and normalization preferences for
//! scripts whose shaping rules go beyond generic GSUB/GPOS application.

mod arabic;
mod arabic_table;
mod default;
mod hangul;
mod hebrew;
mod indic;
mod khmer;
mod myanmar;
mod thai;
mod universal;

use crate::buffer::Buffer;
use crate::common::Script;
use crate::ot::map::{Map, MapBuilder};
use crate::unicode::normalize::NormalizationMode;

/// Hook surface a script-specific shaper implements. Every method has a
/// sensible default so a shaper only overrides what it needs to change.
pub trait ComplexShaper: Send + Sync {
    /// Adds this script's feature list to the map builder, in the order
    /// lookups should run (spec.md §4.6 item 1's per-script feature list).
    fn collect_features(&self, builder: &mut MapBuilder) {
        let _ = builder;
    }

    /// Per-codepoint shaper-specific decomposition, tried before canonical
    /// Unicode decomposition (spec.md §4.7).
    fn decompose(&self, c: char) -> Option<(char, char)> {
        let _ = c;
        None
    }

    /// Shaper-specific composition override, tried before
    /// `unic_ucd_normal::compose` (spec.md §4.7).
    fn compose(&self, a: char, b: char) -> Option<char> {
        let _ = (a, b);
        None
    }

    fn normalization_preference(&self) -> NormalizationMode {
        NormalizationMode::Auto
    }

    /// Called once per diacritic run after the stable CCC sort, letting a
    /// script reorder marks the Unicode canonical order gets wrong for
    /// rendering (e.g. Arabic's modifier-combining-mark swap).
    fn reorder_marks(&self, buffer: &mut Buffer, start: usize, end: usize) {
        let _ = (buffer, start, end);
    }

    /// Assigns initial mask bits before GSUB runs: Arabic's joining state
    /// machine, Indic/USE/Khmer/Myanmar's syllable classification, etc. Takes
    /// the compiled feature map so a shaper can look up the mask bit
    /// allocated to one of its own requested features (e.g. Arabic's `isol`).
    fn setup_masks(&self, buffer: &mut Buffer, map: &Map) {
        let _ = (buffer, map);
    }

    /// Whether the default zero-mark-advance-width policy applies, or the
    /// shaper positions marks itself (spec.md §4.6's mark-width policy).
    fn zero_width_marks(&self) -> bool {
        true
    }

    /// Whether to run the fallback mark positioner when GPOS has no mark
    /// attachment for this script (spec.md §4.9).
    fn fallback_position(&self) -> bool {
        true
    }

    /// Runs after every GSUB pause boundary (spec.md §4.7's per-script
    /// "pause" callback), with the buffer as substitution has left it at
    /// that point. Used by Arabic to record which glyphs `stch` multiplied
    /// before later features get a chance to multiply anything else.
    fn post_gsub_stage(&self, buffer: &mut Buffer) {
        let _ = buffer;
    }

    /// Runs once, in place of normal GSUB, when the face has no GSUB table
    /// at all (spec.md §4.7's Windows-1256 legacy-font fallback). Returns
    /// whether it did anything; a `false` leaves glyph ids exactly as cmap
    /// mapping produced them.
    fn fallback_shape(&self, face: &crate::face::Face, buffer: &mut Buffer) -> bool {
        let _ = (face, buffer);
        false
    }

    /// `postprocess_glyphs(plan, buf)` (spec.md §4.7): runs once, after
    /// GPOS and fallback mark positioning. Used by Arabic to expand
    /// `stch`-marked glyphs into justified stretch runs.
    fn postprocess_glyphs(&self, face: &crate::face::Face, buffer: &mut Buffer) {
        let _ = (face, buffer);
    }
}

pub fn shaper_for_script(script: Option<Script>) -> Box<dyn ComplexShaper> {
    let tag = match script {
        Some(s) => s.tag().to_bytes(),
        None => return Box::new(default::DefaultShaper),
    };

    match &tag {
        b"Arab" | b"Nkoo" | b"Syrc" | b"Mand" | b"Mong" | b"Phag" | b"Adlm" => {
            Box::new(arabic::ArabicShaper::new(&tag))
        }
        b"Hebr" => Box::new(hebrew::HebrewShaper),
        b"Hang" => Box::new(hangul::HangulShaper),
        b"Thai" | b"Lao " => Box::new(thai::ThaiShaper),
        b"Khmr" => Box::new(khmer::KhmerShaper),
        b"Mymr" => Box::new(myanmar::MyanmarShaper),
        b"Deva" | b"Beng" | b"Guru" | b"Gujr" | b"Orya" | b"Taml" | b"Telu" | b"Knda" | b"Mlym" | b"Sinh" => {
            Box::new(indic::IndicShaper::new(&tag))
        }
        // The Universal Shaping Engine is the catch-all for the remaining
        // complex scripts OpenType defines syllable rules for.
        b"Bali" | b"Batk" | b"Brah" | b"Bugi" | b"Buhd" | b"Cakm" | b"Cham" | b"Gran" | b"Hano" | b"Java"
        | b"Kali" | b"Lepc" | b"Limb" | b"Mtei" | b"Modi" | b"Rjng" | b"Saur" | b"Sund" | b"Sylo" | b"Tagb"
        | b"Tale" | b"Talu" | b"Tavt" | b"Tglg" | b"Tibt" | b"Tfng" => Box::new(universal::UniversalShaper),
        _ => Box::new(default::DefaultShaper),
    }
}
