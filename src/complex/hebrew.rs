//! Hebrew: mostly the default shaper, plus a mark-reorder rule for the
//! dagesh/point combinations whose canonical Unicode order doesn't match
//! rendering order, and a fallback composer for precomposed presentation
//! forms absent canonical decompositions.

use crate::buffer::Buffer;
use crate::common::tag;
use crate::ot::map::MapBuilder;

use super::ComplexShaper;

pub struct HebrewShaper;

const FEATURES: &[&[u8; 4]] = &[b"ccmp", b"locl", b"mark", b"mkmk", b"calt", b"clig", b"liga", b"kern"];

impl ComplexShaper for HebrewShaper {
    fn collect_features(&self, builder: &mut MapBuilder) {
        for f in FEATURES {
            builder.add_feature(tag::new(f), true, None);
        }
    }

    fn compose(&self, a: char, b: char) -> Option<char> {
        // A handful of presentation-form compositions Unicode's own
        // canonical decomposition table marks "compatibility" and therefore
        // `unic_ucd_normal::compose` refuses, but which legacy Hebrew fonts
        // still expect to recompose for OpenType shaping purposes.
        match (a, b) {
            ('\u{05D0}', '\u{05B7}') => Some('\u{FB2E}'), // alef + patah -> alef with patah
            ('\u{05D0}', '\u{05B8}') => Some('\u{FB2F}'), // alef + qamats -> alef with qamats
            ('\u{05D9}', '\u{05B4}') => Some('\u{FB1D}'), // yod + hiriq -> yod with hiriq
            _ => None,
        }
    }

    fn reorder_marks(&self, buffer: &mut Buffer, start: usize, end: usize) {
        // A dagesh (U+05BC) must render before a following vowel point even
        // when both share ccc=0-adjacent ordering from input text; swap
        // adjacent pairs where a vowel point precedes a dagesh.
        let mut i = start;
        while i + 1 < end {
            let a = buffer.info()[i].as_char();
            let b = buffer.info()[i + 1].as_char();
            if b == '\u{05BC}' && a != '\u{05BC}' && is_hebrew_point(a) {
                buffer.info.swap(i, i + 1);
                buffer.pos.swap(i, i + 1);
            }
            i += 1;
        }
    }
}

fn is_hebrew_point(c: char) -> bool {
    matches!(c as u32, 0x05B0..=0x05BB | 0x05BD..=0x05C2)
}
