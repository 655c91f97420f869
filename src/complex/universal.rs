//! Universal Shaping Engine (spec.md §4.7 "USE"): the generalized, script-
//! agnostic pipeline for the remaining complex scripts OpenType defines
//! syllable rules for. Categorization here is simplified to Unicode general
//! category (letters are bases, nonspacing/enclosing/spacing marks attach to
//! the preceding base) rather than the full per-script Indic_Syllabic_Category
//! table HarfBuzz's generated `use-table.cc` carries — a script-agnostic
//! approximation in the same spirit as this crate's Indic base-offset model.

use crate::buffer::Buffer;
use crate::common::tag;
use crate::ot::map::{Map, MapBuilder};
use crate::unicode::CharExt;
use crate::Mask;

use super::ComplexShaper;

const DOTTED_CIRCLE: u32 = 0x25CC;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Category {
    Base,
    Mark,
    Other,
}

fn category(c: char) -> Category {
    let gc = c.general_category();
    if gc.is_letter() {
        Category::Base
    } else if gc.is_mark() {
        Category::Mark
    } else {
        Category::Other
    }
}

const BASIC_FEATURES: &[&[u8; 4]] = &[
    b"nukt", b"akhn", b"rphf", b"pref", b"rkrf", b"abvf", b"blwf", b"half", b"pstf", b"vatu", b"cjct",
];

struct FeatureMasks {
    rphf: Mask,
    abvf: Mask,
    blwf: Mask,
}

impl FeatureMasks {
    fn new(map: &Map) -> Self {
        FeatureMasks {
            rphf: map.mask_for(tag::new(b"rphf")),
            abvf: map.mask_for(tag::new(b"abvf")),
            blwf: map.mask_for(tag::new(b"blwf")),
        }
    }
}

struct Syllable {
    start: usize,
    end: usize,
}

pub struct UniversalShaper;

impl ComplexShaper for UniversalShaper {
    fn collect_features(&self, builder: &mut MapBuilder) {
        builder.add_feature(tag::new(b"locl"), true, None);
        builder.add_feature(tag::new(b"ccmp"), true, None);
        builder.add_gsub_pause(tag::new(b"ccmp"));

        for f in BASIC_FEATURES {
            builder.add_feature(tag::new(f), true, None);
            builder.add_gsub_pause(tag::new(f));
        }

        builder.add_feature(tag::new(b"calt"), true, None);
        builder.add_feature(tag::new(b"clig"), true, None);
        builder.add_feature(tag::new(b"liga"), true, None);
        builder.add_feature(tag::new(b"mark"), true, None);
        builder.add_feature(tag::new(b"mkmk"), true, None);
        builder.add_feature(tag::new(b"kern"), true, None);
    }

    fn setup_masks(&self, buffer: &mut Buffer, map: &Map) {
        insert_dotted_circles(buffer);

        let masks = FeatureMasks::new(map);
        let syllables = find_syllables(buffer);

        let mut serial = 0u8;
        for syl in &syllables {
            serial = serial.wrapping_add(1);
            for i in syl.start..syl.end {
                buffer.info_mut()[i].set_syllable(serial, 1);
            }

            if let Some(base) = find_base(buffer, syl.start, syl.end) {
                tag_masks(buffer, syl.start, syl.end, base, &masks);
            }
        }
    }
}

/// A syllable is "broken" when it has no base at all — every position in
/// it is a mark with nothing to attach to. A dotted circle is inserted in
/// front so such a run still has something to render against.
fn insert_dotted_circles(buffer: &mut Buffer) {
    let syllables = find_syllables(buffer);
    let broken_starts: Vec<usize> = syllables
        .iter()
        .filter(|s| find_base(buffer, s.start, s.end).is_none())
        .map(|s| s.start)
        .collect();

    for &start in broken_starts.iter().rev() {
        let mut info = crate::buffer::GlyphInfo::default();
        info.codepoint = DOTTED_CIRCLE;
        info.cluster = buffer.info()[start].cluster;
        buffer.info.insert(start, info);
        buffer.pos.insert(start, crate::buffer::GlyphPosition::default());
    }
}

fn find_syllables(buffer: &Buffer) -> Vec<Syllable> {
    let len = buffer.len();
    let mut out = Vec::new();
    if len == 0 {
        return out;
    }

    let mut start = 0usize;
    for i in 1..len {
        if category(buffer.info()[i].as_char()) == Category::Base {
            out.push(Syllable { start, end: i });
            start = i;
        }
    }
    out.push(Syllable { start, end: len });
    out
}

fn find_base(buffer: &Buffer, start: usize, end: usize) -> Option<usize> {
    (start..end).find(|&i| category(buffer.info()[i].as_char()) == Category::Base)
}

fn tag_masks(buffer: &mut Buffer, start: usize, end: usize, base: usize, masks: &FeatureMasks) {
    for i in start..end {
        if i == base {
            continue;
        }
        let cat = category(buffer.info()[i].as_char());
        if cat != Category::Mark {
            continue;
        }
        let bits = if i < base { masks.rphf } else { masks.abvf | masks.blwf };
        buffer.info_mut()[i].mask |= bits;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_are_base_marks_attach() {
        assert_eq!(category('a'), Category::Base);
        assert_eq!(category('\u{0300}'), Category::Mark); // combining grave
        assert_eq!(category(' '), Category::Other);
    }

    #[test]
    fn broken_syllable_gets_dotted_circle() {
        let mut buffer = Buffer::new();
        buffer.add('\u{0300}' as u32, 0); // lone combining mark, no base
        buffer.add('a' as u32, 1);
        insert_dotted_circles(&mut buffer);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.info()[0].codepoint, DOTTED_CIRCLE);
    }

    #[test]
    fn normal_syllable_is_untouched() {
        let mut buffer = Buffer::new();
        buffer.add('a' as u32, 0);
        buffer.add('\u{0300}' as u32, 0);
        insert_dotted_circles(&mut buffer);
        assert_eq!(buffer.len(), 2);
    }
}
