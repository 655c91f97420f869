//! Khmer shaper (spec.md §4.7 "Khmer, Myanmar"): a coeng (subjoined-
//! consonant marker, the Khmer analogue of Indic's virama) model. A
//! consonant preceded by Coeng (U+17D2) continues the current syllable as a
//! stacked subscript rather than starting a new one; the syllable's base is
//! its first non-subjoined consonant.

use crate::buffer::Buffer;
use crate::common::tag;
use crate::ot::map::{Map, MapBuilder};
use crate::Mask;

use super::ComplexShaper;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Category {
    Consonant,
    Vowel,
    Matra,
    Sign,
    Coeng,
    Other,
}

fn category(c: char) -> Category {
    match c as u32 {
        0x1780..=0x17A2 => Category::Consonant,
        0x17A3..=0x17B3 => Category::Vowel,
        0x17B6..=0x17C5 => Category::Matra,
        0x17C6..=0x17D1 | 0x17DD => Category::Sign,
        0x17D2 => Category::Coeng,
        _ => Category::Other,
    }
}

/// A small representative subset of Khmer's pre-base dependent vowel signs
/// (those rendered to the left of their consonant despite following it in
/// storage order), matching the scope already established for Indic's
/// single-pre-base-matra approximation.
fn is_pre_base_matra(c: char) -> bool {
    matches!(c as u32, 0x17C1..=0x17C3)
}

const FEATURES: &[&[u8; 4]] = &[b"ccmp", b"locl", b"pref", b"blwf", b"abvf", b"pstf"];

struct FeatureMasks {
    pref: Mask,
    blwf: Mask,
    abvf: Mask,
    pstf: Mask,
}

impl FeatureMasks {
    fn new(map: &Map) -> Self {
        FeatureMasks {
            pref: map.mask_for(tag::new(b"pref")),
            blwf: map.mask_for(tag::new(b"blwf")),
            abvf: map.mask_for(tag::new(b"abvf")),
            pstf: map.mask_for(tag::new(b"pstf")),
        }
    }
}

struct Syllable {
    start: usize,
    end: usize,
}

pub struct KhmerShaper;

impl ComplexShaper for KhmerShaper {
    fn collect_features(&self, builder: &mut MapBuilder) {
        for f in FEATURES {
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
        let masks = FeatureMasks::new(map);
        let syllables = find_syllables(buffer);

        let mut serial = 0u8;
        for syl in &syllables {
            serial = serial.wrapping_add(1);
            for i in syl.start..syl.end {
                buffer.info_mut()[i].set_syllable(serial, 1);
            }

            let base = find_base(buffer, syl.start, syl.end);
            let base = reorder_pre_base(buffer, syl.start, syl.end, base);
            tag_masks(buffer, syl.start, syl.end, base, &masks);
        }
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
        let cat = category(buffer.info()[i].as_char());
        let prev_cat = category(buffer.info()[i - 1].as_char());
        let continues = matches!(prev_cat, Category::Coeng);
        if matches!(cat, Category::Consonant | Category::Vowel) && !continues {
            out.push(Syllable { start, end: i });
            start = i;
        }
    }
    out.push(Syllable { start, end: len });
    out
}

/// The base is the first consonant not directly subjoined (i.e. not
/// preceded by Coeng); later consonants in a Coeng chain are subscripts.
fn find_base(buffer: &Buffer, start: usize, end: usize) -> usize {
    for i in start..end {
        if category(buffer.info()[i].as_char()) != Category::Consonant {
            continue;
        }
        let subjoined = i > start && category(buffer.info()[i - 1].as_char()) == Category::Coeng;
        if !subjoined {
            return i;
        }
    }
    start
}

fn reorder_pre_base(buffer: &mut Buffer, start: usize, end: usize, base: usize) -> usize {
    if end - start < 2 {
        return base;
    }

    let order: Vec<usize> = (start..end).collect();
    let pre_base: Vec<usize> =
        order.iter().copied().filter(|&i| i > base && is_pre_base_matra(buffer.info()[i].as_char())).collect();
    if pre_base.is_empty() {
        return base;
    }

    let mut order = order;
    order.retain(|i| !pre_base.contains(i));
    let base_pos = order.iter().position(|&i| i == base).unwrap_or(0);
    for (k, idx) in pre_base.into_iter().enumerate() {
        order.insert(base_pos + k, idx);
    }

    let new_base = start + order.iter().position(|&i| i == base).unwrap_or(0);
    let saved: Vec<_> = order.iter().map(|&i| (buffer.info()[i], buffer.pos()[i])).collect();
    for (k, (info, pos)) in saved.into_iter().enumerate() {
        buffer.info_mut()[start + k] = info;
        buffer.pos_mut()[start + k] = pos;
    }
    buffer.merge_clusters(start, end);
    new_base
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorizes_consonant_and_coeng() {
        assert_eq!(category('\u{1780}'), Category::Consonant); // KA
        assert_eq!(category('\u{17D2}'), Category::Coeng);
        assert_eq!(category('\u{17B6}'), Category::Matra);
    }

    #[test]
    fn base_skips_subjoined_consonant() {
        let mut buffer = Buffer::new();
        buffer.add('\u{1780}' as u32, 0); // KA
        buffer.add('\u{17D2}' as u32, 0); // coeng
        buffer.add('\u{1781}' as u32, 0); // subjoined KHA
        assert_eq!(find_base(&buffer, 0, 3), 0);
    }
}

fn tag_masks(buffer: &mut Buffer, start: usize, end: usize, base: usize, masks: &FeatureMasks) {
    for i in start..end {
        let cat = category(buffer.info()[i].as_char());
        let mut bits = 0;

        if i > start && cat == Category::Consonant && category(buffer.info()[i - 1].as_char()) == Category::Coeng {
            // Subjoined consonant: below-base if it stacks under the base,
            // pre-base if Khmer's Ro-subjoined-before-base exception fires.
            bits |= if i < base { masks.pref } else { masks.blwf };
        }
        if i > base {
            match cat {
                Category::Matra => bits |= masks.pstf,
                Category::Sign => bits |= masks.abvf,
                _ => {}
            }
        }

        buffer.info_mut()[i].mask |= bits;
    }
}
