//! Myanmar shaper (spec.md §4.7 "Khmer, Myanmar"): syllable-machine-driven
//! pre-/post-base reordering (the E vowel sign moves before its consonant;
//! medial consonant signs Ya/Ra/Wa/Ha stay immediately after the base) with
//! an early mark-zeroing policy — advances are zeroed in `setup_masks`,
//! before GSUB runs, rather than in the generic late pass.

use crate::buffer::Buffer;
use crate::common::tag;
use crate::ot::map::{Map, MapBuilder};
use crate::Mask;

use super::ComplexShaper;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Category {
    Consonant,
    Vowel,
    Medial,
    Matra,
    Sign,
    Virama,
    Other,
}

fn category(c: char) -> Category {
    match c as u32 {
        0x1000..=0x1021 => Category::Consonant,
        0x1023..=0x1027 | 0x1029..=0x102A => Category::Vowel,
        0x103B..=0x103E => Category::Medial,
        0x102B..=0x1035 => Category::Matra,
        0x1036..=0x1038 => Category::Sign,
        0x1039 | 0x103A => Category::Virama,
        _ => Category::Other,
    }
}

/// Myanmar's E vowel sign (U+1031) renders before its consonant despite
/// following it in storage order, mirroring Indic's pre-base matra handling.
fn is_pre_base_matra(c: char) -> bool {
    c as u32 == 0x1031
}

const FEATURES: &[&[u8; 4]] = &[b"ccmp", b"locl", b"rphf", b"pref", b"blwf", b"pstf"];

struct FeatureMasks {
    rphf: Mask,
    pstf: Mask,
}

impl FeatureMasks {
    fn new(map: &Map) -> Self {
        FeatureMasks { rphf: map.mask_for(tag::new(b"rphf")), pstf: map.mask_for(tag::new(b"pstf")) }
    }
}

struct Syllable {
    start: usize,
    end: usize,
}

pub struct MyanmarShaper;

impl ComplexShaper for MyanmarShaper {
    fn collect_features(&self, builder: &mut MapBuilder) {
        for f in FEATURES {
            builder.add_feature(tag::new(f), true, None);
            builder.add_gsub_pause(tag::new(f));
        }
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

        zero_mark_advances_early(buffer);
    }

    fn zero_width_marks(&self) -> bool {
        // Handled early above; the generic late pass would be redundant.
        false
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
        if matches!(cat, Category::Consonant | Category::Vowel) {
            out.push(Syllable { start, end: i });
            start = i;
        }
    }
    out.push(Syllable { start, end: len });
    out
}

/// The base is the first consonant in the syllable; any further consonants
/// participate as stacked subscripts via the virama, not as alternate bases.
fn find_base(buffer: &Buffer, start: usize, end: usize) -> usize {
    for i in start..end {
        if category(buffer.info()[i].as_char()) == Category::Consonant {
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

fn tag_masks(buffer: &mut Buffer, start: usize, end: usize, base: usize, masks: &FeatureMasks) {
    for i in start..end {
        let cat = category(buffer.info()[i].as_char());
        let mut bits = 0;

        if i < base && category(buffer.info()[start].as_char()) == Category::Consonant {
            bits |= masks.rphf;
        }
        if i > base && cat == Category::Matra {
            bits |= masks.pstf;
        }

        buffer.info_mut()[i].mask |= bits;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorizes_consonant_and_e_vowel() {
        assert_eq!(category('\u{1000}'), Category::Consonant); // KA
        assert!(is_pre_base_matra('\u{1031}'));
        assert_eq!(category('\u{1039}'), Category::Virama);
    }

    #[test]
    fn pre_base_e_vowel_moves_before_consonant() {
        let mut buffer = Buffer::new();
        buffer.add('\u{1000}' as u32, 0); // KA
        buffer.add('\u{1031}' as u32, 0); // E vowel, stored after, rendered before
        let base = find_base(&buffer, 0, 2);
        assert_eq!(base, 0);
        let new_base = reorder_pre_base(&mut buffer, 0, 2, base);
        assert_eq!(new_base, 1);
        assert_eq!(buffer.info()[0].codepoint, '\u{1031}' as u32);
    }
}

fn zero_mark_advances_early(buffer: &mut Buffer) {
    for i in 0..buffer.len() {
        let cat = category(buffer.info()[i].as_char());
        if matches!(cat, Category::Matra | Category::Sign | Category::Medial | Category::Virama) {
            let pos = &mut buffer.pos_mut()[i];
            pos.x_advance = 0;
            pos.y_advance = 0;
        }
    }
}
