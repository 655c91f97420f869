//! Indic shaper (spec.md §4.7 "Indic"): syllable classification over a
//! Unicode-block-relative character categorization (the nine Devanagari-
//! parallel scripts share a layout: independent vowels, consonants, nukta,
//! dependent vowel signs and virama all sit at the same offset from each
//! block's base codepoint), a base-consonant search, syllable reordering of
//! reph and pre-base matras, and Indic feature mask allocation.

use crate::buffer::Buffer;
use crate::common::tag;
use crate::ot::map::{Map, MapBuilder};
use crate::Mask;

use super::ComplexShaper;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Category {
    Bindu,
    Vowel,
    Consonant,
    Nukta,
    Avagraha,
    Matra,
    Halant,
    Other,
}

const BASIC_FEATURES: &[&[u8; 4]] = &[
    b"nukt", b"akhn", b"rphf", b"rkrf", b"pref", b"blwf", b"abvf", b"half", b"pstf", b"vatu", b"cjct", b"init",
];

const PRESENTATION_FEATURES: &[&[u8; 4]] = &[b"pres", b"abvs", b"blws", b"psts", b"haln", b"calt", b"clig", b"liga"];

struct FeatureMasks {
    nukt: Mask,
    rphf: Mask,
    half: Mask,
    pstf: Mask,
    abvf: Mask,
    cjct: Mask,
    init: Mask,
}

impl FeatureMasks {
    fn new(map: &Map) -> Self {
        FeatureMasks {
            nukt: map.mask_for(tag::new(b"nukt")),
            rphf: map.mask_for(tag::new(b"rphf")),
            half: map.mask_for(tag::new(b"half")),
            pstf: map.mask_for(tag::new(b"pstf")),
            abvf: map.mask_for(tag::new(b"abvf")),
            cjct: map.mask_for(tag::new(b"cjct")),
            init: map.mask_for(tag::new(b"init")),
        }
    }
}

struct Syllable {
    start: usize,
    end: usize,
}

pub struct IndicShaper {
    base: u32,
}

impl IndicShaper {
    pub fn new(script_tag: &[u8; 4]) -> Self {
        let base = match script_tag {
            b"Deva" => 0x0900,
            b"Beng" => 0x0980,
            b"Guru" => 0x0A00,
            b"Gujr" => 0x0A80,
            b"Orya" => 0x0B00,
            b"Taml" => 0x0B80,
            b"Telu" => 0x0C00,
            b"Knda" => 0x0C80,
            b"Mlym" => 0x0D00,
            b"Sinh" => 0x0D80,
            _ => 0x0900,
        };
        IndicShaper { base }
    }

    fn category(&self, c: char) -> Category {
        match (c as u32).wrapping_sub(self.base) {
            0x01..=0x03 => Category::Bindu,
            0x05..=0x14 => Category::Vowel,
            0x15..=0x39 => Category::Consonant,
            0x3C => Category::Nukta,
            0x3D => Category::Avagraha,
            0x3E..=0x4C => Category::Matra,
            0x4D => Category::Halant,
            _ => Category::Other,
        }
    }

    /// Ra sits at the same relative offset in every block this shaper
    /// covers; a leading Ra+Halant marks the reph form.
    fn is_ra(&self, c: char) -> bool {
        (c as u32).wrapping_sub(self.base) == 0x30
    }

    /// The single most common pre-base dependent vowel sign (Devanagari
    /// vowel sign I and its Deva-parallel counterparts) — a representative
    /// subset of the full per-script pre-base-matra set, matching the
    /// scope already established for the Arabic joining table.
    fn is_pre_base_matra(&self, c: char) -> bool {
        (c as u32).wrapping_sub(self.base) == 0x3F
    }
}

impl ComplexShaper for IndicShaper {
    fn collect_features(&self, builder: &mut MapBuilder) {
        builder.add_feature(tag::new(b"ccmp"), true, None);
        builder.add_feature(tag::new(b"locl"), true, None);
        builder.add_gsub_pause(tag::new(b"locl"));

        for f in BASIC_FEATURES {
            builder.add_feature(tag::new(f), true, None);
            builder.add_gsub_pause(tag::new(f));
        }

        for f in PRESENTATION_FEATURES {
            builder.add_feature(tag::new(f), true, None);
        }

        builder.add_feature(tag::new(b"mark"), true, None);
        builder.add_feature(tag::new(b"mkmk"), true, None);
        builder.add_feature(tag::new(b"kern"), true, None);
    }

    fn setup_masks(&self, buffer: &mut Buffer, map: &Map) {
        let masks = FeatureMasks::new(map);
        let syllables = find_syllables(self, buffer);

        let mut serial = 0u8;
        for syl in &syllables {
            serial = serial.wrapping_add(1);
            for i in syl.start..syl.end {
                buffer.info_mut()[i].set_syllable(serial, 1);
            }

            let base = find_base(self, buffer, syl.start, syl.end);
            let base = reorder_syllable(self, buffer, syl.start, syl.end, base);
            tag_masks(self, buffer, syl.start, syl.end, base, &masks);
        }
    }
}

fn find_syllables(shaper: &IndicShaper, buffer: &Buffer) -> Vec<Syllable> {
    let len = buffer.len();
    let mut out = Vec::new();
    if len == 0 {
        return out;
    }

    let mut start = 0usize;
    for i in 1..len {
        let cat = shaper.category(buffer.info()[i].as_char());
        let prev_cat = shaper.category(buffer.info()[i - 1].as_char());
        let continues_conjunct = matches!(prev_cat, Category::Halant | Category::Nukta);
        if matches!(cat, Category::Consonant | Category::Vowel) && !continues_conjunct {
            out.push(Syllable { start, end: i });
            start = i;
        }
    }
    out.push(Syllable { start, end: len });
    out
}

/// The base consonant is the last non-reph consonant in the syllable,
/// falling back to the syllable start when no consonant qualifies (an
/// all-vowel or all-mark syllable).
fn find_base(shaper: &IndicShaper, buffer: &Buffer, start: usize, end: usize) -> usize {
    let is_reph = end - start >= 2
        && shaper.is_ra(buffer.info()[start].as_char())
        && shaper.category(buffer.info()[start + 1].as_char()) == Category::Halant;
    let search_start = if is_reph { start + 2 } else { start };

    let mut base = start;
    for i in search_start..end {
        if shaper.category(buffer.info()[i].as_char()) == Category::Consonant {
            base = i;
        }
    }
    base
}

/// Moves a leading reph to just after the base, and any pre-base matra
/// (stored after its consonant in the Unicode text but rendered before it)
/// to just before the base. Returns the base's position after reordering.
fn reorder_syllable(shaper: &IndicShaper, buffer: &mut Buffer, start: usize, end: usize, base: usize) -> usize {
    if end - start < 2 {
        return base;
    }

    let mut order: Vec<usize> = (start..end).collect();

    let has_reph = shaper.is_ra(buffer.info()[start].as_char())
        && shaper.category(buffer.info()[start + 1].as_char()) == Category::Halant
        && base > start + 1;
    if has_reph {
        let reph: Vec<usize> = order.drain(0..2).collect();
        let base_pos = order.iter().position(|&i| i == base).unwrap_or(order.len().saturating_sub(1));
        for (k, idx) in reph.into_iter().enumerate() {
            order.insert(base_pos + 1 + k, idx);
        }
    }

    let pre_base: Vec<usize> =
        order.iter().copied().filter(|&i| i > base && shaper.is_pre_base_matra(buffer.info()[i].as_char())).collect();
    if !pre_base.is_empty() {
        order.retain(|i| !pre_base.contains(i));
        let base_pos = order.iter().position(|&i| i == base).unwrap_or(0);
        for (k, idx) in pre_base.into_iter().enumerate() {
            order.insert(base_pos + k, idx);
        }
    }

    if order.iter().copied().eq(start..end) {
        return base;
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

fn tag_masks(shaper: &IndicShaper, buffer: &mut Buffer, start: usize, end: usize, base: usize, masks: &FeatureMasks) {
    for i in start..end {
        let c = buffer.info()[i].as_char();
        let cat = shaper.category(c);
        let mut bits = 0;

        if i == start && cat == Category::Consonant {
            bits |= masks.init;
        }
        if cat == Category::Nukta {
            bits |= masks.nukt;
        }
        if i < base {
            if cat == Category::Consonant {
                bits |= masks.half | masks.cjct;
            }
            if shaper.is_ra(c) {
                bits |= masks.rphf;
            }
        } else if i > base {
            match cat {
                Category::Matra => bits |= masks.pstf,
                Category::Bindu => bits |= masks.abvf,
                _ => {}
            }
        }

        buffer.info_mut()[i].mask |= bits;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shaper() -> IndicShaper {
        IndicShaper::new(b"Deva")
    }

    #[test]
    fn categorizes_devanagari_consonant_and_matra() {
        let s = shaper();
        assert_eq!(s.category('\u{0915}'), Category::Consonant); // KA
        assert_eq!(s.category('\u{093F}'), Category::Matra); // vowel sign I
        assert_eq!(s.category('\u{094D}'), Category::Halant); // virama
    }

    #[test]
    fn recognizes_ra_for_reph() {
        let s = shaper();
        assert!(s.is_ra('\u{0930}'));
        assert!(!s.is_ra('\u{0915}'));
    }
}
