//! Arabic-family joining shaper (Arabic, Syriac, N'Ko, Mandaic, Mongolian,
//! Phags-pa, Adlam): a state machine over Unicode joining types assigns each
//! letter its isolated/initial/medial/final presentation form, expressed as
//! OpenType feature masks GSUB's `isol`/`init`/`medi`/`fina`/... lookups key
//! off of, plus a mark-reorder pass for Arabic's modifier combining marks.
//! Grounded on the joining algorithm described by Unicode TR53 and the
//! `ArabicShaping.txt` data file (see [`super::arabic_table`]).

use std::cell::Cell;

use crate::buffer::{Buffer, BufferScratchFlags};
use crate::common::tag;
use crate::face::Face;
use crate::ot::map::{Map, MapBuilder};
use crate::unicode::{CharExt, UnicodeGeneralCategory};

use super::ComplexShaper;

#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Action {
    Isol = 0,
    Fina = 1,
    Fin2 = 2,
    Fin3 = 3,
    Medi = 4,
    Med2 = 5,
    Init = 6,
    None = 7,

    // Same byte, repurposed after GSUB's `stch` feature has already run: by
    // then nothing reads the joining action anymore.
    StretchingFixed = 8,
    StretchingRepeating = 9,
}

impl Action {
    fn is_stch(self) -> bool {
        matches!(self, Action::StretchingFixed | Action::StretchingRepeating)
    }
}

const STATE_TABLE: &[[(Action, Action, u16); 6]] = &[
    // columns: U, L, R, D, ALAPH, DALATH_RISH
    [(Action::None, Action::None, 0), (Action::None, Action::Isol, 2), (Action::None, Action::Isol, 1),
     (Action::None, Action::Isol, 2), (Action::None, Action::Isol, 1), (Action::None, Action::Isol, 6)],
    [(Action::None, Action::None, 0), (Action::None, Action::Isol, 2), (Action::None, Action::Isol, 1),
     (Action::None, Action::Isol, 2), (Action::None, Action::Fin2, 5), (Action::None, Action::Isol, 6)],
    [(Action::None, Action::None, 0), (Action::None, Action::Isol, 2), (Action::Init, Action::Fina, 1),
     (Action::Init, Action::Fina, 3), (Action::Init, Action::Fina, 4), (Action::Init, Action::Fina, 6)],
    [(Action::None, Action::None, 0), (Action::None, Action::Isol, 2), (Action::Medi, Action::Fina, 1),
     (Action::Medi, Action::Fina, 3), (Action::Medi, Action::Fina, 4), (Action::Medi, Action::Fina, 6)],
    [(Action::None, Action::None, 0), (Action::None, Action::Isol, 2), (Action::Med2, Action::Isol, 1),
     (Action::Med2, Action::Isol, 2), (Action::Med2, Action::Fin2, 5), (Action::Med2, Action::Isol, 6)],
    [(Action::None, Action::None, 0), (Action::None, Action::Isol, 2), (Action::Isol, Action::Isol, 1),
     (Action::Isol, Action::Isol, 2), (Action::Isol, Action::Fin2, 5), (Action::Isol, Action::Isol, 6)],
    [(Action::None, Action::None, 0), (Action::None, Action::Isol, 2), (Action::None, Action::Isol, 1),
     (Action::None, Action::Isol, 2), (Action::None, Action::Fin3, 5), (Action::None, Action::Isol, 6)],
];

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum JoiningType {
    U = 0,
    L = 1,
    R = 2,
    D = 3,
    GroupAlaph = 4,
    GroupDalathRish = 5,
    T = 7,
    X = 8,
}

const ARABIC_FEATURES: &[&[u8; 4]] = &[
    b"isol", b"fina", b"fin2", b"fin3", b"medi", b"med2", b"init",
];

fn feature_mask_index(a: Action) -> Option<usize> {
    match a {
        Action::Isol => Some(0),
        Action::Fina => Some(1),
        Action::Fin2 => Some(2),
        Action::Fin3 => Some(3),
        Action::Medi => Some(4),
        Action::Med2 => Some(5),
        Action::Init => Some(6),
        Action::None | Action::StretchingFixed | Action::StretchingRepeating => None,
    }
}

fn feature_is_syriac(tag: &[u8; 4]) -> bool {
    matches!(tag[3], b'2' | b'3')
}

pub struct ArabicShaper {
    script_tag: [u8; 4],
    /// Counts `post_gsub_stage` calls so `record_stch` only runs at the very
    /// first pause (right after `stch` itself), not at every later one.
    gsub_stage: Cell<usize>,
}

impl ArabicShaper {
    pub fn new(script_tag: &[u8; 4]) -> Self {
        ArabicShaper { script_tag: *script_tag, gsub_stage: Cell::new(0) }
    }

    fn is_arabic(&self) -> bool {
        &self.script_tag == b"Arab"
    }

    fn is_mongolian(&self) -> bool {
        &self.script_tag == b"Mong"
    }
}

impl ComplexShaper for ArabicShaper {
    fn collect_features(&self, builder: &mut MapBuilder) {
        // `stch` ("stretching glyph decomposition", Syriac/Arabic subtending
        // marks) runs before everything else and pauses immediately so
        // `post_gsub_stage` can see exactly what it multiplied, before any
        // other feature gets a chance to multiply something else.
        builder.add_feature(tag::new(b"stch"), true, None);
        builder.add_gsub_pause(tag::new(b"stch"));

        builder.add_feature(tag::new(b"ccmp"), true, None);
        builder.add_feature(tag::new(b"locl"), true, None);
        builder.add_gsub_pause(tag::new(b"locl"));

        for f in ARABIC_FEATURES {
            builder.add_feature(tag::new(f), true, None);
            builder.add_gsub_pause(tag::new(f));
        }

        // Unicode says ZWNJ means "don't ligate"; Arabic script additionally
        // treats ZWJ that way, so the ligating features run with manual
        // ZWJ handling (spec.md's auto_zwj/auto_zwnj knobs are set by the
        // plan compiler per feature list, not here).
        builder.add_feature(tag::new(b"rlig"), true, None);
        if self.is_arabic() {
            builder.add_gsub_pause(tag::new(b"rlig"));
        }

        builder.add_feature(tag::new(b"rclt"), true, None);
        builder.add_feature(tag::new(b"calt"), true, None);
        builder.add_gsub_pause(tag::new(b"calt"));

        builder.add_feature(tag::new(b"mset"), true, None);
    }

    fn setup_masks(&self, buffer: &mut Buffer, map: &Map) {
        let mut mask_array = [0u32; ARABIC_FEATURES.len()];
        for (i, f) in ARABIC_FEATURES.iter().enumerate() {
            mask_array[i] = map.mask_for(tag::new(f));
        }

        arabic_joining(buffer);
        if self.is_mongolian() {
            mongolian_variation_selectors(buffer);
        }

        for info in buffer.info_mut() {
            if let Some(action) = feature_mask_index(action_of(info)) {
                info.mask |= mask_array[action];
            }
        }
    }

    fn reorder_marks(&self, buffer: &mut Buffer, start: usize, end: usize) {
        reorder_marks(start, end, buffer);
    }

    fn post_gsub_stage(&self, buffer: &mut Buffer) {
        let stage = self.gsub_stage.get();
        self.gsub_stage.set(stage + 1);
        if stage == 0 {
            record_stch(buffer);
        }
    }

    fn postprocess_glyphs(&self, face: &Face, buffer: &mut Buffer) {
        apply_stch(face, buffer);
    }

    fn fallback_shape(&self, face: &Face, buffer: &mut Buffer) -> bool {
        if !self.is_arabic() || !win1256_signature_matches(face) {
            return false;
        }

        for i in 0..buffer.len() {
            let form = match fallback_form_index(action_of(&buffer.info()[i])) {
                Some(f) => f,
                None => continue,
            };
            let base = buffer.info()[i].as_char();
            let presentation = ARABIC_PRESENTATION_FORMS
                .iter()
                .find(|(c, _)| *c == base)
                .and_then(|(_, forms)| forms[form]);
            if let Some(c) = presentation {
                if let Some(glyph) = face.glyph_index(c) {
                    buffer.info_mut()[i].glyph_id = glyph.0 as u32;
                }
            }
        }

        apply_lam_alef_ligatures(face, buffer);
        true
    }
}

fn action_of(info: &crate::buffer::GlyphInfo) -> Action {
    match info.complex_aux() {
        0 => Action::Isol,
        1 => Action::Fina,
        2 => Action::Fin2,
        3 => Action::Fin3,
        4 => Action::Medi,
        5 => Action::Med2,
        6 => Action::Init,
        8 => Action::StretchingFixed,
        9 => Action::StretchingRepeating,
        _ => Action::None,
    }
}

fn fallback_form_index(a: Action) -> Option<usize> {
    match a {
        Action::Isol => Some(0),
        Action::Fina => Some(1),
        Action::Init => Some(2),
        Action::Medi => Some(3),
        _ => None,
    }
}

fn set_action(info: &mut crate::buffer::GlyphInfo, action: Action) {
    info.set_complex_aux(action as u8);
}

fn get_joining_type(c: char) -> JoiningType {
    let j = super::arabic_table::joining_type(c);
    if j != JoiningType::X {
        return j;
    }

    match c.general_category().0 {
        UnicodeGeneralCategory::NonspacingMark
        | UnicodeGeneralCategory::EnclosingMark
        | UnicodeGeneralCategory::Format => JoiningType::T,
        _ => JoiningType::U,
    }
}

fn arabic_joining(buffer: &mut Buffer) {
    let mut prev: Option<usize> = None;
    let mut state = 0usize;

    for i in 0..buffer.context_len(0) {
        let c = buffer.context(0, i);
        let this_type = get_joining_type(c);
        if this_type == JoiningType::T {
            continue;
        }
        state = STATE_TABLE[state][this_type as usize].2 as usize;
        break;
    }

    for i in 0..buffer.len() {
        let this_type = get_joining_type(buffer.info()[i].as_char());
        if this_type == JoiningType::T {
            set_action(&mut buffer.info_mut()[i], Action::None);
            continue;
        }

        let entry = STATE_TABLE[state][this_type as usize];
        if entry.0 != Action::None {
            if let Some(prev) = prev {
                set_action(&mut buffer.info_mut()[prev], entry.0);
                buffer.unsafe_to_break(prev, i + 1);
            }
        }

        set_action(&mut buffer.info_mut()[i], entry.1);
        prev = Some(i);
        state = entry.2 as usize;
    }

    for i in 0..buffer.context_len(1) {
        let c = buffer.context(1, i);
        let this_type = get_joining_type(c);
        if this_type == JoiningType::T {
            continue;
        }
        let entry = STATE_TABLE[state][this_type as usize];
        if entry.0 != Action::None {
            if let Some(prev) = prev {
                set_action(&mut buffer.info_mut()[prev], entry.0);
            }
        }
        break;
    }
}

fn mongolian_variation_selectors(buffer: &mut Buffer) {
    let len = buffer.len();
    for i in 1..len {
        if (0x180B..=0x180D).contains(&buffer.info()[i].codepoint) {
            let prev_aux = buffer.info()[i - 1].complex_aux();
            buffer.info_mut()[i].set_complex_aux(prev_aux);
        }
    }
}

// http://www.unicode.org/reports/tr53/
const MODIFIER_COMBINING_MARKS: &[u32] = &[
    0x0654, 0x0655, 0x0658, 0x06DC, 0x06E3, 0x06E7, 0x06E8, 0x08D3, 0x08F3,
];

fn reorder_marks(mut start: usize, end: usize, buffer: &mut Buffer) {
    let mut i = start;
    for cc in [220u8, 230].iter().copied() {
        while i < end && buffer.info()[i].modified_combining_class() < cc {
            i += 1;
        }
        if i == end {
            break;
        }
        if buffer.info()[i].modified_combining_class() > cc {
            continue;
        }

        let mut j = i;
        while j < end
            && buffer.info()[j].modified_combining_class() == cc
            && MODIFIER_COMBINING_MARKS.contains(&buffer.info()[j].codepoint)
        {
            j += 1;
        }

        if i == j {
            continue;
        }

        buffer.merge_clusters(start, j);

        let run: Vec<_> = (i..j).map(|k| (buffer.info()[k], buffer.pos()[k])).collect();
        for k in (0..i - start).rev() {
            buffer.info_mut()[k + start + j - i] = buffer.info()[k + start];
            buffer.pos_mut()[k + start + j - i] = buffer.pos()[k + start];
        }
        for (k, (info, pos)) in run.into_iter().enumerate() {
            buffer.info_mut()[k + start] = info;
            buffer.pos_mut()[k + start] = pos;
        }

        // Renumber to CCC22/CCC26 so the shifted run stays sorted for the
        // normalizer's CGJ-handling logic even after this reordering.
        let new_start = start + (j - i);
        let new_cc = if cc == 220 {
            crate::unicode::modified_combining_class::CCC22
        } else {
            crate::unicode::modified_combining_class::CCC26
        };
        while start < new_start {
            buffer.info_mut()[start].set_modified_combining_class(new_cc);
            start += 1;
        }

        i = j;
    }
}

/// `stch` ("stretching glyph decomposition") multiplies subtending marks and
/// Syriac abbreviation marks into repeatable tiles; this records which
/// glyphs it multiplied and how (fixed vs. repeating tile), so `apply_stch`
/// can expand them to fill the available width after GPOS has run. See
/// https://docs.microsoft.com/en-us/typography/script-development/syriac
fn record_stch(buffer: &mut Buffer) {
    let len = buffer.len();
    let mut has_stch = false;
    for i in 0..len {
        if buffer.info()[i].is_multiplied() {
            let comp = if buffer.info()[i].lig_comp() % 2 != 0 {
                Action::StretchingRepeating
            } else {
                Action::StretchingFixed
            };
            set_action(&mut buffer.info_mut()[i], comp);
            has_stch = true;
        }
    }

    if has_stch {
        buffer.set_scratch_flags(buffer.scratch_flags() | BufferScratchFlags::COMPLEX0);
    }
}

fn is_word_category(gc: crate::unicode::GeneralCategory) -> bool {
    use UnicodeGeneralCategory::*;
    matches!(
        gc.0,
        Unassigned
            | PrivateUse
            | ModifierLetter
            | OtherLetter
            | SpacingMark
            | EnclosingMark
            | NonspacingMark
            | DecimalNumber
            | LetterNumber
            | OtherNumber
            | CurrencySymbol
            | ModifierSymbol
            | MathSymbol
            | OtherSymbol
    )
}

/// Expands every `stch`-tagged run to fill the width of its surrounding
/// word, repeating "repeating" tiles and keeping "fixed" tiles as-is. Runs
/// once, after GPOS, since it needs final advances to measure against.
///
/// Two passes over the buffer, walked back to front: MEASURE computes how
/// many extra glyphs the expansion needs without touching the buffer, then
/// a single `ensure` grows it; CUT then writes the expanded sequence from
/// the tail forward, so a write at `j` never clobbers a read at `i` (`j` is
/// always `>= i`).
fn apply_stch(face: &Face, buffer: &mut Buffer) {
    if !buffer.scratch_flags().contains(BufferScratchFlags::COMPLEX0) {
        return;
    }

    let mut extra_glyphs_needed: usize = 0;
    const MEASURE: usize = 0;
    const CUT: usize = 1;
    let old_len = buffer.len();

    for step in 0..2 {
        let new_len = old_len + extra_glyphs_needed;
        let mut i = old_len;
        let mut j = new_len;

        while i != 0 {
            if !action_of(&buffer.info()[i - 1]).is_stch() {
                if step == CUT {
                    j -= 1;
                    buffer.info_mut()[j] = buffer.info()[i - 1];
                    buffer.pos_mut()[j] = buffer.pos()[i - 1];
                }
                i -= 1;
                continue;
            }

            let mut w_total = 0i32;
            let mut w_fixed = 0i32;
            let mut w_repeating = 0i32;
            let mut n_repeating = 0i32;

            let end = i;
            while i != 0 && action_of(&buffer.info()[i - 1]).is_stch() {
                i -= 1;
                let width = face.glyph_h_advance(buffer.info()[i].glyph_id);
                if action_of(&buffer.info()[i]) == Action::StretchingFixed {
                    w_fixed += width;
                } else {
                    w_repeating += width;
                    n_repeating += 1;
                }
            }

            let start = i;
            let mut context = i;
            while context != 0
                && !action_of(&buffer.info()[context - 1]).is_stch()
                && (buffer.info()[context - 1].is_default_ignorable()
                    || is_word_category(buffer.info()[context - 1].general_category()))
            {
                context -= 1;
                w_total += buffer.pos()[context].x_advance;
            }

            i += 1; // Don't touch i again.

            let mut n_copies = 0i32;
            let w_remaining = w_total - w_fixed;
            if w_remaining > w_repeating && w_repeating > 0 {
                n_copies = w_remaining / w_repeating - 1;
            }

            let mut extra_repeat_overlap = 0;
            let shortfall = w_remaining - w_repeating * (n_copies + 1);
            if shortfall > 0 && n_repeating > 0 {
                n_copies += 1;
                let excess = (n_copies + 1) * w_repeating - w_remaining;
                if excess > 0 {
                    extra_repeat_overlap = excess / (n_copies * n_repeating);
                }
            }

            if step == MEASURE {
                extra_glyphs_needed += (n_copies * n_repeating) as usize;
            } else {
                buffer.unsafe_to_break(context, end);
                let mut x_offset = 0;
                for k in (start + 1..=end).rev() {
                    let width = face.glyph_h_advance(buffer.info()[k - 1].glyph_id);

                    let mut repeat = 1;
                    if action_of(&buffer.info()[k - 1]) == Action::StretchingRepeating {
                        repeat += n_copies;
                    }

                    for n in 0..repeat {
                        x_offset -= width;
                        if n > 0 {
                            x_offset += extra_repeat_overlap;
                        }
                        buffer.pos_mut()[k - 1].x_offset = x_offset;

                        j -= 1;
                        buffer.info_mut()[j] = buffer.info()[k - 1];
                        buffer.pos_mut()[j] = buffer.pos()[k - 1];
                    }
                }
            }

            i -= 1;
        }

        if step == MEASURE {
            buffer.ensure(old_len + extra_glyphs_needed);
        } else {
            buffer.set_len(new_len);
        }
    }
}

/// Five fixed codepoints a legacy Windows-1256 Arabic font (one with no
/// GSUB at all, shaped by an OS-level contextual-form substitution instead
/// of OpenType smart shaping) is expected to map directly: the isolated
/// forms of alef/noon and the initial forms of lam/meem, plus the
/// lam-alef ligature. A font that answers all five is treated as one of
/// these legacy fonts (spec.md §8 invariant 7: "a font either passes all
/// five signature probes or fails at the first mismatch").
const WIN1256_SIGNATURE_PROBES: &[u32] = &[0xFE8D, 0xFEE5, 0xFEDF, 0xFEE3, 0xFEFC];

fn win1256_signature_matches(face: &Face) -> bool {
    for &cp in WIN1256_SIGNATURE_PROBES {
        let matched = match char::from_u32(cp) {
            Some(c) => face.glyph_index(c).is_some(),
            None => false,
        };
        if !matched {
            return false;
        }
    }
    true
}

/// Arabic Presentation Forms-B (Unicode block U+FE70-FEFC): per-letter
/// [isolated, final, initial, medial] codepoints, used to synthesize the
/// single-substitution lookups a Windows-1256 legacy font lacks in GSUB.
/// `None` means that letter doesn't take the given form (e.g. right-joining
/// letters have no initial/medial form).
const ARABIC_PRESENTATION_FORMS: &[(char, [Option<char>; 4])] = &[
    ('\u{0621}', [Some('\u{FE80}'), None, None, None]),
    ('\u{0622}', [Some('\u{FE81}'), Some('\u{FE82}'), None, None]),
    ('\u{0623}', [Some('\u{FE83}'), Some('\u{FE84}'), None, None]),
    ('\u{0624}', [Some('\u{FE85}'), Some('\u{FE86}'), None, None]),
    ('\u{0625}', [Some('\u{FE87}'), Some('\u{FE88}'), None, None]),
    ('\u{0626}', [Some('\u{FE89}'), Some('\u{FE8A}'), Some('\u{FE8B}'), Some('\u{FE8C}')]),
    ('\u{0627}', [Some('\u{FE8D}'), Some('\u{FE8E}'), None, None]),
    ('\u{0628}', [Some('\u{FE8F}'), Some('\u{FE90}'), Some('\u{FE91}'), Some('\u{FE92}')]),
    ('\u{0629}', [Some('\u{FE93}'), Some('\u{FE94}'), None, None]),
    ('\u{062A}', [Some('\u{FE95}'), Some('\u{FE96}'), Some('\u{FE97}'), Some('\u{FE98}')]),
    ('\u{062B}', [Some('\u{FE99}'), Some('\u{FE9A}'), Some('\u{FE9B}'), Some('\u{FE9C}')]),
    ('\u{062C}', [Some('\u{FE9D}'), Some('\u{FE9E}'), Some('\u{FE9F}'), Some('\u{FEA0}')]),
    ('\u{062D}', [Some('\u{FEA1}'), Some('\u{FEA2}'), Some('\u{FEA3}'), Some('\u{FEA4}')]),
    ('\u{062E}', [Some('\u{FEA5}'), Some('\u{FEA6}'), Some('\u{FEA7}'), Some('\u{FEA8}')]),
    ('\u{062F}', [Some('\u{FEA9}'), Some('\u{FEAA}'), None, None]),
    ('\u{0630}', [Some('\u{FEAB}'), Some('\u{FEAC}'), None, None]),
    ('\u{0631}', [Some('\u{FEAD}'), Some('\u{FEAE}'), None, None]),
    ('\u{0632}', [Some('\u{FEAF}'), Some('\u{FEB0}'), None, None]),
    ('\u{0633}', [Some('\u{FEB1}'), Some('\u{FEB2}'), Some('\u{FEB3}'), Some('\u{FEB4}')]),
    ('\u{0634}', [Some('\u{FEB5}'), Some('\u{FEB6}'), Some('\u{FEB7}'), Some('\u{FEB8}')]),
    ('\u{0635}', [Some('\u{FEB9}'), Some('\u{FEBA}'), Some('\u{FEBB}'), Some('\u{FEBC}')]),
    ('\u{0636}', [Some('\u{FEBD}'), Some('\u{FEBE}'), Some('\u{FEBF}'), Some('\u{FEC0}')]),
    ('\u{0637}', [Some('\u{FEC1}'), Some('\u{FEC2}'), Some('\u{FEC3}'), Some('\u{FEC4}')]),
    ('\u{0638}', [Some('\u{FEC5}'), Some('\u{FEC6}'), Some('\u{FEC7}'), Some('\u{FEC8}')]),
    ('\u{0639}', [Some('\u{FEC9}'), Some('\u{FECA}'), Some('\u{FECB}'), Some('\u{FECC}')]),
    ('\u{063A}', [Some('\u{FECD}'), Some('\u{FECE}'), Some('\u{FECF}'), Some('\u{FED0}')]),
    ('\u{0641}', [Some('\u{FED1}'), Some('\u{FED2}'), Some('\u{FED3}'), Some('\u{FED4}')]),
    ('\u{0642}', [Some('\u{FED5}'), Some('\u{FED6}'), Some('\u{FED7}'), Some('\u{FED8}')]),
    ('\u{0643}', [Some('\u{FED9}'), Some('\u{FEDA}'), Some('\u{FEDB}'), Some('\u{FEDC}')]),
    ('\u{0644}', [Some('\u{FEDD}'), Some('\u{FEDE}'), Some('\u{FEDF}'), Some('\u{FEE0}')]),
    ('\u{0645}', [Some('\u{FEE1}'), Some('\u{FEE2}'), Some('\u{FEE3}'), Some('\u{FEE4}')]),
    ('\u{0646}', [Some('\u{FEE5}'), Some('\u{FEE6}'), Some('\u{FEE7}'), Some('\u{FEE8}')]),
    ('\u{0647}', [Some('\u{FEE9}'), Some('\u{FEEA}'), Some('\u{FEEB}'), Some('\u{FEEC}')]),
    ('\u{0648}', [Some('\u{FEED}'), Some('\u{FEEE}'), None, None]),
    ('\u{0649}', [Some('\u{FEEF}'), Some('\u{FEF0}'), None, None]),
    ('\u{064A}', [Some('\u{FEF1}'), Some('\u{FEF2}'), Some('\u{FEF3}'), Some('\u{FEF4}')]),
];

/// Lam-alef is the one ligature legacy Windows-1256 fonts always carry as a
/// presentation-form pair (Arabic Presentation Forms-A, U+FEF5-FEFC):
/// [isolated, final] for lam followed by each alef variant.
fn lam_alef_ligature(next: u32) -> Option<(char, char)> {
    match next {
        0x0622 => Some(('\u{FEF5}', '\u{FEF6}')),
        0x0623 => Some(('\u{FEF7}', '\u{FEF8}')),
        0x0625 => Some(('\u{FEF9}', '\u{FEFA}')),
        0x0627 => Some(('\u{FEFB}', '\u{FEFC}')),
        _ => None,
    }
}

const LAM: u32 = 0x0644;

fn apply_lam_alef_ligatures(face: &Face, buffer: &mut Buffer) {
    let len = buffer.len();
    let mut drop = vec![false; len];
    let mut i = 0;
    while i + 1 < len {
        let cur = buffer.info()[i].codepoint;
        let next = buffer.info()[i + 1].codepoint;
        if cur == LAM {
            if let Some((isol, fina)) = lam_alef_ligature(next) {
                let joins_before = matches!(action_of(&buffer.info()[i]), Action::Init | Action::Medi);
                let form = if joins_before { fina } else { isol };
                if let Some(glyph) = face.glyph_index(form) {
                    buffer.info_mut()[i].glyph_id = glyph.0 as u32;
                    buffer.merge_clusters(i, i + 2);
                    drop[i + 1] = true;
                    i += 2;
                    continue;
                }
            }
        }
        i += 1;
    }

    if drop.iter().any(|&d| d) {
        let mut iter = drop.into_iter();
        buffer.delete_glyphs_inplace(move |_| !iter.next().unwrap_or(true));
    }
}
