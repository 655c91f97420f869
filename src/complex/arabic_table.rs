//! Joining-type classification for the Arabic joining family (Arabic,
//! Syriac, N'Ko, Mandaic, Mongolian, Phags-pa, Adlam) per Unicode's
//! `ArabicShaping.txt`. Covers the letters that actually take part in
//! cursive joining; everything else resolves to `X` and falls back to a
//! general-category test in the caller (non-spacing marks join-transparent,
//! everything else non-joining).

use super::arabic::JoiningType;

pub fn joining_type(c: char) -> JoiningType {
    use JoiningType::*;

    match c as u32 {
        // ARABIC LETTER KASHIDA / TATWEEL: joins on both sides (type C in
        // Unicode terms, modeled here as Dual).
        0x0640 => D,

        // Non-joining letters (type U): hamza, and independent forms.
        0x0621 | 0x0674 => U,

        // Right-joining-only letters (type R).
        0x0622 | 0x0623 | 0x0624 | 0x0625 | 0x0627 | 0x0629 | 0x062F | 0x0630
        | 0x0631 | 0x0632 | 0x0648 | 0x0671..=0x0673 | 0x0675..=0x0677
        | 0x0688..=0x0699 | 0x06C0 | 0x06C3..=0x06CB | 0x06CD | 0x06CF
        | 0x06D2 | 0x06D3 | 0x06D5 | 0x0759..=0x075B | 0x08AA..=0x08AC => R,

        // Dual-joining letters (join on both sides, type D): the bulk of
        // the alphabet.
        0x0626 | 0x0628 | 0x062A..=0x062E | 0x0633..=0x063F
        | 0x0641..=0x0647 | 0x0649 | 0x064A | 0x066E | 0x066F
        | 0x0678..=0x0687 | 0x069A..=0x06BF | 0x06C1 | 0x06C2 | 0x06CC
        | 0x06CE | 0x06D0 | 0x06D1 | 0x06FA..=0x06FC | 0x06FF
        | 0x0750..=0x0758 | 0x075C..=0x076A | 0x076D..=0x0770
        | 0x0772 | 0x0775..=0x0777 | 0x077A..=0x077F => D,

        // ZERO WIDTH JOINER acts as join-causing (treated here as dual).
        0x200D => D,

        // ZERO WIDTH NON-JOINER is transparent-non-joining.
        0x200C => U,

        // Syriac primary letters: dual-joining.
        0x0712..=0x072C | 0x074E..=0x074F => D,
        // Syriac ALAPH: its own joining group, dual-joining with special
        // shaping-action fixups handled by the state table's ALAPH column.
        0x0710 => GroupAlaph,
        // Syriac DALATH and RISH: right-joining, own state-table column.
        0x0715 | 0x0716 | 0x072A => GroupDalathRish,

        // N'Ko letters: dual-joining.
        0x07CA..=0x07EA => D,
        // N'Ko GBA (right-joining exception among the N'Ko block).
        0x07D4 => R,

        // Mandaic letters: dual-joining.
        0x0840..=0x0858 => D,

        // Mongolian letters: dual-joining (birga and punctuation excluded).
        0x1820..=0x1842 | 0x1844..=0x1878 | 0x1880..=0x18A8 | 0x18AA => D,

        // Adlam letters: dual-joining.
        0x1E900..=0x1E943 => D,

        // Phags-pa letters: dual-joining.
        0xA840..=0xA871 => D,

        _ => X,
    }
}
