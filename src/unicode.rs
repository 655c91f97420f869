//! Unicode character properties consumed by shaping: general category,
//! script, canonical combining class (raw and "modified"), mirroring, and
//! default-ignorable classification.
//!
//! This wraps the `unicode-*` crates the teacher already depends on rather
//! than hand-rolling UCD tables, matching the "don't fall back to stdlib
//! where the ecosystem has a way" rule.

pub use unicode_general_category::GeneralCategory as UnicodeGeneralCategory;

/// A thin local wrapper so we can attach the `hb`-style packed representation
/// (a single byte, matching the bit budget `GlyphInfo::unicode_props` gives
/// general category in spec.md's data model) without violating orphan rules.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct GeneralCategory(pub UnicodeGeneralCategory);

impl GeneralCategory {
    pub fn of(c: char) -> Self {
        GeneralCategory(unicode_general_category::get_general_category(c))
    }

    pub fn to_hb(self) -> u8 {
        use UnicodeGeneralCategory::*;
        match self.0 {
            ClosePunctuation => 0,
            ConnectorPunctuation => 1,
            Control => 2,
            CurrencySymbol => 3,
            DashPunctuation => 4,
            DecimalNumber => 5,
            EnclosingMark => 6,
            FinalPunctuation => 7,
            Format => 8,
            InitialPunctuation => 9,
            LetterNumber => 10,
            LineSeparator => 11,
            LowercaseLetter => 12,
            MathSymbol => 13,
            ModifierLetter => 14,
            ModifierSymbol => 15,
            NonspacingMark => 16,
            OtherLetter => 17,
            OtherNumber => 18,
            OtherPunctuation => 19,
            OtherSymbol => 20,
            ParagraphSeparator => 21,
            PrivateUse => 22,
            SpaceSeparator => 23,
            SpacingMark => 24,
            Surrogate => 25,
            TitlecaseLetter => 26,
            Unassigned => 27,
            UppercaseLetter => 28,
            OpenPunctuation => 29,
        }
    }

    pub fn from_hb(v: u8) -> Self {
        use UnicodeGeneralCategory::*;
        GeneralCategory(match v {
            0 => ClosePunctuation,
            1 => ConnectorPunctuation,
            2 => Control,
            3 => CurrencySymbol,
            4 => DashPunctuation,
            5 => DecimalNumber,
            6 => EnclosingMark,
            7 => FinalPunctuation,
            8 => Format,
            9 => InitialPunctuation,
            10 => LetterNumber,
            11 => LineSeparator,
            12 => LowercaseLetter,
            13 => MathSymbol,
            14 => ModifierLetter,
            15 => ModifierSymbol,
            16 => NonspacingMark,
            17 => OtherLetter,
            18 => OtherNumber,
            19 => OtherPunctuation,
            20 => OtherSymbol,
            21 => ParagraphSeparator,
            22 => PrivateUse,
            23 => SpaceSeparator,
            24 => SpacingMark,
            25 => Surrogate,
            26 => TitlecaseLetter,
            27 => Unassigned,
            _ => UppercaseLetter,
        })
    }

    pub fn is_mark(self) -> bool {
        matches!(
            self.0,
            UnicodeGeneralCategory::NonspacingMark
                | UnicodeGeneralCategory::SpacingMark
                | UnicodeGeneralCategory::EnclosingMark
        )
    }

    pub fn is_letter(self) -> bool {
        matches!(
            self.0,
            UnicodeGeneralCategory::UppercaseLetter
                | UnicodeGeneralCategory::LowercaseLetter
                | UnicodeGeneralCategory::TitlecaseLetter
                | UnicodeGeneralCategory::ModifierLetter
                | UnicodeGeneralCategory::OtherLetter
        )
    }

    pub fn is_format(self) -> bool {
        self.0 == UnicodeGeneralCategory::Format
    }
}

pub(crate) trait CharExt {
    fn general_category(self) -> GeneralCategory;
    fn modified_combining_class(self) -> u8;
    fn mirrored(self) -> Option<char>;
}

impl CharExt for char {
    fn general_category(self) -> GeneralCategory {
        GeneralCategory::of(self)
    }

    fn modified_combining_class(self) -> u8 {
        modified_combining_class(self)
    }

    fn mirrored(self) -> Option<char> {
        unicode_bidi_mirroring::get_mirrored(self)
    }
}

/// Looks up the Unicode `Script` property for a char, mapped onto our local
/// [`crate::common::Script`] via its ISO 15924 tag. Returns `None` for
/// Common/Inherited/Unknown, matching `hb_buffer_guess_segment_properties`'s
/// skip rule.
pub fn script_for_char(c: char) -> Option<crate::common::Script> {
    use unicode_script::UnicodeScript;

    let script = c.script();
    if script == unicode_script::Script::Common || script == unicode_script::Script::Inherited
        || script == unicode_script::Script::Unknown
    {
        return None;
    }

    let short_name = script.short_name();
    let tag = crate::common::Tag::from_bytes_lossy(short_name.as_bytes());
    crate::common::Script::from_iso15924_tag(tag)
}

/// Whether a codepoint renders as nothing by default: ZWJ/ZWNJ, variation
/// selectors, Mongolian FVS, CGJ, soft hyphen, and the like. Mirrors
/// HarfBuzz's `_hb_glyph_info_is_default_ignorable` predicate.
pub fn is_default_ignorable(c: u32) -> bool {
    match c {
        0x00AD // SOFT HYPHEN
        | 0x034F // COMBINING GRAPHEME JOINER
        | 0x115F..=0x1160 // HANGUL CHOSEONG/JUNGSEONG FILLER
        | 0x17B4..=0x17B5 // KHMER VOWEL INHERENT
        | 0x180B..=0x180E // MONGOLIAN FREE VARIATION SELECTORs + VOWEL SEPARATOR
        | 0x200B..=0x200F // ZWSP, ZWNJ, ZWJ, LRM, RLM
        | 0x202A..=0x202E // bidi embeds/overrides
        | 0x2060..=0x2064 // WORD JOINER .. INVISIBLE PLUS
        | 0x2065
        | 0x2066..=0x206F // bidi isolates + deprecated format chars
        | 0x3164 // HANGUL FILLER
        | 0xFE00..=0xFE0F // VARIATION SELECTOR-1..16
        | 0xFEFF // ZERO WIDTH NO-BREAK SPACE / BOM
        | 0xFFA0 // HALFWIDTH HANGUL FILLER
        | 0xFFF0..=0xFFF8
        | 0x1BCA0..=0x1BCA3
        | 0x1D173..=0x1D17A
        | 0xE0000..=0xE0FFF => true,
        _ => false,
    }
}

pub fn is_variation_selector(c: u32) -> bool {
    matches!(c, 0x180B..=0x180D | 0xFE00..=0xFE0F | 0xE0100..=0xE01EF)
}

pub fn is_zwj(c: u32) -> bool {
    c == 0x200D
}

pub fn is_zwnj(c: u32) -> bool {
    c == 0x200C
}

pub fn is_emoji_extended_pictographic(_c: u32) -> bool {
    // Emoji data tables are out of this crate's scope (not named by the
    // spec); default-ignorable handling does not require this refinement.
    false
}

/// Canonical combining class, via `unicode-ccc`.
pub fn canonical_combining_class(c: char) -> u8 {
    unicode_ccc::get_canonical_combining_class(c) as u8
}

pub mod modified_combining_class {
    //! Deviations from the raw Unicode CCC table used during mark reordering,
    //! per spec.md §4.8 item 2. See `MODIFIED_COMBINING_CLASS` below for the
    //! full remapping table these constants feed into.

    // Hebrew: permute the "fixed position" classes 10-26 into SBL Hebrew order.
    pub const CCC10: u8 = 22;
    pub const CCC11: u8 = 15;
    pub const CCC12: u8 = 16;
    pub const CCC13: u8 = 17;
    pub const CCC14: u8 = 23;
    pub const CCC15: u8 = 18;
    pub const CCC16: u8 = 19;
    pub const CCC17: u8 = 20;
    pub const CCC18: u8 = 21;
    pub const CCC19: u8 = 14;
    pub const CCC20: u8 = 24;
    pub const CCC21: u8 = 12;
    pub const CCC22: u8 = 25;
    pub const CCC23: u8 = 13;
    pub const CCC24: u8 = 10;
    pub const CCC25: u8 = 11;
    pub const CCC26: u8 = 26;

    // Arabic: move Shadda (ccc=33) before other Arabic marks.
    pub const CCC27: u8 = 28;
    pub const CCC28: u8 = 29;
    pub const CCC29: u8 = 30;
    pub const CCC30: u8 = 31;
    pub const CCC31: u8 = 32;
    pub const CCC32: u8 = 33;
    pub const CCC33: u8 = 27;
    pub const CCC34: u8 = 34;
    pub const CCC35: u8 = 35;

    // Syriac.
    pub const CCC36: u8 = 36;

    // Telugu length marks: fold to 0 so they don't reorder against Halant (ccc=9).
    pub const CCC84: u8 = 0;
    pub const CCC91: u8 = 0;

    // Thai: reorder Sara U/UU before Thanthakhat.
    pub const CCC103: u8 = 3;
    pub const CCC107: u8 = 107;

    // Lao.
    pub const CCC118: u8 = 118;
    pub const CCC122: u8 = 122;

    // Tibetan: prefer "u" vowel sign ordering for Dzongkha shortcuts.
    pub const CCC129: u8 = 129;
    pub const CCC130: u8 = 132;
    pub const CCC132: u8 = 131;
}

/// Applies the script-specific deviations from spec.md §4.8 item 2 on top of
/// the raw Unicode canonical combining class.
pub fn modified_combining_class(c: char) -> u8 {
    use modified_combining_class as m;

    let raw = canonical_combining_class(c);
    match raw {
        10 => m::CCC10,
        11 => m::CCC11,
        12 => m::CCC12,
        13 => m::CCC13,
        14 => m::CCC14,
        15 => m::CCC15,
        16 => m::CCC16,
        17 => m::CCC17,
        18 => m::CCC18,
        19 => m::CCC19,
        20 => m::CCC20,
        21 => m::CCC21,
        22 => m::CCC22,
        23 => m::CCC23,
        24 => m::CCC24,
        25 => m::CCC25,
        26 => m::CCC26,
        27 => m::CCC27,
        28 => m::CCC28,
        29 => m::CCC29,
        30 => m::CCC30,
        31 => m::CCC31,
        32 => m::CCC32,
        33 => m::CCC33,
        34 => m::CCC34,
        35 => m::CCC35,
        36 => m::CCC36,
        84 => m::CCC84,
        91 => m::CCC91,
        103 => m::CCC103,
        107 => m::CCC107,
        118 => m::CCC118,
        122 => m::CCC122,
        129 => m::CCC129,
        130 => m::CCC130,
        132 => m::CCC132,
        other => other,
    }
}

pub mod normalize;
