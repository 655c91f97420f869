//! Common value types shared across the crate: tags, direction, script and language.

use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

/// A 4-byte SFNT tag, e.g. `GSUB`, `arab`, `liga`.
///
/// Stored in the same bit order HarfBuzz uses: the first character occupies
/// the most significant byte, matching the big-endian encoding on disk.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tag(pub u32);

impl Tag {
    /// Creates a `Tag` from four bytes.
    #[inline]
    pub const fn from_bytes(bytes: &[u8; 4]) -> Self {
        Tag(((bytes[0] as u32) << 24)
            | ((bytes[1] as u32) << 16)
            | ((bytes[2] as u32) << 8)
            | (bytes[3] as u32))
    }

    /// Creates a `Tag` from a byte slice, space-padding on the right if shorter than 4 bytes.
    pub fn from_bytes_lossy(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Tag::default();
        }

        let mut iter = bytes.iter().copied().chain([b' ', b' ', b' ', b' '].iter().copied());
        Tag::from_bytes(&[
            iter.next().unwrap(),
            iter.next().unwrap(),
            iter.next().unwrap(),
            iter.next().unwrap(),
        ])
    }

    /// Returns the tag's underlying bytes.
    #[inline]
    pub const fn to_bytes(self) -> [u8; 4] {
        [
            (self.0 >> 24 & 0xff) as u8,
            (self.0 >> 16 & 0xff) as u8,
            (self.0 >> 8 & 0xff) as u8,
            (self.0 & 0xff) as u8,
        ]
    }

    pub(crate) fn to_ttf_parser(self) -> ttf_parser::Tag {
        ttf_parser::Tag(self.0)
    }

    pub(crate) fn from_ttf_parser(tag: ttf_parser::Tag) -> Self {
        Tag(tag.0)
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let bytes = self.to_bytes();
        write!(f, "Tag({:?})", String::from_utf8_lossy(&bytes))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let bytes = self.to_bytes();
        for b in &bytes {
            write!(f, "{}", *b as char)?;
        }
        Ok(())
    }
}

impl FromStr for Tag {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.len() > 4 {
            return Err("tag must be 1 to 4 bytes long");
        }

        Ok(Tag::from_bytes_lossy(s.as_bytes()))
    }
}

/// Script and language tag constants.
pub mod tag {
    use super::Tag;

    pub const fn new(bytes: &[u8; 4]) -> Tag {
        Tag::from_bytes(bytes)
    }
}

/// Text flow direction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction {
    Invalid,
    LeftToRight,
    RightToLeft,
    TopToBottom,
    BottomToTop,
}

impl Direction {
    #[inline]
    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::LeftToRight | Direction::RightToLeft)
    }

    #[inline]
    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::TopToBottom | Direction::BottomToTop)
    }

    #[inline]
    pub fn is_backward(self) -> bool {
        matches!(self, Direction::RightToLeft | Direction::BottomToTop)
    }

    #[inline]
    pub fn is_forward(self) -> bool {
        matches!(self, Direction::LeftToRight | Direction::TopToBottom)
    }

    #[inline]
    pub fn reverse(self) -> Self {
        match self {
            Direction::LeftToRight => Direction::RightToLeft,
            Direction::RightToLeft => Direction::LeftToRight,
            Direction::TopToBottom => Direction::BottomToTop,
            Direction::BottomToTop => Direction::TopToBottom,
            Direction::Invalid => Direction::Invalid,
        }
    }
}

impl Default for Direction {
    fn default() -> Self {
        Direction::Invalid
    }
}

/// A script identifier (ISO 15924 four-letter tag, lower-cased for the "new" OpenType form).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Script(pub(crate) Tag);

impl Script {
    pub fn from_iso15924_tag(tag: Tag) -> Option<Self> {
        if tag.0 == 0 {
            None
        } else {
            Some(Script(tag))
        }
    }

    pub fn tag(&self) -> Tag {
        self.0
    }

    /// The "horizontal direction" a script is normally written in, absent higher-level bidi input.
    pub fn horizontal_direction(self) -> Direction {
        match self.0.to_bytes() {
            arabic::TAG | hebrew::TAG | syriac::TAG | thaana::TAG | nko::TAG
            | mandaic::TAG | samaritan::TAG => Direction::RightToLeft,
            _ => Direction::LeftToRight,
        }
    }
}

// Convenience sub-modules of well-known script tags, used both by `horizontal_direction`
// and by the complex shaper dispatch table (see `complex::dispatch`).
macro_rules! script_tags {
    ($($name:ident => $tag:expr),* $(,)?) => {
        $(
            #[allow(non_upper_case_globals, dead_code)]
            pub mod $name {
                pub const TAG: [u8; 4] = *$tag;
            }
        )*
    };
}

pub(crate) mod arabic { pub const TAG: [u8; 4] = *b"Arab"; }
pub(crate) mod hebrew { pub const TAG: [u8; 4] = *b"Hebr"; }
pub(crate) mod syriac { pub const TAG: [u8; 4] = *b"Syrc"; }
pub(crate) mod thaana { pub const TAG: [u8; 4] = *b"Thaa"; }
pub(crate) mod nko { pub const TAG: [u8; 4] = *b"Nkoo"; }
pub(crate) mod mandaic { pub const TAG: [u8; 4] = *b"Mand"; }
pub(crate) mod samaritan { pub const TAG: [u8; 4] = *b"Samr"; }

script_tags! {
    latin => b"Latn",
    devanagari => b"Deva",
    thai_script => b"Thai",
    hangul => b"Hang",
    khmer => b"Khmr",
    myanmar => b"Mymr",
}

/// A BCP-47 language tag, stored as-is (lower-cased) for comparisons.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Language(pub(crate) String);

impl Language {
    pub fn from_str(s: &str) -> Option<Self> {
        if s.is_empty() {
            None
        } else {
            Some(Language(s.to_ascii_lowercase()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Maps to the legacy OpenType `LangSys` tag, when a well-known mapping exists,
    /// else derives a tag from the first four letters of the primary subtag.
    pub(crate) fn to_opentype_tags(&self) -> Vec<Tag> {
        // A handful of the ~7000 BCP-47 to OT mappings HarfBuzz ships; the full
        // table is generated data and out of scope for hand-authoring here.
        let primary = self.0.splitn(2, |c| c == '-' || c == '_').next().unwrap_or(&self.0);
        match primary {
            "en" => vec![Tag::from_bytes(b"ENG ")],
            "fr" => vec![Tag::from_bytes(b"FRA ")],
            "de" => vec![Tag::from_bytes(b"DEU ")],
            "ar" => vec![Tag::from_bytes(b"ARA ")],
            "he" => vec![Tag::from_bytes(b"IWR ")],
            "hi" => vec![Tag::from_bytes(b"HIN ")],
            "th" => vec![Tag::from_bytes(b"THA ")],
            "ko" => vec![Tag::from_bytes(b"KOR ")],
            "km" => vec![Tag::from_bytes(b"KHM ")],
            "my" => vec![Tag::from_bytes(b"MYM ")],
            _ => {
                let mut bytes = [b' '; 4];
                for (i, b) in primary.as_bytes().iter().take(4).enumerate() {
                    bytes[i] = b.to_ascii_uppercase();
                }
                vec![Tag::from_bytes(&bytes)]
            }
        }
    }
}

impl TryFrom<&str> for Language {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Language::from_str(value).ok_or(())
    }
}
