//! Shape-plan compilation (spec.md §4.6): resolves a script/language pair to
//! an ordered lookup list with mask bits allocated, and picks the complex
//! shaper that drives the rest of the pipeline.

use crate::common::{tag, Direction, Language, Script, Tag};
use crate::complex::{self, ComplexShaper};
use crate::face::Face;
use crate::ot::map::{Map, MapBuilder};
use crate::Feature;

/// Features every script wants regardless of which complex shaper is active:
/// generic mark/ligature-caret attachment and kerning. A complex shaper's own
/// `collect_features` runs after these, so a shaper-specific pause still sees
/// them in the lookup order.
const COMMON_FEATURES: &[&[u8; 4]] = &[b"mark", b"mkmk", b"kern"];

pub(crate) struct ShapePlan {
    pub(crate) script: Option<Script>,
    pub(crate) direction: Direction,
    pub(crate) shaper: Box<dyn ComplexShaper>,
    pub(crate) map: Map,
}

impl ShapePlan {
    pub(crate) fn new(
        face: &Face,
        direction: Direction,
        script: Option<Script>,
        language: Option<&Language>,
        user_features: &[Feature],
    ) -> Self {
        let shaper = complex::shaper_for_script(script);
        let script_tags = script_ot_tags(script);
        let language_tags = language.map(|l| l.to_opentype_tags()).unwrap_or_default();

        let mut builder =
            MapBuilder::new(face.gsub, face.gpos, script_tags, language_tags, face.variation_coords());

        for f in COMMON_FEATURES {
            builder.add_feature(tag::new(f), true, None);
        }
        shaper.collect_features(&mut builder);

        for feature in user_features {
            builder.add_feature(feature.tag, feature.is_enabled(), feature.range());
        }

        let map = builder.compile();

        ShapePlan { script, direction, shaper, map }
    }
}

/// Builds the script-tag fallback chain a `MapBuilder` tries in order: the
/// "new-style" OpenType tag (the v2 reordered-glyph tag a handful of Indic
/// scripts also define), the "old-style" tag (the plain lowercased ISO 15924
/// tag every script has), then `DFLT`.
fn script_ot_tags(script: Option<Script>) -> Vec<Tag> {
    let mut tags = Vec::with_capacity(3);

    if let Some(script) = script {
        let bytes = script.tag().to_bytes();
        if let Some(new_tag) = new_style_tag(&bytes) {
            tags.push(new_tag);
        }
        tags.push(old_style_tag(&bytes));
    }

    tags.push(tag::new(b"DFLT"));
    tags
}

fn old_style_tag(bytes: &[u8; 4]) -> Tag {
    let mut lower = *bytes;
    for b in lower.iter_mut() {
        *b = b.to_ascii_lowercase();
    }
    Tag::from_bytes(&lower)
}

/// A handful of scripts shipped a second, "v2" script tag alongside their
/// legacy one when OpenType moved to visual reordering of Indic glyph runs;
/// fonts built against the newer model register lookups under the v2 tag.
fn new_style_tag(bytes: &[u8; 4]) -> Option<Tag> {
    match bytes {
        b"Deva" => Some(tag::new(b"dev2")),
        b"Beng" => Some(tag::new(b"bng2")),
        b"Guru" => Some(tag::new(b"gur2")),
        b"Gujr" => Some(tag::new(b"gjr2")),
        b"Orya" => Some(tag::new(b"ory2")),
        b"Taml" => Some(tag::new(b"tml2")),
        b"Telu" => Some(tag::new(b"tel2")),
        b"Knda" => Some(tag::new(b"knd2")),
        b"Mlym" => Some(tag::new(b"mlm2")),
        b"Mymr" => Some(tag::new(b"mym2")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn devanagari_tries_v2_before_old_style_before_dflt() {
        let script = Script::from_iso15924_tag(Tag::from_bytes(b"Deva")).unwrap();
        let tags = script_ot_tags(Some(script));
        assert_eq!(tags, vec![tag::new(b"dev2"), tag::new(b"deva"), tag::new(b"DFLT")]);
    }

    #[test]
    fn latin_has_no_v2_tag() {
        let script = Script::from_iso15924_tag(Tag::from_bytes(b"Latn")).unwrap();
        let tags = script_ot_tags(Some(script));
        assert_eq!(tags, vec![tag::new(b"latn"), tag::new(b"DFLT")]);
    }

    #[test]
    fn no_script_falls_back_to_dflt_only() {
        assert_eq!(script_ot_tags(None), vec![tag::new(b"DFLT")]);
    }
}
