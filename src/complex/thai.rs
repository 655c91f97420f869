//! Thai/Lao: mostly the default shaper, plus the Sara Am decomposition
//! that must happen before mark reordering so the resulting nikhahit can
//! take part in the normal mark-CCC reorder pass (spec.md §4.6, Thai entry).

use crate::common::tag;
use crate::ot::map::MapBuilder;

use super::ComplexShaper;

pub struct ThaiShaper;

const FEATURES: &[&[u8; 4]] = &[b"ccmp", b"locl", b"liga", b"kern"];

impl ComplexShaper for ThaiShaper {
    fn collect_features(&self, builder: &mut MapBuilder) {
        for f in FEATURES {
            builder.add_feature(tag::new(f), true, None);
        }
    }

    fn decompose(&self, c: char) -> Option<(char, char)> {
        // Sara Am (U+0E33) decomposes to nikhahit + sara aa so the nikhahit
        // mark can reorder before a preceding tone mark, matching how it
        // actually renders.
        if c == '\u{0E33}' {
            Some(('\u{0E4D}', '\u{0E32}'))
        } else {
            None
        }
    }
}
