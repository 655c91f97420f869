//! The generic shaper used for Latin, Cyrillic, Greek, and any script with
//! no script-specific rules (spec.md §4.6's "Default" entry).

use crate::common::tag;
use crate::ot::map::MapBuilder;

use super::ComplexShaper;

pub struct DefaultShaper;

const FEATURES: &[&[u8; 4]] = &[
    b"ccmp", b"locl", b"rlig", b"mark", b"mkmk",
    b"calt", b"clig", b"liga", b"rclt", b"curs",
    b"kern",
];

impl ComplexShaper for DefaultShaper {
    fn collect_features(&self, builder: &mut MapBuilder) {
        for f in FEATURES {
            builder.add_feature(tag::new(f), true, None);
        }
    }
}
