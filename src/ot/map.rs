//! Feature-to-lookup resolution and mask-bit allocation (spec.md §4.6): the
//! `Map` a compiled [`crate::plan::ShapePlan`] carries, built by `MapBuilder`
//! from the script/language-resolved feature list.

use std::collections::BTreeMap;

use crate::common::Tag;
use crate::ot::layout::{FeatureIndex, LayoutTable, LookupIndex};
use crate::Mask;

#[derive(Clone, Copy, Debug)]
pub struct FeatureRequest {
    pub tag: Tag,
    pub enabled: bool,
    /// `None` = whole buffer; `Some((start, end))` = only that character range.
    pub range: Option<(u32, u32)>,
}

/// One entry of the compiled application order: a lookup and the mask that
/// gates which buffer positions it's allowed to touch.
#[derive(Clone, Copy, Debug)]
pub struct MapLookup {
    pub index: LookupIndex,
    pub mask: Mask,
    pub auto_zwnj: bool,
    pub auto_zwj: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Map {
    /// GSUB lookups split into stages at every `add_gsub_pause` boundary
    /// (spec.md §4.6 item 3's "arabic pause" use case): a complex shaper's
    /// `post_gsub_stage` hook runs once after each inner `Vec` completes,
    /// e.g. Arabic recording which glyphs `stch` just multiplied before the
    /// next stage's features get a chance to multiply anything else.
    pub(crate) gsub_stages: Vec<Vec<MapLookup>>,
    /// GPOS has no pause mechanism; all its lookups run as one stage.
    pub(crate) gpos_lookups: Vec<MapLookup>,
    /// Per-feature allocated mask bit and shift, so a complex shaper's
    /// `setup_masks` can look up "the bit for tag X" by name.
    pub(crate) feature_masks: BTreeMap<Tag, Mask>,
}

impl Map {
    pub fn mask_for(&self, tag: Tag) -> Mask {
        self.feature_masks.get(&tag).copied().unwrap_or(0)
    }
}

fn enable_feature(
    table: &LayoutTable,
    feature_index: FeatureIndex,
    bit: Mask,
    lookup_masks: &mut BTreeMap<u16, Mask>,
    lookup_order: &mut Vec<u16>,
) {
    if let Some(feature) = table.feature_at(feature_index) {
        for lookup in feature.lookup_indices.iter() {
            let entry = lookup_masks.entry(lookup.0).or_insert(0);
            if *entry == 0 {
                lookup_order.push(lookup.0);
            }
            *entry |= bit;
        }
    }
}

/// One entry of the requested feature/pause sequence, in the order the
/// shaper's `collect_features` called `add_feature`/`add_gsub_pause`.
#[derive(Clone, Copy, Debug)]
enum Event {
    Feature(FeatureRequest),
    Pause,
}

pub struct MapBuilder<'a> {
    gsub: Option<LayoutTable<'a>>,
    gpos: Option<LayoutTable<'a>>,
    script_tags: Vec<Tag>,
    language_tags: Vec<Tag>,
    requested: Vec<Event>,
    variation_coords: &'a [i32],
}

/// Bit 0: every enabled, whole-buffer feature shares this bit rather than
/// getting one of its own, since most features never need per-range gating.
pub(crate) const GLOBAL_BIT: Mask = 1;

impl<'a> MapBuilder<'a> {
    pub fn new(
        gsub: Option<LayoutTable<'a>>,
        gpos: Option<LayoutTable<'a>>,
        script_tags: Vec<Tag>,
        language_tags: Vec<Tag>,
        variation_coords: &'a [i32],
    ) -> Self {
        MapBuilder { gsub, gpos, script_tags, language_tags, requested: Vec::new(), variation_coords }
    }

    pub fn add_feature(&mut self, tag: Tag, enabled: bool, range: Option<(u32, u32)>) {
        self.requested.push(Event::Feature(FeatureRequest { tag, enabled, range }));
    }

    /// Splits the GSUB lookup list at this point into two stages. Ignored
    /// when compiling GPOS, which has no pause mechanism. `after_feature` is
    /// unused beyond documenting intent at the call site; the pause always
    /// falls after every feature requested so far.
    pub fn add_gsub_pause(&mut self, after_feature: Tag) {
        let _ = after_feature;
        self.requested.push(Event::Pause);
    }

    pub fn compile(&self) -> Map {
        let mut map = Map::default();
        let mut next_bit_shift = 1u32; // bit 0 reserved for GLOBAL_BIT.

        if let Some(gsub) = &self.gsub {
            map.gsub_stages = self.compile_table(gsub, &mut map.feature_masks, &mut next_bit_shift, true);
        }
        if let Some(gpos) = &self.gpos {
            map.gpos_lookups = self
                .compile_table(gpos, &mut map.feature_masks, &mut next_bit_shift, false)
                .into_iter()
                .flatten()
                .collect();
        }

        map
    }

    /// Compiles one table's requested features into staged lookup lists.
    /// `honor_pauses` splits the result at every `Event::Pause` (GSUB); GPOS
    /// has no pause mechanism and always comes back as a single stage.
    fn compile_table(
        &self,
        table: &LayoutTable<'a>,
        feature_masks: &mut BTreeMap<Tag, Mask>,
        next_bit_shift: &mut u32,
        honor_pauses: bool,
    ) -> Vec<Vec<MapLookup>> {
        let script = self.find_script(table);
        let lang_sys = self.find_language(table, script);

        let (required, available) = match lang_sys {
            Some((required, indices)) => (required, indices),
            None => (None, Vec::new()),
        };

        // `lookup_index -> accumulated mask` so a lookup shared by more than
        // one requested feature gets every bit ORed in, not just the last.
        let mut lookup_masks: BTreeMap<u16, Mask> = BTreeMap::new();
        let mut lookup_order: Vec<u16> = Vec::new();

        if let Some(required) = required {
            enable_feature(table, required, GLOBAL_BIT, &mut lookup_masks, &mut lookup_order);
        }

        let mut stages: Vec<Vec<MapLookup>> = Vec::new();
        // Lookups already flushed into an earlier stage, so a pause never
        // re-emits them into the next one.
        let mut flushed = 0usize;

        let flush_stage = |lookup_order: &[u16], lookup_masks: &BTreeMap<u16, Mask>, from: usize| -> Vec<MapLookup> {
            lookup_order[from..]
                .iter()
                .map(|&lookup_index| MapLookup {
                    index: LookupIndex(lookup_index),
                    mask: lookup_masks.get(&lookup_index).copied().unwrap_or(GLOBAL_BIT),
                    auto_zwnj: true,
                    auto_zwj: true,
                })
                .collect()
        };

        for event in &self.requested {
            let req = match event {
                Event::Feature(req) => req,
                Event::Pause => {
                    if honor_pauses {
                        stages.push(flush_stage(&lookup_order, &lookup_masks, flushed));
                        flushed = lookup_order.len();
                    }
                    continue;
                }
            };

            if !req.enabled {
                continue;
            }

            let bit = if req.range.is_some() {
                // 31-bit budget (bit 0 reserved for global features): once
                // exhausted, fall back to the global bit rather than error,
                // matching the "global-bit fallback" rule (spec.md §4.6 item 2).
                if *next_bit_shift >= 31 {
                    GLOBAL_BIT
                } else {
                    let bit = 1 << *next_bit_shift;
                    *next_bit_shift += 1;
                    bit
                }
            } else {
                GLOBAL_BIT
            };

            if let Some(idx) = self.feature_index(table, &available, req.tag) {
                enable_feature(table, idx, bit, &mut lookup_masks, &mut lookup_order);
                feature_masks.insert(req.tag, feature_masks.get(&req.tag).copied().unwrap_or(0) | bit);
            }

            // Apply feature variations: a matching variation's substitution
            // record replaces which lookups this feature index contributes.
            for variation in table.feature_variations() {
                if !variation.evaluate(self.variation_coords) {
                    continue;
                }
                for (idx, feature) in variation.substitutions() {
                    if table.feature_at(idx).map(|f| f.tag) == Some(req.tag) {
                        for lookup in feature.lookup_indices.iter() {
                            let entry = lookup_masks.entry(lookup.0).or_insert(0);
                            if *entry == 0 {
                                lookup_order.push(lookup.0);
                            }
                            *entry |= bit;
                        }
                    }
                }
            }
        }

        stages.push(flush_stage(&lookup_order, &lookup_masks, flushed));
        stages
    }

    fn find_script(&self, table: &LayoutTable<'a>) -> Option<crate::ot::layout::Script<'a>> {
        for tag in &self.script_tags {
            if let Some(s) = table.script_by_tag(*tag) {
                return Some(s);
            }
        }
        table.script_by_tag(Tag::from_bytes(b"DFLT")).or_else(|| table.script_by_tag(Tag::from_bytes(b"dflt")))
    }

    fn find_language(
        &self,
        table: &LayoutTable<'a>,
        script: Option<crate::ot::layout::Script<'a>>,
    ) -> Option<(Option<FeatureIndex>, Vec<FeatureIndex>)> {
        let script = script?;
        for tag in &self.language_tags {
            if let Some(lang) = script.language_by_tag(*tag) {
                return Some((lang.required_feature_index, lang.feature_indices.iter().collect()));
            }
        }
        let lang = script.default_language()?;
        Some((lang.required_feature_index, lang.feature_indices.iter().collect()))
    }

    fn feature_index(&self, table: &LayoutTable<'a>, available: &[FeatureIndex], tag: Tag) -> Option<FeatureIndex> {
        available.iter().copied().find(|&idx| table.feature_at(idx).map(|f| f.tag) == Some(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::tag;

    #[test]
    fn mask_for_unknown_tag_is_zero() {
        let map = Map::default();
        assert_eq!(map.mask_for(tag::new(b"liga")), 0);
    }

    #[test]
    fn without_a_font_no_feature_resolves_and_no_lookups_are_staged() {
        let mut builder = MapBuilder::new(None, None, vec![tag::new(b"latn")], vec![tag::new(b"dflt")], &[]);
        builder.add_feature(tag::new(b"liga"), true, None);
        let map = builder.compile();
        assert_eq!(map.mask_for(tag::new(b"liga")), 0);
        assert!(map.gsub_stages.iter().all(|stage| stage.is_empty()));
        assert!(map.gpos_lookups.is_empty());
    }
}
