//! Hangul: algorithmic Jamo <-> syllable composition/decomposition, done
//! directly rather than through `unic-ucd-normal`'s generic canonical
//! decomposition since the Hangul algorithm is a closed-form arithmetic
//! rule, not a decomposition table lookup (spec.md §4.6, Hangul entry).

use crate::common::tag;
use crate::ot::map::MapBuilder;
use crate::unicode::normalize::NormalizationMode;

use super::ComplexShaper;

pub struct HangulShaper;

const S_BASE: u32 = 0xAC00;
const L_BASE: u32 = 0x1100;
const V_BASE: u32 = 0x1161;
const T_BASE: u32 = 0x11A7;
const L_COUNT: u32 = 19;
const V_COUNT: u32 = 21;
const T_COUNT: u32 = 28;
const N_COUNT: u32 = V_COUNT * T_COUNT;
const S_COUNT: u32 = L_COUNT * N_COUNT;

const FEATURES: &[&[u8; 4]] = &[b"ccmp", b"ljmo", b"vjmo", b"tjmo"];

impl ComplexShaper for HangulShaper {
    fn collect_features(&self, builder: &mut MapBuilder) {
        for f in FEATURES {
            builder.add_feature(tag::new(f), true, None);
        }
    }

    fn normalization_preference(&self) -> NormalizationMode {
        // Hangul recomposition happens through this shaper's own `compose`,
        // not the generic Unicode composition table, but the generic
        // recompose pass already calls `compose` first and only falls back
        // to `unic_ucd_normal::compose`, so leaving this at `Auto` is safe.
        NormalizationMode::Auto
    }

    fn decompose(&self, c: char) -> Option<(char, char)> {
        let s = c as u32;
        if s < S_BASE || s >= S_BASE + S_COUNT {
            return None;
        }
        let s_index = s - S_BASE;
        let t_index = s_index % T_COUNT;

        if t_index == 0 {
            // LV syllable: decomposes to L + V only.
            let l = L_BASE + s_index / N_COUNT;
            let v = V_BASE + (s_index % N_COUNT) / T_COUNT;
            Some((char::from_u32(l)?, char::from_u32(v)?))
        } else {
            // LVT syllable: this crate's two-char decomposition contract
            // can't express three parts in one step, so first split off T;
            // the LV part re-enters decomposition on the next pass.
            let lv_index = s_index - t_index;
            let lv = S_BASE + lv_index;
            let t = T_BASE + t_index;
            Some((char::from_u32(lv)?, char::from_u32(t)?))
        }
    }

    fn compose(&self, a: char, b: char) -> Option<char> {
        let a = a as u32;
        let b = b as u32;

        // L + V -> LV
        if (L_BASE..L_BASE + L_COUNT).contains(&a) && (V_BASE..V_BASE + V_COUNT).contains(&b) {
            let l_index = a - L_BASE;
            let v_index = b - V_BASE;
            let lv_index = l_index * N_COUNT + v_index * T_COUNT;
            return char::from_u32(S_BASE + lv_index);
        }

        // LV + T -> LVT
        if (S_BASE..S_BASE + S_COUNT).contains(&a) && (a - S_BASE) % T_COUNT == 0 && (T_BASE + 1..T_BASE + T_COUNT).contains(&b) {
            let t_index = b - T_BASE;
            return char::from_u32(a + t_index);
        }

        None
    }
}
