//! # Palette Module
//!
//! Palette substitution over compiled vertex colors and point lights.

use serde::{Deserialize, Serialize};

use super::compiled::PointLight;
use crate::voxels::Rgb;

/// Replace every occurrence of `from` with `to`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorReplacement {
    pub from: Rgb,
    pub to: Rgb,
}

impl ColorReplacement {
    pub const fn new(from: Rgb, to: Rgb) -> Self {
        ColorReplacement { from, to }
    }
}

pub struct PaletteRemapper;

impl PaletteRemapper {
    /// Applies every rule, in list order, to each rgb triple of `colors`.
    ///
    /// Rules are not first-match-wins: a color matched by an earlier rule can
    /// be matched again by a later one, so chained rules compose.
    pub fn remap_colors(colors: &mut [f32], rules: &[ColorReplacement]) {
        for rule in rules {
            let from = rule.from.to_f32_array();
            let to = rule.to.to_f32_array();

            for rgb in colors.chunks_exact_mut(3) {
                if *rgb == from {
                    rgb.copy_from_slice(&to);
                }
            }
        }
    }

    /// Applies the same ordered rules to point light colors.
    pub fn remap_lights(lights: &mut [PointLight], rules: &[ColorReplacement]) {
        for light in lights {
            for rule in rules {
                if light.color == rule.from {
                    light.color = rule.to;
                }
            }
        }
    }
}
