//! # Configuration
//!
//! Loader-wide feature toggles and per-request options. Both are plain serde
//! structs so they can be read from JSON alongside voxel objects.

use serde::{Deserialize, Serialize};

use crate::{
    error::{LoaderError, LoaderResult},
    meshing::{ChannelToggles, ColorReplacement},
    voxels::{
        color::{PRIMARY_PLACEHOLDER, SECONDARY_PLACEHOLDER},
        Rgb,
    },
};

/// Color value meaning "leave the placeholder alone" in the legacy shorthand.
pub const DEFAULT_COLOR: &str = "default";

/// Loader-wide feature toggles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Emit the emissive metadata channel.
    pub allow_emissive_channel: bool,
    /// Emit the roughness and metalness metadata channels.
    pub allow_metal_channel: bool,
    /// Pass particle emitters through to loaded meshes.
    pub allow_emitters: bool,
    /// Bound on the number of compiled objects kept; `None` keeps everything.
    pub compiled_cache_capacity: Option<usize>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            allow_emissive_channel: true,
            allow_metal_channel: true,
            allow_emitters: true,
            compiled_cache_capacity: None,
        }
    }
}

impl LoaderConfig {
    pub fn from_json_str(json: &str) -> LoaderResult<Self> {
        let config: LoaderConfig =
            serde_json::from_str(json).map_err(|e| LoaderError::Config(e.to_string()))?;
        config.validate()?;

        Ok(config)
    }

    /// Rejects settings that cannot be honored. A compiled cache capacity
    /// of zero is an error rather than a silent switch to unbounded.
    pub fn validate(&self) -> LoaderResult<()> {
        if self.compiled_cache_capacity == Some(0) {
            return Err(LoaderError::Config(
                "compiled_cache_capacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn channel_toggles(&self) -> ChannelToggles {
        ChannelToggles {
            emissive: self.allow_emissive_channel,
            metal: self.allow_metal_channel,
        }
    }
}

/// Options for a single load request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RequestOptions {
    /// Uniform scale applied to every position.
    pub scale: f32,
    /// Ordered palette substitutions.
    pub color_replacements: Vec<ColorReplacement>,
    /// Legacy replacement for the primary placeholder color.
    pub color: Option<String>,
    /// Legacy replacement for the secondary placeholder color.
    pub color2: Option<String>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        RequestOptions {
            scale: 1.0,
            color_replacements: Vec::new(),
            color: None,
            color2: None,
        }
    }
}

/// Request options after legacy shorthand expansion; this is what gets hashed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NormalizedOptions {
    pub scale: f32,
    pub color_replacements: Vec<ColorReplacement>,
}

impl RequestOptions {
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_replacement(mut self, from: Rgb, to: Rgb) -> Self {
        self.color_replacements.push(ColorReplacement::new(from, to));
        self
    }

    /// Expands the legacy `color` / `color2` shorthand and validates the scale.
    ///
    /// The shorthand only applies when no explicit replacements are given,
    /// and each value only when it is a well-formed `#rrggbb` other than
    /// `"default"`; anything else is ignored.
    pub fn normalize(&self) -> LoaderResult<NormalizedOptions> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(LoaderError::InvalidOptions(format!(
                "scale must be a positive number, got {}",
                self.scale
            )));
        }

        let mut color_replacements = self.color_replacements.clone();
        if color_replacements.is_empty() {
            let shorthand = [
                (PRIMARY_PLACEHOLDER, self.color.as_deref()),
                (SECONDARY_PLACEHOLDER, self.color2.as_deref()),
            ];

            for (placeholder, value) in shorthand {
                if let Some(to) = value.filter(|v| *v != DEFAULT_COLOR).and_then(Rgb::parse_hex) {
                    color_replacements.push(ColorReplacement::new(placeholder, to));
                }
            }
        }

        Ok(NormalizedOptions {
            scale: self.scale,
            color_replacements,
        })
    }
}
