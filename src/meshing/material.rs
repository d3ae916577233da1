//! # Material Module
//!
//! Material selection and the shared metadata ramp texture.
//!
//! The loader does not create renderer materials. It tells the consumer which
//! of four material setups a mesh needs, and provides the one texture the
//! metadata encoding relies on.

use image::{GrayImage, ImageFormat, Luma};
use std::io::Cursor;

use super::metadata::RAMP_WIDTH;
use crate::{
    config::LoaderConfig,
    error::{LoaderError, LoaderResult},
};

/// Light-map intensity applied when sampling the emissive channel.
pub const LIGHT_MAP_INTENSITY: f32 = 6.0;

/// The four material setups, keyed by which metadata a mesh carries.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MaterialVariant {
    /// Emissive and metal metadata.
    Full,
    /// Emissive metadata only.
    EmissiveOnly,
    /// Metal metadata only.
    MetalOnly,
    /// Neither.
    Plain,
}

/// Lighting model a material variant should be rendered with.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ShadingModel {
    Lambert,
    Standard,
}

/// What a consumer needs to build the renderer material for a variant.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MaterialDescriptor {
    pub shading: ShadingModel,
    /// Vertex colors are always used.
    pub vertex_colors: bool,
    /// Light map (the ramp sampled through the emissive channel) and its intensity.
    pub light_map_intensity: Option<f32>,
    /// Roughness and metalness maps (the ramp sampled through the metal channels).
    pub roughness_metalness_maps: bool,
}

impl MaterialVariant {
    pub fn select(has_emissive: bool, has_metal: bool) -> Self {
        match (has_emissive, has_metal) {
            (true, true) => MaterialVariant::Full,
            (true, false) => MaterialVariant::EmissiveOnly,
            (false, true) => MaterialVariant::MetalOnly,
            (false, false) => MaterialVariant::Plain,
        }
    }

    /// The material setup for this variant under the given feature toggles.
    pub fn descriptor(self, config: &LoaderConfig) -> MaterialDescriptor {
        let light_map = config
            .allow_emissive_channel
            .then_some(LIGHT_MAP_INTENSITY);

        let (shading, light_map_intensity, roughness_metalness_maps) = match self {
            MaterialVariant::Full if config.allow_metal_channel => {
                (ShadingModel::Standard, light_map, true)
            }
            MaterialVariant::Full => (ShadingModel::Lambert, light_map, false),
            MaterialVariant::EmissiveOnly => (ShadingModel::Lambert, light_map, false),
            MaterialVariant::MetalOnly => {
                (ShadingModel::Standard, None, config.allow_metal_channel)
            }
            MaterialVariant::Plain => (ShadingModel::Lambert, None, false),
        };

        MaterialDescriptor {
            shading,
            vertex_colors: true,
            light_map_intensity,
            roughness_metalness_maps,
        }
    }
}

/// The 256x1 grayscale ramp: texel `x` holds the value `x`.
///
/// Consumers should sample it with nearest filtering so the encoded texel
/// column is recovered exactly.
#[derive(Clone, Debug)]
pub struct RampTexture {
    image: GrayImage,
}

impl RampTexture {
    pub fn new() -> Self {
        RampTexture {
            image: GrayImage::from_fn(RAMP_WIDTH, 1, |x, _| Luma([x as u8])),
        }
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// The ramp encoded as PNG, for renderers that upload from image files.
    pub fn to_png(&self) -> LoaderResult<Vec<u8>> {
        let mut bytes = Cursor::new(Vec::new());
        self.image
            .write_to(&mut bytes, ImageFormat::Png)
            .map_err(|e| LoaderError::RampEncoding(e.to_string()))?;
        Ok(bytes.into_inner())
    }
}

impl Default for RampTexture {
    fn default() -> Self {
        Self::new()
    }
}
