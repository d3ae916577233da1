//! # Metadata Encoding Module
//!
//! Per-vertex metadata encoding.
//!
//! Emission, roughness and metalness are packed into texture coordinates that
//! address a shared 256x1 grayscale ramp: the texel column holds the scalar,
//! and the face's base UV keeps the sample inside that column.

use crate::voxels::Voxel;

/// Width of the grayscale ramp, in texels.
pub const RAMP_WIDTH: u32 = 256;

/// Roughness assigned to metal voxels, as a fraction of full scale.
pub const METAL_ROUGHNESS: f32 = 0.65;
/// Metalness assigned to metal voxels, as a fraction of full scale.
pub const METAL_METALNESS: f32 = 0.75;

/// Light intensity that maps to full emission.
const MAX_LIGHT_INTENSITY: f64 = 5.0;
const FULL_SCALE: f32 = 255.0;

/// Ramp values for a single voxel, shared by all of its vertices.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VoxelMetadata {
    pub light_level: f32,
    pub roughness: f32,
    pub metalness: f32,
}

/// Encoded auxiliary texture coordinates for one vertex.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MetadataUvs {
    pub emissive: [f32; 2],
    pub roughness: [f32; 2],
    pub metalness: [f32; 2],
}

pub struct MetadataEncoder;

impl MetadataEncoder {
    /// Computes the ramp values for a voxel.
    ///
    /// Legacy-lighting objects always emit at full level when the voxel
    /// declares any light attribute. A missing or non-numeric intensity also
    /// maps to full level.
    pub fn voxel_metadata(voxel: &Voxel, legacy_lighting: bool) -> VoxelMetadata {
        let light_level = if !voxel.has_light() {
            0.0
        } else if legacy_lighting {
            FULL_SCALE
        } else {
            Self::light_level(voxel.gi)
        };

        let (roughness, metalness) = if voxel.me {
            (
                (METAL_ROUGHNESS * FULL_SCALE).floor(),
                (METAL_METALNESS * FULL_SCALE).floor(),
            )
        } else {
            (FULL_SCALE, 0.0)
        };

        VoxelMetadata {
            light_level,
            roughness,
            metalness,
        }
    }

    fn light_level(intensity: Option<f64>) -> f32 {
        match intensity {
            Some(gi) if gi.is_finite() => {
                (FULL_SCALE as f64 * (gi / MAX_LIGHT_INTENSITY)).clamp(0.0, FULL_SCALE as f64) as f32
            }
            _ => FULL_SCALE,
        }
    }

    /// Encodes a ramp value against a face corner's base UV.
    pub fn encode(value: f32, base_uv: [f32; 2]) -> [f32; 2] {
        [(value + base_uv[0]) / RAMP_WIDTH as f32, base_uv[1]]
    }

    /// Encodes all three channels for one vertex.
    pub fn encode_vertex(metadata: &VoxelMetadata, base_uv: [f32; 2]) -> MetadataUvs {
        MetadataUvs {
            emissive: Self::encode(metadata.light_level, base_uv),
            roughness: Self::encode(metadata.roughness, base_uv),
            metalness: Self::encode(metadata.metalness, base_uv),
        }
    }

    /// The ramp texel a nearest-filtered sample at `u` lands on.
    pub fn texel(u: f32) -> u32 {
        ((u * RAMP_WIDTH as f32).floor().max(0.0) as u32).min(RAMP_WIDTH - 1)
    }

    /// The scalar (0..=1) a renderer recovers by sampling the ramp at `u`.
    pub fn decode(u: f32) -> f32 {
        Self::texel(u) as f32 / FULL_SCALE
    }
}
