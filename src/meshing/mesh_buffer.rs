//! # Mesh Buffer Module
//!
//! Final mesh assembly. Packs compiled geometry into per-attribute buffers
//! ready for upload, applies the request's uniform scale and recomputes
//! smooth vertex normals.

use cgmath::{InnerSpace, Vector3, Zero};

use super::{compiled::CompiledGeometry, metadata::MetadataEncoder};
use crate::error::{LoaderError, LoaderResult};

/// Which optional metadata channels the assembled mesh may carry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChannelToggles {
    pub emissive: bool,
    pub metal: bool,
}

impl Default for ChannelToggles {
    fn default() -> Self {
        ChannelToggles {
            emissive: true,
            metal: true,
        }
    }
}

/// An immutable-by-convention, engine-facing mesh.
///
/// The metadata channels are `None` when the source has no such metadata or
/// the corresponding channel toggle is disabled; a disabled channel is never
/// emitted as zeros.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshBuffer {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub emissive_uvs: Option<Vec<[f32; 2]>>,
    pub roughness_uvs: Option<Vec<[f32; 2]>>,
    pub metalness_uvs: Option<Vec<[f32; 2]>>,
    /// Whether the source geometry carries emissive metadata, regardless of toggles.
    pub has_emissive: bool,
    /// Whether the source geometry carries metal metadata, regardless of toggles.
    pub has_metal: bool,
}

impl MeshBuffer {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    pub fn normal_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.normals)
    }

    pub fn color_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.colors)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Per-vertex emission (0..=1) as recovered from the ramp, for consumers
    /// that take scalar vertex attributes directly.
    pub fn emissive_levels(&self) -> Option<Vec<f32>> {
        decode_channel(self.emissive_uvs.as_deref())
    }

    /// Per-vertex roughness (0..=1).
    pub fn roughness_levels(&self) -> Option<Vec<f32>> {
        decode_channel(self.roughness_uvs.as_deref())
    }

    /// Per-vertex metalness (0..=1).
    pub fn metalness_levels(&self) -> Option<Vec<f32>> {
        decode_channel(self.metalness_uvs.as_deref())
    }
}

fn decode_channel(uvs: Option<&[[f32; 2]]>) -> Option<Vec<f32>> {
    uvs.map(|uvs| uvs.iter().map(|uv| MetadataEncoder::decode(uv[0])).collect())
}

pub struct MeshAssembly;

impl MeshAssembly {
    /// Builds the final mesh from (already palette-remapped) geometry.
    ///
    /// # Arguments
    /// * `geometry` - Compiled geometry, either freshly meshed or decoded from a payload
    /// * `scale` - Uniform factor applied to positions only
    /// * `channels` - Which metadata channels the mesh may carry
    ///
    /// # Returns
    /// The assembled mesh, or `DecodeFailure` when the geometry's buffers do
    /// not describe a consistent triangle list.
    pub fn assemble(
        geometry: &CompiledGeometry,
        scale: f32,
        channels: ChannelToggles,
    ) -> LoaderResult<MeshBuffer> {
        geometry.check_shape()?;

        let positions: Vec<[f32; 3]> = triples(&geometry.positions, "positions")?
            .iter()
            .map(|p| p.map(|c| c * scale))
            .collect();

        let emissive_uvs = if geometry.has_emissive && channels.emissive {
            Some(pairs(&geometry.emissive_uvs, "emissive uvs")?)
        } else {
            None
        };

        let (roughness_uvs, metalness_uvs) = if geometry.has_metal && channels.metal {
            (
                Some(pairs(&geometry.roughness_uvs, "roughness uvs")?),
                Some(pairs(&geometry.metalness_uvs, "metalness uvs")?),
            )
        } else {
            (None, None)
        };

        let mut mesh = MeshBuffer {
            normals: triples(&geometry.normals, "normals")?.to_vec(),
            colors: triples(&geometry.colors, "colors")?.to_vec(),
            indices: geometry.indices.clone(),
            positions,
            emissive_uvs,
            roughness_uvs,
            metalness_uvs,
            has_emissive: geometry.has_emissive,
            has_metal: geometry.has_metal,
        };

        Self::compute_vertex_normals(&mut mesh);

        Ok(mesh)
    }

    /// Replaces the normals with area-weighted averages of adjacent triangle
    /// normals. Vertices touched by no triangle get a zero normal.
    pub fn compute_vertex_normals(mesh: &mut MeshBuffer) {
        let mut accumulated = vec![Vector3::<f32>::zero(); mesh.positions.len()];
        let position = |i: u32| Vector3::from(mesh.positions[i as usize]);

        for triangle in mesh.indices.chunks_exact(3) {
            let (a, b, c) = (triangle[0], triangle[1], triangle[2]);
            let face_normal = (position(c) - position(b)).cross(position(a) - position(b));

            for i in [a, b, c] {
                accumulated[i as usize] += face_normal;
            }
        }

        mesh.normals = accumulated
            .into_iter()
            .map(|n| {
                if n.magnitude2() > 0.0 {
                    n.normalize().into()
                } else {
                    [0.0; 3]
                }
            })
            .collect();
    }
}

fn triples<'a>(flat: &'a [f32], name: &str) -> LoaderResult<&'a [[f32; 3]]> {
    bytemuck::try_cast_slice(flat)
        .map_err(|e| LoaderError::DecodeFailure(format!("{name} are not xyz triples: {e}")))
}

fn pairs(flat: &[f32], name: &str) -> LoaderResult<Vec<[f32; 2]>> {
    bytemuck::try_cast_slice::<f32, [f32; 2]>(flat)
        .map(<[[f32; 2]]>::to_vec)
        .map_err(|e| LoaderError::DecodeFailure(format!("{name} are not uv pairs: {e}")))
}
