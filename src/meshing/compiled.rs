//! # Compiled Geometry Module
//!
//! Compiled geometry: the face-culled output of the mesher, or its decoded
//! precompiled equivalent.

use serde::{Deserialize, Serialize};

use crate::{
    error::{LoaderError, LoaderResult},
    voxels::Rgb,
};

/// A point light extracted from a light-emitting voxel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointLight {
    /// Mesh-space cell of the emitting voxel.
    pub x: u32,
    pub y: u32,
    pub z: u32,
    /// Declared intensity, if any.
    #[serde(default)]
    pub intensity: Option<f64>,
    pub radius: f64,
    pub color: Rgb,
}

/// Flat, engine-agnostic geometry buffers for one voxel object.
///
/// Positions, normals and colors are xyz / rgb triples; the three metadata
/// channels are uv pairs. Every face contributes four vertices and six
/// indices.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledGeometry {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub colors: Vec<f32>,
    pub emissive_uvs: Vec<f32>,
    pub roughness_uvs: Vec<f32>,
    pub metalness_uvs: Vec<f32>,
    pub indices: Vec<u32>,
    pub has_emissive: bool,
    pub has_metal: bool,
    #[serde(default)]
    pub lights: Vec<PointLight>,
    #[serde(default)]
    pub particle_emitters: Vec<serde_json::Value>,
}

impl CompiledGeometry {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn face_count(&self) -> usize {
        self.indices.len() / 6
    }

    /// Basic shape checks for geometry that did not come from the mesher.
    ///
    /// Verifies buffer lengths agree with each other and that every index
    /// references an existing vertex. Geometric invariants are trusted.
    pub fn check_shape(&self) -> LoaderResult<()> {
        let fail = |msg: String| Err(LoaderError::DecodeFailure(msg));

        if self.positions.len() % 3 != 0 {
            return fail(format!("{} position components", self.positions.len()));
        }

        let vertices = self.vertex_count();
        for (name, buffer, width) in [
            ("normals", &self.normals, 3),
            ("colors", &self.colors, 3),
            ("emissive uvs", &self.emissive_uvs, 2),
            ("roughness uvs", &self.roughness_uvs, 2),
            ("metalness uvs", &self.metalness_uvs, 2),
        ] {
            if buffer.len() != vertices * width {
                return fail(format!(
                    "{name} has {} components for {vertices} vertices",
                    buffer.len()
                ));
            }
        }

        if self.indices.len() % 3 != 0 {
            return fail(format!("{} indices is not a triangle list", self.indices.len()));
        }

        if let Some(index) = self.indices.iter().find(|&&i| i as usize >= vertices) {
            return fail(format!("index {index} out of range for {vertices} vertices"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> CompiledGeometry {
        CompiledGeometry {
            positions: vec![0.0; 9],
            normals: vec![0.0; 9],
            colors: vec![1.0; 9],
            emissive_uvs: vec![0.0; 6],
            roughness_uvs: vec![0.0; 6],
            metalness_uvs: vec![0.0; 6],
            indices: vec![0, 1, 2],
            ..Default::default()
        }
    }

    #[test]
    fn consistent_geometry_passes() {
        assert!(triangle().check_shape().is_ok());
        assert!(CompiledGeometry::default().check_shape().is_ok());
    }

    #[test]
    fn out_of_range_index_fails() {
        let mut geometry = triangle();
        geometry.indices = vec![0, 1, 3];
        assert!(matches!(geometry.check_shape(), Err(LoaderError::DecodeFailure(_))));
    }

    #[test]
    fn mismatched_channel_fails() {
        let mut geometry = triangle();
        geometry.metalness_uvs.pop();
        assert!(geometry.check_shape().is_err());
    }
}
