//! # Voxel Object Module
//!
//! The sparse voxel description consumed by the mesher. Objects are plain
//! deserialized data and are never mutated after loading; derived values such
//! as the effective lattice size are computed on demand.

use cgmath::Point3;
use serde::{Deserialize, Serialize};

use super::color::Rgb;
use crate::error::{LoaderError, LoaderResult};

/// Objects created at or before this timestamp (milliseconds since the Unix
/// epoch) use the legacy lighting encoding.
pub const NEW_LIGHTING_CUTOFF_MS: u64 = 1_696_771_084_976;

/// Largest accepted object size and voxel coordinate magnitude, in cells.
///
/// Keeps the meshed lattice (and its occupancy grid) bounded at roughly
/// `MAX_LATTICE_EXTENT³` cells.
pub const MAX_LATTICE_EXTENT: i32 = 1024;

/// A single unit cube of a voxel object.
///
/// Coordinates are stored in the object's native axes, where `y` and `z` are
/// swapped relative to the mesh's vertical axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Voxel {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Voxel color.
    pub c: Rgb,
    /// Light intensity, on a 0-5 scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gi: Option<f64>,
    /// Light radius.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gr: Option<f64>,
    /// Metal flag.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub me: bool,
}

impl Voxel {
    /// Creates an unlit, non-metal voxel at the given native coordinates.
    pub fn new(x: i32, y: i32, z: i32, c: Rgb) -> Self {
        Voxel {
            x: x as f64,
            y: y as f64,
            z: z as f64,
            c,
            gi: None,
            gr: None,
            me: false,
        }
    }

    /// Sets the light intensity and radius.
    pub fn with_light(mut self, intensity: Option<f64>, radius: Option<f64>) -> Self {
        self.gi = intensity;
        self.gr = radius;
        self
    }

    /// Marks the voxel as metal.
    pub fn with_metal(mut self) -> Self {
        self.me = true;
        self
    }

    /// The voxel's lattice cell in mesh axes (X, vertical Y, Z).
    ///
    /// Native coordinates are rounded half-up and the native `y`/`z` axes
    /// are swapped so that native `z` becomes the vertical axis.
    pub fn mesh_cell(&self) -> Point3<i32> {
        Point3::new(round_half_up(self.x), round_half_up(self.z), round_half_up(self.y))
    }

    /// Whether the voxel declares any light attribute.
    pub fn has_light(&self) -> bool {
        is_set(self.gi) || is_set(self.gr)
    }

    /// Whether the voxel should contribute a point light.
    pub fn emits_point_light(&self) -> bool {
        self.has_light() && self.gr.is_some_and(|radius| radius > 0.0)
    }
}

/// Object-level variables carried next to the voxel list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectVars {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_timestamp: Option<u64>,
}

/// A bounded voxel object, as supplied by an object source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoxelObject {
    pub voxels: Vec<Voxel>,
    /// Horizontal lattice extent. Odd values are rounded up to even.
    pub size: i32,
    #[serde(default)]
    pub vars: ObjectVars,
    /// Precompiled, compressed geometry shipped alongside the voxels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precnew: Option<String>,
    /// Opaque particle emitter descriptions passed through to the output.
    #[serde(default, alias = "particleEmitters", skip_serializing_if = "Vec::is_empty")]
    pub particle_emitters: Vec<serde_json::Value>,
}

impl VoxelObject {
    pub fn new(size: i32, voxels: Vec<Voxel>) -> Self {
        VoxelObject {
            voxels,
            size,
            vars: ObjectVars::default(),
            precnew: None,
            particle_emitters: Vec::new(),
        }
    }

    /// Parses an object from its JSON description.
    pub fn from_json(json: &str) -> LoaderResult<Self> {
        serde_json::from_str(json).map_err(|e| LoaderError::MalformedObject(e.to_string()))
    }

    /// Canonical serialized form, used as the content hash input.
    pub fn canonical_json(&self) -> LoaderResult<String> {
        serde_json::to_string(self).map_err(|e| LoaderError::MalformedObject(e.to_string()))
    }

    /// The lattice extent actually meshed: `size`, bumped to the next even value.
    pub fn effective_size(&self) -> LoaderResult<i32> {
        if self.size % 2 == 0 {
            return Ok(self.size);
        }

        self.size.checked_add(1).ok_or_else(|| {
            LoaderError::MalformedObject(format!("size {} cannot be rounded up", self.size))
        })
    }

    /// Objects created before the new-lighting cutoff, or with no creation
    /// timestamp at all, always encode maximum emission on lit voxels.
    pub fn uses_legacy_lighting(&self) -> bool {
        !self
            .vars
            .created_timestamp
            .is_some_and(|created| created > NEW_LIGHTING_CUTOFF_MS)
    }

    /// Rejects objects the mesher cannot process.
    ///
    /// `size` must lie in `1..=MAX_LATTICE_EXTENT` and every coordinate must
    /// be finite with a magnitude of at most [`MAX_LATTICE_EXTENT`].
    pub fn validate(&self) -> LoaderResult<()> {
        if !(1..=MAX_LATTICE_EXTENT).contains(&self.size) {
            return Err(LoaderError::MalformedObject(format!(
                "size must be in 1..={MAX_LATTICE_EXTENT}, got {}",
                self.size
            )));
        }

        let limit = MAX_LATTICE_EXTENT as f64;
        let in_bounds = |c: f64| c.is_finite() && c.abs() <= limit;
        if let Some(index) = self
            .voxels
            .iter()
            .position(|v| !(in_bounds(v.x) && in_bounds(v.y) && in_bounds(v.z)))
        {
            return Err(LoaderError::MalformedObject(format!(
                "voxel {index} has a coordinate outside ±{MAX_LATTICE_EXTENT}"
            )));
        }

        Ok(())
    }
}

fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

fn is_set(value: Option<f64>) -> bool {
    value.is_some_and(|v| v != 0.0 && !v.is_nan())
}
