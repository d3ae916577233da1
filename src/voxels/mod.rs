//! # Voxel Objects
//!
//! The input side of the loader: voxel objects as delivered by an object
//! source, their colors, and the read-only lattice the mesher queries.
//!
//! ## Axes
//!
//! Voxel object files store the vertical axis in `z`. Everything downstream of
//! [`Voxel::mesh_cell`] works in mesh axes, where `y` is vertical.

pub mod color;
pub mod face_direction;
pub mod lattice;
pub mod voxel;

pub use color::Rgb;
pub use face_direction::FaceDirection;
pub use lattice::VoxelLattice;
pub use voxel::{ObjectVars, Voxel, VoxelObject, MAX_LATTICE_EXTENT, NEW_LIGHTING_CUTOFF_MS};
