//! # Meshing Module
//!
//! Mesh generation for voxel objects.
//!
//! This module converts voxel objects into engine-agnostic triangle meshes.
//!
//! # Architecture
//! - [`FaceMesher`]: face-culling pass producing [`CompiledGeometry`]
//! - [`MetadataEncoder`]: packs emission, roughness and metalness into ramp texture coordinates
//! - [`PaletteRemapper`]: exact-match color substitution on compiled colors and lights
//! - [`MeshAssembly`]: scaling, channel selection and normal recomputation into a [`MeshBuffer`]
//! - [`MaterialVariant`]: the four-way material table and the shared [`RampTexture`]
//!
//! # Pipeline
//! ```no_run
//! use voxel_object_loader::meshing::{ChannelToggles, FaceMesher, MeshAssembly};
//! use voxel_object_loader::voxels::{Rgb, Voxel, VoxelObject};
//!
//! let object = VoxelObject::new(2, vec![Voxel::new(0, 0, 0, Rgb::new(255, 0, 0))]);
//! let compiled = FaceMesher::compile(&object).unwrap();
//! let mesh = MeshAssembly::assemble(&compiled, 1.0, ChannelToggles::default()).unwrap();
//! assert_eq!(mesh.triangle_count(), 12);
//! ```

mod compiled;
mod face_mesher;
mod material;
mod mesh_buffer;
mod metadata;
mod palette;

pub use compiled::{CompiledGeometry, PointLight};
pub use face_mesher::FaceMesher;
pub use material::{
    MaterialDescriptor, MaterialVariant, RampTexture, ShadingModel, LIGHT_MAP_INTENSITY,
};
pub use mesh_buffer::{ChannelToggles, MeshAssembly, MeshBuffer};
pub use metadata::{
    MetadataEncoder, MetadataUvs, VoxelMetadata, METAL_METALNESS, METAL_ROUGHNESS, RAMP_WIDTH,
};
pub use palette::{ColorReplacement, PaletteRemapper};
