#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Object Loader
//!
//! Turns sparse voxel objects (positioned unit cubes carrying a color, an
//! optional light and a metal flag) into engine-agnostic triangle meshes.
//!
//! ## Key Modules
//!
//! * `voxels` - The voxel object model and the occupancy lattice used for culling
//! * `meshing` - Face culling, metadata encoding, palette remapping and mesh assembly
//! * `cache` - Content-addressed caches for compiled geometry and finished meshes
//! * `loader` - The service tying the caches together behind `load` / `load_by_id`
//!
//! ## Usage
//!
//! ```no_run
//! use voxel_object_loader::{LoaderConfig, RequestOptions, VoxelObjectLoader};
//! use voxel_object_loader::voxels::{Rgb, Voxel, VoxelObject};
//!
//! voxel_object_loader::init_logger();
//!
//! let loader = VoxelObjectLoader::new(LoaderConfig::default());
//! let object = VoxelObject::new(2, vec![Voxel::new(0, 0, 0, Rgb::new(200, 40, 40))]);
//! let mesh = pollster::block_on(loader.load(&object, &RequestOptions::default())).unwrap();
//! assert_eq!(mesh.mesh.triangle_count(), 12);
//! ```
//!
//! ## Output
//!
//! Each visible voxel face becomes one quad (two triangles). Emission,
//! roughness and metalness are packed into texture coordinates that index a
//! shared 256x1 ramp texture, so a renderer can bind them as ordinary maps.

use log::info;

pub mod cache;
pub mod config;
pub mod error;
pub mod loader;
pub mod meshing;
pub mod voxels;

pub use config::{LoaderConfig, RequestOptions};
pub use error::{LoaderError, LoaderResult};
pub use loader::{InMemoryObjectSource, ObjectSource, VoxelMesh, VoxelObjectLoader};

/// Installs a stdout logger filtered by `RUST_LOG`.
///
/// Does nothing if a logger is already installed.
pub fn init_logger() {
    let mut log_builder = env_logger::Builder::new();
    let installed = log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .try_init()
        .is_ok();

    if installed {
        info!("Logger initialized");
    }
}
