//! # Cache Module
//!
//! Two-tier, content-addressed caching of loaded voxel objects.
//!
//! - [`CompiledObjectCache`]: one [`CompiledGeometry`](crate::meshing::CompiledGeometry)
//!   per distinct object, shared by every variant of it
//! - [`VariantCache`]: one finished [`Variant`] per (object, options) pair, built once
//!   even when requested concurrently

mod compiled_cache;
mod content_hash;
mod decoder;
mod variant_cache;

pub use compiled_cache::{CompiledCacheStats, CompiledObjectCache};
pub use content_hash::ContentHash;
pub use decoder::{encode_precompiled, Lz4PayloadDecoder, PrecompiledDecoder};
pub use variant_cache::{Variant, VariantCache, VariantCacheStats, VariantState};
