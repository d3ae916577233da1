//! # Voxel Object Loader
//!
//! The owning service: turns voxel objects (given directly or fetched by id)
//! into ready-to-render meshes, going through both cache tiers.
//!
//! ## Request flow
//! 1. Normalize the request options and derive the variant key
//! 2. On a variant miss, fetch compiled geometry (decoded or meshed) from the
//!    compiled tier and deep-copy it
//! 3. Remap the palette on the copy, then scale and assemble the mesh
//! 4. Attach the material variant, lights and particle emitters
//!
//! Changing a channel toggle invalidates every finished variant. Compiled
//! geometry does not depend on the toggles and is kept.

mod source;

pub use source::{InMemoryObjectSource, ObjectSource};

use std::{collections::HashMap, sync::Arc};

use log::{info, warn};
use parking_lot::Mutex;

use crate::{
    cache::{
        CompiledCacheStats, CompiledObjectCache, ContentHash, Lz4PayloadDecoder,
        PrecompiledDecoder, Variant, VariantCache, VariantCacheStats,
    },
    config::{LoaderConfig, NormalizedOptions, RequestOptions},
    error::{LoaderError, LoaderResult},
    meshing::{
        CompiledGeometry, MaterialDescriptor, MaterialVariant, MeshAssembly, MeshBuffer,
        PaletteRemapper, PointLight, RampTexture,
    },
    voxels::VoxelObject,
};

/// A loaded voxel object, ready to hand to a renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct VoxelMesh {
    pub mesh: MeshBuffer,
    pub material: MaterialVariant,
    pub descriptor: MaterialDescriptor,
    pub lights: Vec<PointLight>,
    pub emitters: Vec<serde_json::Value>,
    pub opacity: f32,
    pub transparent: bool,
}

impl VoxelMesh {
    /// Sets the material opacity; anything other than 1 renders transparent.
    pub fn set_opacity(&mut self, opacity: f32) {
        if opacity == self.opacity {
            return;
        }

        self.opacity = opacity;
        self.transparent = opacity != 1.0;
    }
}

pub struct VoxelObjectLoader {
    config: LoaderConfig,
    compiled: CompiledObjectCache,
    variants: VariantCache,
    decoder: Box<dyn PrecompiledDecoder>,
    source: Option<Box<dyn ObjectSource>>,
    remote_objects: Mutex<HashMap<String, Arc<VoxelObject>>>,
    ramp: RampTexture,
}

impl VoxelObjectLoader {
    /// Creates a loader without validating `config`.
    ///
    /// A compiled cache capacity of zero falls back to an unbounded cache.
    /// Use [`VoxelObjectLoader::try_new`] to reject it instead.
    pub fn new(config: LoaderConfig) -> Self {
        info!("Creating voxel object loader with {config:?}");
        if config.compiled_cache_capacity == Some(0) {
            warn!("compiled_cache_capacity of 0 requested, keeping every compiled object");
        }

        VoxelObjectLoader {
            compiled: CompiledObjectCache::new(config.compiled_cache_capacity),
            variants: VariantCache::new(),
            decoder: Box::new(Lz4PayloadDecoder),
            source: None,
            remote_objects: Mutex::new(HashMap::new()),
            ramp: RampTexture::new(),
            config,
        }
    }

    /// Creates a loader after checking `config` with [`LoaderConfig::validate`].
    pub fn try_new(config: LoaderConfig) -> LoaderResult<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Replaces the decoder used for precompiled payloads.
    pub fn with_decoder(mut self, decoder: impl PrecompiledDecoder + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    /// Sets the source [`load_by_id`](Self::load_by_id) fetches from.
    pub fn with_source(mut self, source: impl ObjectSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Loads `object` with the given options.
    ///
    /// Concurrent loads of the same object and options share a single build;
    /// every caller receives its own copy of the mesh.
    pub async fn load(
        &self,
        object: &VoxelObject,
        options: &RequestOptions,
    ) -> LoaderResult<VoxelMesh> {
        object.validate()?;
        let options = options.normalize()?;
        let key = ContentHash::of_variant(object, &options)?;

        let options = &options;
        let variant = self
            .variants
            .get_or_build(key, move || self.build_variant(object, options))
            .await?;

        Ok(self.finish(variant))
    }

    /// Loads the object registered under `id` in the configured source.
    ///
    /// Fetched objects are remembered, so the source sees each id once.
    pub async fn load_by_id(&self, id: &str, options: &RequestOptions) -> LoaderResult<VoxelMesh> {
        let object = self.fetch_object(id).await?;
        self.load(&object, options).await
    }

    async fn fetch_object(&self, id: &str) -> LoaderResult<Arc<VoxelObject>> {
        let known = self.remote_objects.lock().get(id).cloned();
        if let Some(object) = known {
            return Ok(object);
        }

        let source = self
            .source
            .as_ref()
            .ok_or_else(|| LoaderError::LookupMiss(id.to_string()))?;

        let object = Arc::new(source.fetch(id).await?);
        info!("Fetched voxel object `{id}` ({} voxels)", object.voxels.len());
        self.remote_objects
            .lock()
            .insert(id.to_string(), object.clone());

        Ok(object)
    }

    async fn build_variant(
        &self,
        object: &VoxelObject,
        options: &NormalizedOptions,
    ) -> LoaderResult<Variant> {
        let compiled = self.compiled.get(object, self.decoder.as_ref()).await?;

        // The compiled geometry is shared by every variant of the object.
        let mut geometry = CompiledGeometry::clone(&compiled);
        PaletteRemapper::remap_colors(&mut geometry.colors, &options.color_replacements);
        PaletteRemapper::remap_lights(&mut geometry.lights, &options.color_replacements);

        let mesh = MeshAssembly::assemble(&geometry, options.scale, self.config.channel_toggles())?;

        Ok(Variant {
            mesh,
            lights: geometry.lights,
            particle_emitters: geometry.particle_emitters,
        })
    }

    fn finish(&self, variant: Variant) -> VoxelMesh {
        let material = MaterialVariant::select(variant.mesh.has_emissive, variant.mesh.has_metal);
        let emitters = if self.config.allow_emitters {
            variant.particle_emitters
        } else {
            Vec::new()
        };

        VoxelMesh {
            descriptor: material.descriptor(&self.config),
            material,
            mesh: variant.mesh,
            lights: variant.lights,
            emitters,
            opacity: 1.0,
            transparent: false,
        }
    }

    pub fn set_allow_emissive_channel(&mut self, allow: bool) {
        if self.config.allow_emissive_channel != allow {
            self.config.allow_emissive_channel = allow;
            self.invalidate_variants();
        }
    }

    pub fn set_allow_metal_channel(&mut self, allow: bool) {
        if self.config.allow_metal_channel != allow {
            self.config.allow_metal_channel = allow;
            self.invalidate_variants();
        }
    }

    /// Only affects what is returned; cached variants keep their emitters.
    pub fn set_allow_emitters(&mut self, allow: bool) {
        self.config.allow_emitters = allow;
    }

    fn invalidate_variants(&mut self) {
        info!(
            "Channel toggles changed, dropping {} cached variants",
            self.variants.len()
        );
        self.variants.clear();
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// The ramp texture every metadata channel samples.
    pub fn ramp_texture(&self) -> &RampTexture {
        &self.ramp
    }

    pub fn compiled_stats(&self) -> CompiledCacheStats {
        self.compiled.stats()
    }

    pub fn variant_stats(&self) -> VariantCacheStats {
        self.variants.stats()
    }

    pub fn cached_variants(&self) -> usize {
        self.variants.len()
    }

    pub fn cached_objects(&self) -> usize {
        self.compiled.len()
    }
}

impl Default for VoxelObjectLoader {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxels::{Rgb, Voxel};
    use futures::future::BoxFuture;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn lamp_object() -> VoxelObject {
        let mut object = VoxelObject::new(
            4,
            vec![
                Voxel::new(0, 0, 0, Rgb::new(255, 0, 255)).with_light(Some(2.0), Some(3.0)),
                Voxel::new(1, 0, 0, Rgb::new(30, 30, 30)).with_metal(),
            ],
        );
        object.particle_emitters = vec![json!({"kind": "sparks"})];
        object
    }

    struct CountingSource {
        inner: InMemoryObjectSource,
        fetches: Arc<AtomicUsize>,
    }

    impl ObjectSource for CountingSource {
        fn fetch<'a>(&'a self, id: &'a str) -> BoxFuture<'a, LoaderResult<VoxelObject>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch(id)
        }
    }

    #[test]
    fn load_selects_material_from_metadata() {
        let loader = VoxelObjectLoader::default();
        let mesh = pollster::block_on(loader.load(&lamp_object(), &RequestOptions::default()))
            .unwrap();

        assert_eq!(mesh.material, MaterialVariant::Full);
        assert!(mesh.descriptor.roughness_metalness_maps);
        assert_eq!(mesh.lights.len(), 1);
        assert_eq!(mesh.emitters.len(), 1);
        assert_eq!((mesh.opacity, mesh.transparent), (1.0, false));
    }

    #[test]
    fn palette_applies_to_vertices_and_lights() {
        let loader = VoxelObjectLoader::default();
        let options = RequestOptions {
            color: Some("#00ff00".to_string()),
            ..Default::default()
        };

        let mesh = pollster::block_on(loader.load(&lamp_object(), &options)).unwrap();
        assert_eq!(mesh.lights[0].color, Rgb::new(0, 255, 0));
        assert!(mesh.mesh.colors.contains(&[0.0, 1.0, 0.0]));
        assert!(!mesh.mesh.colors.contains(&[1.0, 0.0, 1.0]));
    }

    #[test]
    fn toggle_change_drops_variants_but_not_geometry() {
        let mut loader = VoxelObjectLoader::default();
        let object = lamp_object();
        pollster::block_on(loader.load(&object, &RequestOptions::default())).unwrap();
        assert_eq!(loader.cached_variants(), 1);

        loader.set_allow_metal_channel(false);
        assert_eq!(loader.cached_variants(), 0);
        assert_eq!(loader.cached_objects(), 1);

        let mesh = pollster::block_on(loader.load(&object, &RequestOptions::default())).unwrap();
        assert!(mesh.mesh.roughness_uvs.is_none());
        assert!(mesh.mesh.metalness_uvs.is_none());
        assert!(mesh.mesh.emissive_uvs.is_some());
        assert!(!mesh.descriptor.roughness_metalness_maps);
        assert_eq!(loader.compiled_stats().compilations, 1);
    }

    #[test]
    fn disabled_emitters_are_dropped_from_output() {
        let mut loader = VoxelObjectLoader::default();
        loader.set_allow_emitters(false);

        let mesh = pollster::block_on(loader.load(&lamp_object(), &RequestOptions::default()))
            .unwrap();
        assert!(mesh.emitters.is_empty());
    }

    #[test]
    fn invalid_requests_leave_no_entry() {
        let loader = VoxelObjectLoader::default();

        let bad_scale = RequestOptions::default().with_scale(0.0);
        assert!(matches!(
            pollster::block_on(loader.load(&lamp_object(), &bad_scale)),
            Err(LoaderError::InvalidOptions(_))
        ));

        let empty = VoxelObject::new(0, Vec::new());
        assert!(matches!(
            pollster::block_on(loader.load(&empty, &RequestOptions::default())),
            Err(LoaderError::MalformedObject(_))
        ));
        assert_eq!(loader.cached_variants(), 0);
    }

    #[test]
    fn fetched_objects_are_memoized() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let inner = InMemoryObjectSource::new();
        inner.insert("lamp", &lamp_object()).unwrap();

        let loader = VoxelObjectLoader::default().with_source(CountingSource {
            inner,
            fetches: fetches.clone(),
        });

        for scale in [1.0, 2.0] {
            let options = RequestOptions::default().with_scale(scale);
            pollster::block_on(loader.load_by_id("lamp", &options)).unwrap();
        }

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert_eq!(loader.cached_variants(), 2);
        assert!(matches!(
            pollster::block_on(loader.load_by_id("missing", &RequestOptions::default())),
            Err(LoaderError::LookupMiss(_))
        ));
    }

    #[test]
    fn load_by_id_without_source_misses() {
        let loader = VoxelObjectLoader::default();
        assert_eq!(
            pollster::block_on(loader.load_by_id("lamp", &RequestOptions::default())),
            Err(LoaderError::LookupMiss("lamp".to_string()))
        );
    }

    #[test]
    fn opacity_controls_transparency() {
        let loader = VoxelObjectLoader::default();
        let mut mesh = pollster::block_on(loader.load(&lamp_object(), &RequestOptions::default()))
            .unwrap();

        mesh.set_opacity(0.5);
        assert!(mesh.transparent);
        mesh.set_opacity(1.0);
        assert!(!mesh.transparent);
    }

    #[test]
    fn zero_capacity_config_is_rejected() {
        let config = LoaderConfig {
            compiled_cache_capacity: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            VoxelObjectLoader::try_new(config.clone()),
            Err(LoaderError::Config(_))
        ));

        let bounded = LoaderConfig {
            compiled_cache_capacity: Some(4),
            ..config
        };
        let loader = VoxelObjectLoader::try_new(bounded).unwrap();
        assert_eq!(loader.config().compiled_cache_capacity, Some(4));
    }
}
