//! # Compiled Cache Module
//!
//! Memoized compiled geometry, keyed by the content hash of the voxel object.

use std::{
    num::NonZeroUsize,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use log::{debug, info};
use lru::LruCache;
use parking_lot::Mutex;

use super::{content_hash::ContentHash, decoder::PrecompiledDecoder};
use crate::{
    error::LoaderResult,
    meshing::{CompiledGeometry, FaceMesher},
    voxels::VoxelObject,
};

/// Counters describing how compiled geometry requests were satisfied.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CompiledCacheStats {
    pub hits: usize,
    pub compilations: usize,
    pub decodes: usize,
}

/// Stores one [`CompiledGeometry`] per distinct voxel object.
///
/// Without a capacity the cache only grows, which matches a process that
/// loads a bounded catalogue of objects. With a capacity, the least recently
/// used entry is evicted.
pub struct CompiledObjectCache {
    entries: Mutex<LruCache<ContentHash, Arc<CompiledGeometry>>>,
    hits: AtomicUsize,
    compilations: AtomicUsize,
    decodes: AtomicUsize,
}

impl CompiledObjectCache {
    pub fn new(capacity: Option<usize>) -> Self {
        let entries = match capacity.and_then(NonZeroUsize::new) {
            Some(capacity) => LruCache::new(capacity),
            None => LruCache::unbounded(),
        };

        CompiledObjectCache {
            entries: Mutex::new(entries),
            hits: AtomicUsize::new(0),
            compilations: AtomicUsize::new(0),
            decodes: AtomicUsize::new(0),
        }
    }

    /// Returns the compiled geometry for `object`, decoding its precompiled
    /// payload or running the mesher on a miss.
    ///
    /// # Arguments
    /// * `object` - The validated voxel object, hashed as supplied
    /// * `decoder` - Decoder used when the object ships a precompiled payload
    ///
    /// # Returns
    /// A shared handle to the cached geometry. Failures are not cached.
    pub async fn get(
        &self,
        object: &VoxelObject,
        decoder: &dyn PrecompiledDecoder,
    ) -> LoaderResult<Arc<CompiledGeometry>> {
        let key = ContentHash::of_object(object)?;

        let cached = self.entries.lock().get(&key).cloned();
        if let Some(geometry) = cached {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Compiled geometry cache hit for {key}");
            return Ok(geometry);
        }

        let geometry = match &object.precnew {
            Some(payload) => {
                self.decodes.fetch_add(1, Ordering::Relaxed);
                let geometry = decoder.decode(payload).await?;
                geometry.check_shape()?;
                info!(
                    "Decoded precompiled geometry {key}: {} faces, {} lights",
                    geometry.face_count(),
                    geometry.lights.len()
                );
                geometry
            }
            None => {
                self.compilations.fetch_add(1, Ordering::Relaxed);
                let geometry = FaceMesher::compile(object)?;
                info!(
                    "Compiled voxel object {key}: {} faces, {} lights",
                    geometry.face_count(),
                    geometry.lights.len()
                );
                geometry
            }
        };

        let geometry = Arc::new(geometry);
        self.entries.lock().put(key, geometry.clone());

        Ok(geometry)
    }

    pub fn contains(&self, object: &VoxelObject) -> bool {
        ContentHash::of_object(object)
            .map(|key| self.entries.lock().contains(&key))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn stats(&self) -> CompiledCacheStats {
        CompiledCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            compilations: self.compilations.load(Ordering::Relaxed),
            decodes: self.decodes.load(Ordering::Relaxed),
        }
    }
}
