//! # Object Source Module
//!
//! Where voxel objects come from when they are requested by id.

use std::collections::HashMap;

use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::RwLock;

use crate::{
    error::{LoaderError, LoaderResult},
    voxels::VoxelObject,
};

/// Retrieves voxel objects by id (a path, URL, or any other key).
///
/// The loader memoizes successful fetches, so an implementation is asked for
/// each id at most once per loader.
pub trait ObjectSource: Send + Sync {
    fn fetch<'a>(&'a self, id: &'a str) -> BoxFuture<'a, LoaderResult<VoxelObject>>;
}

/// An [`ObjectSource`] backed by objects registered up front.
#[derive(Default)]
pub struct InMemoryObjectSource {
    objects: RwLock<HashMap<String, String>>,
}

impl InMemoryObjectSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the JSON document served for `id`. Parsing happens on fetch.
    pub fn insert_json(&self, id: impl Into<String>, json: impl Into<String>) {
        self.objects.write().insert(id.into(), json.into());
    }

    pub fn insert(&self, id: impl Into<String>, object: &VoxelObject) -> LoaderResult<()> {
        self.insert_json(id, object.canonical_json()?);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectSource for InMemoryObjectSource {
    fn fetch<'a>(&'a self, id: &'a str) -> BoxFuture<'a, LoaderResult<VoxelObject>> {
        let result = match self.objects.read().get(id) {
            Some(json) => VoxelObject::from_json(json),
            None => Err(LoaderError::LookupMiss(id.to_string())),
        };
        future::ready(result).boxed()
    }
}
