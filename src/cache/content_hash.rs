//! # Content Hash Module
//!
//! Content hashes used as cache keys.

use std::fmt;

use crate::{
    config::NormalizedOptions,
    error::{LoaderError, LoaderResult},
    voxels::VoxelObject,
};

/// A 64-bit FNV-1a hash of serialized content.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash(u64);

impl ContentHash {
    pub fn of_str(content: &str) -> Self {
        ContentHash(const_fnv1a_hash::fnv1a_hash_str_64(content))
    }

    /// Key of the compiled geometry for an object.
    pub fn of_object(object: &VoxelObject) -> LoaderResult<Self> {
        Ok(Self::of_str(&object.canonical_json()?))
    }

    /// Key of a final variant: the object's content followed by the options'.
    pub fn of_variant(object: &VoxelObject, options: &NormalizedOptions) -> LoaderResult<Self> {
        let options = serde_json::to_string(options)
            .map_err(|e| LoaderError::InvalidOptions(e.to_string()))?;
        Ok(Self::of_str(&(object.canonical_json()? + &options)))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
