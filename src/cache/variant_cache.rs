//! # Variant Cache Module
//!
//! Memoized final meshes with single-flight builds.
//!
//! ## Entry lifecycle
//!
//! ```text
//! absent --first request--> pending --build ok--> ready
//!                              |
//!                              +--build failed / builder dropped--> absent
//! ```
//!
//! The first request for a key becomes its builder. Requests that arrive while
//! the key is pending subscribe to the builder's completion signal instead of
//! building again, and are woken with the same outcome. The entry map lock is
//! only held to read or flip an entry's state, never across an await.

use std::{
    collections::HashMap,
    future::Future,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use futures::{
    channel::oneshot,
    future::{FutureExt, Shared},
};
use log::{debug, warn};
use parking_lot::Mutex;

use super::content_hash::ContentHash;
use crate::{
    error::{LoaderError, LoaderResult},
    meshing::{MeshBuffer, PointLight},
};

/// A finished mesh for one (object, options) pair.
#[derive(Clone, Debug, PartialEq)]
pub struct Variant {
    pub mesh: MeshBuffer,
    pub lights: Vec<PointLight>,
    pub particle_emitters: Vec<serde_json::Value>,
}

/// Observable state of a cache key.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VariantState {
    Absent,
    Pending,
    Ready,
}

/// Counters describing how variant requests were satisfied.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct VariantCacheStats {
    pub hits: usize,
    pub builds: usize,
    pub waits: usize,
}

type BuildOutcome = Result<Arc<Variant>, LoaderError>;
type PendingBuild = Shared<oneshot::Receiver<BuildOutcome>>;

enum VariantEntry {
    Pending(PendingBuild),
    Ready(Arc<Variant>),
}

enum Role {
    Hit(Arc<Variant>),
    Wait(PendingBuild),
    Build(oneshot::Sender<BuildOutcome>),
}

#[derive(Default)]
pub struct VariantCache {
    entries: Mutex<HashMap<ContentHash, VariantEntry>>,
    hits: AtomicUsize,
    builds: AtomicUsize,
    waits: AtomicUsize,
}

impl VariantCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an independent copy of the variant stored under `key`,
    /// running `build` only if no other request has built or is building it.
    ///
    /// # Arguments
    /// * `key` - Variant key hashed from the object and its normalized options
    /// * `build` - Produces the variant when this request becomes the builder
    ///
    /// # Returns
    /// A fresh copy of the variant, the builder's error (shared with every
    /// waiter), or `BuildAbandoned` if the builder was dropped mid-build.
    pub async fn get_or_build<F, Fut>(&self, key: ContentHash, build: F) -> LoaderResult<Variant>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = LoaderResult<Variant>>,
    {
        let role = {
            let mut entries = self.entries.lock();
            match entries.get(&key) {
                Some(VariantEntry::Ready(variant)) => Role::Hit(variant.clone()),
                Some(VariantEntry::Pending(pending)) => Role::Wait(pending.clone()),
                None => {
                    let (sender, receiver) = oneshot::channel();
                    entries.insert(key, VariantEntry::Pending(receiver.shared()));
                    Role::Build(sender)
                }
            }
        };

        match role {
            Role::Hit(variant) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Variant cache hit for {key}");
                Ok(Variant::clone(&variant))
            }
            Role::Wait(pending) => {
                self.waits.fetch_add(1, Ordering::Relaxed);
                debug!("Waiting on in-flight build of {key}");
                match pending.await {
                    Ok(Ok(variant)) => Ok(Variant::clone(&variant)),
                    Ok(Err(e)) => Err(e),
                    Err(oneshot::Canceled) => Err(LoaderError::BuildAbandoned),
                }
            }
            Role::Build(sender) => {
                self.builds.fetch_add(1, Ordering::Relaxed);
                let mut pending = PendingGuard {
                    cache: self,
                    key,
                    sender: Some(sender),
                };

                let outcome = build().await.map(Arc::new);
                pending.complete(outcome.clone());

                outcome.map(|variant| Variant::clone(&variant))
            }
        }
    }

    pub fn state(&self, key: ContentHash) -> VariantState {
        match self.entries.lock().get(&key) {
            None => VariantState::Absent,
            Some(VariantEntry::Pending(_)) => VariantState::Pending,
            Some(VariantEntry::Ready(_)) => VariantState::Ready,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry. Requires exclusive access, so no build can be in flight.
    pub fn clear(&mut self) {
        self.entries.get_mut().clear();
    }

    pub fn stats(&self) -> VariantCacheStats {
        VariantCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            builds: self.builds.load(Ordering::Relaxed),
            waits: self.waits.load(Ordering::Relaxed),
        }
    }
}

/// Owns a pending entry on behalf of its builder.
///
/// Resolves the entry when the build finishes, or clears it if the builder is
/// dropped first so later requests can retry.
struct PendingGuard<'a> {
    cache: &'a VariantCache,
    key: ContentHash,
    sender: Option<oneshot::Sender<BuildOutcome>>,
}

impl PendingGuard<'_> {
    fn complete(&mut self, outcome: BuildOutcome) {
        {
            let mut entries = self.cache.entries.lock();
            match &outcome {
                Ok(variant) => {
                    entries.insert(self.key, VariantEntry::Ready(variant.clone()));
                }
                Err(e) => {
                    warn!("Build of {} failed: {e}", self.key);
                    entries.remove(&self.key);
                }
            }
        }

        if let Some(sender) = self.sender.take() {
            // Nobody waiting is fine.
            let _ = sender.send(outcome);
        }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.sender.is_some() {
            warn!("Build of {} dropped before completion", self.key);
            let mut entries = self.cache.entries.lock();
            if matches!(entries.get(&self.key), Some(VariantEntry::Pending(_))) {
                entries.remove(&self.key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        meshing::{ChannelToggles, FaceMesher, MeshAssembly},
        voxels::{Rgb, Voxel, VoxelObject},
    };
    use futures::future::{join_all, pending};

    fn key(n: u8) -> ContentHash {
        ContentHash::of_str(&format!("variant-{n}"))
    }

    fn variant() -> Variant {
        let object = VoxelObject::new(2, vec![Voxel::new(0, 0, 0, Rgb::new(5, 6, 7))]);
        let compiled = FaceMesher::compile(&object).unwrap();
        Variant {
            mesh: MeshAssembly::assemble(&compiled, 1.0, ChannelToggles::default()).unwrap(),
            lights: Vec::new(),
            particle_emitters: Vec::new(),
        }
    }

    #[test]
    fn ready_entries_are_cloned_without_rebuilding() {
        let cache = VariantCache::new();
        let builds = AtomicUsize::new(0);
        let counter = &builds;

        for _ in 0..3 {
            let result = pollster::block_on(cache.get_or_build(key(1), || async move {
                let builds = counter;
                builds.fetch_add(1, Ordering::SeqCst);
                Ok(variant())
            }));
            assert_eq!(result.unwrap(), variant());
        }

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(cache.state(key(1)), VariantState::Ready);
        assert_eq!(cache.stats().hits, 2);
    }

    #[test]
    fn concurrent_requests_share_one_build() {
        let cache = VariantCache::new();
        let builds = AtomicUsize::new(0);
        let (open, gate) = oneshot::channel::<()>();
        let gate = gate.shared();

        let requests = join_all((0..5).map(|_| {
            let gate = gate.clone();
            let builds = &builds;
            cache.get_or_build(key(2), move || async move {
                builds.fetch_add(1, Ordering::SeqCst);
                let _ = gate.await;
                Ok(variant())
            })
        }));

        let release = async {
            assert_eq!(cache.state(key(2)), VariantState::Pending);
            open.send(()).unwrap();
        };

        let (results, ()) = pollster::block_on(async { futures::join!(requests, release) });

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().waits, 4);
        let mut results: Vec<Variant> = results.into_iter().map(Result::unwrap).collect();
        assert!(results.iter().all(|v| *v == variant()));

        // Each caller owns its buffers.
        results[0].mesh.colors[0] = [0.0; 3];
        assert_eq!(results[1], variant());
        let again = pollster::block_on(cache.get_or_build(key(2), || async { Ok(variant()) }));
        assert_eq!(again.unwrap(), variant());
    }

    #[test]
    fn failed_build_clears_the_entry_and_reaches_waiters() {
        let cache = VariantCache::new();
        let (open, gate) = oneshot::channel::<()>();
        let gate = gate.shared();

        let requests = join_all((0..3).map(|_| {
            let gate = gate.clone();
            cache.get_or_build(key(3), move || async move {
                let _ = gate.await;
                Err(LoaderError::MalformedObject("no voxels".to_string()))
            })
        }));
        let release = async {
            open.send(()).unwrap();
        };

        let (results, ()) = pollster::block_on(async { futures::join!(requests, release) });

        assert!(results
            .iter()
            .all(|r| matches!(r, Err(LoaderError::MalformedObject(_)))));
        assert_eq!(cache.state(key(3)), VariantState::Absent);

        let retry = pollster::block_on(cache.get_or_build(key(3), || async { Ok(variant()) }));
        assert!(retry.is_ok());
        assert_eq!(cache.stats().builds, 2);
    }

    #[test]
    fn dropped_builder_releases_waiters() {
        let cache = VariantCache::new();

        let mut builder = Box::pin(cache.get_or_build(key(4), pending::<LoaderResult<Variant>>));
        assert!(builder.as_mut().now_or_never().is_none());
        assert_eq!(cache.state(key(4)), VariantState::Pending);

        let mut waiter = Box::pin(cache.get_or_build(key(4), || async { Ok(variant()) }));
        assert!(waiter.as_mut().now_or_never().is_none());

        drop(builder);
        assert_eq!(cache.state(key(4)), VariantState::Absent);
        assert_eq!(pollster::block_on(waiter), Err(LoaderError::BuildAbandoned));
    }

    #[test]
    fn clear_empties_the_cache() {
        let mut cache = VariantCache::new();
        pollster::block_on(cache.get_or_build(key(5), || async { Ok(variant()) })).unwrap();
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
