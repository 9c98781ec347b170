// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The keyed cache of loaded assets.

use ahash::{AHashMap, AHashSet};
use cairn_core::{ContentError, ContentKey, ErasedAsset};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A thread-safe map from key to cached asset.
///
/// At most one entry exists per key. Insertion never replaces an existing entry:
/// when two loads of the same key race, the first insertion wins and the second
/// caller keeps its own value without it ever becoming visible here.
///
/// The lock is scoped to the store, so cache mutation never blocks loader
/// resolution or unrelated work in the manager.
pub struct CacheStore<K: ContentKey> {
    entries: RwLock<AHashMap<K, ErasedAsset>>,
}

impl<K: ContentKey> Default for CacheStore<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ContentKey> CacheStore<K> {
    /// Creates a new, empty cache.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(AHashMap::new()),
        }
    }

    // A loader panicking on another thread must not make the cache unusable, and
    // no operation here leaves the map half-updated, so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, AHashMap<K, ErasedAsset>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, AHashMap<K, ErasedAsset>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Looks up the asset cached under `key`.
    pub fn try_get(&self, key: &K) -> Option<ErasedAsset> {
        self.read().get(key).cloned()
    }

    /// Stores `asset` under `key` unless an entry already exists.
    ///
    /// Returns `true` if this call inserted the entry.
    pub fn insert_if_absent(&self, key: K, asset: ErasedAsset) -> bool {
        let mut entries = self.write();
        if entries.contains_key(&key) {
            log::trace!("Cache already holds {:?}, discarding the late result", key);
            return false;
        }
        entries.insert(key, asset);
        true
    }

    /// Checks if an asset is cached under `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.read().contains_key(key)
    }

    /// The number of cached entries.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// A snapshot of the cached keys, in no particular order.
    pub fn keys(&self) -> Vec<K> {
        self.read().keys().cloned().collect()
    }

    /// Removes every entry, optionally releasing disposable assets first.
    ///
    /// The map is detached under the lock before any release action runs, so the
    /// cache is empty on every exit path. Each distinct allocation is released at
    /// most once even if it is cached under several keys. The first failing
    /// release aborts the remaining ones and is returned.
    ///
    /// Returns the number of entries removed.
    pub fn clear(&self, dispose_each: bool) -> Result<usize, ContentError> {
        let detached = std::mem::take(&mut *self.write());
        let count = detached.len();

        if dispose_each {
            let mut released = AHashSet::with_capacity(count);
            for asset in detached.values() {
                let Some(disposable) = asset.as_disposable() else {
                    continue;
                };
                if !released.insert(asset.addr()) {
                    continue;
                }
                disposable.dispose().map_err(|source| ContentError::Dispose {
                    type_name: asset.token().name(),
                    source: source.into(),
                })?;
            }
        }

        log::debug!("Cleared {} cached asset(s)", count);
        Ok(count)
    }
}
