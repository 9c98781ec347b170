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

use super::{Asset, ErasedAsset};
use std::{fmt, ops::Deref, sync::Arc};

/// A thread-safe, reference-counted handle to loaded asset data.
///
/// Cloning a handle is cheap: it only increments a reference count. The cache and
/// every caller that loaded the same key share one allocation, which is what
/// [`AssetHandle::ptr_eq`] observes.
pub struct AssetHandle<T: Asset>(Arc<T>);

impl<T: Asset> AssetHandle<T> {
    /// Creates a new `AssetHandle` that takes ownership of the asset data.
    pub fn new(asset: T) -> Self {
        Self(Arc::new(asset))
    }

    /// Wraps an already shared asset.
    pub fn from_arc(asset: Arc<T>) -> Self {
        Self(asset)
    }

    /// Recovers a typed handle from a type-erased cache value.
    ///
    /// Returns `None` if the erased value holds a different type.
    pub fn from_erased(erased: &ErasedAsset) -> Option<Self> {
        erased.downcast::<T>().map(Self)
    }

    /// Type-erases this handle for storage in the cache.
    pub fn into_erased(self) -> ErasedAsset {
        ErasedAsset::from_arc(self.0)
    }

    /// Returns `true` if both handles point to the same allocation.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.0, &other.0)
    }
}

impl<T: Asset> Clone for AssetHandle<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Asset> Deref for AssetHandle<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: Asset + fmt::Debug> fmt::Debug for AssetHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AssetHandle").field(&*self.0).finish()
    }
}

impl<T: Asset> From<T> for AssetHandle<T> {
    fn from(asset: T) -> Self {
        Self::new(asset)
    }
}
