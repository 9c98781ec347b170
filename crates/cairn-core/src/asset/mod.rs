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

//! Defines what an asset is and how loaded assets are shared.
//!
//! Loaded assets are handed out as [`AssetHandle`]s, cheap reference-counted
//! pointers. The cache keeps them type-erased as [`ErasedAsset`] so a single store
//! can hold meshes, textures and documents side by side.

mod erased;
mod handle;

pub use erased::*;
pub use handle::*;

use crate::error::BoxedError;

/// A marker trait for any type that can be loaded, cached and shared as an asset.
///
/// Assets must be thread-safe since a loader may produce them on a worker thread
/// while other threads read them from the cache.
pub trait Asset: Send + Sync + 'static {
    /// Exposes the release capability of this asset, if it has one.
    ///
    /// The content manager calls this when unloading with auto-dispose enabled.
    /// Assets holding external resources (GPU buffers, file locks, sockets)
    /// override it to return `Some(self)`.
    fn as_disposable(&self) -> Option<&dyn Disposable> {
        None
    }
}

/// An asset that holds resources which must be released explicitly.
pub trait Disposable {
    /// Releases the resources held by this asset.
    ///
    /// Called at most once per cached allocation by an unload. Implementors
    /// use interior mutability since the asset may still be shared.
    fn dispose(&self) -> Result<(), BoxedError>;
}

impl Asset for String {}

impl Asset for Vec<u8> {}
