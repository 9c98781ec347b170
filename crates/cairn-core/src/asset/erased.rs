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

use super::{Asset, Disposable};
use crate::token::TypeToken;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A type-erased, shared asset as stored by the cache.
///
/// Two views of the same allocation are kept: an `Any` view to recover the
/// concrete type, and an [`Asset`] view to reach capabilities such as
/// [`Disposable`] without knowing the type.
#[derive(Clone)]
pub struct ErasedAsset {
    any: Arc<dyn Any + Send + Sync>,
    asset: Arc<dyn Asset>,
    token: TypeToken,
}

impl ErasedAsset {
    /// Erases a shared asset.
    pub fn from_arc<A: Asset>(asset: Arc<A>) -> Self {
        Self {
            any: asset.clone(),
            asset,
            token: TypeToken::of::<A>(),
        }
    }

    /// The concrete type held by this value.
    pub fn token(&self) -> TypeToken {
        self.token
    }

    /// Returns `true` if this value holds an `A`.
    pub fn is<A: Asset>(&self) -> bool {
        self.any.is::<A>()
    }

    /// Attempts to recover the concrete shared pointer.
    pub fn downcast<A: Asset>(&self) -> Option<Arc<A>> {
        self.any.clone().downcast::<A>().ok()
    }

    /// The release capability of the held asset, if it exposes one.
    pub fn as_disposable(&self) -> Option<&dyn Disposable> {
        self.asset.as_disposable()
    }

    /// The address of the shared allocation, identical for every clone.
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.any) as *const () as usize
    }

    /// Returns `true` if both values point to the same allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl fmt::Debug for ErasedAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedAsset")
            .field("type", &self.token.name())
            .field("addr", &format_args!("{:#x}", self.addr()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetHandle;
    use crate::error::BoxedError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, PartialEq)]
    struct Mesh {
        vertices: usize,
    }
    impl Asset for Mesh {}

    #[derive(Default)]
    struct GpuBuffer {
        released: AtomicUsize,
    }
    impl Asset for GpuBuffer {
        fn as_disposable(&self) -> Option<&dyn Disposable> {
            Some(self)
        }
    }
    impl Disposable for GpuBuffer {
        fn dispose(&self) -> Result<(), BoxedError> {
            self.released.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_round_trip_preserves_allocation() {
        let handle = AssetHandle::new(Mesh { vertices: 8 });
        let erased = handle.clone().into_erased();

        assert!(erased.is::<Mesh>());
        assert_eq!(erased.token(), TypeToken::of::<Mesh>());

        let recovered = AssetHandle::<Mesh>::from_erased(&erased).unwrap();
        assert!(AssetHandle::ptr_eq(&handle, &recovered));
        assert_eq!(recovered.vertices, 8);
    }

    #[test]
    fn test_wrong_type_is_not_recovered() {
        let erased = AssetHandle::new(Mesh { vertices: 3 }).into_erased();
        assert!(AssetHandle::<String>::from_erased(&erased).is_none());
    }

    #[test]
    fn test_disposable_capability_is_reachable() {
        let buffer = AssetHandle::new(GpuBuffer::default());
        let erased = buffer.clone().into_erased();

        erased.as_disposable().unwrap().dispose().unwrap();
        assert_eq!(buffer.released.load(Ordering::SeqCst), 1);

        let mesh = AssetHandle::new(Mesh { vertices: 1 }).into_erased();
        assert!(mesh.as_disposable().is_none());
    }

    #[test]
    fn test_clones_share_identity() {
        let erased = AssetHandle::new(Mesh { vertices: 2 }).into_erased();
        let other = AssetHandle::new(Mesh { vertices: 2 }).into_erased();
        assert!(erased.ptr_eq(&erased.clone()));
        assert!(!erased.ptr_eq(&other));
    }
}
