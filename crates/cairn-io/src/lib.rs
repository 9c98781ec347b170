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

//! Type-directed loading, caching and saving of content.
//!
//! A [`ContentManager`] owns a cache of loaded assets and two registries of
//! plugins: [`Reader`]s that turn a key into an asset and [`Writer`]s that
//! persist one. Plugins are registered against the asset type they produce;
//! asking the manager for a `T` routes to the first reader registered for `T`
//! that accepts the key.

#![warn(missing_docs)]

pub mod manager;
pub mod reader;
pub mod registry;
pub mod writer;

pub use manager::{
    ContentManager, ContentManagerBuilder, ContentMetrics, LoadEnvelope, CONTENT_NAMESPACE,
};
pub use reader::{DynReader, ReadProgress, Reader};
pub use registry::{Enumeration, LoaderEntry, LoaderRegistry};
pub use writer::{DynWriter, WriteCompletion, Writer};

/// The types most loaders and callers need.
pub mod prelude {
    pub use crate::manager::{ContentManager, ContentManagerBuilder, LoadEnvelope};
    pub use crate::reader::{ReadProgress, Reader};
    pub use crate::writer::{WriteCompletion, Writer};
    pub use cairn_core::{
        Asset, AssetHandle, BoxedError, CancellationFlag, ContentConfig, ContentError,
        ContentKey, Disposable, ReadEnvelope, ReadState,
    };
}
