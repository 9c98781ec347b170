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

//! Foundational types shared by every cairn crate.
//!
//! Nothing in here performs I/O or owns threads. The crate defines the vocabulary
//! the rest of the workspace speaks: what a key is, how a loaded asset is shared,
//! what an asynchronous read reports, and how failures are classified.

#![warn(missing_docs)]

pub mod asset;
pub mod config;
pub mod envelope;
pub mod error;
pub mod key;
pub mod token;

pub use asset::{Asset, AssetHandle, Disposable, ErasedAsset};
pub use config::ContentConfig;
pub use envelope::{CancellationFlag, ReadEnvelope, ReadState};
pub use error::{BoxedError, ContentError, LoaderKind};
pub use key::{validate_key, ContentKey};
pub use token::TypeToken;
