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

//! Loader lanes for content stored on the local file system.
//!
//! Keys are paths. Relative keys are resolved against the manager's root
//! directory at the time of the call, absolute keys are used as they are.

#![warn(missing_docs)]

pub mod file_lane;

pub use file_lane::{resolve_path, BytesFileLane, TextFileLane, DEFAULT_CHUNK_SIZE};
