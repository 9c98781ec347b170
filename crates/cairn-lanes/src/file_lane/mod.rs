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

//! File-backed readers and writers.

mod bytes_file_lane;
mod chunked;
mod text_file_lane;

pub use bytes_file_lane::BytesFileLane;
pub use text_file_lane::TextFileLane;

use std::path::{Path, PathBuf};

/// Size of the reads performed by asynchronous file loads, in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Maps a key to a file path: absolute keys are kept, relative ones are joined
/// to `root`.
pub fn resolve_path(root: &Path, key: &str) -> PathBuf {
    let path = Path::new(key);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_key_joins_root() {
        let root = Path::new("assets");
        assert_eq!(
            resolve_path(root, "textures/stone.png"),
            PathBuf::from("assets/textures/stone.png")
        );
        assert_eq!(resolve_path(Path::new(""), "a.txt"), PathBuf::from("a.txt"));
    }

    #[test]
    fn test_absolute_key_ignores_root() {
        let absolute = std::env::temp_dir().join("cairn.txt");
        let key = absolute.to_string_lossy().into_owned();
        assert_eq!(resolve_path(Path::new("assets"), &key), absolute);
    }
}
