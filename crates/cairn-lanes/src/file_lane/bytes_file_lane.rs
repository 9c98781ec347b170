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

//! Raw file contents.

use super::chunked::spawn_read;
use super::{resolve_path, DEFAULT_CHUNK_SIZE};
use anyhow::Context;
use cairn_core::BoxedError;
use cairn_io::{ContentManager, ReadProgress, Reader};
use std::fs;
use std::path::Path;

/// Reads whole files as bytes, optionally only those with given extensions.
#[derive(Debug, Clone)]
pub struct BytesFileLane {
    extensions: Vec<String>,
    chunk_size: usize,
}

impl BytesFileLane {
    /// Creates a lane accepting every existing file.
    pub fn new() -> Self {
        Self {
            extensions: Vec::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Restricts the lane to files with one of `extensions`. Matching ignores
    /// case and a leading dot.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    /// Sets how many bytes an asynchronous read takes between two progress
    /// reports.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    fn accepts_extension(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .is_some_and(|ext| self.extensions.contains(&ext))
    }
}

impl Default for BytesFileLane {
    fn default() -> Self {
        Self::new()
    }
}

impl Reader<String, Vec<u8>> for BytesFileLane {
    fn read(&self, key: &String, content: &ContentManager<String>) -> Result<Vec<u8>, BoxedError> {
        let path = resolve_path(&content.root_directory(), key);
        let bytes =
            fs::read(&path).with_context(|| format!("Failed to read '{}'", path.display()))?;
        Ok(bytes)
    }

    fn can_read(&self, key: &String, content: &ContentManager<String>) -> bool {
        let path = resolve_path(&content.root_directory(), key);
        self.accepts_extension(&path) && path.is_file()
    }

    fn read_async(
        &self,
        key: String,
        content: ContentManager<String>,
        progress: ReadProgress<String, Vec<u8>>,
    ) {
        let path = resolve_path(&content.root_directory(), &key);
        spawn_read(path, self.chunk_size, progress, |bytes| Ok(bytes));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_filter_is_case_insensitive() {
        let lane = BytesFileLane::new().with_extensions([".PNG", "bin"]);
        assert!(lane.accepts_extension(Path::new("a/stone.png")));
        assert!(lane.accepts_extension(Path::new("mesh.BIN")));
        assert!(!lane.accepts_extension(Path::new("notes.txt")));
        assert!(!lane.accepts_extension(Path::new("Makefile")));
    }

    #[test]
    fn test_no_filter_accepts_everything() {
        let lane = BytesFileLane::new();
        assert!(lane.accepts_extension(Path::new("Makefile")));
    }
}
