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

//! UTF-8 text files.

use super::chunked::spawn_read;
use super::{resolve_path, DEFAULT_CHUNK_SIZE};
use anyhow::Context;
use cairn_core::{AssetHandle, BoxedError};
use cairn_io::{ContentManager, ReadProgress, Reader, WriteCompletion, Writer};
use std::fs;
use std::path::Path;
use std::thread;

/// Reads and writes whole text files.
///
/// Reading accepts keys naming an existing file. Writing accepts keys whose
/// directory exists or can be created, and creates it on demand.
#[derive(Debug, Clone)]
pub struct TextFileLane {
    chunk_size: usize,
}

impl TextFileLane {
    /// Creates a lane reading [`DEFAULT_CHUNK_SIZE`] bytes at a time.
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Sets how many bytes an asynchronous read takes between two progress
    /// reports.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

impl Default for TextFileLane {
    fn default() -> Self {
        Self::new()
    }
}

impl Reader<String, String> for TextFileLane {
    fn read(&self, key: &String, content: &ContentManager<String>) -> Result<String, BoxedError> {
        let path = resolve_path(&content.root_directory(), key);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read text file '{}'", path.display()))?;
        Ok(text)
    }

    fn can_read(&self, key: &String, content: &ContentManager<String>) -> bool {
        resolve_path(&content.root_directory(), key).is_file()
    }

    fn read_async(
        &self,
        key: String,
        content: ContentManager<String>,
        progress: ReadProgress<String, String>,
    ) {
        let path = resolve_path(&content.root_directory(), &key);
        let shown = path.display().to_string();
        spawn_read(path, self.chunk_size, progress, move |bytes| {
            String::from_utf8(bytes).with_context(|| format!("'{}' is not valid UTF-8", shown))
        });
    }
}

impl Writer<String, String> for TextFileLane {
    fn write(
        &self,
        key: &String,
        data: &String,
        content: &ContentManager<String>,
    ) -> Result<(), BoxedError> {
        let path = resolve_path(&content.root_directory(), key);
        write_text(&path, data)?;
        Ok(())
    }

    fn can_write(&self, key: &String, content: &ContentManager<String>) -> bool {
        let path = resolve_path(&content.root_directory(), key);
        if path.file_name().is_none() || path.is_dir() {
            return false;
        }
        // The first existing ancestor decides: a file there blocks creation.
        match path.parent() {
            Some(parent) => parent
                .ancestors()
                .find(|ancestor| ancestor.exists())
                .map_or(true, Path::is_dir),
            None => true,
        }
    }

    fn write_async(
        &self,
        key: String,
        data: AssetHandle<String>,
        content: ContentManager<String>,
        completion: WriteCompletion<String>,
    ) {
        let path = resolve_path(&content.root_directory(), &key);
        let spawned = thread::Builder::new()
            .name("cairn-file-write".to_string())
            .spawn(move || {
                let outcome = write_text(&path, &data).map_err(BoxedError::from);
                completion.complete(outcome);
            });
        if let Err(e) = spawned {
            log::warn!("Failed to start a file write thread: {}", e);
        }
    }
}

fn write_text(path: &Path, text: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory '{}'", parent.display()))?;
    }
    fs::write(path, text)
        .with_context(|| format!("Failed to write text file '{}'", path.display()))?;
    log::debug!("Wrote {} bytes to '{}'", text.len(), path.display());
    Ok(())
}
