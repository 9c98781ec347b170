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

//! Background file reads that report progress chunk by chunk.

use anyhow::{Context, Result};
use cairn_core::{Asset, BoxedError};
use cairn_io::ReadProgress;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::thread;

/// Reads the file at `path`, reporting progress after every chunk.
///
/// Returns `None` once the read is canceled.
pub(crate) fn read_with_progress<A: Asset>(
    path: &Path,
    chunk_size: usize,
    progress: &mut ReadProgress<String, A>,
) -> Result<Option<Vec<u8>>> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open '{}'", path.display()))?;
    let total = file
        .metadata()
        .with_context(|| format!("Failed to stat '{}'", path.display()))?
        .len();

    let mut data = Vec::with_capacity(usize::try_from(total).unwrap_or(0));
    let mut buffer = vec![0u8; chunk_size.max(1)];
    loop {
        if progress.is_canceled() {
            return Ok(None);
        }
        let read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read '{}'", path.display()))
            }
        };
        data.extend_from_slice(&buffer[..read]);
        if total > 0 {
            progress.report((data.len() as f64 / total as f64 * 100.0) as f32);
        }
    }
    Ok(Some(data))
}

/// Reads `path` on a dedicated thread and completes `progress` with the
/// decoded asset.
///
/// If the thread cannot be started the sink is dropped, which completes the
/// read as abandoned.
pub(crate) fn spawn_read<A, D>(
    path: PathBuf,
    chunk_size: usize,
    progress: ReadProgress<String, A>,
    decode: D,
) where
    A: Asset,
    D: FnOnce(Vec<u8>) -> Result<A> + Send + 'static,
{
    let spawned = thread::Builder::new()
        .name("cairn-file-read".to_string())
        .spawn(move || {
            let mut progress = progress;
            let outcome: Result<A, BoxedError> =
                match read_with_progress(&path, chunk_size, &mut progress) {
                    Ok(Some(bytes)) => decode(bytes).map_err(BoxedError::from),
                    Ok(None) => {
                        log::debug!("Read of '{}' canceled", path.display());
                        Err(format!("read of '{}' was canceled", path.display()).into())
                    }
                    Err(e) => Err(e.into()),
                };
            progress.complete(outcome);
        });

    if let Err(e) = spawned {
        log::warn!("Failed to start a file read thread: {}", e);
    }
}
