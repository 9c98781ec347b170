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

//! Construction-time settings of a content manager.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings a content manager starts with.
///
/// Usually written as a RON file next to the assets:
///
/// ```ron
/// (
///     root_directory: "assets",
///     auto_dispose_on_unload: true,
/// )
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Directory that relative keys are resolved against by file-based loaders.
    pub root_directory: PathBuf,
    /// Release disposable assets when the cache is unloaded.
    pub auto_dispose_on_unload: bool,
    /// Let concurrent asynchronous loads of the same key share one loader run.
    pub coalesce_in_flight_loads: bool,
}

impl ContentConfig {
    /// Creates a configuration rooted at `root_directory`, other settings default.
    pub fn with_root(root_directory: impl Into<PathBuf>) -> Self {
        Self {
            root_directory: root_directory.into(),
            ..Self::default()
        }
    }

    /// Parses a configuration from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    /// Reads and parses a RON configuration file.
    pub fn from_ron_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read content config '{}'", path.display()))?;
        let config = Self::from_ron_str(&text)
            .with_context(|| format!("Failed to parse content config '{}'", path.display()))?;
        log::debug!("Loaded content config from '{}'", path.display());
        Ok(config)
    }
}
