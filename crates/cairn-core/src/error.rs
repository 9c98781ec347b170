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

//! Error taxonomy of the content manager.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// The error type loaders, writers and release actions report.
///
/// It must be thread-safe since asynchronous loaders may fail on a worker thread.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which side of the registry an error concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoaderKind {
    /// A reader, producing assets.
    Reader,
    /// A writer, persisting assets.
    Writer,
}

impl fmt::Display for LoaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoaderKind::Reader => f.write_str("reader"),
            LoaderKind::Writer => f.write_str("writer"),
        }
    }
}

/// Every failure the content manager can surface.
///
/// Validation and resolution errors are returned synchronously by every entry
/// point, asynchronous ones included. Only [`ContentError::LoaderFailure`] and
/// [`ContentError::Abandoned`] travel inside envelopes.
#[derive(Debug, Clone, Error)]
pub enum ContentError {
    /// A textual key was empty or whitespace-only, or a key was absent.
    #[error("invalid content key {key}")]
    InvalidKey {
        /// Debug rendering of the rejected key.
        key: String,
    },

    /// No reader has been registered for the requested type.
    #[error("no reader is registered for type `{type_name}`")]
    NoLoaderForType {
        /// The requested type.
        type_name: &'static str,
    },

    /// Readers exist for the requested type but none accepted the key.
    #[error("no reader for type `{type_name}` can read {key}")]
    NoAcceptingLoader {
        /// The requested type.
        type_name: &'static str,
        /// Debug rendering of the key.
        key: String,
    },

    /// No writer has been registered for the data type.
    #[error("no writer is registered for type `{type_name}`")]
    NoWriterForType {
        /// The data type.
        type_name: &'static str,
    },

    /// Writers exist for the data type but none accepted the key.
    #[error("no writer for type `{type_name}` can write {key}")]
    NoAcceptingWriter {
        /// The data type.
        type_name: &'static str,
        /// Debug rendering of the key.
        key: String,
    },

    /// The same loader instance was registered twice for one type.
    #[error("{kind} `{loader}` is already registered for type `{type_name}`")]
    DuplicateRegistration {
        /// Reader or writer.
        kind: LoaderKind,
        /// Type name of the loader.
        loader: &'static str,
        /// The produced type it was registered under.
        type_name: &'static str,
    },

    /// The cache holds a value of another type under this key.
    #[error("{key} is cached as `{found}`, not `{expected}`")]
    TypeMismatch {
        /// Debug rendering of the key.
        key: String,
        /// The requested type.
        expected: &'static str,
        /// The type actually cached.
        found: &'static str,
    },

    /// A loader or writer failed while doing its work.
    #[error("{kind} failed on {key}: {source}")]
    LoaderFailure {
        /// Reader or writer.
        kind: LoaderKind,
        /// Debug rendering of the key.
        key: String,
        /// The loader's own error.
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// An asynchronous operation was dropped without reporting completion.
    #[error("asynchronous {kind} for {key} was dropped before completing")]
    Abandoned {
        /// Reader or writer.
        kind: LoaderKind,
        /// Debug rendering of the key.
        key: String,
    },

    /// A release action failed during unload.
    #[error("failed to dispose a cached asset of type `{type_name}`: {source}")]
    Dispose {
        /// The type of the asset whose release failed.
        type_name: &'static str,
        /// The release action's error.
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// Telemetry could not be set up for a content manager.
    #[error("telemetry setup failed")]
    Telemetry {
        /// The metrics layer's own error.
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl ContentError {
    /// Wraps a loader's own error.
    pub fn loader_failure(kind: LoaderKind, key: &dyn fmt::Debug, source: BoxedError) -> Self {
        ContentError::LoaderFailure {
            kind,
            key: format!("{key:?}"),
            source: Arc::from(source),
        }
    }

    /// Wraps a metrics registration failure.
    pub fn telemetry(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        ContentError::Telemetry {
            source: Arc::new(source),
        }
    }

    /// Returns `true` for the errors raised before any loader runs.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            ContentError::NoLoaderForType { .. }
                | ContentError::NoAcceptingLoader { .. }
                | ContentError::NoWriterForType { .. }
                | ContentError::NoAcceptingWriter { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_loader_failure_keeps_source() {
        let err = ContentError::loader_failure(
            LoaderKind::Reader,
            &"textures/missing.png",
            "file not found".into(),
        );
        assert!(err.to_string().contains("\"textures/missing.png\""));
        assert_eq!(err.source().unwrap().to_string(), "file not found");
    }

    #[test]
    fn test_telemetry_keeps_source() {
        let cause = std::io::Error::new(std::io::ErrorKind::Other, "backend offline");
        let err = ContentError::telemetry(cause);
        assert_eq!(err.to_string(), "telemetry setup failed");
        assert_eq!(err.source().unwrap().to_string(), "backend offline");
    }

    #[test]
    fn test_resolution_classification() {
        let err = ContentError::NoLoaderForType { type_name: "Mesh" };
        assert!(err.is_resolution_error());
        let err = ContentError::InvalidKey { key: "\"\"".into() };
        assert!(!err.is_resolution_error());
    }
}
