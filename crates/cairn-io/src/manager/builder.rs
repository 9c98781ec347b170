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

use super::metrics::ContentMetrics;
use super::ContentManager;
use cairn_core::{ContentConfig, ContentError, ContentKey};
use cairn_telemetry::MetricsRegistry;
use std::marker::PhantomData;
use std::path::PathBuf;

/// A builder for [`ContentManager`] instances.
pub struct ContentManagerBuilder<K: ContentKey> {
    config: ContentConfig,
    metrics: Option<MetricsRegistry>,
    _key: PhantomData<fn() -> K>,
}

impl<K: ContentKey> ContentManagerBuilder<K> {
    /// Creates a builder with the default configuration and no metrics.
    pub fn new() -> Self {
        Self {
            config: ContentConfig::default(),
            metrics: None,
            _key: PhantomData,
        }
    }

    /// Replaces the whole configuration.
    pub fn with_config(mut self, config: ContentConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the directory relative keys are resolved against.
    pub fn with_root_directory(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.root_directory = root.into();
        self
    }

    /// Whether `unload` disposes cached assets.
    pub fn with_auto_dispose_on_unload(mut self, enabled: bool) -> Self {
        self.config.auto_dispose_on_unload = enabled;
        self
    }

    /// Whether concurrent asynchronous loads of one asset share a single read.
    pub fn with_coalesced_loads(mut self, enabled: bool) -> Self {
        self.config.coalesce_in_flight_loads = enabled;
        self
    }

    /// Reports cache and loader activity into `registry`.
    pub fn with_metrics(mut self, registry: MetricsRegistry) -> Self {
        self.metrics = Some(registry);
        self
    }

    /// Builds the manager.
    ///
    /// # Errors
    /// Returns [`ContentError::Telemetry`] if the metrics backend refuses the
    /// content metrics.
    pub fn build(self) -> Result<ContentManager<K>, ContentError> {
        let metrics = match &self.metrics {
            Some(registry) => Some(
                ContentMetrics::register(registry)
                    .map_err(ContentError::telemetry)?,
            ),
            None => None,
        };
        Ok(ContentManager::from_parts(self.config, metrics))
    }
}

impl<K: ContentKey> Default for ContentManagerBuilder<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_telemetry::MetricsError;
    use std::error::Error as _;

    #[test]
    fn test_builder_applies_settings() {
        let manager = ContentManagerBuilder::<String>::new()
            .with_root_directory("assets")
            .with_auto_dispose_on_unload(true)
            .with_metrics(MetricsRegistry::new())
            .build()
            .unwrap();

        assert_eq!(manager.root_directory(), PathBuf::from("assets"));
        assert!(manager.auto_dispose_on_unload());
        assert!(manager.metrics().is_some());
    }

    #[test]
    fn test_metrics_failure_keeps_its_source() {
        let err = ContentError::telemetry(MetricsError::InvalidOperation(
            "histogram buckets must be strictly ascending".to_string(),
        ));
        let source = err.source().unwrap();
        assert!(source.downcast_ref::<MetricsError>().is_some());
    }
}
