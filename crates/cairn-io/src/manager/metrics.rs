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

//! Metrics the content manager reports when built with a registry.

use cairn_telemetry::{
    CounterHandle, GaugeHandle, HistogramHandle, MetricsRegistry, MetricsResult,
    ScopedMetricTimer,
};

/// Namespace of every content metric.
pub const CONTENT_NAMESPACE: &str = "content";

const LOAD_TIME_BUCKETS_MS: [f64; 8] = [0.5, 1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0];

/// Handles to the content manager's metrics.
#[derive(Debug, Clone)]
pub struct ContentMetrics {
    cache_hits: CounterHandle,
    cache_misses: CounterHandle,
    loads_total: CounterHandle,
    saves_total: CounterHandle,
    load_time: HistogramHandle,
    loading_queue: GaugeHandle,
    saving_queue: GaugeHandle,
    cached_assets: GaugeHandle,
}

impl ContentMetrics {
    /// Registers the content metrics in `registry`.
    pub fn register(registry: &MetricsRegistry) -> MetricsResult<Self> {
        Ok(Self {
            cache_hits: registry.register_counter(
                CONTENT_NAMESPACE,
                "cache_hits",
                "Loads answered from the cache",
            )?,
            cache_misses: registry.register_counter(
                CONTENT_NAMESPACE,
                "cache_misses",
                "Loads that had to reach a reader",
            )?,
            loads_total: registry.register_counter(
                CONTENT_NAMESPACE,
                "loads_total",
                "Assets successfully produced by readers",
            )?,
            saves_total: registry.register_counter(
                CONTENT_NAMESPACE,
                "saves_total",
                "Assets successfully persisted by writers",
            )?,
            load_time: registry.register_histogram(
                CONTENT_NAMESPACE,
                "load_time",
                "Duration of synchronous reads",
                "ms",
                LOAD_TIME_BUCKETS_MS.to_vec(),
            )?,
            loading_queue: registry.register_gauge(
                CONTENT_NAMESPACE,
                "loading_queue",
                "Asynchronous loads in flight",
                "operations",
            )?,
            saving_queue: registry.register_gauge(
                CONTENT_NAMESPACE,
                "saving_queue",
                "Asynchronous saves in flight",
                "operations",
            )?,
            cached_assets: registry.register_gauge(
                CONTENT_NAMESPACE,
                "cached_assets",
                "Entries held by the cache",
                "assets",
            )?,
        })
    }

    pub(crate) fn record_cache_hit(&self) {
        bump(&self.cache_hits);
    }

    pub(crate) fn record_cache_miss(&self) {
        bump(&self.cache_misses);
    }

    pub(crate) fn record_load(&self) {
        bump(&self.loads_total);
    }

    pub(crate) fn record_save(&self) {
        bump(&self.saves_total);
    }

    pub(crate) fn time_load(&self) -> ScopedMetricTimer<'_> {
        ScopedMetricTimer::new(&self.load_time)
    }

    pub(crate) fn record_loading_queue(&self, in_flight: usize) {
        set(&self.loading_queue, in_flight);
    }

    pub(crate) fn record_saving_queue(&self, in_flight: usize) {
        set(&self.saving_queue, in_flight);
    }

    pub(crate) fn record_cached_assets(&self, count: usize) {
        set(&self.cached_assets, count);
    }

    /// The cache hit counter.
    pub fn cache_hits(&self) -> &CounterHandle {
        &self.cache_hits
    }

    /// The cache miss counter.
    pub fn cache_misses(&self) -> &CounterHandle {
        &self.cache_misses
    }

    /// The successful load counter.
    pub fn loads_total(&self) -> &CounterHandle {
        &self.loads_total
    }

    /// The successful save counter.
    pub fn saves_total(&self) -> &CounterHandle {
        &self.saves_total
    }

    /// The synchronous read duration histogram.
    pub fn load_time(&self) -> &HistogramHandle {
        &self.load_time
    }

    /// Asynchronous loads in flight, as of the last change.
    pub fn loading_queue(&self) -> &GaugeHandle {
        &self.loading_queue
    }

    /// Asynchronous saves in flight, as of the last change.
    pub fn saving_queue(&self) -> &GaugeHandle {
        &self.saving_queue
    }

    /// Number of cached assets, as of the last insert or unload.
    pub fn cached_assets(&self) -> &GaugeHandle {
        &self.cached_assets
    }
}

fn bump(counter: &CounterHandle) {
    if let Err(e) = counter.increment() {
        log::warn!("Failed to update metric '{}': {:?}", counter.id(), e);
    }
}

fn set(gauge: &GaugeHandle, reading: usize) {
    if let Err(e) = gauge.set(reading as f64) {
        log::warn!("Failed to update metric '{}': {:?}", gauge.id(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_telemetry::MetricId;

    #[test]
    fn test_register_content_metrics() {
        let registry = MetricsRegistry::new();
        let metrics = ContentMetrics::register(&registry).unwrap();
        assert_eq!(registry.namespace_metrics(CONTENT_NAMESPACE).len(), 8);
        assert_eq!(registry.metric_count(), 8);

        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_save();
        assert_eq!(metrics.cache_hits().get().unwrap(), 2);
        assert_eq!(metrics.saves_total().get().unwrap(), 1);
        assert!(registry.contains_metric(&MetricId::new(CONTENT_NAMESPACE, "load_time")));
    }

    #[test]
    fn test_load_timer_feeds_histogram() {
        let registry = MetricsRegistry::new();
        let metrics = ContentMetrics::register(&registry).unwrap();
        drop(metrics.time_load());
        let histogram = metrics.load_time().get_metric().unwrap();
        assert_eq!(histogram.value.histogram_count(), Some(1));
    }

    #[test]
    fn test_gauges_follow_latest_reading() {
        let registry = MetricsRegistry::new();
        let metrics = ContentMetrics::register(&registry).unwrap();
        metrics.record_loading_queue(3);
        metrics.record_loading_queue(1);
        metrics.record_cached_assets(4);

        assert_eq!(metrics.loading_queue().get().unwrap(), 1.0);
        assert_eq!(metrics.saving_queue().get().unwrap(), 0.0);
        assert_eq!(metrics.cached_assets().get().unwrap(), 4.0);
    }
}
