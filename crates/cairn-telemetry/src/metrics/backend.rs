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

use super::model::{Metric, MetricId, MetricType, MetricValue, MetricsError, MetricsResult};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Storage for metrics.
///
/// Implementations must make [`modify`](MetricsBackend::modify) atomic per
/// metric: counters are bumped concurrently by every thread that loads content.
pub trait MetricsBackend: Send + Sync + Debug + 'static {
    /// Stores or replaces a metric.
    fn put_metric(&self, metric: Metric) -> MetricsResult<()>;

    /// Retrieves a copy of a metric.
    fn get_metric(&self, id: &MetricId) -> MetricsResult<Metric>;

    /// Applies `update` to a stored metric in place.
    fn modify(
        &self,
        id: &MetricId,
        update: &mut dyn FnMut(&mut Metric) -> MetricsResult<()>,
    ) -> MetricsResult<()>;

    /// Checks if a metric exists.
    fn contains_metric(&self, id: &MetricId) -> bool;

    /// Copies of every stored metric.
    fn list_all_metrics(&self) -> Vec<Metric>;

    /// The number of stored metrics.
    fn metric_count(&self) -> usize;

    /// Adds `delta` to a counter and returns the new total.
    fn increment_counter(&self, id: &MetricId, delta: u64) -> MetricsResult<u64> {
        let mut total = 0;
        self.modify(id, &mut |metric: &mut Metric| match metric.value {
            MetricValue::Counter(ref mut value) => {
                *value = value.saturating_add(delta);
                total = *value;
                Ok(())
            }
            ref other => Err(MetricsError::TypeMismatch {
                expected: MetricType::Counter,
                found: other.metric_type(),
            }),
        })?;
        Ok(total)
    }

    /// Sets a gauge.
    fn set_gauge(&self, id: &MetricId, reading: f64) -> MetricsResult<()> {
        self.modify(id, &mut |metric: &mut Metric| match metric.value {
            MetricValue::Gauge(ref mut value) => {
                *value = reading;
                Ok(())
            }
            ref other => Err(MetricsError::TypeMismatch {
                expected: MetricType::Gauge,
                found: other.metric_type(),
            }),
        })
    }

    /// Records one observation in a histogram.
    fn record_histogram_sample(&self, id: &MetricId, sample: f64) -> MetricsResult<()> {
        self.modify(id, &mut |metric: &mut Metric| match metric.value {
            MetricValue::Histogram {
                ref bucket_bounds,
                ref mut bucket_counts,
                ref mut count,
                ref mut sum,
            } => {
                for (bound, bucket) in bucket_bounds.iter().zip(bucket_counts.iter_mut()) {
                    if sample <= *bound {
                        *bucket += 1;
                    }
                }
                *count += 1;
                *sum += sample;
                Ok(())
            }
            ref other => Err(MetricsError::TypeMismatch {
                expected: MetricType::Histogram,
                found: other.metric_type(),
            }),
        })
    }
}

/// The default backend: a `RwLock<HashMap>` kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    storage: RwLock<HashMap<MetricId, Metric>>,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }


    // Poisoned locks are recovered.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<MetricId, Metric>> {
        self.storage.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<MetricId, Metric>> {
        self.storage.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MetricsBackend for InMemoryBackend {
    fn put_metric(&self, metric: Metric) -> MetricsResult<()> {
        self.write().insert(metric.id.clone(), metric);
        Ok(())
    }

    fn get_metric(&self, id: &MetricId) -> MetricsResult<Metric> {
        self.read()
            .get(id)
            .cloned()
            .ok_or_else(|| MetricsError::MetricNotFound(id.clone()))
    }

    fn modify(
        &self,
        id: &MetricId,
        update: &mut dyn FnMut(&mut Metric) -> MetricsResult<()>,
    ) -> MetricsResult<()> {
        let mut storage = self.write();
        let metric = storage
            .get_mut(id)
            .ok_or_else(|| MetricsError::MetricNotFound(id.clone()))?;
        update(metric)
    }

    fn contains_metric(&self, id: &MetricId) -> bool {
        self.read().contains_key(id)
    }

    fn list_all_metrics(&self) -> Vec<Metric> {
        self.read().values().cloned().collect()
    }

    fn metric_count(&self) -> usize {
        self.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_counter_increment() {
        let backend = InMemoryBackend::new();
        let id = MetricId::new("content", "loads_total");
        backend.put_metric(Metric::counter(id.clone(), "Loads")).unwrap();

        assert_eq!(backend.increment_counter(&id, 5).unwrap(), 5);
        assert_eq!(backend.increment_counter(&id, 3).unwrap(), 8);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let backend = Arc::new(InMemoryBackend::new());
        let id = MetricId::new("content", "cache_hits");
        backend.put_metric(Metric::counter(id.clone(), "Hits")).unwrap();

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let backend = backend.clone();
                let id = id.clone();
                thread::spawn(move || {
                    for _ in 0..250 {
                        backend.increment_counter(&id, 1).unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let metric = backend.get_metric(&id).unwrap();
        assert_eq!(metric.value.as_counter(), Some(1000));
    }

    #[test]
    fn test_histogram_buckets() {
        let backend = InMemoryBackend::new();
        let id = MetricId::new("content", "load_time");
        backend
            .put_metric(Metric::histogram(id.clone(), "Load time", "ms", vec![1.0, 10.0, 100.0]))
            .unwrap();

        backend.record_histogram_sample(&id, 0.5).unwrap();
        backend.record_histogram_sample(&id, 7.0).unwrap();
        backend.record_histogram_sample(&id, 250.0).unwrap();

        match backend.get_metric(&id).unwrap().value {
            MetricValue::Histogram {
                bucket_counts,
                count,
                sum,
                ..
            } => {
                assert_eq!(bucket_counts, vec![1, 2, 2]);
                assert_eq!(count, 3);
                assert_eq!(sum, 257.5);
            }
            other => panic!("expected histogram, got {other:?}"),
        }
    }

    #[test]
    fn test_type_mismatch() {
        let backend = InMemoryBackend::new();
        let id = MetricId::new("content", "queue");
        backend.put_metric(Metric::gauge(id.clone(), "Queue", "ops")).unwrap();

        let err = backend.increment_counter(&id, 1).unwrap_err();
        assert!(matches!(
            err,
            MetricsError::TypeMismatch {
                expected: MetricType::Counter,
                found: MetricType::Gauge
            }
        ));
    }

    #[test]
    fn test_missing_metric() {
        let backend = InMemoryBackend::new();
        let err = backend
            .set_gauge(&MetricId::new("content", "nope"), 1.0)
            .unwrap_err();
        assert!(matches!(err, MetricsError::MetricNotFound(_)));
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let backend = Arc::new(InMemoryBackend::new());
        let id = MetricId::new("content", "cached_assets");
        backend
            .put_metric(Metric::gauge(id.clone(), "Cached", "assets"))
            .unwrap();

        let poisoner = backend.clone();
        let _ = thread::spawn(move || {
            let _guard = poisoner.storage.write().unwrap();
            panic!("poison the metric store");
        })
        .join();

        backend.set_gauge(&id, 3.0).unwrap();
        assert_eq!(backend.get_metric(&id).unwrap().value.as_gauge(), Some(3.0));
        assert_eq!(backend.metric_count(), 1);
    }
}
