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

use std::fmt;
use thiserror::Error;

/// Identifies a metric as `namespace:name`, e.g. `content:cache_hits`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricId {
    /// The component owning the metric (e.g. "content").
    pub namespace: String,
    /// The metric name within the namespace (e.g. "load_time").
    pub name: String,
}

impl MetricId {
    /// Creates a new `MetricId`.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

/// The kind of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    /// Monotonically increasing count.
    Counter,
    /// A value that can go up and down.
    Gauge,
    /// A distribution of observations over fixed buckets.
    Histogram,
}

/// The current value of a metric.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    /// A counter's total.
    Counter(u64),
    /// A gauge's current reading.
    Gauge(f64),
    /// A histogram's summary.
    Histogram {
        /// Upper bounds of the buckets, ascending.
        bucket_bounds: Vec<f64>,
        /// Observations per bucket (cumulative: a sample counts in every bucket
        /// whose bound it does not exceed).
        bucket_counts: Vec<u64>,
        /// Number of observations.
        count: u64,
        /// Sum of all observations.
        sum: f64,
    },
}

impl MetricValue {
    /// The [`MetricType`] of this value.
    pub fn metric_type(&self) -> MetricType {
        match self {
            MetricValue::Counter(_) => MetricType::Counter,
            MetricValue::Gauge(_) => MetricType::Gauge,
            MetricValue::Histogram { .. } => MetricType::Histogram,
        }
    }

    /// The counter total, if this is a counter.
    pub fn as_counter(&self) -> Option<u64> {
        match self {
            MetricValue::Counter(v) => Some(*v),
            _ => None,
        }
    }

    /// The gauge reading, if this is a gauge.
    pub fn as_gauge(&self) -> Option<f64> {
        match self {
            MetricValue::Gauge(v) => Some(*v),
            _ => None,
        }
    }

    /// The number of observations, if this is a histogram.
    pub fn histogram_count(&self) -> Option<u64> {
        match self {
            MetricValue::Histogram { count, .. } => Some(*count),
            _ => None,
        }
    }
}

/// A registered metric.
#[derive(Debug, Clone)]
pub struct Metric {
    /// Its identifier.
    pub id: MetricId,
    /// What it measures.
    pub description: String,
    /// Unit of measurement ("count", "ms", ...).
    pub unit: String,
    /// Its current value.
    pub value: MetricValue,
}

impl Metric {
    /// A counter starting at zero.
    pub fn counter(id: MetricId, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            unit: "count".to_string(),
            value: MetricValue::Counter(0),
        }
    }

    /// A gauge starting at zero.
    pub fn gauge(id: MetricId, description: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            unit: unit.into(),
            value: MetricValue::Gauge(0.0),
        }
    }

    /// An empty histogram over `bucket_bounds`.
    pub fn histogram(
        id: MetricId,
        description: impl Into<String>,
        unit: impl Into<String>,
        bucket_bounds: Vec<f64>,
    ) -> Self {
        let bucket_counts = vec![0; bucket_bounds.len()];
        Self {
            id,
            description: description.into(),
            unit: unit.into(),
            value: MetricValue::Histogram {
                bucket_bounds,
                bucket_counts,
                count: 0,
                sum: 0.0,
            },
        }
    }
}

/// Result alias for metric operations.
pub type MetricsResult<T> = Result<T, MetricsError>;

/// Failures of metric operations.
#[derive(Debug, Clone, Error)]
pub enum MetricsError {
    /// No metric is registered under this id.
    #[error("metric not found: {0}")]
    MetricNotFound(MetricId),
    /// The operation does not apply to this kind of metric.
    #[error("type mismatch: expected {expected:?}, found {found:?}")]
    TypeMismatch {
        /// The kind the operation needs.
        expected: MetricType,
        /// The kind actually registered.
        found: MetricType,
    },
    /// The operation's arguments were rejected.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_id_display() {
        assert_eq!(
            MetricId::new("content", "cache_hits").to_string(),
            "content:cache_hits"
        );
    }

    #[test]
    fn test_constructors() {
        let counter = Metric::counter(MetricId::new("content", "loads_total"), "Loads");
        assert_eq!(counter.value.as_counter(), Some(0));
        assert_eq!(counter.unit, "count");

        let histogram = Metric::histogram(
            MetricId::new("content", "load_time"),
            "Load time",
            "ms",
            vec![1.0, 10.0],
        );
        assert_eq!(histogram.value.metric_type(), MetricType::Histogram);
        assert_eq!(histogram.value.histogram_count(), Some(0));
    }
}
