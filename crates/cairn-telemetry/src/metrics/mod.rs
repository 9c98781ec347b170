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

//! Counters, gauges and histograms, with a pluggable storage backend.
//!
//! Components register the metrics they own once and keep the returned handles;
//! updating a metric afterwards only needs the handle.

mod backend;
mod model;
mod registry;

pub use backend::{InMemoryBackend, MetricsBackend};
pub use model::{Metric, MetricId, MetricType, MetricValue, MetricsError, MetricsResult};
pub use registry::{CounterHandle, GaugeHandle, HistogramHandle, MetricsRegistry};
