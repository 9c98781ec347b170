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

//! The record delivered to callers of asynchronous reads.

use crate::error::ContentError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lifecycle of an asynchronous read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadState {
    /// The read is still running; `progress` may keep growing.
    Working,
    /// The read has finished, successfully or not.
    Completed,
}

/// Advisory cancellation shared by every envelope of one operation and by the
/// loader's progress sink.
///
/// Setting it never aborts the manager's bookkeeping. Loaders are expected to
/// poll it and stop emitting progress once it is set.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Creates a flag that is not yet set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns `true` once cancellation has been requested.
    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Progress, state, result and error of one asynchronous read.
///
/// The result is only defined once the state is [`ReadState::Completed`] and no
/// error is set; callers must check [`error`](Self::error) on every completed
/// delivery before trusting [`result`](Self::result).
#[derive(Debug, Clone)]
pub struct ReadEnvelope<K, T> {
    key: K,
    progress: f32,
    state: ReadState,
    result: Option<T>,
    error: Option<ContentError>,
    cancellation: CancellationFlag,
}

impl<K, T> ReadEnvelope<K, T> {
    /// An in-progress report. `progress` is clamped to `[0, 100]`.
    pub fn working(key: K, progress: f32, cancellation: CancellationFlag) -> Self {
        Self {
            key,
            progress: clamp_progress(progress),
            state: ReadState::Working,
            result: None,
            error: None,
            cancellation,
        }
    }

    /// The terminal report, at 100 percent.
    pub fn completed(
        key: K,
        outcome: Result<T, ContentError>,
        cancellation: CancellationFlag,
    ) -> Self {
        let (result, error) = match outcome {
            Ok(value) => (Some(value), None),
            Err(err) => (None, Some(err)),
        };
        Self {
            key,
            progress: 100.0,
            state: ReadState::Completed,
            result,
            error,
            cancellation,
        }
    }

    /// The key being read.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Progress in percent, within `[0, 100]`.
    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// The lifecycle state.
    pub fn state(&self) -> ReadState {
        self.state
    }

    /// Shorthand for `state() == ReadState::Completed`.
    pub fn is_completed(&self) -> bool {
        self.state == ReadState::Completed
    }

    /// The loaded value, on successful completion.
    pub fn result(&self) -> Option<&T> {
        self.result.as_ref()
    }

    /// The failure, if the read completed with one.
    pub fn error(&self) -> Option<&ContentError> {
        self.error.as_ref()
    }

    /// Requests cancellation of the operation this envelope belongs to.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Returns `true` once cancellation has been requested.
    pub fn is_canceled(&self) -> bool {
        self.cancellation.is_canceled()
    }

    /// The flag shared by the whole operation.
    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancellation
    }

    /// The outcome of a completed read; `None` while still working.
    pub fn into_result(self) -> Option<Result<T, ContentError>> {
        match (self.state, self.error, self.result) {
            (ReadState::Working, _, _) => None,
            (ReadState::Completed, Some(err), _) => Some(Err(err)),
            (ReadState::Completed, None, Some(value)) => Some(Ok(value)),
            (ReadState::Completed, None, None) => None,
        }
    }

    /// Projects the result into another representation, keeping everything else.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ReadEnvelope<K, U> {
        ReadEnvelope {
            key: self.key,
            progress: self.progress,
            state: self.state,
            result: self.result.map(f),
            error: self.error,
            cancellation: self.cancellation,
        }
    }
}

fn clamp_progress(progress: f32) -> f32 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 100.0)
    }
}
