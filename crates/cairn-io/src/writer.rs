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

//! The writer capability: persisting an asset under a key.

use crate::manager::ContentManager;
use crate::registry::LoaderEntry;
use cairn_core::{Asset, AssetHandle, BoxedError, ContentError, ContentKey, LoaderKind, TypeToken};
use std::any::Any;
use std::sync::Arc;

/// A plugin that persists data of type `A` under keys of type `K`.
pub trait Writer<K: ContentKey, A: Asset>: Send + Sync + 'static {
    /// Writes `data` synchronously, blocking the calling thread.
    fn write(&self, key: &K, data: &A, content: &ContentManager<K>) -> Result<(), BoxedError>;

    /// Whether this writer accepts `key`. Must be free of side effects on the
    /// manager.
    fn can_write(&self, key: &K, content: &ContentManager<K>) -> bool;

    /// Writes `data` without blocking the caller, finishing through `completion`.
    /// The default runs [`write`](Writer::write) inline.
    fn write_async(
        &self,
        key: K,
        data: AssetHandle<A>,
        content: ContentManager<K>,
        completion: WriteCompletion<K>,
    ) {
        let result = self.write(&key, &data, &content);
        completion.complete(result);
    }
}

/// The object-safe view of a registered writer.
pub trait DynWriter<K: ContentKey>: LoaderEntry {
    /// Forwards to [`Writer::can_write`].
    fn can_write(&self, key: &K, content: &ContentManager<K>) -> bool;

    /// Used by the manager to recover the typed writer.
    fn as_any(&self) -> &dyn Any;
}

pub(crate) struct WriterSlot<K: ContentKey, A: Asset> {
    writer: Arc<dyn Writer<K, A>>,
    name: &'static str,
    identity: usize,
}

impl<K: ContentKey, A: Asset> WriterSlot<K, A> {
    pub(crate) fn new<W: Writer<K, A>>(writer: Arc<W>) -> Self {
        Self {
            identity: Arc::as_ptr(&writer) as *const () as usize,
            name: std::any::type_name::<W>(),
            writer,
        }
    }

    pub(crate) fn downcast(entry: &dyn DynWriter<K>) -> Option<&Self> {
        entry.as_any().downcast_ref::<Self>()
    }

    pub(crate) fn writer(&self) -> &dyn Writer<K, A> {
        self.writer.as_ref()
    }
}

impl<K: ContentKey, A: Asset> LoaderEntry for WriterSlot<K, A> {
    fn produced(&self) -> TypeToken {
        TypeToken::of::<A>()
    }

    fn loader_name(&self) -> &'static str {
        self.name
    }

    fn identity(&self) -> usize {
        self.identity
    }
}

impl<K: ContentKey, A: Asset> DynWriter<K> for WriterSlot<K, A> {
    fn can_write(&self, key: &K, content: &ContentManager<K>) -> bool {
        self.writer.can_write(key, content)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

type Notify = Box<dyn FnOnce(Result<(), ContentError>) + Send>;

/// Completion handle of an asynchronous write.
///
/// Consumed by [`complete`](Self::complete). Dropping it unused reports
/// [`ContentError::Abandoned`].
pub struct WriteCompletion<K: ContentKey> {
    key: K,
    notify: Option<Notify>,
}

impl<K: ContentKey> WriteCompletion<K> {
    pub(crate) fn new(key: K, notify: Notify) -> Self {
        Self {
            key,
            notify: Some(notify),
        }
    }

    /// The key being written.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Finishes the write with the writer's outcome.
    pub fn complete(mut self, result: Result<(), BoxedError>) {
        let outcome =
            result.map_err(|e| ContentError::loader_failure(LoaderKind::Writer, &self.key, e));
        self.finish(outcome);
    }

    fn finish(&mut self, outcome: Result<(), ContentError>) {
        if let Some(notify) = self.notify.take() {
            notify(outcome);
        }
    }
}

impl<K: ContentKey> Drop for WriteCompletion<K> {
    fn drop(&mut self) {
        if self.notify.is_some() {
            log::warn!("Asynchronous write of {:?} was dropped before completing", self.key);
            let err = ContentError::Abandoned {
                kind: LoaderKind::Writer,
                key: format!("{:?}", self.key),
            };
            self.finish(Err(err));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_completion_reports_once() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let completion = WriteCompletion::new(
            "save.ron".to_string(),
            Box::new(move |outcome: Result<(), ContentError>| {
                sink.lock().unwrap().push(outcome.is_ok())
            }),
        );
        completion.complete(Ok(()));
        assert_eq!(*seen.lock().unwrap(), vec![true]);
    }

    #[test]
    fn test_dropped_completion_reports_abandoned() {
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let completion = WriteCompletion::new(
            7u64,
            Box::new(move |outcome: Result<(), ContentError>| {
                *sink.lock().unwrap() = Some(outcome)
            }),
        );
        drop(completion);

        let outcome = seen.lock().unwrap().take().unwrap();
        assert!(matches!(
            outcome,
            Err(ContentError::Abandoned {
                kind: LoaderKind::Writer,
                ..
            })
        ));
    }
}
