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

//! The reader capability: turning a key into an asset.

use crate::manager::ContentManager;
use crate::registry::LoaderEntry;
use cairn_core::{
    Asset, AssetHandle, BoxedError, CancellationFlag, ContentError, ContentKey, LoaderKind,
    ReadEnvelope, TypeToken,
};
use std::any::Any;
use std::sync::Arc;

/// A plugin that produces assets of type `A` from keys of type `K`.
///
/// The produced type `A` is the reader's declaration: the manager dispatches a
/// request for `A` only to readers registered for `A`, then asks each of them in
/// registration order whether it [can read](Reader::can_read) the key.
pub trait Reader<K: ContentKey, A: Asset>: Send + Sync + 'static {
    /// Loads the asset synchronously, blocking the calling thread.
    fn read(&self, key: &K, content: &ContentManager<K>) -> Result<A, BoxedError>;

    /// Whether this reader accepts `key`.
    ///
    /// May inspect the file system or the key's shape, but must not touch the
    /// manager's cache or registry.
    fn can_read(&self, key: &K, content: &ContentManager<K>) -> bool;

    /// Loads the asset without blocking the caller.
    ///
    /// Implementations report through `progress`, possibly from another thread,
    /// and finish with [`ReadProgress::complete`]. The default runs
    /// [`read`](Reader::read) inline.
    fn read_async(&self, key: K, content: ContentManager<K>, progress: ReadProgress<K, A>) {
        let result = self.read(&key, &content);
        progress.complete(result);
    }
}

/// The object-safe view of a registered reader.
pub trait DynReader<K: ContentKey>: LoaderEntry {
    /// Forwards to [`Reader::can_read`].
    fn can_read(&self, key: &K, content: &ContentManager<K>) -> bool;

    /// Used by the manager to recover the typed reader.
    fn as_any(&self) -> &dyn Any;
}

/// Binds a reader to the asset type it was registered for.
pub(crate) struct ReaderSlot<K: ContentKey, A: Asset> {
    reader: Arc<dyn Reader<K, A>>,
    name: &'static str,
    identity: usize,
}

impl<K: ContentKey, A: Asset> ReaderSlot<K, A> {
    pub(crate) fn new<R: Reader<K, A>>(reader: Arc<R>) -> Self {
        Self {
            identity: Arc::as_ptr(&reader) as *const () as usize,
            name: std::any::type_name::<R>(),
            reader,
        }
    }

    pub(crate) fn downcast(entry: &dyn DynReader<K>) -> Option<&Self> {
        entry.as_any().downcast_ref::<Self>()
    }

    pub(crate) fn reader(&self) -> &dyn Reader<K, A> {
        self.reader.as_ref()
    }
}

impl<K: ContentKey, A: Asset> LoaderEntry for ReaderSlot<K, A> {
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

impl<K: ContentKey, A: Asset> DynReader<K> for ReaderSlot<K, A> {
    fn can_read(&self, key: &K, content: &ContentManager<K>) -> bool {
        self.reader.can_read(key, content)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

type Deliver<K, A> = Box<dyn FnMut(ReadEnvelope<K, AssetHandle<A>>) + Send>;

/// The sink an asynchronous reader reports through.
///
/// Progress reports are clamped to `[0, 100]` and never go backwards. The sink
/// is consumed by [`complete`](Self::complete), so exactly one completed envelope
/// is delivered per read. A sink dropped without completing delivers a completed
/// envelope carrying [`ContentError::Abandoned`] so the manager's bookkeeping
/// always settles.
pub struct ReadProgress<K: ContentKey, A: Asset> {
    key: K,
    last: f32,
    cancellation: CancellationFlag,
    deliver: Option<Deliver<K, A>>,
}

impl<K: ContentKey, A: Asset> ReadProgress<K, A> {
    pub(crate) fn new(key: K, cancellation: CancellationFlag, deliver: Deliver<K, A>) -> Self {
        Self {
            key,
            last: 0.0,
            cancellation,
            deliver: Some(deliver),
        }
    }

    /// The key being read.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Returns `true` once the caller asked to cancel. Readers should stop
    /// working and complete promptly.
    pub fn is_canceled(&self) -> bool {
        self.cancellation.is_canceled()
    }

    /// The last progress reported, in percent.
    pub fn last_progress(&self) -> f32 {
        self.last
    }

    /// Reports intermediate progress, in percent.
    ///
    /// Values below the last report are raised to it. Reports made after
    /// cancellation are dropped.
    pub fn report(&mut self, progress: f32) {
        if self.is_canceled() {
            log::trace!("Dropping progress report for canceled read of {:?}", self.key);
            return;
        }
        let progress = if progress.is_nan() { 0.0 } else { progress };
        self.last = progress.clamp(self.last, 100.0);
        if let Some(deliver) = self.deliver.as_mut() {
            deliver(ReadEnvelope::working(
                self.key.clone(),
                self.last,
                self.cancellation.clone(),
            ));
        }
    }

    /// Finishes the read with the reader's outcome.
    pub fn complete(mut self, result: Result<A, BoxedError>) {
        let outcome = result
            .map(AssetHandle::new)
            .map_err(|e| ContentError::loader_failure(LoaderKind::Reader, &self.key, e));
        self.finish(outcome);
    }

    /// Finishes the read with an already shared asset.
    pub fn complete_shared(mut self, result: Result<AssetHandle<A>, BoxedError>) {
        let outcome =
            result.map_err(|e| ContentError::loader_failure(LoaderKind::Reader, &self.key, e));
        self.finish(outcome);
    }

    fn finish(&mut self, outcome: Result<AssetHandle<A>, ContentError>) {
        if let Some(mut deliver) = self.deliver.take() {
            self.last = 100.0;
            deliver(ReadEnvelope::completed(
                self.key.clone(),
                outcome,
                self.cancellation.clone(),
            ));
        }
    }
}

impl<K: ContentKey, A: Asset> Drop for ReadProgress<K, A> {
    fn drop(&mut self) {
        if self.deliver.is_some() {
            log::warn!("Asynchronous read of {:?} was dropped before completing", self.key);
            let err = ContentError::Abandoned {
                kind: LoaderKind::Reader,
                key: format!("{:?}", self.key),
            };
            self.finish(Err(err));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::ReadState;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct Doc(&'static str);
    impl Asset for Doc {}

    type Log = Arc<Mutex<Vec<(ReadState, f32, bool)>>>;

    fn recording_sink(flag: CancellationFlag) -> (ReadProgress<String, Doc>, Log) {
        let log: Log = Arc::default();
        let sink_log = log.clone();
        let sink = ReadProgress::new(
            "doc.html".to_string(),
            flag,
            Box::new(move |envelope: ReadEnvelope<String, AssetHandle<Doc>>| {
                sink_log.lock().unwrap().push((
                    envelope.state(),
                    envelope.progress(),
                    envelope.error().is_some(),
                ));
            }),
        );
        (sink, log)
    }

    #[test]
    fn test_progress_is_monotonic_and_clamped() {
        let (mut sink, log) = recording_sink(CancellationFlag::new());
        sink.report(10.0);
        sink.report(5.0);
        sink.report(250.0);
        sink.complete(Ok(Doc("<html/>")));

        let log = log.lock().unwrap();
        let progress: Vec<f32> = log.iter().map(|(_, p, _)| *p).collect();
        assert_eq!(progress, vec![10.0, 10.0, 100.0, 100.0]);
        assert_eq!(log.last().unwrap().0, ReadState::Completed);
        assert_eq!(log.iter().filter(|e| e.0 == ReadState::Completed).count(), 1);
    }

    #[test]
    fn test_reports_after_cancel_are_dropped() {
        let flag = CancellationFlag::new();
        let (mut sink, log) = recording_sink(flag.clone());
        sink.report(20.0);
        flag.cancel();
        assert!(sink.is_canceled());
        sink.report(40.0);
        sink.complete(Err("canceled".into()));

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1], (ReadState::Completed, 100.0, true));
    }

    #[test]
    fn test_complete_shared_hands_over_the_same_asset() {
        let shared = AssetHandle::new(Doc("<p/>"));
        let delivered = Arc::new(Mutex::new(None));
        let slot = delivered.clone();
        let sink = ReadProgress::<String, Doc>::new(
            "doc.html".to_string(),
            CancellationFlag::new(),
            Box::new(move |envelope: ReadEnvelope<String, AssetHandle<Doc>>| {
                *slot.lock().unwrap() = envelope.into_result();
            }),
        );
        sink.complete_shared(Ok(shared.clone()));

        let outcome = delivered.lock().unwrap().take().unwrap();
        assert!(AssetHandle::ptr_eq(&outcome.unwrap(), &shared));
    }

    #[test]
    fn test_dropped_sink_completes_with_abandoned() {
        let (sink, log) = recording_sink(CancellationFlag::new());
        drop(sink);

        let log = log.lock().unwrap();
        assert_eq!(log.as_slice(), &[(ReadState::Completed, 100.0, true)]);
    }
}
