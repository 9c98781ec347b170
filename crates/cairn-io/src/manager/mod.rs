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

//! The content manager: cache, registries and dispatch in one handle.

mod builder;
mod metrics;
mod pending;
mod queue;

pub use builder::ContentManagerBuilder;
pub use metrics::{ContentMetrics, CONTENT_NAMESPACE};

use crate::reader::{DynReader, ReadProgress, Reader, ReaderSlot};
use crate::registry::{Enumeration, LoaderEntry, LoaderRegistry};
use crate::writer::{DynWriter, WriteCompletion, Writer, WriterSlot};
use cairn_core::{
    validate_key, Asset, AssetHandle, CancellationFlag, ContentConfig, ContentError, ContentKey,
    LoaderKind, ReadEnvelope, TypeToken,
};
use cairn_data::CacheStore;
use pending::{Follower, PendingLoads, Sink};
use queue::QueueCounter;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// The envelope delivered to asynchronous load callbacks.
pub type LoadEnvelope<K, A> = ReadEnvelope<K, AssetHandle<A>>;

struct Shared<K: ContentKey> {
    cache: CacheStore<K>,
    readers: LoaderRegistry<dyn DynReader<K>>,
    writers: LoaderRegistry<dyn DynWriter<K>>,
    loading: QueueCounter,
    saving: QueueCounter,
    root_directory: RwLock<PathBuf>,
    auto_dispose_on_unload: AtomicBool,
    pending: Option<PendingLoads<K>>,
    metrics: Option<ContentMetrics>,
}

impl<K: ContentKey> Shared<K> {
    fn track_loading(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.record_loading_queue(self.loading.get());
        }
    }

    fn track_saving(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.record_saving_queue(self.saving.get());
        }
    }

    fn track_cache(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.record_cached_assets(self.cache.len());
        }
    }
}

/// Loads, caches and saves assets of any registered type under keys of type `K`.
///
/// The manager is a cheap handle over shared state: clones see the same cache,
/// registries and counters, so a clone can travel with an asynchronous read to
/// whichever thread completes it.
///
/// A request for type `A` is routed to the readers registered for `A`, in
/// registration order, and served by the first one whose
/// [`can_read`](Reader::can_read) accepts the key. Validation and resolution
/// failures are always returned directly to the caller, including from the
/// asynchronous entry points. Only failures raised while a loader works travel
/// inside the completed envelope.
pub struct ContentManager<K: ContentKey> {
    inner: Arc<Shared<K>>,
}

impl<K: ContentKey> Clone for ContentManager<K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K: ContentKey> ContentManager<K> {
    /// Creates a manager from `config`, without metrics.
    pub fn new(config: ContentConfig) -> Self {
        Self::from_parts(config, None)
    }

    /// Starts building a manager.
    pub fn builder() -> ContentManagerBuilder<K> {
        ContentManagerBuilder::new()
    }

    pub(crate) fn from_parts(config: ContentConfig, metrics: Option<ContentMetrics>) -> Self {
        log::debug!(
            "Creating content manager for {} keys (root: '{}')",
            std::any::type_name::<K>(),
            config.root_directory.display()
        );
        Self {
            inner: Arc::new(Shared {
                cache: CacheStore::new(),
                readers: LoaderRegistry::new(LoaderKind::Reader),
                writers: LoaderRegistry::new(LoaderKind::Writer),
                loading: QueueCounter::default(),
                saving: QueueCounter::default(),
                root_directory: RwLock::new(config.root_directory),
                auto_dispose_on_unload: AtomicBool::new(config.auto_dispose_on_unload),
                pending: config.coalesce_in_flight_loads.then(PendingLoads::new),
                metrics,
            }),
        }
    }

    // --- Registration ---

    /// Registers `reader` as a source of `A`.
    ///
    /// # Errors
    /// [`ContentError::DuplicateRegistration`] if this very instance already
    /// reads `A`.
    pub fn register_reader<A, R>(&self, reader: Arc<R>) -> Result<(), ContentError>
    where
        A: Asset,
        R: Reader<K, A>,
    {
        let slot: Arc<dyn DynReader<K>> = Arc::new(ReaderSlot::<K, A>::new(reader));
        self.inner.readers.register(slot)
    }

    /// Registers `writer` as a sink for `A`.
    ///
    /// # Errors
    /// [`ContentError::DuplicateRegistration`] if this very instance already
    /// writes `A`.
    pub fn register_writer<A, W>(&self, writer: Arc<W>) -> Result<(), ContentError>
    where
        A: Asset,
        W: Writer<K, A>,
    {
        let slot: Arc<dyn DynWriter<K>> = Arc::new(WriterSlot::<K, A>::new(writer));
        self.inner.writers.register(slot)
    }

    /// Every registered reader, grouped by type in first-registration order.
    pub fn readers(&self) -> Enumeration<dyn DynReader<K>> {
        self.inner.readers.enumerate(None)
    }

    /// Every registered writer, grouped by type in first-registration order.
    pub fn writers(&self) -> Enumeration<dyn DynWriter<K>> {
        self.inner.writers.enumerate(None)
    }

    /// The readers registered for `A`, in registration order.
    pub fn readers_for<A: Asset>(&self) -> Enumeration<dyn DynReader<K>> {
        self.inner.readers.enumerate(Some(TypeToken::of::<A>()))
    }

    /// The writers registered for `A`, in registration order.
    pub fn writers_for<A: Asset>(&self) -> Enumeration<dyn DynWriter<K>> {
        self.inner.writers.enumerate(Some(TypeToken::of::<A>()))
    }

    // --- Loading ---

    /// Loads `key` as `A`, caching a freshly read asset.
    pub fn load<A: Asset>(&self, key: &K) -> Result<AssetHandle<A>, ContentError> {
        self.load_with_caching(key, true)
    }

    /// Loads `key` as `A`, blocking until the reader returns.
    ///
    /// A cached asset is returned whatever `cache` says; the flag only decides
    /// whether a freshly read asset is stored. When another load stored the key
    /// first, that entry is kept and this call still returns its own asset.
    ///
    /// # Errors
    /// - [`ContentError::InvalidKey`] for a blank key.
    /// - [`ContentError::TypeMismatch`] if the key is cached as another type.
    /// - [`ContentError::NoLoaderForType`] / [`ContentError::NoAcceptingLoader`]
    ///   when no reader takes the request.
    /// - [`ContentError::LoaderFailure`] wrapping the reader's own error.
    pub fn load_with_caching<A: Asset>(
        &self,
        key: &K,
        cache: bool,
    ) -> Result<AssetHandle<A>, ContentError> {
        validate_key(key)?;
        if let Some(hit) = self.lookup::<A>(key)? {
            return Ok(hit);
        }

        let entry = self.resolve_reader::<A>(key)?;
        let slot = Self::typed_reader::<A>(&*entry)?;

        let asset = {
            let _timer = self.inner.metrics.as_ref().map(ContentMetrics::time_load);
            slot.reader()
                .read(key, self)
                .map_err(|e| ContentError::loader_failure(LoaderKind::Reader, key, e))?
        };

        let handle = AssetHandle::new(asset);
        if cache {
            self.inner
                .cache
                .insert_if_absent(key.clone(), handle.clone().into_erased());
            self.inner.track_cache();
        }
        if let Some(metrics) = &self.inner.metrics {
            metrics.record_load();
        }
        Ok(handle)
    }

    /// Starts loading `key` as `A`, caching the result.
    pub fn load_async<A, F>(
        &self,
        key: K,
        on_complete: F,
    ) -> Result<CancellationFlag, ContentError>
    where
        A: Asset,
        F: FnMut(LoadEnvelope<K, A>) + Send + 'static,
    {
        self.load_async_with_caching(key, true, on_complete)
    }

    /// Starts loading `key` as `A` without blocking.
    ///
    /// `on_complete` receives every progress report followed by exactly one
    /// completed envelope, possibly on another thread. A cached asset is
    /// delivered inline, before this call returns, and is not counted in
    /// [`loading_queue`](Self::loading_queue).
    ///
    /// The returned flag is shared with every envelope of this load; setting it
    /// asks the reader to stop early.
    ///
    /// # Errors
    /// The validation and resolution errors of
    /// [`load_with_caching`](Self::load_with_caching), raised before any
    /// envelope is delivered.
    pub fn load_async_with_caching<A, F>(
        &self,
        key: K,
        cache: bool,
        on_complete: F,
    ) -> Result<CancellationFlag, ContentError>
    where
        A: Asset,
        F: FnMut(LoadEnvelope<K, A>) + Send + 'static,
    {
        validate_key(&key)?;
        let cancellation = CancellationFlag::new();
        let mut on_complete: Sink<K, A> = Box::new(on_complete);

        if let Some(hit) = self.lookup::<A>(&key)? {
            on_complete(ReadEnvelope::completed(key, Ok(hit), cancellation.clone()));
            return Ok(cancellation);
        }

        let entry = self.resolve_reader::<A>(&key)?;
        let slot = Self::typed_reader::<A>(&*entry)?;

        if let Some(pending) = &self.inner.pending {
            match pending.join_or_lead(&key, Follower::new(on_complete, cancellation.clone(), cache)) {
                None => return Ok(cancellation),
                Some(leader) => on_complete = leader.into_sink(),
            }
        }

        let queued = self.inner.loading.increment();
        self.inner.track_loading();
        log::debug!("Reading {:?} asynchronously ({} in flight)", key, queued);

        let inner = self.inner.clone();
        let deliver = Box::new(move |envelope: LoadEnvelope<K, A>| {
            if !envelope.is_completed() {
                on_complete(envelope);
                return;
            }

            inner.loading.decrement();
            inner.track_loading();
            let followers = match &inner.pending {
                Some(pending) => pending.finish::<A>(envelope.key()),
                None => Vec::new(),
            };
            if let Some(handle) = envelope.result() {
                if cache || followers.iter().any(Follower::wants_cache) {
                    inner
                        .cache
                        .insert_if_absent(envelope.key().clone(), handle.clone().into_erased());
                    inner.track_cache();
                }
                if let Some(metrics) = &inner.metrics {
                    metrics.record_load();
                }
            }
            for follower in followers {
                follower.deliver(&envelope);
            }
            on_complete(envelope);
        });

        let progress = ReadProgress::new(key.clone(), cancellation.clone(), deliver);
        slot.reader().read_async(key, self.clone(), progress);
        Ok(cancellation)
    }

    /// Starts loading `key` as `A` and returns a channel carrying its envelopes.
    ///
    /// The channel yields the same sequence a callback would receive, ending
    /// with the completed envelope.
    pub fn load_channel<A: Asset>(
        &self,
        key: K,
        cache: bool,
    ) -> Result<flume::Receiver<LoadEnvelope<K, A>>, ContentError> {
        let (sender, receiver) = flume::unbounded();
        self.load_async_with_caching::<A, _>(key, cache, move |envelope| {
            if sender.send(envelope).is_err() {
                log::trace!("Load channel receiver dropped, discarding envelope");
            }
        })?;
        Ok(receiver)
    }

    fn lookup<A: Asset>(&self, key: &K) -> Result<Option<AssetHandle<A>>, ContentError> {
        let hit = self.cached::<A>(key)?;
        if hit.is_some() {
            log::trace!("Cache hit for {:?}", key);
        }
        if let Some(metrics) = &self.inner.metrics {
            if hit.is_some() {
                metrics.record_cache_hit();
            } else {
                metrics.record_cache_miss();
            }
        }
        Ok(hit)
    }

    fn resolve_reader<A: Asset>(&self, key: &K) -> Result<Arc<dyn DynReader<K>>, ContentError> {
        self.inner
            .readers
            .resolve(TypeToken::of::<A>(), key, |reader| reader.can_read(key, self))
    }

    fn resolve_writer<A: Asset>(&self, key: &K) -> Result<Arc<dyn DynWriter<K>>, ContentError> {
        self.inner
            .writers
            .resolve(TypeToken::of::<A>(), key, |writer| writer.can_write(key, self))
    }

    fn typed_reader<A: Asset>(
        entry: &dyn DynReader<K>,
    ) -> Result<&ReaderSlot<K, A>, ContentError> {
        ReaderSlot::<K, A>::downcast(entry).ok_or_else(|| {
            log::error!("Reader '{}' is filed under the wrong type", entry.loader_name());
            ContentError::NoLoaderForType {
                type_name: TypeToken::of::<A>().name(),
            }
        })
    }

    fn typed_writer<A: Asset>(
        entry: &dyn DynWriter<K>,
    ) -> Result<&WriterSlot<K, A>, ContentError> {
        WriterSlot::<K, A>::downcast(entry).ok_or_else(|| {
            log::error!("Writer '{}' is filed under the wrong type", entry.loader_name());
            ContentError::NoWriterForType {
                type_name: TypeToken::of::<A>().name(),
            }
        })
    }

    // --- Saving ---

    /// Persists `data` under `key`, blocking until the writer returns.
    ///
    /// Saving never reads nor fills the cache.
    ///
    /// # Errors
    /// [`ContentError::InvalidKey`], [`ContentError::NoWriterForType`],
    /// [`ContentError::NoAcceptingWriter`], or [`ContentError::LoaderFailure`]
    /// wrapping the writer's own error.
    pub fn save<A: Asset>(&self, key: &K, data: &A) -> Result<(), ContentError> {
        validate_key(key)?;
        let entry = self.resolve_writer::<A>(key)?;
        let slot = Self::typed_writer::<A>(&*entry)?;

        slot.writer()
            .write(key, data, self)
            .map_err(|e| ContentError::loader_failure(LoaderKind::Writer, key, e))?;
        if let Some(metrics) = &self.inner.metrics {
            metrics.record_save();
        }
        Ok(())
    }

    /// Starts persisting `data` under `key` without blocking.
    ///
    /// `on_complete` is called exactly once with the writer's outcome.
    ///
    /// # Errors
    /// The validation and resolution errors of [`save`](Self::save), raised
    /// before the writer is invoked.
    pub fn save_async<A, F>(
        &self,
        key: K,
        data: AssetHandle<A>,
        on_complete: F,
    ) -> Result<(), ContentError>
    where
        A: Asset,
        F: FnOnce(Result<(), ContentError>) + Send + 'static,
    {
        validate_key(&key)?;
        let entry = self.resolve_writer::<A>(&key)?;
        let slot = Self::typed_writer::<A>(&*entry)?;

        let queued = self.inner.saving.increment();
        self.inner.track_saving();
        log::debug!("Writing {:?} asynchronously ({} in flight)", key, queued);

        let inner = self.inner.clone();
        let completion = WriteCompletion::new(
            key.clone(),
            Box::new(move |outcome: Result<(), ContentError>| {
                inner.saving.decrement();
                inner.track_saving();
                if outcome.is_ok() {
                    if let Some(metrics) = &inner.metrics {
                        metrics.record_save();
                    }
                }
                on_complete(outcome);
            }),
        );
        slot.writer().write_async(key, data, self.clone(), completion);
        Ok(())
    }

    /// Starts persisting `data` under `key` and returns a channel that receives
    /// the outcome.
    pub fn save_channel<A: Asset>(
        &self,
        key: K,
        data: AssetHandle<A>,
    ) -> Result<flume::Receiver<Result<(), ContentError>>, ContentError> {
        let (sender, receiver) = flume::bounded(1);
        self.save_async(key, data, move |outcome| {
            if sender.send(outcome).is_err() {
                log::trace!("Save channel receiver dropped, discarding outcome");
            }
        })?;
        Ok(receiver)
    }

    // --- Cache ---

    /// The cached asset for `key`, if any.
    ///
    /// # Errors
    /// [`ContentError::InvalidKey`] for a blank key, and
    /// [`ContentError::TypeMismatch`] when `key` is cached as another type.
    pub fn cached<A: Asset>(&self, key: &K) -> Result<Option<AssetHandle<A>>, ContentError> {
        validate_key(key)?;
        let Some(erased) = self.inner.cache.try_get(key) else {
            return Ok(None);
        };
        match AssetHandle::from_erased(&erased) {
            Some(handle) => Ok(Some(handle)),
            None => Err(ContentError::TypeMismatch {
                key: format!("{key:?}"),
                expected: TypeToken::of::<A>().name(),
                found: erased.token().name(),
            }),
        }
    }

    /// Caches `asset` under `key` unless the key is already cached.
    ///
    /// Returns `true` if the asset was stored. Blank keys are never stored.
    pub fn insert_cached<A: Asset>(&self, key: K, asset: AssetHandle<A>) -> bool {
        if !key.is_valid_key() {
            log::warn!("Refusing to cache an asset under invalid key {:?}", key);
            return false;
        }
        let stored = self.inner.cache.insert_if_absent(key, asset.into_erased());
        if stored {
            self.inner.track_cache();
        }
        stored
    }

    /// Whether anything is cached under `key`.
    pub fn is_cached(&self, key: &K) -> bool {
        self.inner.cache.contains(key)
    }

    /// Number of cached assets.
    pub fn cached_count(&self) -> usize {
        self.inner.cache.len()
    }

    /// Drops every cached asset and returns how many there were.
    ///
    /// With [`auto_dispose_on_unload`](Self::auto_dispose_on_unload) set, each
    /// disposable asset is released once first. The cache ends up empty even
    /// when a release fails.
    ///
    /// # Errors
    /// [`ContentError::Dispose`] for the first release that failed. Later
    /// assets are not released.
    pub fn unload(&self) -> Result<usize, ContentError> {
        let dispose = self.auto_dispose_on_unload();
        let cleared = self.inner.cache.clear(dispose);
        self.inner.track_cache();
        let count = cleared?;
        log::info!("Unloaded {} cached asset(s) (dispose: {})", count, dispose);
        Ok(count)
    }

    // --- State ---

    /// Asynchronous loads accepted and not yet completed.
    pub fn loading_queue(&self) -> usize {
        self.inner.loading.get()
    }

    /// Asynchronous saves accepted and not yet completed.
    pub fn saving_queue(&self) -> usize {
        self.inner.saving.get()
    }

    /// The directory relative keys are resolved against.
    pub fn root_directory(&self) -> PathBuf {
        self.inner
            .root_directory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Changes the directory relative keys are resolved against.
    pub fn set_root_directory(&self, root: impl Into<PathBuf>) {
        let root = root.into();
        log::debug!("Content root directory set to '{}'", root.display());
        *self
            .inner
            .root_directory
            .write()
            .unwrap_or_else(PoisonError::into_inner) = root;
    }

    /// Whether [`unload`](Self::unload) disposes cached assets.
    pub fn auto_dispose_on_unload(&self) -> bool {
        self.inner.auto_dispose_on_unload.load(Ordering::Acquire)
    }

    /// Sets whether [`unload`](Self::unload) disposes cached assets.
    pub fn set_auto_dispose_on_unload(&self, enabled: bool) {
        self.inner
            .auto_dispose_on_unload
            .store(enabled, Ordering::Release);
    }

    /// The metrics this manager reports into, if it was built with any.
    pub fn metrics(&self) -> Option<&ContentMetrics> {
        self.inner.metrics.as_ref()
    }
}

impl<K: ContentKey> Default for ContentManager<K> {
    fn default() -> Self {
        Self::new(ContentConfig::default())
    }
}

impl<K: ContentKey> fmt::Debug for ContentManager<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentManager")
            .field("root_directory", &self.root_directory())
            .field("cached", &self.cached_count())
            .field("readers", &self.inner.readers.len())
            .field("writers", &self.inner.writers.len())
            .field("loading_queue", &self.loading_queue())
            .field("saving_queue", &self.saving_queue())
            .field(
                "coalescing",
                &self.inner.pending.as_ref().map(PendingLoads::in_flight),
            )
            .finish()
    }
}
