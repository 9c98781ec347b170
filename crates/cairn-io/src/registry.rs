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

//! Ordered, type-keyed registration of readers and writers.

use ahash::AHashMap;
use cairn_core::{ContentError, LoaderKind, TypeToken};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// What the registry needs to know about a registered loader.
pub trait LoaderEntry: Send + Sync {
    /// The asset type this loader declares it produces (or persists).
    fn produced(&self) -> TypeToken;

    /// A readable name, used in logs and errors.
    fn loader_name(&self) -> &'static str;

    /// Identity of the underlying loader instance. Two entries with the same
    /// identity are the same loader.
    fn identity(&self) -> usize;
}

struct Slots<L: ?Sized> {
    order: Vec<TypeToken>,
    by_type: AHashMap<TypeToken, Vec<Arc<L>>>,
}

impl<L: ?Sized> Default for Slots<L> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            by_type: AHashMap::new(),
        }
    }
}

/// Loaders grouped by the type they produce, each group in registration order.
pub struct LoaderRegistry<L: ?Sized + LoaderEntry> {
    kind: LoaderKind,
    slots: RwLock<Slots<L>>,
}

impl<L: ?Sized + LoaderEntry> LoaderRegistry<L> {
    /// Creates an empty registry whose errors name `kind`.
    pub fn new(kind: LoaderKind) -> Self {
        Self {
            kind,
            slots: RwLock::new(Slots::default()),
        }
    }

    /// Whether this registry holds readers or writers.
    pub fn kind(&self) -> LoaderKind {
        self.kind
    }

    fn read(&self) -> RwLockReadGuard<'_, Slots<L>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Slots<L>> {
        self.slots.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `entry` to the list of its produced type.
    ///
    /// Fails with [`ContentError::DuplicateRegistration`] when the same loader
    /// instance is already registered for that type.
    pub fn register(&self, entry: Arc<L>) -> Result<(), ContentError> {
        let token = entry.produced();
        let mut slots = self.write();

        if let Some(existing) = slots.by_type.get(&token) {
            if existing.iter().any(|e| e.identity() == entry.identity()) {
                return Err(ContentError::DuplicateRegistration {
                    kind: self.kind,
                    loader: entry.loader_name(),
                    type_name: token.name(),
                });
            }
        }

        log::info!(
            "Registered {} '{}' for type '{}'",
            self.kind,
            entry.loader_name(),
            token.name()
        );
        let Slots { order, by_type } = &mut *slots;
        by_type
            .entry(token)
            .or_insert_with(|| {
                order.push(token);
                Vec::new()
            })
            .push(entry);
        Ok(())
    }

    /// A snapshot of the loaders registered for `token`, or `None` when the type
    /// has never been registered.
    pub fn candidates(&self, token: TypeToken) -> Option<Vec<Arc<L>>> {
        self.read().by_type.get(&token).cloned()
    }

    /// Picks the first loader for `token`, in registration order, that `accept`
    /// agrees to.
    ///
    /// The lock is released before `accept` runs.
    pub fn resolve(
        &self,
        token: TypeToken,
        key: &dyn fmt::Debug,
        mut accept: impl FnMut(&L) -> bool,
    ) -> Result<Arc<L>, ContentError> {
        let Some(candidates) = self.candidates(token) else {
            return Err(self.no_loader(token));
        };

        let chosen = candidates.into_iter().find(|candidate| accept(&**candidate));
        match chosen {
            Some(loader) => {
                log::debug!(
                    "Resolved {} '{}' for {:?} as '{}'",
                    self.kind,
                    loader.loader_name(),
                    key,
                    token.name()
                );
                Ok(loader)
            }
            None => Err(self.none_accepting(token, key)),
        }
    }

    fn no_loader(&self, token: TypeToken) -> ContentError {
        let type_name = token.name();
        match self.kind {
            LoaderKind::Reader => ContentError::NoLoaderForType { type_name },
            LoaderKind::Writer => ContentError::NoWriterForType { type_name },
        }
    }

    fn none_accepting(&self, token: TypeToken, key: &dyn fmt::Debug) -> ContentError {
        let type_name = token.name();
        let key = format!("{key:?}");
        match self.kind {
            LoaderKind::Reader => ContentError::NoAcceptingLoader { type_name, key },
            LoaderKind::Writer => ContentError::NoAcceptingWriter { type_name, key },
        }
    }

    /// Every registered loader, or only those of `scope`, in registration order.
    /// Types are visited in the order they were first registered.
    pub fn enumerate(&self, scope: Option<TypeToken>) -> Enumeration<L> {
        let slots = self.read();
        let entries = match scope {
            Some(token) => slots.by_type.get(&token).cloned().unwrap_or_default(),
            None => slots
                .order
                .iter()
                .filter_map(|token| slots.by_type.get(token))
                .flatten()
                .cloned()
                .collect(),
        };
        Enumeration { entries }
    }

    /// Total number of registered loaders.
    pub fn len(&self) -> usize {
        self.read().by_type.values().map(Vec::len).sum()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The registered types, in first-registration order.
    pub fn types(&self) -> Vec<TypeToken> {
        self.read().order.clone()
    }
}

impl<L: ?Sized + LoaderEntry> fmt::Debug for LoaderRegistry<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderRegistry")
            .field("kind", &self.kind)
            .field("types", &self.types())
            .field("len", &self.len())
            .finish()
    }
}

/// A finite snapshot of registered loaders. Iterating it does not touch the
/// registry, so it can be walked any number of times.
pub struct Enumeration<L: ?Sized> {
    entries: Vec<Arc<L>>,
}

impl<L: ?Sized> Enumeration<L> {
    /// Iterates the snapshot in registration order.
    pub fn iter(&self) -> std::slice::Iter<'_, Arc<L>> {
        self.entries.iter()
    }

    /// Number of loaders in the snapshot.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<L: ?Sized> IntoIterator for Enumeration<L> {
    type Item = Arc<L>;
    type IntoIter = std::vec::IntoIter<Arc<L>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a, L: ?Sized> IntoIterator for &'a Enumeration<L> {
    type Item = &'a Arc<L>;
    type IntoIter = std::slice::Iter<'a, Arc<L>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct StubLoader {
        produced: TypeToken,
        name: &'static str,
        identity: usize,
        accepts: bool,
    }

    impl LoaderEntry for StubLoader {
        fn produced(&self) -> TypeToken {
            self.produced
        }

        fn loader_name(&self) -> &'static str {
            self.name
        }

        fn identity(&self) -> usize {
            self.identity
        }
    }

    fn stub<T: 'static>(name: &'static str, identity: usize, accepts: bool) -> Arc<StubLoader> {
        Arc::new(StubLoader {
            produced: TypeToken::of::<T>(),
            name,
            identity,
            accepts,
        })
    }

    #[test]
    fn test_resolution_follows_registration_order() {
        let registry = LoaderRegistry::<StubLoader>::new(LoaderKind::Reader);
        registry.register(stub::<String>("first", 1, false)).unwrap();
        registry.register(stub::<String>("second", 2, true)).unwrap();
        registry.register(stub::<String>("third", 3, true)).unwrap();

        let chosen = registry
            .resolve(TypeToken::of::<String>(), &"a.txt", |p| p.accepts)
            .unwrap();
        assert_eq!(chosen.name, "second");
    }

    #[test]
    fn test_unknown_type_and_rejection() {
        let readers = LoaderRegistry::<StubLoader>::new(LoaderKind::Reader);
        let err = readers
            .resolve(TypeToken::of::<u8>(), &"a", |_| true)
            .unwrap_err();
        assert!(matches!(err, ContentError::NoLoaderForType { .. }));

        readers.register(stub::<u8>("picky", 1, false)).unwrap();
        let err = readers
            .resolve(TypeToken::of::<u8>(), &"a", |p| p.accepts)
            .unwrap_err();
        assert!(matches!(err, ContentError::NoAcceptingLoader { .. }));

        let writers = LoaderRegistry::<StubLoader>::new(LoaderKind::Writer);
        let err = writers
            .resolve(TypeToken::of::<u8>(), &"a", |_| true)
            .unwrap_err();
        assert!(matches!(err, ContentError::NoWriterForType { .. }));
    }

    #[test]
    fn test_duplicate_is_rejected_per_type() {
        let registry = LoaderRegistry::<StubLoader>::new(LoaderKind::Writer);
        registry.register(stub::<String>("w", 7, true)).unwrap();

        let err = registry.register(stub::<String>("w", 7, true)).unwrap_err();
        assert!(matches!(
            err,
            ContentError::DuplicateRegistration {
                kind: LoaderKind::Writer,
                ..
            }
        ));
        assert_eq!(registry.len(), 1);

        // The same instance may serve another type.
        registry.register(stub::<Vec<u8>>("w", 7, true)).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_enumeration_order_and_scope() {
        let registry = LoaderRegistry::<StubLoader>::new(LoaderKind::Reader);
        registry.register(stub::<u32>("a", 1, true)).unwrap();
        registry.register(stub::<String>("b", 2, true)).unwrap();
        registry.register(stub::<u32>("c", 3, true)).unwrap();

        let all: Vec<_> = registry.enumerate(None).iter().map(|p| p.name).collect();
        assert_eq!(all, vec!["a", "c", "b"]);

        let scoped = registry.enumerate(Some(TypeToken::of::<String>()));
        assert_eq!(scoped.len(), 1);
        assert!(registry
            .enumerate(Some(TypeToken::of::<f32>()))
            .is_empty());
        assert_eq!(
            registry.types(),
            vec![TypeToken::of::<u32>(), TypeToken::of::<String>()]
        );
    }

    #[test]
    fn test_enumeration_is_restartable() {
        let registry = LoaderRegistry::<StubLoader>::new(LoaderKind::Reader);
        registry.register(stub::<u32>("a", 1, true)).unwrap();
        let snapshot = registry.enumerate(None);

        assert_eq!(snapshot.iter().count(), 1);
        assert_eq!(snapshot.iter().count(), 1);
        registry.register(stub::<u32>("b", 2, true)).unwrap();
        assert_eq!(snapshot.len(), 1);
    }
}
