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

//! Coalescing of concurrent asynchronous loads of the same asset.

use ahash::AHashMap;
use cairn_core::{Asset, AssetHandle, CancellationFlag, ContentKey, ReadEnvelope, TypeToken};
use std::any::Any;
use std::sync::{Mutex, PoisonError};

/// The caller-side callback of an asynchronous load.
pub(crate) type Sink<K, A> = Box<dyn FnMut(ReadEnvelope<K, AssetHandle<A>>) + Send>;

/// A caller waiting on a load started by someone else.
pub(crate) struct Follower<K: ContentKey, A: Asset> {
    sink: Sink<K, A>,
    cancellation: CancellationFlag,
    cache: bool,
}

impl<K: ContentKey, A: Asset> Follower<K, A> {
    pub(crate) fn new(sink: Sink<K, A>, cancellation: CancellationFlag, cache: bool) -> Self {
        Self {
            sink,
            cancellation,
            cache,
        }
    }

    /// Whether this caller asked for the shared result to be cached.
    pub(crate) fn wants_cache(&self) -> bool {
        self.cache
    }

    pub(crate) fn into_sink(self) -> Sink<K, A> {
        self.sink
    }

    /// Hands the leader's outcome to this follower, under the follower's own
    /// cancellation flag.
    pub(crate) fn deliver(mut self, completed: &ReadEnvelope<K, AssetHandle<A>>) {
        if let Some(outcome) = completed.clone().into_result() {
            (self.sink)(ReadEnvelope::completed(
                completed.key().clone(),
                outcome,
                self.cancellation,
            ));
        }
    }
}

type Erased = Box<dyn Any + Send>;

/// In-flight loads, keyed by the requested key and asset type.
pub(crate) struct PendingLoads<K: ContentKey> {
    waiting: Mutex<AHashMap<(K, TypeToken), Vec<Erased>>>,
}

impl<K: ContentKey> PendingLoads<K> {
    pub(crate) fn new() -> Self {
        Self {
            waiting: Mutex::new(AHashMap::new()),
        }
    }

    /// Either marks the caller as the leader of a new load, handing `follower`
    /// back, or queues `follower` behind the load already running.
    pub(crate) fn join_or_lead<A: Asset>(
        &self,
        key: &K,
        follower: Follower<K, A>,
    ) -> Option<Follower<K, A>> {
        let slot = (key.clone(), TypeToken::of::<A>());
        let mut waiting = self.waiting.lock().unwrap_or_else(PoisonError::into_inner);
        match waiting.get_mut(&slot) {
            Some(queue) => {
                log::debug!("Joining in-flight load of {:?}", key);
                queue.push(Box::new(follower));
                None
            }
            None => {
                waiting.insert(slot, Vec::new());
                Some(follower)
            }
        }
    }

    /// Ends the load of `key` and returns everyone who joined it.
    pub(crate) fn finish<A: Asset>(&self, key: &K) -> Vec<Follower<K, A>> {
        let slot = (key.clone(), TypeToken::of::<A>());
        let queue = self
            .waiting
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&slot)
            .unwrap_or_default();
        queue
            .into_iter()
            .filter_map(|erased| erased.downcast::<Follower<K, A>>().ok())
            .map(|follower| *follower)
            .collect()
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.waiting
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::ReadState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(hits: &Arc<AtomicUsize>) -> Follower<String, String> {
        let hits = hits.clone();
        Follower::new(
            Box::new(move |envelope: ReadEnvelope<String, AssetHandle<String>>| {
                assert_eq!(envelope.state(), ReadState::Completed);
                hits.fetch_add(1, Ordering::SeqCst);
            }),
            CancellationFlag::new(),
            false,
        )
    }

    #[test]
    fn test_first_caller_leads_and_others_follow() {
        let pending = PendingLoads::<String>::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let key = "a.txt".to_string();

        assert!(pending.join_or_lead(&key, counting(&hits)).is_some());
        assert!(pending.join_or_lead(&key, counting(&hits)).is_none());
        assert!(pending.join_or_lead(&key, counting(&hits)).is_none());
        assert_eq!(pending.in_flight(), 1);

        let completed = ReadEnvelope::completed(
            key.clone(),
            Ok(AssetHandle::new("text".to_string())),
            CancellationFlag::new(),
        );
        let followers = pending.finish::<String>(&key);
        assert_eq!(followers.len(), 2);
        for follower in followers {
            follower.deliver(&completed);
        }
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(pending.in_flight(), 0);
    }

    #[test]
    fn test_follower_keeps_its_own_cancellation() {
        let leader_flag = CancellationFlag::new();
        let follower_flag = CancellationFlag::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let sink_seen = seen.clone();
        let follower = Follower::<String, String>::new(
            Box::new(move |envelope: ReadEnvelope<String, AssetHandle<String>>| {
                if !envelope.is_canceled() {
                    sink_seen.fetch_add(1, Ordering::SeqCst);
                }
            }),
            follower_flag,
            false,
        );

        leader_flag.cancel();
        follower.deliver(&ReadEnvelope::completed(
            "a.txt".to_string(),
            Ok(AssetHandle::new(String::new())),
            leader_flag,
        ));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_types_do_not_share_a_load() {
        let pending = PendingLoads::<String>::new();
        let key = "a.bin".to_string();
        let hits = Arc::new(AtomicUsize::new(0));
        let bytes = Follower::<String, Vec<u8>>::new(
            Box::new(|_: ReadEnvelope<String, AssetHandle<Vec<u8>>>| {}),
            CancellationFlag::new(),
            true,
        );

        assert!(pending.join_or_lead(&key, counting(&hits)).is_some());
        assert!(pending.join_or_lead(&key, bytes).is_some());
        assert_eq!(pending.in_flight(), 2);
    }

    #[test]
    fn test_followers_keep_their_cache_request() {
        let pending = PendingLoads::<String>::new();
        let key = "a.txt".to_string();
        let hits = Arc::new(AtomicUsize::new(0));
        let caching = Follower::<String, String>::new(
            Box::new(|_: ReadEnvelope<String, AssetHandle<String>>| {}),
            CancellationFlag::new(),
            true,
        );

        assert!(pending.join_or_lead(&key, counting(&hits)).is_some());
        assert!(pending.join_or_lead(&key, caching).is_none());
        assert!(pending.join_or_lead(&key, counting(&hits)).is_none());

        let wants: Vec<bool> = pending
            .finish::<String>(&key)
            .iter()
            .map(Follower::wants_cache)
            .collect();
        assert_eq!(wants, vec![true, false]);
    }
}
