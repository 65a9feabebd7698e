//! Concurrent per-key record storage shared by the strategies.
//!
//! A store maps a client key to exactly one accounting record. Records are
//! created lazily on first touch and live until an explicit eviction.

use std::fmt::Debug;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

/// A single key's record behind its own lock.
///
/// The lock is the record's exclusive section: strategies run their whole
/// read-check-mutate step while holding it.
#[derive(Debug)]
pub struct Slot<R> {
    state: Mutex<SlotState<R>>,
}

#[derive(Debug)]
struct SlotState<R> {
    record: R,
    /// Set once the slot has been removed from its store.
    retired: bool,
}

impl<R> Slot<R> {
    pub fn new(record: R) -> Self {
        Self {
            state: Mutex::new(SlotState {
                record,
                retired: false,
            }),
        }
    }

    /// Reads the record under its lock.
    pub fn read<T>(&self, f: impl FnOnce(&R) -> T) -> T {
        f(&self.state.lock().record)
    }

    /// Marks the slot retired if `predicate` holds for its record.
    ///
    /// A store must call this while it still owns the slot, and drop the slot
    /// from its map if it returns `true`.
    pub fn retire_if(&self, predicate: impl FnOnce(&R) -> bool) -> bool {
        let mut state = self.state.lock();
        if !state.retired && predicate(&state.record) {
            state.retired = true;
        }
        state.retired
    }
}

/// Lookup-or-create storage of per-key records.
pub trait KeyStore<R>: Debug + Send + Sync {
    /// Returns the record for `key`, installing `factory()` if the key is unseen.
    ///
    /// Callers racing on the same unseen key all receive the same slot.
    fn get_or_create<F>(&self, key: &str, factory: F) -> Arc<Slot<R>>
    where
        F: FnOnce() -> R;

    /// Returns the record for `key` without creating one.
    fn get(&self, key: &str) -> Option<Arc<Slot<R>>>;

    /// Removes every record for which `predicate` holds, returning how many went.
    ///
    /// The predicate runs under each record's lock.
    fn evict<P>(&self, predicate: P) -> usize
    where
        P: FnMut(&R) -> bool;

    /// Number of keys currently tracked.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs `f` inside the exclusive section of `key`'s record.
    ///
    /// A slot evicted between lookup and lock is skipped and the lookup retried,
    /// so `f` only ever sees the record currently installed for `key`.
    fn with_record<F, T>(&self, key: &str, factory: impl Fn() -> R, f: F) -> T
    where
        F: FnOnce(&mut R) -> T,
    {
        loop {
            let slot = self.get_or_create(key, &factory);
            let mut state = slot.state.lock();
            if state.retired {
                continue;
            }
            return f(&mut state.record);
        }
    }
}

/// The default store: a sharded concurrent map of key to slot.
///
/// A shard lock is held only while looking up or inserting a slot. The record
/// lock is taken afterwards, so unrelated keys never wait on each other.
#[derive(Debug)]
pub struct ShardedStore<R> {
    slots: DashMap<String, Arc<Slot<R>>>,
}

impl<R> Default for ShardedStore<R> {
    fn default() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }
}

impl<R> ShardedStore<R> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R> KeyStore<R> for ShardedStore<R>
where
    R: Debug + Send,
{
    fn get_or_create<F>(&self, key: &str, factory: F) -> Arc<Slot<R>>
    where
        F: FnOnce() -> R,
    {
        // Read-locked fast path for keys we have already seen
        if let Some(slot) = self.slots.get(key) {
            return Arc::clone(slot.value());
        }

        Arc::clone(
            self.slots
                .entry(key.to_owned())
                .or_insert_with(|| Arc::new(Slot::new(factory())))
                .value(),
        )
    }

    fn get(&self, key: &str) -> Option<Arc<Slot<R>>> {
        self.slots.get(key).map(|slot| Arc::clone(slot.value()))
    }

    fn evict<P>(&self, mut predicate: P) -> usize
    where
        P: FnMut(&R) -> bool,
    {
        let mut evicted = 0;
        self.slots.retain(|_, slot| {
            if slot.retire_if(&mut predicate) {
                evicted += 1;
                false
            } else {
                true
            }
        });
        evicted
    }

    fn len(&self) -> usize {
        self.slots.len()
    }
}
