use indexmap::IndexMap;

use evidence_store_core::Container;

const DEFAULT_CAPACITY: usize = 32_768;

/// A bounded MRU cache keyed by `(type_name, zero_based_index)`.
///
/// Entries are kept in most-recently-used order with the MRU end at index
/// 0: every insert and every cache hit moves the entry to the front, and
/// eviction (when a new insert would exceed capacity) removes from the
/// back. This mirrors the original read-cache mixin's
/// `move_to_end(key, last=False)` / `popitem(last=True)` discipline,
/// implemented here on an `indexmap::IndexMap` rather than a generic `lru`
/// crate.
#[derive(Debug)]
pub struct ReadCache {
    capacity: usize,
    entries: IndexMap<(String, u64), Container>,
}

impl ReadCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: IndexMap::new(),
        }
    }

    /// Returns a cached container, promoting it to the MRU end on a hit.
    pub fn get(&mut self, type_name: &str, index: u64) -> Option<Container> {
        let key = (type_name.to_string(), index);
        let pos = self.entries.get_index_of(&key)?;
        self.entries.move_index(pos, 0);
        self.entries.get_index(0).map(|(_, v)| v.clone())
    }

    /// Inserts or replaces the entry for `(type_name, index)`, placing it
    /// at the MRU end. Evicts the LRU entry first if the cache is already
    /// at capacity.
    pub fn insert(&mut self, type_name: &str, index: u64, container: Container) {
        let key = (type_name.to_string(), index);
        if let Some(pos) = self.entries.get_index_of(&key) {
            self.entries[pos] = container;
            self.entries.move_index(pos, 0);
            return;
        }
        if self.entries.len() >= self.capacity {
            if let Some(((evicted_type, evicted_index), _)) = self.entries.pop() {
                tracing::warn!(
                    type_name = %evicted_type,
                    index = evicted_index,
                    capacity = self.capacity,
                    "read cache at capacity, evicting least-recently-used entry"
                );
            }
        }
        self.entries.shift_insert(0, key, container);
    }

    /// Removes a single entry, e.g. after an `update` invalidates it.
    pub fn invalidate(&mut self, type_name: &str, index: u64) {
        self.entries.shift_remove(&(type_name.to_string(), index));
    }

    /// Drops every cached entry for `type_name`. Used when a type's
    /// contents change in a way that isn't a single-index update (none of
    /// the current backends need this yet, but it keeps the cache
    /// consistent if one later supports bulk deletes).
    pub fn invalidate_type(&mut self, type_name: &str) {
        self.entries.retain(|(t, _), _| t != type_name);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ReadCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
