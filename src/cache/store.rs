//! Cache Store Module
//!
//! Keyed storage for cache entries. Lookups, writes and deletes are O(1);
//! pattern invalidation and size enforcement scan linearly.

use std::collections::HashMap;

use crate::cache::CacheEntry;

// == Cache Store ==
/// Associative map from normalized key to entry.
#[derive(Debug)]
pub struct Store<V> {
    /// Key-entry storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Next write sequence number
    next_seq: u64,
}

impl<V> Store<V> {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_seq: 0,
        }
    }

    // == Get ==
    pub fn get(&self, key: &str) -> Option<&CacheEntry<V>> {
        self.entries.get(key)
    }

    // == Insert ==
    /// Stores an entry under its key, replacing any previous entry.
    ///
    /// Every write gets a fresh sequence number, so a rewrite counts as the
    /// newest insertion.
    pub fn insert(&mut self, mut entry: CacheEntry<V>) -> Option<CacheEntry<V>> {
        entry.seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(entry.key.clone(), entry)
    }

    // == Remove ==
    pub fn remove(&mut self, key: &str) -> Option<CacheEntry<V>> {
        self.entries.remove(key)
    }

    /// Removes every entry whose key satisfies `predicate`.
    ///
    /// Returns the removed keys.
    pub fn remove_where<P>(&mut self, mut predicate: P) -> Vec<String>
    where
        P: FnMut(&CacheEntry<V>) -> bool,
    {
        let doomed: Vec<String> = self
            .entries
            .values()
            .filter(|entry| predicate(entry))
            .map(|entry| entry.key.clone())
            .collect();

        for key in &doomed {
            self.entries.remove(key);
        }
        doomed
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CacheEntry<V>> {
        self.entries.values()
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for Store<V> {
    fn default() -> Self {
        Self::new()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Validators;
    use std::time::Duration;

    fn entry(key: &str, value: &str, now: u64) -> CacheEntry<String> {
        CacheEntry::new(
            key.to_string(),
            value.to_string(),
            now,
            Duration::from_secs(60),
            Validators::default(),
        )
    }

    #[test]
    fn test_store_new() {
        let store: Store<String> = Store::new();
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_insert_and_get() {
        let mut store = Store::new();
        store.insert(entry("key1", "value1", 0));

        assert_eq!(store.get("key1").unwrap().value, "value1");
        assert!(store.get("missing").is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_overwrite_keeps_one_entry() {
        let mut store = Store::new();
        store.insert(entry("key1", "value1", 0));
        let previous = store.insert(entry("key1", "value2", 5));

        assert_eq!(previous.unwrap().value, "value1");
        assert_eq!(store.get("key1").unwrap().value, "value2");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_assigns_increasing_sequence() {
        let mut store = Store::new();
        store.insert(entry("a", "1", 0));
        store.insert(entry("b", "2", 0));
        store.insert(entry("a", "3", 0));

        assert!(store.get("a").unwrap().seq > store.get("b").unwrap().seq);
    }

    #[test]
    fn test_store_remove() {
        let mut store = Store::new();
        store.insert(entry("key1", "value1", 0));

        assert!(store.remove("key1").is_some());
        assert!(store.remove("key1").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_remove_where() {
        let mut store = Store::new();
        store.insert(entry("a:1", "x", 0));
        store.insert(entry("a:2", "y", 0));
        store.insert(entry("b:1", "z", 0));

        let mut removed = store.remove_where(|e| e.key.starts_with("a:"));
        removed.sort();

        assert_eq!(removed, vec!["a:1", "a:2"]);
        assert!(store.contains_key("b:1"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_clear() {
        let mut store = Store::new();
        store.insert(entry("a", "x", 0));
        store.insert(entry("b", "y", 0));
        store.clear();
        assert!(store.is_empty());
        assert!(store.keys().is_empty());
    }
}
