//! Eviction Module
//!
//! Size-bound eviction and expiry sweeping over a [`Store`].
//!
//! The size bound evicts by insertion time, not by last access: reads never
//! refresh an entry's position.

use crate::cache::Store;

// == Enforce Max Size ==
/// Removes the oldest-inserted entries until at most `max_size` remain.
///
/// Remaining TTL plays no part. Returns the evicted keys, oldest first.
pub fn enforce_max_size<V>(store: &mut Store<V>, max_size: usize) -> Vec<String> {
    let excess = store.len().saturating_sub(max_size);
    if excess == 0 {
        return Vec::new();
    }

    let mut by_age: Vec<(u64, u64, String)> = store
        .iter()
        .map(|entry| (entry.inserted_at, entry.seq, entry.key.clone()))
        .collect();
    by_age.sort_unstable();

    by_age
        .into_iter()
        .take(excess)
        .map(|(_, _, key)| {
            store.remove(&key);
            key
        })
        .collect()
}

// == Sweep Expired ==
/// Removes every entry that is expired at `now_ms`.
///
/// Returns the removed keys.
pub fn sweep_expired<V>(store: &mut Store<V>, now_ms: u64) -> Vec<String> {
    store.remove_where(|entry| entry.is_expired(now_ms))
}
