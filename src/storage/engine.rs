//! Thread-Safe Item Store with Lazy Expiry
//!
//! This module implements the core storage engine for FlashCache.
//! It provides a thread-safe, concurrent HashMap of memcached items
//! (value + flags + optional expiry).
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: Instead of one big lock, keys are spread over shards.
//!    A key always lives in the same shard, so per-key guarantees are exactly
//!    those of a single-lock map.
//! 2. **Lazy Expiry**: Expired items are treated as absent and purged when a
//!    `get` observes them. There is no timer per item. Until then an expired
//!    item is still held, and `add`, `replace` and `delete` see it as present.
//! 3. **Raw keys**: keys are arbitrary bytes, compared byte for byte.
//! 4. **One critical section per operation**: every mutation (including the
//!    existence check of `add`/`replace`) happens under a single write lock.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      MemoryStore                            │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Number of shards for the store.
const NUM_SHARDS: usize = 64;

/// A stored value with its opaque flags and optional expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// The raw value bytes
    pub value: Bytes,
    /// Opaque client flags, returned verbatim
    pub flags: u16,
    /// When this item expires (None = never expires)
    pub expires_at: Option<Instant>,
}

impl Item {
    /// Creates an item from a memcached `exptime`.
    ///
    /// `exptime <= 0` means the item never expires; a positive value is a
    /// relative offset in seconds from now. An offset too far in the future
    /// to represent is treated as never expiring.
    pub fn new(value: Bytes, flags: u16, exptime: i64) -> Self {
        let expires_at = u64::try_from(exptime)
            .ok()
            .filter(|&secs| secs > 0)
            .and_then(|secs| Instant::now().checked_add(Duration::from_secs(secs)));

        Self {
            value,
            flags,
            expires_at,
        }
    }

    /// Creates an item that expires after `ttl`.
    ///
    /// A `ttl` too large to represent is treated as never expiring.
    pub fn with_ttl(value: Bytes, flags: u16, ttl: Duration) -> Self {
        Self {
            value,
            flags,
            expires_at: Instant::now().checked_add(ttl),
        }
    }

    /// Checks if this item has expired.
    ///
    /// An item is expired once the current time is strictly after its expiry.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    #[inline]
    fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.map(|exp| now > exp).unwrap_or(false)
    }
}

/// The storage operations the command layer depends on.
///
/// Every method is one atomic step with respect to the given key: a concurrent
/// caller observes either the state before or after it, never a partial item.
pub trait CacheStore: Send + Sync {
    /// Inserts or fully replaces the item for `key`.
    fn set(&self, key: Bytes, item: Item);

    /// Returns the item for `key` if it exists and is unexpired.
    ///
    /// An expired item is removed as a side effect.
    fn get(&self, key: &[u8]) -> Option<Item>;

    /// Stores `item` only if no item is held for `key`.
    ///
    /// An expired item that no `get` has purged yet still counts as held.
    /// Returns `true` if the item was stored.
    fn add(&self, key: Bytes, item: Item) -> bool;

    /// Stores `item` only if an item is held for `key`, expired or not.
    ///
    /// Returns `true` if the item was stored.
    fn replace(&self, key: Bytes, item: Item) -> bool;

    /// Removes `key`, expired or not.
    ///
    /// Returns `true` if an item was removed.
    fn delete(&self, key: &[u8]) -> bool;
}

/// A single shard containing a portion of the items.
#[derive(Debug, Default)]
struct Shard {
    items: RwLock<HashMap<Bytes, Item>>,
}

/// The in-memory store used by the server.
///
/// This struct is designed to be wrapped in an `Arc` and shared across
/// all connection tasks.
///
/// # Example
///
/// ```
/// use flashcache::storage::{CacheStore, Item, MemoryStore};
/// use bytes::Bytes;
///
/// let store = MemoryStore::new();
/// store.set(Bytes::from("name"), Item::new(Bytes::from("Ariz"), 7, 0));
///
/// let item = store.get(b"name").unwrap();
/// assert_eq!(item.value, Bytes::from("Ariz"));
/// assert_eq!(item.flags, 7);
/// ```
pub struct MemoryStore {
    shards: Vec<Shard>,

    key_count: AtomicU64,
    get_hits: AtomicU64,
    get_misses: AtomicU64,
    set_count: AtomicU64,
    del_count: AtomicU64,
    expired_count: AtomicU64,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("shards", &self.shards.len())
            .field("key_count", &self.key_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        let shards = (0..NUM_SHARDS).map(|_| Shard::default()).collect();

        Self {
            shards,
            key_count: AtomicU64::new(0),
            get_hits: AtomicU64::new(0),
            get_misses: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    #[inline]
    fn shard(&self, key: &[u8]) -> &Shard {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % NUM_SHARDS]
    }

    /// Inserts under an already held write lock and keeps the key count in sync.
    fn insert_locked(&self, items: &mut HashMap<Bytes, Item>, key: Bytes, item: Item) {
        self.set_count.fetch_add(1, Ordering::Relaxed);
        if items.insert(key, item).is_none() {
            self.key_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Returns whether `key` holds a live item, purging it if it has expired.
    fn live_locked(&self, items: &mut HashMap<Bytes, Item>, key: &[u8]) -> bool {
        match items.get(key) {
            Some(item) if item.is_expired() => {
                items.remove(key);
                self.key_count.fetch_sub(1, Ordering::Relaxed);
                self.expired_count.fetch_add(1, Ordering::Relaxed);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Returns the number of items held, including expired ones not yet purged.
    pub fn len(&self) -> u64 {
        self.key_count.load(Ordering::Relaxed)
    }

    /// Returns true if the store holds no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every expired item from all shards.
    ///
    /// Used by the optional background sweeper. Returns the number of items
    /// removed.
    pub fn cleanup_expired(&self) -> u64 {
        let now = Instant::now();
        let mut cleaned = 0u64;

        for shard in &self.shards {
            let mut items = shard.items.write();
            let before = items.len();
            items.retain(|_, item| !item.is_expired_at(now));
            cleaned += (before - items.len()) as u64;
        }

        if cleaned > 0 {
            self.key_count.fetch_sub(cleaned, Ordering::Relaxed);
            self.expired_count.fetch_add(cleaned, Ordering::Relaxed);
        }

        cleaned
    }

    /// Returns a snapshot of the store counters.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            items: self.key_count.load(Ordering::Relaxed),
            get_hits: self.get_hits.load(Ordering::Relaxed),
            get_misses: self.get_misses.load(Ordering::Relaxed),
            set_ops: self.set_count.load(Ordering::Relaxed),
            delete_ops: self.del_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }
}

impl CacheStore for MemoryStore {
    fn set(&self, key: Bytes, item: Item) {
        let mut items = self.shard(&key).items.write();
        self.insert_locked(&mut items, key, item);
    }

    fn get(&self, key: &[u8]) -> Option<Item> {
        // Write lock: the expiry path mutates the shard.
        let mut items = self.shard(key).items.write();

        let found = if self.live_locked(&mut items, key) {
            items.get(key).cloned()
        } else {
            None
        };

        if found.is_some() {
            self.get_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.get_misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    fn add(&self, key: Bytes, item: Item) -> bool {
        let mut items = self.shard(&key).items.write();
        if items.contains_key(&key) {
            return false;
        }
        self.insert_locked(&mut items, key, item);
        true
    }

    fn replace(&self, key: Bytes, item: Item) -> bool {
        let mut items = self.shard(&key).items.write();
        if !items.contains_key(&key) {
            return false;
        }
        self.insert_locked(&mut items, key, item);
        true
    }

    fn delete(&self, key: &[u8]) -> bool {
        self.del_count.fetch_add(1, Ordering::Relaxed);

        let mut items = self.shard(key).items.write();
        if items.remove(key).is_some() {
            self.key_count.fetch_sub(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }
}

/// Store counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Items currently held (approximate)
    pub items: u64,
    /// Gets that returned an item
    pub get_hits: u64,
    /// Gets that found nothing (absent or expired)
    pub get_misses: u64,
    /// Successful writes (set, add, replace)
    pub set_ops: u64,
    /// Delete calls
    pub delete_ops: u64,
    /// Items purged because they expired
    pub expired: u64,
}
