//! Backing store abstraction.
//!
//! The engine talks to the store through [`BackingStore`] so the Redis client
//! can be swapped for the in-process [`MemoryStore`] or a test double.

mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::{create_pool, redact_url, RedisStore};

use crate::error::CacheResult;
use async_trait::async_trait;
use serde::Serialize;

/// Store-side statistics gathered at call time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreInfo {
    /// Memory used by the store, in bytes.
    pub used_memory_bytes: u64,
    /// Number of keys in the selected database.
    pub key_count: u64,
}

/// Minimal command surface the cache engine needs from a key-value store.
///
/// All keys passed in are already namespaced. Batch operations are pipelined
/// for fewer round trips and carry no atomicity.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// `GET`.
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// `SETEX`. `ttl_secs` is at least 1.
    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> CacheResult<()>;

    /// `DEL` over many keys. Returns how many existed.
    async fn del(&self, keys: &[String]) -> CacheResult<u64>;

    /// `EXISTS`.
    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// `MGET`. The result has one slot per input key, in order.
    async fn mget(&self, keys: &[String]) -> CacheResult<Vec<Option<Vec<u8>>>>;

    /// Pipelined `SETEX` for `(key, value, ttl_secs)` triples.
    async fn mset_ex(&self, entries: &[(String, Vec<u8>, u64)]) -> CacheResult<()>;

    /// Pipelined `SADD` for `(set, member, ttl_secs)` triples.
    ///
    /// Each set's expiry is raised to at least `ttl_secs` from now, so a set
    /// lives as long as its longest-lived member and no longer than needed.
    async fn sadd(&self, members: &[(String, String, u64)]) -> CacheResult<()>;

    /// `SMEMBERS`.
    async fn smembers(&self, key: &str) -> CacheResult<Vec<String>>;

    /// Full `SCAN ... MATCH pattern COUNT count` iteration, deduplicated.
    async fn scan_match(&self, pattern: &str, count: usize) -> CacheResult<Vec<String>>;

    /// Memory usage and key count.
    async fn info(&self) -> CacheResult<StoreInfo>;

    /// `PING`.
    async fn ping(&self) -> CacheResult<()>;

    /// Releases connections. Later calls fail with `Unavailable`.
    async fn close(&self);
}
