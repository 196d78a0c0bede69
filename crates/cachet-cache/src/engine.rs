//! Cache engine.
//!
//! [`CacheEngine`] is the API business code calls. It namespaces keys, encodes
//! values, keeps tag indexes up to date, and turns every store failure into a
//! miss or `false` so that a degraded store never fails the caller.

use crate::codec::{pack, unpack, Codec, JsonCodec};
use crate::error::CacheResult;
use crate::keys::{has_wildcard, KeySpace};
use crate::metrics::{CacheMetrics, CacheStats};
use crate::rules::{rule_for, EntityRule, ENTITY_RULES};
use crate::store::BackingStore;
use crate::tags::TagIndex;
use cachet_config::CacheConfig;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Per-write options.
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// Time to live. The engine default applies when `None`; anything under a
    /// second is rounded up to one second.
    pub ttl: Option<Duration>,
    /// Gzip the payload when it is larger than the compression threshold.
    pub compress: bool,
    /// Tags to register the key under.
    pub tags: Vec<String>,
}

impl SetOptions {
    /// Options with the default TTL, no compression and no tags.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the TTL.
    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Enables compression for large payloads.
    #[must_use]
    pub fn compressed(mut self) -> Self {
        self.compress = true;
        self
    }

    /// Adds tags.
    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}

/// One entry of a batch write.
#[derive(Debug, Clone)]
pub struct BatchEntry<T> {
    /// Key, without namespace.
    pub key: String,
    /// Value to store.
    pub value: T,
    /// Write options for this entry.
    pub options: SetOptions,
}

impl<T> BatchEntry<T> {
    /// Create a batch entry.
    pub fn new(key: impl Into<String>, value: T, options: SetOptions) -> Self {
        Self {
            key: key.into(),
            value,
            options,
        }
    }
}

/// Tag-aware cache over a [`BackingStore`].
pub struct CacheEngine<C: Codec = JsonCodec> {
    store: Arc<dyn BackingStore>,
    codec: C,
    keys: KeySpace,
    tags: TagIndex,
    metrics: CacheMetrics,
    rules: &'static [EntityRule],
    default_ttl: Duration,
    compression_threshold: usize,
    scan_batch_size: usize,
}

impl CacheEngine<JsonCodec> {
    /// Create an engine with the JSON codec.
    pub fn new(store: Arc<dyn BackingStore>, config: &CacheConfig) -> Self {
        Self::with_codec(store, config, JsonCodec)
    }
}

impl<C: Codec> CacheEngine<C> {
    /// Create an engine with a custom codec.
    pub fn with_codec(store: Arc<dyn BackingStore>, config: &CacheConfig, codec: C) -> Self {
        let keys = KeySpace::new(config.namespace.clone());
        Self {
            tags: TagIndex::new(store.clone(), keys.clone()),
            store,
            codec,
            keys,
            metrics: CacheMetrics::new(),
            rules: ENTITY_RULES,
            default_ttl: config.default_ttl(),
            compression_threshold: config.compression_threshold_bytes,
            scan_batch_size: config.scan_batch_size,
        }
    }

    /// Replaces the entity invalidation rules.
    #[must_use]
    pub fn with_rules(mut self, rules: &'static [EntityRule]) -> Self {
        self.rules = rules;
        self
    }

    /// Key namespace.
    pub fn key_space(&self) -> &KeySpace {
        &self.keys
    }

    /// Entity invalidation rules in effect.
    pub fn rules(&self) -> &'static [EntityRule] {
        self.rules
    }

    /// In-process counters.
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Looks up a value. Absent keys, undecodable payloads and store failures
    /// all count as a miss and return `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let started = Instant::now();
        let full_key = self.keys.key(key);

        let value = match self.store.get(&full_key).await {
            Ok(Some(bytes)) => self.decode(&full_key, bytes),
            Ok(None) => None,
            Err(e) => {
                warn!(key = %full_key, error = %e, "Cache get failed, treating as miss");
                CacheMetrics::record_store_error("get");
                None
            }
        };

        if value.is_some() {
            self.metrics.record_hit(started.elapsed());
            debug!(key = %full_key, "Cache hit");
        } else {
            self.metrics.record_miss(started.elapsed());
            debug!(key = %full_key, "Cache miss");
        }
        value
    }

    /// Writes a value and registers its tags.
    ///
    /// Returns `false` when the value could not be encoded or written. A tag
    /// registration failure after a successful write is logged and the write
    /// is kept.
    pub async fn set<T>(&self, key: &str, value: &T, options: SetOptions) -> bool
    where
        T: Serialize + Sync + ?Sized,
    {
        let full_key = self.keys.key(key);

        let payload = match self.encode(value, options.compress) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %full_key, error = %e, "Failed to encode cache value");
                return false;
            }
        };
        let ttl_secs = self.ttl_secs(options.ttl);

        if let Err(e) = self.store.set_ex(&full_key, payload, ttl_secs).await {
            warn!(key = %full_key, error = %e, "Cache set failed");
            CacheMetrics::record_store_error("set");
            return false;
        }
        CacheMetrics::record_writes(1);

        if let Err(e) = self.tags.add_tags(&full_key, &options.tags, ttl_secs).await {
            warn!(key = %full_key, tags = ?options.tags, error = %e, "Failed to register tags, value kept");
            CacheMetrics::record_store_error("add_tags");
        }

        debug!(key = %full_key, ttl_secs, tags = options.tags.len(), "Cached value");
        true
    }

    /// Removes a key. Returns `true` only if a key was actually removed.
    ///
    /// Tag sets still listing the key are left alone.
    pub async fn delete(&self, key: &str) -> bool {
        let full_key = self.keys.key(key);
        self.delete_keys("delete", &[full_key]).await > 0
    }

    /// Checks whether a key is present without decoding it.
    pub async fn exists(&self, key: &str) -> bool {
        let full_key = self.keys.key(key);
        match self.store.exists(&full_key).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(key = %full_key, error = %e, "Cache exists check failed");
                CacheMetrics::record_store_error("exists");
                false
            }
        }
    }

    /// Returns the cached value, or runs `fetcher`, caches its result and
    /// returns it.
    ///
    /// Errors from `fetcher` are returned unchanged and nothing is cached.
    /// Cache failures never surface: a failed write still returns the fetched
    /// value.
    ///
    /// There is no single-flight protection. Concurrent callers that miss the
    /// same key each run `fetcher` and each write the result, so expensive or
    /// side-effecting fetchers need their own coordination.
    pub async fn remember<T, F, Fut, E>(&self, key: &str, fetcher: F, options: SetOptions) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get::<T>(key).await {
            return Ok(cached);
        }

        let value = fetcher().await?;
        self.set(key, &value, options).await;
        Ok(value)
    }

    /// Looks up many keys in one round trip.
    ///
    /// The result has one slot per key, in input order. A store failure
    /// yields `None` in every slot.
    pub async fn mget<T: DeserializeOwned>(&self, keys: &[&str]) -> Vec<Option<T>> {
        if keys.is_empty() {
            return Vec::new();
        }
        let full_keys: Vec<String> = keys.iter().map(|key| self.keys.key(key)).collect();

        match self.store.mget(&full_keys).await {
            Ok(values) => full_keys
                .iter()
                .zip(values.into_iter().chain(std::iter::repeat_with(|| None)))
                .map(|(full_key, bytes)| bytes.and_then(|bytes| self.decode(full_key, bytes)))
                .collect(),
            Err(e) => {
                warn!(keys = full_keys.len(), error = %e, "Cache mget failed, treating as misses");
                CacheMetrics::record_store_error("mget");
                full_keys.iter().map(|_| None).collect()
            }
        }
    }

    /// Writes many entries in one pipeline.
    ///
    /// Returns one flag per entry, in input order. Entries that fail to encode
    /// are `false` and the rest are still written. A pipeline failure marks
    /// every pipelined entry `false`. Tags are registered best-effort.
    pub async fn mset<T: Serialize>(&self, entries: Vec<BatchEntry<T>>) -> Vec<bool> {
        let mut results = vec![false; entries.len()];
        let mut writes = Vec::with_capacity(entries.len());
        let mut written = Vec::with_capacity(entries.len());
        let mut tagged = Vec::new();

        for (index, entry) in entries.into_iter().enumerate() {
            let full_key = self.keys.key(&entry.key);
            match self.encode(&entry.value, entry.options.compress) {
                Ok(payload) => {
                    let ttl_secs = self.ttl_secs(entry.options.ttl);
                    writes.push((full_key.clone(), payload, ttl_secs));
                    written.push(index);
                    if !entry.options.tags.is_empty() {
                        tagged.push((full_key, entry.options.tags, ttl_secs));
                    }
                }
                Err(e) => warn!(key = %full_key, error = %e, "Failed to encode batch entry"),
            }
        }

        if writes.is_empty() {
            return results;
        }

        if let Err(e) = self.store.mset_ex(&writes).await {
            warn!(entries = writes.len(), error = %e, "Cache mset failed");
            CacheMetrics::record_store_error("mset");
            return results;
        }
        for index in &written {
            results[*index] = true;
        }
        CacheMetrics::record_writes(written.len() as u64);

        if let Err(e) = self.tags.add_tags_many(&tagged).await {
            warn!(entries = tagged.len(), error = %e, "Failed to register batch tags, values kept");
            CacheMetrics::record_store_error("add_tags");
        }

        debug!(entries = written.len(), "Cached batch");
        results
    }

    /// Deletes every key registered under any of `tags`, plus the tag sets
    /// themselves. Returns how many keys were removed.
    ///
    /// Runs to completion before returning.
    pub async fn invalidate_by_tags<S: AsRef<str> + Sync>(&self, tags: &[S]) -> u64 {
        let tags: Vec<String> = tags.iter().map(|tag| tag.as_ref().to_string()).collect();
        if tags.is_empty() {
            return 0;
        }

        let keys = self.tags.resolve_and_clear(&tags).await;
        let removed = self.delete_keys("invalidate_by_tags", &keys).await;

        info!(tags = ?tags, removed, "Invalidated cache by tags");
        removed
    }

    /// Invalidates everything derived from one entity, according to the
    /// entity rules. Unknown entity types remove nothing.
    ///
    /// Returns the total number of keys removed.
    pub async fn invalidate_related(&self, entity_type: &str, entity_id: &str) -> u64 {
        let Some(rule) = rule_for(self.rules, entity_type) else {
            warn!(entity_type, entity_id, "No invalidation rule for entity type");
            return 0;
        };

        let tags = rule.render_tags(entity_id);
        let mut removed = self.invalidate_by_tags(tags.as_slice()).await;

        for pattern in rule.render_patterns(entity_id) {
            let keys = if has_wildcard(&pattern) {
                let full_pattern = self.keys.pattern(&pattern);
                match self.store.scan_match(&full_pattern, self.scan_batch_size).await {
                    Ok(keys) => keys,
                    Err(e) => {
                        warn!(pattern = %full_pattern, error = %e, "Key scan failed, skipping pattern");
                        CacheMetrics::record_store_error("scan");
                        continue;
                    }
                }
            } else {
                vec![self.keys.key(&pattern)]
            };

            removed += self.delete_keys("invalidate_related", &keys).await;
        }

        info!(entity_type, entity_id, removed, "Invalidated related cache entries");
        removed
    }

    /// Deletes every key in the namespace, tag sets included.
    ///
    /// For administration and tests; scans the whole keyspace.
    pub async fn clear(&self) -> bool {
        let pattern = self.keys.namespace_pattern();

        let keys = match self.store.scan_match(&pattern, self.scan_batch_size).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Cache clear scan failed");
                CacheMetrics::record_store_error("clear");
                return false;
            }
        };

        if keys.is_empty() {
            return true;
        }

        match self.store.del(&keys).await {
            Ok(removed) => {
                CacheMetrics::record_invalidated("clear", removed);
                info!(namespace = self.keys.namespace(), removed, "Cleared cache namespace");
                true
            }
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Cache clear failed");
                CacheMetrics::record_store_error("clear");
                false
            }
        }
    }

    /// Hit/miss counters plus live store statistics.
    ///
    /// Store figures are `None` when the store cannot be queried.
    pub async fn stats(&self) -> CacheStats {
        let info = match self.store.info().await {
            Ok(info) => Some(info),
            Err(e) => {
                warn!(error = %e, "Failed to read store statistics");
                CacheMetrics::record_store_error("info");
                None
            }
        };
        self.metrics.snapshot(info)
    }

    /// Returns `true` if the store answers.
    pub async fn ping(&self) -> bool {
        match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "Store ping failed");
                false
            }
        }
    }

    /// Releases the store's connections.
    pub async fn close(&self) {
        self.store.close().await;
    }

    fn ttl_secs(&self, ttl: Option<Duration>) -> u64 {
        ttl.unwrap_or(self.default_ttl).as_secs().max(1)
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T, compress: bool) -> CacheResult<Vec<u8>> {
        let bytes = self.codec.encode(value)?;
        pack(bytes, compress, self.compression_threshold)
    }

    fn decode<T: DeserializeOwned>(&self, full_key: &str, bytes: Vec<u8>) -> Option<T> {
        match unpack(bytes).and_then(|bytes| self.codec.decode(&bytes)) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %full_key, error = %e, "Undecodable cache entry, treating as miss");
                None
            }
        }
    }

    async fn delete_keys(&self, operation: &'static str, keys: &[String]) -> u64 {
        if keys.is_empty() {
            return 0;
        }

        match self.store.del(keys).await {
            Ok(removed) => {
                CacheMetrics::record_invalidated(operation, removed);
                removed
            }
            Err(e) => {
                warn!(operation, keys = keys.len(), error = %e, "Cache delete failed");
                CacheMetrics::record_store_error(operation);
                0
            }
        }
    }
}
