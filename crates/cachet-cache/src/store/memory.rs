//! In-process store.
//!
//! Used when Redis is disabled and as the store behind integration tests.
//! Expired values and sets are dropped lazily on access.

use super::{BackingStore, StoreInfo};
use crate::error::{CacheError, CacheResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug)]
enum Slot {
    Value { bytes: Vec<u8>, expires_at: Instant },
    Set { members: HashSet<String>, expires_at: Instant },
}

impl Slot {
    fn is_expired(&self, now: Instant) -> bool {
        match self {
            Slot::Value { expires_at, .. } | Slot::Set { expires_at, .. } => *expires_at <= now,
        }
    }

    fn size(&self) -> usize {
        match self {
            Slot::Value { bytes, .. } => bytes.len(),
            Slot::Set { members, .. } => members.iter().map(String::len).sum(),
        }
    }
}

fn wrong_type(key: &str) -> CacheError {
    CacheError::Redis(redis::RedisError::from((
        redis::ErrorKind::TypeError,
        "WRONGTYPE Operation against a key holding the wrong kind of value",
        key.to_string(),
    )))
}

/// Hash-map store with per-key expiry.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, Slot>>,
    closed: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> CacheResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CacheError::Unavailable("store is closed".to_string()));
        }
        Ok(())
    }

    fn read_value(slots: &mut HashMap<String, Slot>, key: &str, now: Instant) -> Option<Vec<u8>> {
        if slots.get(key).is_some_and(|slot| slot.is_expired(now)) {
            slots.remove(key);
            return None;
        }
        match slots.get(key) {
            Some(Slot::Value { bytes, .. }) => Some(bytes.clone()),
            _ => None,
        }
    }

    fn write_value(slots: &mut HashMap<String, Slot>, key: &str, value: Vec<u8>, ttl_secs: u64, now: Instant) {
        slots.insert(
            key.to_string(),
            Slot::Value {
                bytes: value,
                expires_at: now + Duration::from_secs(ttl_secs.max(1)),
            },
        );
    }

    fn purge_expired(slots: &mut HashMap<String, Slot>, now: Instant) {
        slots.retain(|_, slot| !slot.is_expired(now));
    }
}

#[async_trait]
impl BackingStore for MemoryStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.ensure_open()?;
        let mut slots = self.slots.lock();
        Ok(Self::read_value(&mut slots, key, Instant::now()))
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> CacheResult<()> {
        self.ensure_open()?;
        let mut slots = self.slots.lock();
        Self::write_value(&mut slots, key, value, ttl_secs, Instant::now());
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> CacheResult<u64> {
        self.ensure_open()?;
        let now = Instant::now();
        let mut slots = self.slots.lock();

        let mut deleted = 0u64;
        for key in keys {
            if let Some(slot) = slots.remove(key) {
                if !slot.is_expired(now) {
                    deleted += 1;
                }
            }
        }
        Ok(deleted)
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        self.ensure_open()?;
        let now = Instant::now();
        let slots = self.slots.lock();
        Ok(slots.get(key).is_some_and(|slot| !slot.is_expired(now)))
    }

    async fn mget(&self, keys: &[String]) -> CacheResult<Vec<Option<Vec<u8>>>> {
        self.ensure_open()?;
        let now = Instant::now();
        let mut slots = self.slots.lock();
        Ok(keys
            .iter()
            .map(|key| Self::read_value(&mut slots, key, now))
            .collect())
    }

    async fn mset_ex(&self, entries: &[(String, Vec<u8>, u64)]) -> CacheResult<()> {
        self.ensure_open()?;
        let now = Instant::now();
        let mut slots = self.slots.lock();
        for (key, value, ttl_secs) in entries {
            Self::write_value(&mut slots, key, value.clone(), *ttl_secs, now);
        }
        Ok(())
    }

    async fn sadd(&self, members: &[(String, String, u64)]) -> CacheResult<()> {
        self.ensure_open()?;
        let now = Instant::now();
        let mut slots = self.slots.lock();
        for (set, member, ttl_secs) in members {
            let expiry = now + Duration::from_secs((*ttl_secs).max(1));
            if slots.get(set).is_some_and(|slot| slot.is_expired(now)) {
                slots.remove(set);
            }

            let slot = slots.entry(set.clone()).or_insert_with(|| Slot::Set {
                members: HashSet::new(),
                expires_at: expiry,
            });
            match slot {
                Slot::Set { members: existing, expires_at } => {
                    existing.insert(member.clone());
                    *expires_at = (*expires_at).max(expiry);
                }
                Slot::Value { .. } => return Err(wrong_type(set)),
            }
        }
        Ok(())
    }

    async fn smembers(&self, key: &str) -> CacheResult<Vec<String>> {
        self.ensure_open()?;
        let now = Instant::now();
        let slots = self.slots.lock();
        match slots.get(key) {
            Some(slot) if slot.is_expired(now) => Ok(Vec::new()),
            Some(Slot::Set { members, .. }) => Ok(members.iter().cloned().collect()),
            Some(Slot::Value { .. }) => Err(wrong_type(key)),
            None => Ok(Vec::new()),
        }
    }

    async fn scan_match(&self, pattern: &str, _count: usize) -> CacheResult<Vec<String>> {
        self.ensure_open()?;
        let now = Instant::now();
        let mut slots = self.slots.lock();
        Self::purge_expired(&mut slots, now);

        let found: BTreeSet<String> = slots
            .keys()
            .filter(|key| glob_match(pattern.as_bytes(), key.as_bytes()))
            .cloned()
            .collect();
        Ok(found.into_iter().collect())
    }

    async fn info(&self) -> CacheResult<StoreInfo> {
        self.ensure_open()?;
        let now = Instant::now();
        let mut slots = self.slots.lock();
        Self::purge_expired(&mut slots, now);

        let used_memory_bytes = slots.iter().map(|(key, slot)| key.len() + slot.size()).sum::<usize>();
        Ok(StoreInfo {
            used_memory_bytes: used_memory_bytes as u64,
            key_count: slots.len() as u64,
        })
    }

    async fn ping(&self) -> CacheResult<()> {
        self.ensure_open()
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.slots.lock().clear();
    }
}

/// Redis-style glob matching: `*`, `?`, `[abc]`, `[a-z]`, `[^a]` and `\`
/// escapes.
pub(crate) fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    // Position after the last `*` and the text index it is currently absorbing.
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() {
            match pattern[p] {
                b'*' => {
                    backtrack = Some((p + 1, t));
                    p += 1;
                    continue;
                }
                b'?' => {
                    p += 1;
                    t += 1;
                    continue;
                }
                b'[' => {
                    if let Some((matched, next)) = match_class(pattern, p, text[t]) {
                        if matched {
                            p = next;
                            t += 1;
                            continue;
                        }
                    }
                }
                b'\\' if p + 1 < pattern.len() => {
                    if pattern[p + 1] == text[t] {
                        p += 2;
                        t += 1;
                        continue;
                    }
                }
                c => {
                    if c == text[t] {
                        p += 1;
                        t += 1;
                        continue;
                    }
                }
            }
        }

        match backtrack {
            Some((star_p, star_t)) => {
                p = star_p;
                t = star_t + 1;
                backtrack = Some((star_p, star_t + 1));
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|&c| c == b'*')
}

/// Matches `c` against the class starting at `pattern[start] == b'['`.
/// Returns whether it matched and the index after the closing `]`, or `None`
/// for an unterminated class.
fn match_class(pattern: &[u8], start: usize, c: u8) -> Option<(bool, usize)> {
    let mut i = start + 1;
    let negate = pattern.get(i) == Some(&b'^');
    if negate {
        i += 1;
    }

    let mut matched = false;
    while i < pattern.len() && pattern[i] != b']' {
        if pattern[i] == b'\\' && i + 1 < pattern.len() {
            matched |= pattern[i + 1] == c;
            i += 2;
        } else if i + 2 < pattern.len() && pattern[i + 1] == b'-' && pattern[i + 2] != b']' {
            let (lo, hi) = (pattern[i].min(pattern[i + 2]), pattern[i].max(pattern[i + 2]));
            matched |= (lo..=hi).contains(&c);
            i += 3;
        } else {
            matched |= pattern[i] == c;
            i += 1;
        }
    }

    if i >= pattern.len() {
        return None;
    }
    Some((matched != negate, i + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(list: &[&str]) -> Vec<String> {
        list.iter().map(|k| (*k).to_string()).collect()
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match(b"ns:user:42:*", b"ns:user:42:profile"));
        assert!(glob_match(b"ns:user:42:*", b"ns:user:42:"));
        assert!(!glob_match(b"ns:user:42:*", b"ns:user:420:profile"));
        assert!(glob_match(b"ns:profile:42*", b"ns:profile:42"));
        assert!(glob_match(b"ns:profile:42*", b"ns:profile:42:avatar"));
        assert!(glob_match(b"*", b"anything"));
        assert!(glob_match(b"a?c", b"abc"));
        assert!(!glob_match(b"a?c", b"ac"));
        assert!(glob_match(b"h[ae]llo", b"hello"));
        assert!(!glob_match(b"h[^e]llo", b"hello"));
        assert!(glob_match(b"v[0-9]", b"v7"));
        assert!(glob_match(b"a\\*b", b"a*b"));
        assert!(!glob_match(b"a\\*b", b"axb"));
        assert!(glob_match(b"*:tags:*", b"ns:tags:user:1"));
    }

    #[tokio::test]
    async fn test_set_get_del() {
        let store = MemoryStore::new();
        store.set_ex("ns:a", b"1".to_vec(), 60).await.unwrap();

        assert_eq!(store.get("ns:a").await.unwrap(), Some(b"1".to_vec()));
        assert!(store.exists("ns:a").await.unwrap());
        assert_eq!(store.del(&keys(&["ns:a", "ns:b"])).await.unwrap(), 1);
        assert_eq!(store.get("ns:a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expiry() {
        let store = MemoryStore::new();
        store.set_ex("ns:short", b"x".to_vec(), 1).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert!(!store.exists("ns:short").await.unwrap());
        assert_eq!(store.get("ns:short").await.unwrap(), None);
        assert_eq!(store.del(&keys(&["ns:short"])).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mget_keeps_order() {
        let store = MemoryStore::new();
        store
            .mset_ex(&[
                ("ns:a".to_string(), b"1".to_vec(), 60),
                ("ns:c".to_string(), b"3".to_vec(), 60),
            ])
            .await
            .unwrap();

        let values = store.mget(&keys(&["ns:a", "ns:b", "ns:c"])).await.unwrap();
        assert_eq!(values, vec![Some(b"1".to_vec()), None, Some(b"3".to_vec())]);
    }

    #[tokio::test]
    async fn test_sets() {
        let store = MemoryStore::new();
        store
            .sadd(&[
                ("ns:tags:t".to_string(), "ns:a".to_string(), 60),
                ("ns:tags:t".to_string(), "ns:a".to_string(), 60),
                ("ns:tags:t".to_string(), "ns:b".to_string(), 60),
            ])
            .await
            .unwrap();

        let mut members = store.smembers("ns:tags:t").await.unwrap();
        members.sort();
        assert_eq!(members, keys(&["ns:a", "ns:b"]));
        assert!(store.smembers("ns:tags:none").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_expires_with_longest_member() {
        let store = MemoryStore::new();
        store
            .sadd(&[
                ("ns:tags:long".to_string(), "ns:a".to_string(), 1),
                ("ns:tags:long".to_string(), "ns:b".to_string(), 60),
                ("ns:tags:short".to_string(), "ns:a".to_string(), 1),
            ])
            .await
            .unwrap();
        // A shorter TTL never shrinks an existing expiry.
        store
            .sadd(&[("ns:tags:long".to_string(), "ns:c".to_string(), 1)])
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert!(!store.exists("ns:tags:short").await.unwrap());
        assert!(store.smembers("ns:tags:short").await.unwrap().is_empty());
        assert_eq!(store.smembers("ns:tags:long").await.unwrap().len(), 3);
        assert_eq!(store.info().await.unwrap().key_count, 1);
    }

    #[tokio::test]
    async fn test_wrong_type_both_ways() {
        let store = MemoryStore::new();
        store.set_ex("ns:value", b"1".to_vec(), 60).await.unwrap();
        store
            .sadd(&[("ns:set".to_string(), "ns:a".to_string(), 60)])
            .await
            .unwrap();

        let err = store.smembers("ns:value").await.unwrap_err();
        assert!(matches!(err, CacheError::Redis(ref e) if e.kind() == redis::ErrorKind::TypeError));

        let err = store
            .sadd(&[("ns:value".to_string(), "ns:a".to_string(), 60)])
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Redis(ref e) if e.kind() == redis::ErrorKind::TypeError));
    }

    #[tokio::test]
    async fn test_scan_and_info() {
        let store = MemoryStore::new();
        store.set_ex("ns:user:1:a", b"1".to_vec(), 60).await.unwrap();
        store.set_ex("ns:user:1:b", b"2".to_vec(), 60).await.unwrap();
        store.set_ex("ns:user:2:a", b"3".to_vec(), 60).await.unwrap();

        let found = store.scan_match("ns:user:1:*", 10).await.unwrap();
        assert_eq!(found, keys(&["ns:user:1:a", "ns:user:1:b"]));

        let info = store.info().await.unwrap();
        assert_eq!(info.key_count, 3);
        assert!(info.used_memory_bytes > 0);
    }

    #[tokio::test]
    async fn test_closed_store() {
        let store = MemoryStore::new();
        store.close().await;
        assert!(matches!(store.ping().await, Err(CacheError::Unavailable(_))));
        assert!(store.get("ns:a").await.is_err());
    }
}
