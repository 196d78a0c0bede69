//! Tag index maintenance.
//!
//! A tag is a store-side set at `{namespace}:tags:{tag}` whose members are
//! full cache keys. A set expires together with its longest-lived member.
//! Members may outlive the keys they name; deleting a key that already
//! expired is a no-op.

use crate::error::CacheResult;
use crate::keys::KeySpace;
use crate::store::BackingStore;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Maintains tag sets in the backing store.
#[derive(Clone)]
pub struct TagIndex {
    store: Arc<dyn BackingStore>,
    keys: KeySpace,
}

impl TagIndex {
    /// Create a tag index over a store.
    pub fn new(store: Arc<dyn BackingStore>, keys: KeySpace) -> Self {
        Self { store, keys }
    }

    /// Registers `full_key`, written with `ttl_secs`, under every tag in one
    /// pipeline. Idempotent.
    pub async fn add_tags(&self, full_key: &str, tags: &[String], ttl_secs: u64) -> CacheResult<()> {
        if tags.is_empty() {
            return Ok(());
        }

        let members: Vec<(String, String, u64)> = tags
            .iter()
            .map(|tag| (self.keys.tag(tag), full_key.to_string(), ttl_secs))
            .collect();
        self.store.sadd(&members).await
    }

    /// Registers many `(full_key, tags, ttl_secs)` entries in one pipeline.
    pub async fn add_tags_many(&self, entries: &[(String, Vec<String>, u64)]) -> CacheResult<()> {
        let members: Vec<(String, String, u64)> = entries
            .iter()
            .flat_map(|(full_key, tags, ttl_secs)| {
                tags.iter()
                    .map(move |tag| (self.keys.tag(tag), full_key.clone(), *ttl_secs))
            })
            .collect();

        if members.is_empty() {
            return Ok(());
        }
        self.store.sadd(&members).await
    }

    /// Reads every tag set, deletes it, and returns the union of its members.
    ///
    /// Each set is read before it is deleted. A tag that fails is logged and
    /// skipped; the others are still cleared.
    pub async fn resolve_and_clear(&self, tags: &[String]) -> Vec<String> {
        let mut resolved = BTreeSet::new();

        for tag in tags {
            let tag_key = self.keys.tag(tag);

            let members = match self.store.smembers(&tag_key).await {
                Ok(members) => members,
                Err(e) => {
                    warn!(tag = %tag, error = %e, "Failed to read tag set, skipping");
                    continue;
                }
            };

            if let Err(e) = self.store.del(std::slice::from_ref(&tag_key)).await {
                warn!(tag = %tag, error = %e, "Failed to delete tag set");
            }

            debug!(tag = %tag, members = members.len(), "Resolved tag");
            resolved.extend(members);
        }

        resolved.into_iter().collect()
    }
}
