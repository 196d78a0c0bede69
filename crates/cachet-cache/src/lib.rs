//! # Cachet Cache
//!
//! Tag-aware caching over a Redis-class key-value store.
//!
//! [`CacheEngine`] is the entry point: typed get/set with TTLs, batch
//! operations, the `remember` pattern, tag-based and entity-based
//! invalidation, and hit/miss statistics. Store access goes through the
//! [`BackingStore`] trait, implemented by [`RedisStore`] and the in-process
//! [`MemoryStore`].

pub mod codec;
pub mod engine;
pub mod error;
pub mod keys;
pub mod metrics;
pub mod rules;
pub mod store;
pub mod tags;
pub mod warmup;

pub use codec::{Codec, JsonCodec};
pub use engine::{BatchEntry, CacheEngine, SetOptions};
pub use error::{CacheError, CacheResult};
pub use keys::KeySpace;
pub use self::metrics::{register_metrics, CacheMetrics, CacheStats};
pub use rules::{rule_for, EntityRule, ENTITY_RULES};
pub use store::{BackingStore, MemoryStore, RedisStore, StoreInfo};
pub use tags::TagIndex;
pub use warmup::{RoutineOutcome, WarmUpCoordinator, WarmUpReport, WarmUpRoutine, WarmUpSource};
