//! Startup cache warm-up.
//!
//! A routine pulls reference data from a [`WarmUpSource`] and writes it into
//! the cache under the routine's tags. Routines run concurrently and
//! independently: one failing routine does not stop the others.

use crate::engine::{BatchEntry, CacheEngine, SetOptions};
use crate::metrics::CacheMetrics;
use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Supplies the entries a warm-up routine writes.
#[async_trait]
pub trait WarmUpSource: Send + Sync {
    /// Returns `(key, value)` pairs to cache. Keys are not namespaced.
    async fn fetch(&self) -> anyhow::Result<Vec<(String, serde_json::Value)>>;
}

/// A named warm-up routine.
#[derive(Clone)]
pub struct WarmUpRoutine {
    /// Routine name, used in logs and reports.
    pub name: String,
    /// Where the entries come from.
    pub source: Arc<dyn WarmUpSource>,
    /// Tags attached to every entry.
    pub tags: Vec<String>,
    /// TTL for the entries; the engine default applies when `None`.
    pub ttl: Option<Duration>,
}

impl WarmUpRoutine {
    /// Create a routine with no tags and the default TTL.
    pub fn new(name: impl Into<String>, source: Arc<dyn WarmUpSource>) -> Self {
        Self {
            name: name.into(),
            source,
            tags: Vec::new(),
            ttl: None,
        }
    }

    /// Sets the tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the TTL.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    fn options(&self) -> SetOptions {
        SetOptions {
            ttl: self.ttl,
            compress: true,
            tags: self.tags.clone(),
        }
    }
}

/// Result of a single routine.
#[derive(Debug, Clone, Serialize)]
pub struct RoutineOutcome {
    /// Routine name.
    pub name: String,
    /// Entries written.
    pub written: usize,
    /// Entries the cache rejected.
    pub rejected: usize,
    /// Source error, if the routine could not fetch its data.
    pub error: Option<String>,
    /// Wall time spent in the routine.
    pub duration_ms: u64,
}

impl RoutineOutcome {
    /// True when the source answered and every entry was written.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.rejected == 0
    }
}

/// Outcome of a warm-up run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WarmUpReport {
    /// Per-routine results, in registration order.
    pub routines: Vec<RoutineOutcome>,
}

impl WarmUpReport {
    /// Number of fully successful routines.
    pub fn succeeded(&self) -> usize {
        self.routines.iter().filter(|r| r.is_success()).count()
    }

    /// Number of routines that failed or partially failed.
    pub fn failed(&self) -> usize {
        self.routines.len() - self.succeeded()
    }

    /// Total entries written.
    pub fn entries_written(&self) -> usize {
        self.routines.iter().map(|r| r.written).sum()
    }
}

/// Runs warm-up routines against a cache engine.
pub struct WarmUpCoordinator {
    engine: Arc<CacheEngine>,
    routines: Vec<WarmUpRoutine>,
}

impl WarmUpCoordinator {
    /// Create a coordinator with no routines.
    pub fn new(engine: Arc<CacheEngine>) -> Self {
        Self {
            engine,
            routines: Vec::new(),
        }
    }

    /// Adds a routine.
    #[must_use]
    pub fn with_routine(mut self, routine: WarmUpRoutine) -> Self {
        self.routines.push(routine);
        self
    }

    /// Names of the registered routines.
    pub fn routine_names(&self) -> Vec<&str> {
        self.routines.iter().map(|r| r.name.as_str()).collect()
    }

    /// Runs every routine concurrently and waits for all of them.
    pub async fn warm_up(&self) -> WarmUpReport {
        let started = Instant::now();
        let outcomes = join_all(self.routines.iter().map(|routine| self.run_routine(routine))).await;
        let report = WarmUpReport { routines: outcomes };

        info!(
            routines = report.routines.len(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            entries = report.entries_written(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Cache warm-up finished"
        );
        report
    }

    async fn run_routine(&self, routine: &WarmUpRoutine) -> RoutineOutcome {
        let started = Instant::now();

        let outcome = match routine.source.fetch().await {
            Ok(entries) => {
                let options = routine.options();
                let batch: Vec<BatchEntry<serde_json::Value>> = entries
                    .into_iter()
                    .map(|(key, value)| BatchEntry::new(key, value, options.clone()))
                    .collect();
                let total = batch.len();
                let written = self.engine.mset(batch).await.into_iter().filter(|ok| *ok).count();

                if written < total {
                    warn!(routine = %routine.name, written, total, "Warm-up routine partially failed");
                } else {
                    info!(routine = %routine.name, written, "Warm-up routine finished");
                }

                RoutineOutcome {
                    name: routine.name.clone(),
                    written,
                    rejected: total - written,
                    error: None,
                    duration_ms: 0,
                }
            }
            Err(e) => {
                warn!(routine = %routine.name, error = %e, "Warm-up routine failed");
                RoutineOutcome {
                    name: routine.name.clone(),
                    written: 0,
                    rejected: 0,
                    error: Some(format!("{:#}", e)),
                    duration_ms: 0,
                }
            }
        };

        CacheMetrics::record_warmup(&routine.name, outcome.is_success());
        RoutineOutcome {
            duration_ms: started.elapsed().as_millis() as u64,
            ..outcome
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use cachet_config::CacheConfig;
    use serde_json::json;

    struct StaticSource(Vec<(String, serde_json::Value)>);

    #[async_trait]
    impl WarmUpSource for StaticSource {
        async fn fetch(&self) -> anyhow::Result<Vec<(String, serde_json::Value)>> {
            Ok(self.0.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl WarmUpSource for FailingSource {
        async fn fetch(&self) -> anyhow::Result<Vec<(String, serde_json::Value)>> {
            anyhow::bail!("catalog service unreachable")
        }
    }

    fn engine() -> Arc<CacheEngine> {
        Arc::new(CacheEngine::new(Arc::new(MemoryStore::new()), &CacheConfig::default()))
    }

    #[tokio::test]
    async fn test_failing_routine_does_not_block_others() {
        let engine = engine();
        let categories = StaticSource(vec![
            ("device:categories:all".to_string(), json!(["wheelchair", "hoist"])),
            ("device:categories:count".to_string(), json!(2)),
        ]);

        let coordinator = WarmUpCoordinator::new(engine.clone())
            .with_routine(WarmUpRoutine::new("broken", Arc::new(FailingSource)))
            .with_routine(
                WarmUpRoutine::new("device_categories", Arc::new(categories))
                    .with_tags(["device:categories"])
                    .with_ttl(Duration::from_secs(3600)),
            );

        let report = coordinator.warm_up().await;
        assert_eq!(report.routines.len(), 2);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.entries_written(), 2);

        let broken = &report.routines[0];
        assert_eq!(broken.name, "broken");
        assert!(broken.error.as_deref().unwrap().contains("unreachable"));

        assert_eq!(engine.get::<u32>("device:categories:count").await, Some(2));
    }

    #[tokio::test]
    async fn test_warmed_entries_are_tagged() {
        let engine = engine();
        let rules = StaticSource(vec![("pricing:rules:weekend".to_string(), json!({"surcharge": 10}))]);
        let coordinator = WarmUpCoordinator::new(engine.clone())
            .with_routine(WarmUpRoutine::new("pricing_rules", Arc::new(rules)).with_tags(["pricing:rules"]));

        coordinator.warm_up().await;
        assert_eq!(engine.invalidate_by_tags(&["pricing:rules"]).await, 1);
        assert!(!engine.exists("pricing:rules:weekend").await);
    }

    #[tokio::test]
    async fn test_no_routines() {
        let coordinator = WarmUpCoordinator::new(engine());
        assert!(coordinator.routine_names().is_empty());

        let report = coordinator.warm_up().await;
        assert!(report.routines.is_empty());
        assert_eq!(report.failed(), 0);
    }
}
