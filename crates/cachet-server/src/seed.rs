//! File-backed warm-up sources.
//!
//! Each configured routine reads one JSON object from `{seed_dir}/{file}`;
//! every member becomes a cache entry.

use anyhow::Context;
use async_trait::async_trait;
use cachet_cache::{WarmUpRoutine, WarmUpSource};
use cachet_config::WarmUpConfig;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Reads warm-up entries from a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl WarmUpSource for JsonFileSource {
    async fn fetch(&self) -> anyhow::Result<Vec<(String, Value)>> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read seed file {}", self.path.display()))?;

        let entries: Map<String, Value> = serde_json::from_str(&raw)
            .with_context(|| format!("seed file {} is not a JSON object", self.path.display()))?;

        Ok(entries.into_iter().collect())
    }
}

/// Builds one routine per configured seed file.
pub fn build_routines(config: &WarmUpConfig) -> Vec<WarmUpRoutine> {
    let seed_dir = Path::new(&config.seed_dir);

    config
        .routines
        .iter()
        .map(|routine| {
            let source = Arc::new(JsonFileSource::new(seed_dir.join(&routine.file)));
            let built = WarmUpRoutine::new(routine.name.clone(), source).with_tags(routine.tags.clone());
            match routine.ttl_secs {
                Some(secs) => built.with_ttl(Duration::from_secs(secs)),
                None => built,
            }
        })
        .collect()
}
