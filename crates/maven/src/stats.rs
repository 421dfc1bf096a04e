use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::api::Identifier;

/// Records successful artifact resolutions.
#[async_trait]
pub trait StatisticsRecorder: Send + Sync + 'static {
    async fn increment_resolved(&self, identifier: Identifier);
}

/// Counter map held in memory for the lifetime of the process.
#[derive(Default)]
pub struct InMemoryStatistics {
    counters: Mutex<HashMap<Identifier, u64>>,
}

impl InMemoryStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn resolved_count(&self, identifier: &Identifier) -> u64 {
        self.counters
            .lock()
            .await
            .get(identifier)
            .copied()
            .unwrap_or(0)
    }

    /// Total resolutions across all artifacts.
    pub async fn sum(&self) -> u64 {
        self.counters.lock().await.values().sum()
    }

    /// Snapshot of all counters, highest first.
    pub async fn all_resolved(&self) -> Vec<(Identifier, u64)> {
        let mut entries: Vec<_> = self
            .counters
            .lock()
            .await
            .iter()
            .map(|(identifier, count)| (identifier.clone(), *count))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
    }
}

#[async_trait]
impl StatisticsRecorder for InMemoryStatistics {
    async fn increment_resolved(&self, identifier: Identifier) {
        *self.counters.lock().await.entry(identifier).or_insert(0) += 1;
    }
}
