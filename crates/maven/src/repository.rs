use std::sync::Arc;

use tokio::sync::RwLock;

use quarry_core::{MirrorConfig, Visibility};
use quarry_storage::StorageProvider;

/// Behavioural settings of a repository that may change at runtime.
#[derive(Debug, Clone, Copy)]
pub struct RepositoryPolicy {
    pub visibility: Visibility,
    pub redeployment: bool,
    pub preserved_snapshots: u32,
}

/// A named artifact repository bound to one storage backend and an ordered
/// list of upstream mirrors.
pub struct Repository {
    name: String,
    storage: Arc<dyn StorageProvider>,
    policy: RwLock<RepositoryPolicy>,
    mirrors: Vec<MirrorConfig>,
}

impl Repository {
    pub fn new(
        name: impl Into<String>,
        storage: Arc<dyn StorageProvider>,
        policy: RepositoryPolicy,
        mirrors: Vec<MirrorConfig>,
    ) -> Self {
        Self {
            name: name.into(),
            storage,
            policy: RwLock::new(policy),
            mirrors,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn storage(&self) -> &Arc<dyn StorageProvider> {
        &self.storage
    }

    /// Snapshot of the current policy. Operations read the policy once and
    /// act on that snapshot for their whole duration.
    pub async fn policy(&self) -> RepositoryPolicy {
        *self.policy.read().await
    }

    pub async fn update_policy(&self, policy: RepositoryPolicy) {
        *self.policy.write().await = policy;
    }

    pub fn mirrors(&self) -> &[MirrorConfig] {
        &self.mirrors
    }

    pub async fn shutdown(&self) {
        self.storage.shutdown().await;
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("name", &self.name)
            .field("backend", &self.storage.backend_name())
            .field("mirrors", &self.mirrors.len())
            .finish()
    }
}
