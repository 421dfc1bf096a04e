use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use quarry_core::RepositoryConfig;
use quarry_storage::StorageError;

use crate::api::{not_found, ErrorResponse};
use crate::repository::{Repository, RepositoryPolicy};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate repository name '{0}'")]
    DuplicateName(String),

    #[error("repository '{name}': {source}")]
    Storage {
        name: String,
        #[source]
        source: StorageError,
    },
}

/// Immutable set of repositories built once at startup. Repository policies
/// stay mutable through the contained [`Repository`] handles.
pub struct RepositoryRegistry {
    repositories: Vec<Arc<Repository>>,
    by_name: HashMap<String, Arc<Repository>>,
}

impl RepositoryRegistry {
    /// Builds every configured repository, failing fast on duplicate names
    /// or unreachable storage.
    pub async fn from_config(configs: &[RepositoryConfig]) -> Result<Self, RegistryError> {
        let mut repositories = Vec::with_capacity(configs.len());
        let mut by_name = HashMap::with_capacity(configs.len());

        for config in configs {
            if by_name.contains_key(&config.name) {
                return Err(RegistryError::DuplicateName(config.name.clone()));
            }

            let storage = quarry_storage::from_config(&config.storage)
                .await
                .map_err(|source| RegistryError::Storage {
                    name: config.name.clone(),
                    source,
                })?;

            let repository = Arc::new(Repository::new(
                config.name.clone(),
                storage,
                RepositoryPolicy {
                    visibility: config.visibility,
                    redeployment: config.redeployment,
                    preserved_snapshots: config.preserved_snapshots,
                },
                config.proxied.clone(),
            ));

            info!(
                repository = %config.name,
                backend = repository.storage().backend_name(),
                mirrors = config.proxied.len(),
                "repository initialized"
            );

            by_name.insert(config.name.clone(), repository.clone());
            repositories.push(repository);
        }

        Ok(Self {
            repositories,
            by_name,
        })
    }

    pub fn get_repository(&self, name: &str) -> Option<Arc<Repository>> {
        self.by_name.get(name).cloned()
    }

    pub fn find_repository(&self, name: &str) -> Result<Arc<Repository>, ErrorResponse> {
        self.get_repository(name)
            .ok_or_else(|| not_found(format!("Repository {name} not found")))
    }

    /// Repositories in declaration order.
    pub fn repositories(&self) -> &[Arc<Repository>] {
        &self.repositories
    }

    pub async fn shutdown_all(&self) {
        for repository in &self.repositories {
            repository.shutdown().await;
        }
    }
}
