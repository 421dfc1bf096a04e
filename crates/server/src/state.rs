//! Application state shared across handlers.

use std::sync::Arc;

use quarry_core::AppConfig;
use quarry_maven::{AccessTokenVault, InMemoryStatistics, MavenService, RepositoryRegistry};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// The resolution engine.
    pub maven: Arc<MavenService>,
    /// Token vault used by the auth middleware.
    pub vault: Arc<AccessTokenVault>,
    /// Repository registry, for shutdown and listings.
    pub registry: Arc<RepositoryRegistry>,
    /// Resolution counters.
    pub stats: Arc<InMemoryStatistics>,
}
