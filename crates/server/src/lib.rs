//! Quarry HTTP server.
//!
//! Thin axum boundary over the resolution engine: credential extraction,
//! route dispatch and JSON error rendering.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;

use std::sync::Arc;

use quarry_core::AppConfig;
use quarry_maven::{
    preserved_snapshots_listener, AccessTokenVault, EventBus, HttpRemoteClient,
    InMemoryStatistics, MavenService, MirrorService, RegistryError, RepositoryRegistry,
    SecurityPolicy,
};

/// Builds the full application state from validated configuration:
/// repositories with their storage providers, the seeded token vault and
/// the assembled engine.
pub async fn build_state(config: AppConfig) -> Result<AppState, RegistryError> {
    let registry = Arc::new(RepositoryRegistry::from_config(&config.repositories).await?);

    let vault = Arc::new(AccessTokenVault::new());
    for token in &config.tokens {
        vault.insert_from_config(token).await;
    }

    let stats = Arc::new(InMemoryStatistics::new());

    let events = EventBus::builder()
        .subscribe(preserved_snapshots_listener())
        .build();

    let maven = Arc::new(MavenService::new(
        registry.clone(),
        SecurityPolicy::new(vault.clone()),
        MirrorService::new(Arc::new(HttpRemoteClient::new())),
        stats.clone(),
        Arc::new(events),
    ));

    Ok(AppState {
        config: Arc::new(config),
        maven,
        vault,
        registry,
        stats,
    })
}
