use std::sync::Arc;

use bytes::Bytes;
use futures::TryStreamExt;
use tempfile::TempDir;

use quarry_core::{
    AccessTokenId, AccessTokenType, Location, MirrorConfig, RepositoryConfig, Route,
    RoutePermission, StorageConfig, Visibility,
};
use quarry_maven::{
    AccessTokenVault, EventBus, HttpRemoteClient, InMemoryStatistics, MavenService, MirrorService,
    RepositoryRegistry, SecurityPolicy,
};
use quarry_storage::ByteStream;

pub struct Harness {
    pub service: MavenService,
    pub registry: Arc<RepositoryRegistry>,
    pub vault: Arc<AccessTokenVault>,
    pub stats: Arc<InMemoryStatistics>,
    pub root: TempDir,
}

pub fn repository_config(root: &TempDir, name: &str) -> RepositoryConfig {
    RepositoryConfig {
        name: name.to_string(),
        visibility: Visibility::Public,
        redeployment: false,
        preserved_snapshots: 0,
        storage: StorageConfig::Filesystem {
            path: root.path().join(name),
        },
        proxied: Vec::new(),
    }
}

pub fn mirror(url: String, store: bool) -> MirrorConfig {
    MirrorConfig {
        url,
        credentials: None,
        connect_timeout_secs: 2,
        read_timeout_secs: 5,
        store,
    }
}

pub async fn harness(root: TempDir, configs: Vec<RepositoryConfig>) -> Harness {
    harness_with_bus(root, configs, EventBus::builder().build()).await
}

pub async fn harness_with_bus(
    root: TempDir,
    configs: Vec<RepositoryConfig>,
    bus: EventBus,
) -> Harness {
    let registry = Arc::new(RepositoryRegistry::from_config(&configs).await.unwrap());
    let vault = Arc::new(AccessTokenVault::new());
    let stats = Arc::new(InMemoryStatistics::new());

    let service = MavenService::new(
        registry.clone(),
        SecurityPolicy::new(vault.clone()),
        MirrorService::new(Arc::new(HttpRemoteClient::new())),
        stats.clone(),
        Arc::new(bus),
    );

    Harness {
        service,
        registry,
        vault,
        stats,
        root,
    }
}

pub fn gav(path: &str) -> Location {
    path.parse().unwrap()
}

pub async fn token_with_route(
    vault: &AccessTokenVault,
    name: &str,
    path: &str,
    permission: RoutePermission,
) -> AccessTokenId {
    let created = vault.create_token(name, AccessTokenType::Temporary).await;
    vault
        .add_route(&created.id, Route::new(path, permission))
        .await
        .unwrap();
    created.id
}

pub async fn collect(stream: ByteStream) -> Bytes {
    let mut stream = stream;
    let mut buf = Vec::new();
    while let Some(chunk) = stream.try_next().await.unwrap() {
        buf.extend_from_slice(&chunk);
    }
    Bytes::from(buf)
}
