//! Repository resolution and proxy engine.
//!
//! Ties together the repository registry, token vault, access control,
//! mirror fallback and statistics behind [`MavenService`].

pub mod api;
pub mod events;
pub mod mirror;
pub mod preserved;
pub mod registry;
pub mod remote;
pub mod repository;
pub mod security;
pub mod service;
pub mod stats;
pub mod vault;

pub use api::{
    DeleteRequest, DeployEvent, DeployRequest, ErrorResponse, Identifier, LookupRequest,
    PreResolveEvent, ResolvedFileEvent,
};
pub use events::{Event, EventBus, EventBusBuilder};
pub use mirror::MirrorService;
pub use preserved::preserved_snapshots_listener;
pub use registry::{RegistryError, RepositoryRegistry};
pub use remote::{HttpRemoteClient, RemoteClient};
pub use repository::{Repository, RepositoryPolicy};
pub use security::SecurityPolicy;
pub use service::MavenService;
pub use stats::{InMemoryStatistics, StatisticsRecorder};
pub use vault::{AccessTokenVault, CreatedToken};
