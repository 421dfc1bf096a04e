//! Core domain types and shared logic for the Quarry artifact repository.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Artifact coordinates (`Location`)
//! - Access tokens and path-scoped routes
//! - Repository, mirror and storage configuration

pub mod config;
pub mod error;
pub mod location;
pub mod token;

pub use config::{
    AppConfig, AuthenticationMethod, MirrorConfig, MirrorCredentials, RepositoryConfig,
    RouteConfig, ServerConfig, StorageConfig, TokenConfig, Visibility,
};
pub use error::{Error, Result};
pub use location::{Location, METADATA_FILE};
pub use token::{hash_secret, AccessToken, AccessTokenId, AccessTokenType, Route, RoutePermission};
