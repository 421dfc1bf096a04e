//! Storage abstraction and backends for Quarry.
//!
//! Every repository owns exactly one [`StorageProvider`]; the local
//! filesystem and S3-compatible backends present identical semantics
//! (atomic puts, `NotFound` for absent paths, one-level directory listings).

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::{filesystem::FilesystemStorageProvider, s3::S3StorageProvider};
pub use error::{StorageError, StorageResult};
pub use traits::{
    content_type_for, single_chunk_stream, ByteStream, DirectoryInfo, DocumentInfo, FileDetails,
    StorageProvider,
};

use quarry_core::config::StorageConfig;
use std::sync::Arc;

/// Create a storage provider from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn StorageProvider>> {
    config.validate().map_err(StorageError::Config)?;

    match config {
        StorageConfig::Filesystem { path } => {
            let provider = FilesystemStorageProvider::new(path).await?;
            Ok(Arc::new(provider))
        }
        StorageConfig::S3 {
            bucket,
            endpoint,
            region,
            prefix,
            access_key_id,
            secret_access_key,
            force_path_style,
        } => {
            let provider = S3StorageProvider::new(
                bucket,
                endpoint.clone(),
                region.clone(),
                prefix.clone(),
                access_key_id.clone(),
                secret_access_key.clone(),
                *force_path_style,
            )
            .await?;
            Ok(Arc::new(provider))
        }
    }
}
