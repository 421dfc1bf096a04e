//! Local filesystem storage backend.

use crate::error::{StorageError, StorageResult};
use crate::traits::{
    content_type_for, ByteStream, DirectoryInfo, DocumentInfo, FileDetails, StorageProvider,
};
use async_trait::async_trait;
use bytes::Bytes;
use quarry_core::Location;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

/// Chunk size for streaming reads (64 KiB).
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Filesystem storage provider rooted at one directory per repository.
pub struct FilesystemStorageProvider {
    root: PathBuf,
}

impl FilesystemStorageProvider {
    /// Create a provider, creating the root directory if needed.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Resolve a location to a path under the root.
    ///
    /// `Location` normalization already rejects `..` and absolute segments,
    /// so a plain join cannot escape the root.
    fn resolve(&self, location: &Location) -> PathBuf {
        self.root.join(location.as_str())
    }

    async fn ensure_parent(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    fn document_info(location: &Location, metadata: &std::fs::Metadata) -> DocumentInfo {
        DocumentInfo {
            name: location.simple_name().to_string(),
            content_type: content_type_for(location).to_string(),
            content_length: Some(metadata.len()),
            last_modified: metadata.modified().ok().map(|t| t.into()),
        }
    }

    async fn directory_info(&self, location: &Location) -> StorageResult<DirectoryInfo> {
        let path = self.resolve(location);
        let mut files = Vec::new();
        let mut entries = fs::read_dir(&path).await?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            // Skip in-flight temp files and symlinks; symlinks are never
            // created by this provider and could point outside the root.
            if name.contains(".tmp.") {
                continue;
            }
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                files.push(FileDetails::Directory(DirectoryInfo {
                    name,
                    files: Vec::new(),
                }));
            } else if file_type.is_file() {
                let child = location.resolve(&name).map_err(|e| {
                    StorageError::InvalidPath(format!("unlistable entry {name}: {e}"))
                })?;
                let metadata = entry.metadata().await?;
                files.push(FileDetails::Document(Self::document_info(
                    &child, &metadata,
                )));
            }
        }

        files.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(DirectoryInfo {
            name: location.simple_name().to_string(),
            files,
        })
    }
}

#[async_trait]
impl StorageProvider for FilesystemStorageProvider {
    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn exists(&self, location: &Location) -> bool {
        match fs::try_exists(self.resolve(location)).await {
            Ok(exists) => exists,
            Err(e) => {
                tracing::debug!(location = %location, error = %e, "existence check failed");
                false
            }
        }
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn file_details(&self, location: &Location) -> StorageResult<FileDetails> {
        let path = self.resolve(location);
        let metadata = fs::metadata(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(location.to_string())
            } else {
                StorageError::Io(e)
            }
        })?;

        if metadata.is_dir() {
            Ok(FileDetails::Directory(self.directory_info(location).await?))
        } else {
            Ok(FileDetails::Document(Self::document_info(
                location, &metadata,
            )))
        }
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get_file(&self, location: &Location) -> StorageResult<ByteStream> {
        use tokio::io::AsyncReadExt;

        let path = self.resolve(location);
        let file = fs::File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(location.to_string())
            } else {
                StorageError::Io(e)
            }
        })?;

        let stream = async_stream::try_stream! {
            let mut file = file;
            let mut buf = vec![0u8; STREAM_CHUNK_SIZE];
            loop {
                let n = file.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                yield Bytes::copy_from_slice(&buf[..n]);
            }
        };

        Ok(Box::pin(stream))
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get_file_bytes(&self, location: &Location) -> StorageResult<Bytes> {
        let path = self.resolve(location);
        let data = fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(location.to_string())
            } else {
                StorageError::Io(e)
            }
        })?;
        Ok(Bytes::from(data))
    }

    #[instrument(skip(self, data), fields(backend = "filesystem", size = data.len()))]
    async fn put_file(&self, location: &Location, data: Bytes) -> StorageResult<()> {
        let path = self.resolve(location);
        self.ensure_parent(&path).await?;

        // Write to a uniquely named temp file, fsync, then rename so readers
        // never observe a partial write.
        let temp_name = format!(".tmp.{}", Uuid::new_v4());
        let temp_path = path.with_file_name(
            path.file_name()
                .map(|n| format!("{}{}", n.to_string_lossy(), temp_name))
                .unwrap_or_else(|| temp_name.clone()),
        );
        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
        }
        fs::rename(&temp_path, &path).await?;

        Ok(())
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn remove_file(&self, location: &Location) -> StorageResult<()> {
        let path = self.resolve(location);
        let metadata = fs::metadata(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(location.to_string())
            } else {
                StorageError::Io(e)
            }
        })?;

        if metadata.is_dir() {
            fs::remove_dir_all(&path).await?;
        } else {
            fs::remove_file(&path).await?;
        }
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn usage(&self) -> StorageResult<u64> {
        let mut total = 0u64;
        let mut stack = vec![self.root.clone()];

        while let Some(dir) = stack.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    stack.push(entry.path());
                } else if file_type.is_file() {
                    total += entry.metadata().await?.len();
                }
            }
        }

        Ok(total)
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(path: &str) -> Location {
        Location::parse(path).unwrap()
    }

    #[tokio::test]
    async fn put_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FilesystemStorageProvider::new(dir.path()).await.unwrap();

        let gav = location("com/acme/lib/1.0/lib-1.0.jar");
        let data = Bytes::from("artifact bytes");

        provider.put_file(&gav, data.clone()).await.unwrap();
        assert!(provider.exists(&gav).await);
        assert_eq!(provider.get_file_bytes(&gav).await.unwrap(), data);
    }

    #[tokio::test]
    async fn overwrite_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FilesystemStorageProvider::new(dir.path()).await.unwrap();

        let gav = location("com/acme/lib/1.0/lib-1.0.jar");
        provider.put_file(&gav, Bytes::from("first")).await.unwrap();
        provider
            .put_file(&gav, Bytes::from("second"))
            .await
            .unwrap();

        assert_eq!(
            provider.get_file_bytes(&gav).await.unwrap(),
            Bytes::from("second")
        );
    }

    #[tokio::test]
    async fn file_details_document() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FilesystemStorageProvider::new(dir.path()).await.unwrap();

        let gav = location("com/acme/lib/1.0/lib-1.0.jar");
        provider.put_file(&gav, Bytes::from("data")).await.unwrap();

        match provider.file_details(&gav).await.unwrap() {
            FileDetails::Document(document) => {
                assert_eq!(document.name, "lib-1.0.jar");
                assert_eq!(document.content_type, "application/java-archive");
                assert_eq!(document.content_length, Some(4));
                assert!(document.last_modified.is_some());
            }
            other => panic!("expected document, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn file_details_directory_lists_children() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FilesystemStorageProvider::new(dir.path()).await.unwrap();

        provider
            .put_file(&location("com/acme/lib/1.0/lib-1.0.jar"), Bytes::from("a"))
            .await
            .unwrap();
        provider
            .put_file(&location("com/acme/lib/1.0/lib-1.0.pom"), Bytes::from("b"))
            .await
            .unwrap();
        provider
            .put_file(&location("com/acme/lib/2.0/lib-2.0.jar"), Bytes::from("c"))
            .await
            .unwrap();

        match provider
            .file_details(&location("com/acme/lib"))
            .await
            .unwrap()
        {
            FileDetails::Directory(listing) => {
                assert_eq!(listing.name, "lib");
                let names: Vec<_> = listing.files.iter().map(|f| f.name()).collect();
                assert_eq!(names, vec!["1.0", "2.0"]);
                assert!(listing.files.iter().all(|f| f.is_directory()));
            }
            other => panic!("expected directory, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn in_flight_temp_files_are_hidden_from_listings() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FilesystemStorageProvider::new(dir.path()).await.unwrap();

        provider
            .put_file(&location("com/acme/lib/1.0/lib-1.0.jar"), Bytes::from("a"))
            .await
            .unwrap();
        // A concurrent deploy in progress leaves a "{file}.tmp.{uuid}" entry
        // until its rename lands.
        let partial = format!("lib-1.0.jar.tmp.{}", Uuid::new_v4());
        std::fs::write(
            dir.path().join("com/acme/lib/1.0").join(partial),
            b"partial",
        )
        .unwrap();

        match provider
            .file_details(&location("com/acme/lib/1.0"))
            .await
            .unwrap()
        {
            FileDetails::Directory(listing) => {
                let names: Vec<_> = listing.files.iter().map(|f| f.name()).collect();
                assert_eq!(names, vec!["lib-1.0.jar"]);
            }
            other => panic!("expected directory, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FilesystemStorageProvider::new(dir.path()).await.unwrap();

        let gav = location("com/missing/file.jar");
        assert!(!provider.exists(&gav).await);
        assert!(matches!(
            provider.file_details(&gav).await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            provider.get_file_bytes(&gav).await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            provider.remove_file(&gav).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn remove_then_read_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FilesystemStorageProvider::new(dir.path()).await.unwrap();

        let gav = location("com/acme/lib/1.0/lib-1.0.jar");
        provider.put_file(&gav, Bytes::from("data")).await.unwrap();
        provider.remove_file(&gav).await.unwrap();

        assert!(!provider.exists(&gav).await);
        assert!(matches!(
            provider.get_file_bytes(&gav).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn usage_sums_stored_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FilesystemStorageProvider::new(dir.path()).await.unwrap();

        provider
            .put_file(&location("a/one.bin"), Bytes::from(vec![0u8; 10]))
            .await
            .unwrap();
        provider
            .put_file(&location("a/b/two.bin"), Bytes::from(vec![0u8; 32]))
            .await
            .unwrap();

        assert_eq!(provider.usage().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn get_file_streams_full_content() {
        use futures::TryStreamExt;

        let dir = tempfile::tempdir().unwrap();
        let provider = FilesystemStorageProvider::new(dir.path()).await.unwrap();

        let gav = location("com/acme/big.bin");
        let data = Bytes::from(vec![7u8; STREAM_CHUNK_SIZE * 2 + 17]);
        provider.put_file(&gav, data.clone()).await.unwrap();

        let stream = provider.get_file(&gav).await.unwrap();
        let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
        let total: usize = chunks.iter().map(|c| c.len()).sum();
        assert_eq!(total, data.len());
    }
}
