//! S3-compatible storage backend using the AWS SDK.

use crate::error::{StorageError, StorageResult};
use crate::traits::{
    content_type_for, ByteStream, DirectoryInfo, DocumentInfo, FileDetails, StorageProvider,
};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Builder as S3ConfigBuilder, Credentials, Region};
use aws_sdk_s3::Client;
use bytes::Bytes;
use quarry_core::Location;
use time::OffsetDateTime;
use tracing::instrument;

/// S3-compatible storage provider, optionally rooted at a key prefix.
pub struct S3StorageProvider {
    client: Client,
    bucket: String,
    prefix: Option<String>,
}

impl std::fmt::Debug for S3StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3StorageProvider")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl S3StorageProvider {
    /// Create a new S3 provider.
    ///
    /// Both keys must be given together; otherwise ambient AWS credentials
    /// (env vars, instance profile) are used.
    pub async fn new(
        bucket: &str,
        endpoint: Option<String>,
        region: Option<String>,
        prefix: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        force_path_style: bool,
    ) -> StorageResult<Self> {
        if access_key_id.is_some() != secret_access_key.is_some() {
            return Err(StorageError::Config(
                "both access_key_id and secret_access_key must be set together".to_string(),
            ));
        }

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        if let (Some(access_key_id), Some(secret_access_key)) =
            (access_key_id, secret_access_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "quarry-config",
            ));
        }
        let shared_config = loader.load().await;

        let mut builder = S3ConfigBuilder::from(&shared_config);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        builder = builder.force_path_style(force_path_style);

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: bucket.to_string(),
            prefix: prefix.filter(|p| !p.is_empty()),
        })
    }

    fn key_for(&self, location: &Location) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}/{location}"),
            None => location.to_string(),
        }
    }

    /// Whether any object is stored under `key/`.
    async fn has_children(&self, key: &str) -> StorageResult<bool> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(format!("{key}/"))
            .max_keys(1)
            .send()
            .await
            .map_err(|e| StorageError::S3(Box::new(e)))?;
        Ok(response.key_count().unwrap_or(0) > 0)
    }

    async fn head_document(&self, location: &Location) -> StorageResult<Option<DocumentInfo>> {
        let key = self.key_for(location);
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(head) => {
                let content_type = head
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| content_type_for(location).to_string());
                Ok(Some(DocumentInfo {
                    name: location.simple_name().to_string(),
                    content_type,
                    content_length: head.content_length().and_then(|n| u64::try_from(n).ok()),
                    last_modified: head
                        .last_modified()
                        .and_then(|dt| OffsetDateTime::from_unix_timestamp(dt.secs()).ok()),
                }))
            }
            Err(err) => {
                let service_error = err.into_service_error();
                if service_error.is_not_found() {
                    Ok(None)
                } else {
                    Err(StorageError::S3(Box::new(service_error)))
                }
            }
        }
    }

    /// One-level listing of `location` built from a delimiter query.
    async fn list_directory(&self, location: &Location) -> StorageResult<DirectoryInfo> {
        let key = self.key_for(location);
        let base = if key.is_empty() {
            String::new()
        } else {
            format!("{key}/")
        };

        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(&base)
            .delimiter("/")
            .into_paginator()
            .send();

        let mut files = Vec::new();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| StorageError::S3(Box::new(e)))?;

            for common_prefix in page.common_prefixes() {
                if let Some(prefix) = common_prefix.prefix() {
                    let name = prefix
                        .trim_end_matches('/')
                        .rsplit('/')
                        .next()
                        .unwrap_or_default()
                        .to_string();
                    files.push(FileDetails::Directory(DirectoryInfo {
                        name,
                        files: Vec::new(),
                    }));
                }
            }

            for object in page.contents() {
                let Some(object_key) = object.key() else {
                    continue;
                };
                let name = object_key.rsplit('/').next().unwrap_or_default();
                if name.is_empty() {
                    continue;
                }
                let child = location
                    .resolve(name)
                    .map_err(|e| StorageError::InvalidPath(e.to_string()))?;
                files.push(FileDetails::Document(DocumentInfo {
                    name: name.to_string(),
                    content_type: content_type_for(&child).to_string(),
                    content_length: object.size().and_then(|n| u64::try_from(n).ok()),
                    last_modified: object
                        .last_modified()
                        .and_then(|dt| OffsetDateTime::from_unix_timestamp(dt.secs()).ok()),
                }));
            }
        }

        if files.is_empty() {
            return Err(StorageError::NotFound(location.to_string()));
        }

        files.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(DirectoryInfo {
            name: location.simple_name().to_string(),
            files,
        })
    }
}

#[async_trait]
impl StorageProvider for S3StorageProvider {
    #[instrument(skip(self), fields(backend = "s3"))]
    async fn exists(&self, location: &Location) -> bool {
        match self.head_document(location).await {
            Ok(Some(_)) => true,
            Ok(None) => {
                // The path may still be a "directory" prefix of stored keys.
                self.has_children(&self.key_for(location))
                    .await
                    .unwrap_or_else(|e| {
                        tracing::debug!(location = %location, error = %e, "existence check failed");
                        false
                    })
            }
            Err(e) => {
                tracing::debug!(location = %location, error = %e, "existence check failed");
                false
            }
        }
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn file_details(&self, location: &Location) -> StorageResult<FileDetails> {
        if let Some(document) = self.head_document(location).await? {
            return Ok(FileDetails::Document(document));
        }
        Ok(FileDetails::Directory(self.list_directory(location).await?))
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn get_file(&self, location: &Location) -> StorageResult<ByteStream> {
        let key = self.key_for(location);
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|err| {
                let service_error = err.into_service_error();
                if service_error.is_no_such_key() {
                    StorageError::NotFound(location.to_string())
                } else {
                    StorageError::S3(Box::new(service_error))
                }
            })?;

        let mut body = output.body;
        let stream = async_stream::try_stream! {
            while let Some(chunk) = body
                .try_next()
                .await
                .map_err(|e| StorageError::S3(Box::new(e)))?
            {
                yield chunk;
            }
        };

        Ok(Box::pin(stream))
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn get_file_bytes(&self, location: &Location) -> StorageResult<Bytes> {
        use futures::TryStreamExt;

        let stream = self.get_file(location).await?;
        let chunks: Vec<Bytes> = stream.try_collect().await?;
        Ok(chunks.concat().into())
    }

    #[instrument(skip(self, data), fields(backend = "s3", size = data.len()))]
    async fn put_file(&self, location: &Location, data: Bytes) -> StorageResult<()> {
        let key = self.key_for(location);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type_for(location))
            .body(aws_sdk_s3::primitives::ByteStream::from(data))
            .send()
            .await
            .map_err(|e| StorageError::S3(Box::new(e)))?;
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn remove_file(&self, location: &Location) -> StorageResult<()> {
        let key = self.key_for(location);

        if self.head_document(location).await?.is_some() {
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(&key)
                .send()
                .await
                .map_err(|e| StorageError::S3(Box::new(e)))?;
            return Ok(());
        }

        // Directory delete: remove every object under the prefix.
        if !self.has_children(&key).await? {
            return Err(StorageError::NotFound(location.to_string()));
        }

        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(format!("{key}/"))
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| StorageError::S3(Box::new(e)))?;
            for object in page.contents() {
                if let Some(object_key) = object.key() {
                    self.client
                        .delete_object()
                        .bucket(&self.bucket)
                        .key(object_key)
                        .send()
                        .await
                        .map_err(|e| StorageError::S3(Box::new(e)))?;
                }
            }
        }

        Ok(())
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn usage(&self) -> StorageResult<u64> {
        let base = self
            .prefix
            .as_ref()
            .map(|p| format!("{p}/"))
            .unwrap_or_default();

        let mut total = 0u64;
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(base)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| StorageError::S3(Box::new(e)))?;
            for object in page.contents() {
                total += object.size().and_then(|n| u64::try_from(n).ok()).unwrap_or(0);
            }
        }

        Ok(total)
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}
