//! Storage provider trait and file metadata types.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use quarry_core::Location;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use time::OffsetDateTime;

/// A boxed stream of bytes for streaming reads.
pub type ByteStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// Wrap an already-materialized buffer as a single-chunk byte stream.
pub fn single_chunk_stream(data: Bytes) -> ByteStream {
    Box::pin(futures::stream::once(async move { Ok(data) }))
}

/// Metadata about a stored document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentInfo {
    /// Simple file name (last path segment).
    pub name: String,
    /// Content type, guessed from the extension when the backend has none.
    pub content_type: String,
    /// Size in bytes; `None` when the backend cannot determine it.
    pub content_length: Option<u64>,
    /// Last modification time, if available.
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_modified: Option<OffsetDateTime>,
}

/// A directory listing, one level deep.
///
/// Nested directories appear as `Directory` entries with empty `files`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DirectoryInfo {
    pub name: String,
    pub files: Vec<FileDetails>,
}

/// Details for a stored path.
///
/// A file lookup only ever produces `Document`; `Directory` is produced for
/// browse operations.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FileDetails {
    Document(DocumentInfo),
    Directory(DirectoryInfo),
}

impl FileDetails {
    pub fn name(&self) -> &str {
        match self {
            Self::Document(document) => &document.name,
            Self::Directory(directory) => &directory.name,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory(_))
    }
}

/// Uniform byte-store abstraction implemented by every backend.
///
/// Implementations must present identical semantics: atomic puts (a reader
/// never observes a partially written file), `NotFound` for absent paths, and
/// safety under concurrent calls on different paths. Concurrent writers to
/// the same path are last-write-wins at put granularity.
#[async_trait]
pub trait StorageProvider: Send + Sync + 'static {
    /// Check if a path exists. Never fails: transient backend errors are
    /// logged and reported as absent.
    async fn exists(&self, location: &Location) -> bool;

    /// Details for a path: `Directory` when the path is a prefix of stored
    /// entries, `Document` otherwise.
    async fn file_details(&self, location: &Location) -> StorageResult<FileDetails>;

    /// Stream a document's content.
    async fn get_file(&self, location: &Location) -> StorageResult<ByteStream>;

    /// Fetch a document's content into memory.
    async fn get_file_bytes(&self, location: &Location) -> StorageResult<Bytes>;

    /// Write a document atomically.
    async fn put_file(&self, location: &Location, data: Bytes) -> StorageResult<()>;

    /// Remove a document, or a directory subtree.
    async fn remove_file(&self, location: &Location) -> StorageResult<()>;

    /// Total bytes stored by this provider.
    async fn usage(&self) -> StorageResult<u64>;

    /// Static identifier for the backend type, used in logs.
    fn backend_name(&self) -> &'static str;

    /// Release backend resources. Called once on server shutdown.
    async fn shutdown(&self) {}
}

/// Guess a content type from a location's file extension.
pub fn content_type_for(location: &Location) -> &'static str {
    match location.extension() {
        Some("jar") | Some("war") | Some("ear") => "application/java-archive",
        Some("pom") | Some("xml") => "application/xml",
        Some("json") | Some("module") => "application/json",
        Some("md5") | Some("sha1") | Some("sha256") | Some("sha512") | Some("asc")
        | Some("txt") => "text/plain",
        Some("html") => "text/html",
        Some("zip") => "application/zip",
        Some("gz") | Some("tgz") => "application/gzip",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_by_extension() {
        let jar = Location::parse("com/acme/lib-1.0.jar").unwrap();
        assert_eq!(content_type_for(&jar), "application/java-archive");

        let pom = Location::parse("com/acme/lib-1.0.pom").unwrap();
        assert_eq!(content_type_for(&pom), "application/xml");

        let unknown = Location::parse("com/acme/lib-1.0.weird").unwrap();
        assert_eq!(content_type_for(&unknown), "application/octet-stream");
    }

    #[test]
    fn file_details_serializes_with_type_tag() {
        let details = FileDetails::Document(DocumentInfo {
            name: "lib-1.0.jar".to_string(),
            content_type: "application/java-archive".to_string(),
            content_length: Some(42),
            last_modified: None,
        });

        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["type"], "document");
        assert_eq!(json["name"], "lib-1.0.jar");
        assert_eq!(json["content_length"], 42);
    }
}
