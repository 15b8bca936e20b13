//! The object-store side of the adapter.
//!
//! [`ObjectStore`] is the narrow set of container/object operations the
//! adapter needs. [`SwiftClient`](swift::SwiftClient) speaks the Swift v1
//! REST API; [`MemoryStore`](memory::MemoryStore) keeps everything in
//! process.

pub mod auth;
pub mod memory;
pub mod swift;

use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use futures::StreamExt;

use swiftfs_common::{ByteStream, Payload};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Swift {method} {target} failed: HTTP {status} - {body}")]
    BadResponse {
        method: String,
        target: String,
        status: u16,
        body: String,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl StoreError {
    pub fn not_found(method: &str, target: &str) -> Self {
        Self::BadResponse {
            method: method.to_string(),
            target: target.to_string(),
            status: 404,
            body: String::new(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::BadResponse { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Metadata of one remote object, as returned by HEAD or a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectMetadata {
    pub key: String,
    pub content_length: u64,
    pub content_type: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Container/object operations required by the adapter.
///
/// A store is bound to one container for its whole lifetime. Large-object
/// segments may be written to a different container.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    fn container_name(&self) -> &str;

    /// Create or overwrite an object in one request.
    async fn create_object(
        &self,
        key: &str,
        payload: Payload,
        content_type: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Upload a stream as segments of `segment_size` bytes into
    /// `segment_container`, then create a manifest at `key` that presents
    /// them as one object.
    async fn create_large_object(
        &self,
        key: &str,
        stream: ByteStream,
        segment_size: u64,
        segment_container: &str,
    ) -> Result<(), StoreError>;

    async fn head_object(&self, key: &str) -> Result<ObjectMetadata, StoreError>;

    async fn download_object(&self, key: &str) -> Result<ByteStream, StoreError>;

    /// `Ok(false)` on 404; any other failure is an error.
    async fn object_exists(&self, key: &str) -> Result<bool, StoreError>;

    /// All objects whose key starts with `prefix`, in store order. Pages are
    /// requested as the stream is polled.
    fn list_objects<'a>(&'a self, prefix: &str) -> BoxStream<'a, Result<ObjectMetadata, StoreError>>;

    /// Server-side copy to `destination`, given as `/{container}/{key}`.
    async fn copy_object(&self, key: &str, destination: &str) -> Result<(), StoreError>;

    async fn delete_object(&self, key: &str) -> Result<(), StoreError>;

    /// Pre-signed URL granting `method` access to `key` until `expires`
    /// (Unix seconds).
    fn temporary_url(&self, key: &str, method: &str, expires: i64) -> Result<String, StoreError>;
}

/// Splits a byte stream into fixed-size segments.
///
/// Every segment except the last is exactly `segment_size` bytes.
pub struct SegmentReader {
    stream: ByteStream,
    pending: BytesMut,
    segment_size: usize,
    finished: bool,
}

impl SegmentReader {
    pub fn new(stream: ByteStream, segment_size: u64) -> Self {
        Self {
            stream,
            pending: BytesMut::new(),
            segment_size: (segment_size.max(1)).min(usize::MAX as u64) as usize,
            finished: false,
        }
    }

    pub async fn next_segment(&mut self) -> std::io::Result<Option<Bytes>> {
        while !self.finished && self.pending.len() < self.segment_size {
            match self.stream.next().await {
                Some(chunk) => self.pending.extend_from_slice(&chunk?),
                None => self.finished = true,
            }
        }
        if self.pending.is_empty() {
            return Ok(None);
        }
        let take = self.pending.len().min(self.segment_size);
        Ok(Some(self.pending.split_to(take).freeze()))
    }
}

/// Name of the `index`th segment of an upload.
/// Scheme: `{key}/{upload_id}/{index:08}`
pub fn segment_key(key: &str, upload_id: &str, index: usize) -> String {
    format!("{}{:08}", segment_prefix(key, upload_id), index)
}

/// Common prefix of all segments of an upload, with a trailing `/`.
pub fn segment_prefix(key: &str, upload_id: &str) -> String {
    format!("{}/{}/", key.trim_end_matches('/'), upload_id)
}

/// A fresh identifier for one segmented upload.
pub fn new_upload_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().timestamp(), &uuid[..8])
}

/// Split a `/{container}/{key}` copy destination into its parts.
pub fn parse_destination(destination: &str) -> Option<(&str, &str)> {
    let (container, key) = destination.trim_start_matches('/').split_once('/')?;
    if container.is_empty() || key.is_empty() {
        return None;
    }
    Some((container, key))
}
