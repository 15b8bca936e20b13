use std::fmt;

use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::TryStreamExt;

use crate::attributes::{FileAttributes, Visibility};
use crate::config::Config;
use crate::Result;

/// A lazily consumed sequence of byte chunks.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// A lazily produced listing of file attributes.
pub type AttributeStream<'a> = BoxStream<'a, Result<FileAttributes>>;

/// Content submitted to a write, tagged by how the caller holds it.
pub enum Payload {
    /// A bounded, fully buffered body.
    Contents(Bytes),
    /// A streaming source. `size` is the caller's declaration of the total
    /// length, when known; adapters use it to choose an upload strategy.
    Stream { stream: ByteStream, size: Option<u64> },
}

impl Payload {
    pub fn stream(stream: ByteStream) -> Self {
        Payload::Stream { stream, size: None }
    }

    pub fn sized_stream(stream: ByteStream, size: u64) -> Self {
        Payload::Stream {
            stream,
            size: Some(size),
        }
    }

    /// Known length of the payload, if any.
    pub fn declared_size(&self) -> Option<u64> {
        match self {
            Payload::Contents(data) => Some(data.len() as u64),
            Payload::Stream { size, .. } => *size,
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Contents(data) => f.debug_tuple("Contents").field(&data.len()).finish(),
            Payload::Stream { size, .. } => f.debug_struct("Stream").field("size", size).finish(),
        }
    }
}

impl From<Bytes> for Payload {
    fn from(data: Bytes) -> Self {
        Payload::Contents(data)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(data: Vec<u8>) -> Self {
        Payload::Contents(Bytes::from(data))
    }
}

impl From<&'static str> for Payload {
    fn from(data: &'static str) -> Self {
        Payload::Contents(Bytes::from_static(data.as_bytes()))
    }
}

/// Drain a byte stream into one contiguous buffer.
pub async fn read_to_bytes(stream: ByteStream) -> std::io::Result<Bytes> {
    let buf = stream
        .try_fold(BytesMut::new(), |mut buf, chunk| async move {
            buf.extend_from_slice(&chunk);
            Ok(buf)
        })
        .await?;
    Ok(buf.freeze())
}

/// Trait implemented by all filesystem adapters.
///
/// Paths are logical: callers never see the storage prefix or the
/// container. Directories are implicit; an adapter may treat directory
/// operations as no-ops or as unsupported. File operations reject a
/// path that normalizes to the root.
#[async_trait::async_trait]
pub trait FilesystemAdapter: Send + Sync {
    /// Whether a file exists at `path`. A missing file is `Ok(false)`.
    async fn file_exists(&self, path: &str) -> Result<bool>;

    /// Create or overwrite the file at `path`.
    async fn write(&self, path: &str, payload: Payload, config: &Config) -> Result<()>;

    /// Write from a stream of unknown length.
    async fn write_stream(&self, path: &str, stream: ByteStream, config: &Config) -> Result<()> {
        self.write(path, Payload::stream(stream), config).await
    }

    /// Full contents of the file at `path`.
    async fn read(&self, path: &str) -> Result<Bytes>;

    /// Attributes of the file at `path` plus a stream over its contents.
    async fn read_stream(&self, path: &str) -> Result<(FileAttributes, ByteStream)>;

    /// Delete the file at `path`. Deleting a missing file is an error.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Delete a directory and everything under it. May be unsupported.
    async fn delete_directory(&self, path: &str) -> Result<()>;

    /// Create a directory. A no-op where directories are implicit.
    async fn create_directory(&self, path: &str, config: &Config) -> Result<()>;

    /// Change the visibility of the file at `path`. May be ignored.
    async fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<()>;

    /// Attributes including the visibility of the file at `path`. May be unsupported.
    async fn visibility(&self, path: &str) -> Result<FileAttributes>;

    /// Attributes including the MIME type of the file at `path`.
    async fn mime_type(&self, path: &str) -> Result<FileAttributes>;

    /// Attributes including the modification time of the file at `path`.
    async fn last_modified(&self, path: &str) -> Result<FileAttributes>;

    /// Attributes including the size of the file at `path`.
    async fn file_size(&self, path: &str) -> Result<FileAttributes>;

    /// List everything under `path`. Items are produced on demand.
    fn list_contents<'a>(&'a self, path: &'a str, deep: bool) -> AttributeStream<'a>;

    /// Move a file. Moving a file onto itself leaves it in place.
    async fn move_file(&self, source: &str, destination: &str, config: &Config) -> Result<()>;

    /// Copy a file. May be unsupported.
    async fn copy(&self, source: &str, destination: &str, config: &Config) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn test_read_to_bytes() {
        let chunks: Vec<std::io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"hel")),
            Ok(Bytes::from_static(b"lo")),
        ];
        let data = read_to_bytes(Box::pin(stream::iter(chunks))).await.unwrap();
        assert_eq!(&data[..], b"hello");
    }

    #[tokio::test]
    async fn test_read_to_bytes_propagates_error() {
        let chunks: Vec<std::io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"hel")),
            Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "reset")),
        ];
        assert!(read_to_bytes(Box::pin(stream::iter(chunks))).await.is_err());
    }

    #[test]
    fn test_declared_size() {
        assert_eq!(Payload::from("hello").declared_size(), Some(5));
        let empty: ByteStream = Box::pin(futures::stream::empty());
        assert_eq!(Payload::stream(empty).declared_size(), None);
        let empty: ByteStream = Box::pin(futures::stream::empty());
        assert_eq!(Payload::sized_stream(empty, 42).declared_size(), Some(42));
    }
}
