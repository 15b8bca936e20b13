//! Filesystem adapter over a Swift container.
//!
//! Each call rewrites the logical path into a storage key with the
//! [`PathPrefixer`], delegates to the [`ObjectStore`], and maps the result
//! into [`FileAttributes`] or a [`FilesystemError`]. Directories are
//! implicit key prefixes; visibility is not modeled.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use tracing::{debug, warn};

use swiftfs_common::{
    normalize_path, read_to_bytes, AttributeStream, BoxError, ByteStream, Config, FileAttributes,
    FilesystemAdapter, FilesystemError, MetadataField, MimeTypeDetector, MoveStage, PathPrefixer,
    Payload, Result, Visibility,
};

use crate::config::SwiftConfig;
use crate::store::swift::SwiftClient;
use crate::store::{ObjectMetadata, ObjectStore, StoreError};

/// Result of the legacy prefix delete.
#[derive(Debug)]
pub enum DeleteDirOutcome {
    /// The directory normalized to the storage root; nothing was deleted.
    Refused,
    /// Every object under the prefix was deleted.
    Completed { deleted: usize },
    /// The batch stopped at `failed_key` (an object key, or the listing
    /// prefix when listing itself failed). The `deleted` objects before it
    /// stay deleted.
    Aborted {
        deleted: usize,
        failed_key: String,
        error: StoreError,
    },
}

impl DeleteDirOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, DeleteDirOutcome::Completed { .. })
    }
}

const ROOT_IS_NOT_A_FILE: &str = "The storage root is not a file";

pub struct SwiftAdapter {
    store: Arc<dyn ObjectStore>,
    prefixer: PathPrefixer,
    mime_detector: MimeTypeDetector,
}

impl SwiftAdapter {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: &str) -> Self {
        Self {
            store,
            prefixer: PathPrefixer::new(prefix),
            mime_detector: MimeTypeDetector::new(),
        }
    }

    /// Connect to Swift with `config` and bind to its container and prefix.
    pub async fn connect(config: &SwiftConfig) -> std::result::Result<Self, StoreError> {
        let client = SwiftClient::connect(config).await?;
        Ok(Self::new(Arc::new(client), &config.prefix))
    }

    pub fn container_name(&self) -> &str {
        self.store.container_name()
    }

    /// Storage key for a file path.
    ///
    /// A path that normalizes to the root names no file; its key would
    /// address the container itself, so it is rejected with `reject`.
    fn file_key(
        &self,
        path: &str,
        reject: impl FnOnce(&'static str) -> FilesystemError,
    ) -> Result<String> {
        if normalize_path(path)?.is_empty() {
            return Err(reject(ROOT_IS_NOT_A_FILE));
        }
        self.prefixer.prefix_path(path)
    }

    fn attributes(&self, meta: &ObjectMetadata) -> FileAttributes {
        let path = self.prefixer.strip_prefix(&meta.key).to_string();
        let mime_type = meta
            .content_type
            .clone()
            .or_else(|| self.mime_detector.detect_from_path(&path));
        FileAttributes {
            file_size: Some(meta.content_length),
            visibility: None,
            last_modified: meta.last_modified.map(|d| d.timestamp()),
            mime_type,
            path,
        }
    }

    async fn fetch_metadata(&self, path: &str, field: MetadataField) -> Result<FileAttributes> {
        let key = self.file_key(path, |r| FilesystemError::unable_to_retrieve_metadata(path, field, r))?;
        let meta = self
            .store
            .head_object(&key)
            .await
            .map_err(|e| FilesystemError::unable_to_retrieve_metadata(path, field, e))?;
        Ok(self.attributes(&meta))
    }

    /// Legacy existence check; same semantics as [`FilesystemAdapter::file_exists`].
    pub async fn has(&self, path: &str) -> Result<bool> {
        self.file_exists(path).await
    }

    /// Legacy delete of every object under a directory prefix.
    ///
    /// Objects are deleted one at a time in listing order; the first
    /// failure stops the batch without restoring anything already deleted.
    pub async fn delete_dir(&self, path: &str) -> Result<DeleteDirOutcome> {
        if normalize_path(path)?.is_empty() {
            warn!(path = %path, "Refusing to delete the storage root");
            return Ok(DeleteDirOutcome::Refused);
        }
        let prefix = self.prefixer.prefix_directory_path(path)?;

        let mut deleted = 0usize;
        let mut objects = self.store.list_objects(&prefix);
        while let Some(item) = objects.next().await {
            let meta = match item {
                Ok(meta) => meta,
                Err(error) => {
                    warn!(prefix = %prefix, error = %error, "Listing failed during directory delete");
                    return Ok(DeleteDirOutcome::Aborted {
                        deleted,
                        failed_key: prefix,
                        error,
                    });
                }
            };
            if let Err(error) = self.store.delete_object(&meta.key).await {
                warn!(key = %meta.key, error = %error, deleted, "Directory delete aborted");
                return Ok(DeleteDirOutcome::Aborted {
                    deleted,
                    failed_key: meta.key,
                    error,
                });
            }
            deleted += 1;
        }

        debug!(prefix = %prefix, deleted, "Directory delete complete");
        Ok(DeleteDirOutcome::Completed { deleted })
    }

    /// Signed GET URL for `path`, valid until `expires_at`.
    pub fn temporary_url(&self, path: &str, expires_at: DateTime<Utc>) -> Result<String> {
        let key = self.file_key(path, |r| FilesystemError::UnableToGenerateTemporaryUrl {
            path: path.to_string(),
            reason: r.to_string(),
        })?;
        self.store
            .temporary_url(&key, "GET", expires_at.timestamp())
            .map_err(|e| FilesystemError::UnableToGenerateTemporaryUrl {
                path: path.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl FilesystemAdapter for SwiftAdapter {
    async fn file_exists(&self, path: &str) -> Result<bool> {
        let key = self.file_key(path, |r| FilesystemError::unable_to_check_existence(path, r))?;
        match self.store.object_exists(&key).await {
            Ok(exists) => Ok(exists),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(FilesystemError::unable_to_check_existence(path, e)),
        }
    }

    async fn write(&self, path: &str, payload: Payload, config: &Config) -> Result<()> {
        let key = self.file_key(path, |r| FilesystemError::unable_to_write(path, r))?;
        debug!(key = %key, size = ?payload.declared_size(), "Writing object");

        let result = match payload {
            Payload::Stream {
                stream,
                size: Some(size),
            } if size > config.large_object_threshold() => {
                let segment_container = config.segment_container(self.store.container_name());
                debug!(key = %key, size, segment_container = %segment_container, "Using segmented upload");
                self.store
                    .create_large_object(&key, stream, config.segment_size(), segment_container)
                    .await
            }
            payload => {
                let content_type = match &payload {
                    Payload::Contents(data) => self.mime_detector.detect(path, Some(&data[..])),
                    Payload::Stream { .. } => self.mime_detector.detect(path, None),
                };
                self.store
                    .create_object(&key, payload, content_type.as_deref())
                    .await
            }
        };

        result.map_err(|e| FilesystemError::unable_to_write(path, e))
    }

    async fn read(&self, path: &str) -> Result<Bytes> {
        let (_, stream) = self.read_stream(path).await?;
        read_to_bytes(stream)
            .await
            .map_err(|e| FilesystemError::unable_to_read(path, e))
    }

    async fn read_stream(&self, path: &str) -> Result<(FileAttributes, ByteStream)> {
        let key = self.file_key(path, |r| FilesystemError::unable_to_read(path, r))?;
        let meta = self
            .store
            .head_object(&key)
            .await
            .map_err(|e| FilesystemError::unable_to_read(path, e))?;
        let stream = self
            .store
            .download_object(&key)
            .await
            .map_err(|e| FilesystemError::unable_to_read(path, e))?;
        Ok((self.attributes(&meta), stream))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let key = self.file_key(path, |r| FilesystemError::unable_to_delete(path, r))?;
        self.store
            .delete_object(&key)
            .await
            .map_err(|e| FilesystemError::unable_to_delete(path, e))
    }

    async fn delete_directory(&self, path: &str) -> Result<()> {
        Err(FilesystemError::UnableToDeleteDirectory {
            path: path.to_string(),
            reason: "Directory deletion is not supported; use delete_dir for a prefix delete".to_string(),
        })
    }

    async fn create_directory(&self, _path: &str, _config: &Config) -> Result<()> {
        // Directories only exist as key prefixes
        Ok(())
    }

    async fn set_visibility(&self, path: &str, _visibility: Visibility) -> Result<()> {
        let condition = FilesystemError::UnableToSetVisibility {
            path: path.to_string(),
            reason: "Visibility is not supported by the Swift adapter".to_string(),
        };
        warn!(error = %condition, "Ignoring visibility change");
        Ok(())
    }

    async fn visibility(&self, path: &str) -> Result<FileAttributes> {
        Err(FilesystemError::UnableToRetrieveMetadata {
            path: path.to_string(),
            field: MetadataField::Visibility,
            reason: "Visibility is not supported by the Swift adapter".to_string(),
            source: None,
        })
    }

    async fn mime_type(&self, path: &str) -> Result<FileAttributes> {
        self.fetch_metadata(path, MetadataField::MimeType).await
    }

    async fn last_modified(&self, path: &str) -> Result<FileAttributes> {
        self.fetch_metadata(path, MetadataField::LastModified).await
    }

    async fn file_size(&self, path: &str) -> Result<FileAttributes> {
        self.fetch_metadata(path, MetadataField::FileSize).await
    }

    fn list_contents<'a>(&'a self, path: &'a str, _deep: bool) -> AttributeStream<'a> {
        // Listings are flat prefix matches, so every depth is already included.
        let prefix = match self.prefixer.prefix_path(path) {
            Ok(prefix) => prefix,
            Err(e) => return futures::stream::once(async move { Err(e) }).boxed(),
        };
        self.store
            .list_objects(&prefix)
            .map_ok(move |meta| self.attributes(&meta))
            .map_err(move |e| FilesystemError::UnableToListContents {
                path: path.to_string(),
                source: Some(e.into()),
            })
            .boxed()
    }

    async fn move_file(&self, source: &str, destination: &str, _config: &Config) -> Result<()> {
        let fail = |stage: MoveStage, e: BoxError| FilesystemError::UnableToMoveFile {
            from: source.to_string(),
            to: destination.to_string(),
            stage,
            source: Some(e),
        };
        let source_key = self.file_key(source, |r| fail(MoveStage::Copy, r.into()))?;
        let destination_key = self.file_key(destination, |r| fail(MoveStage::Copy, r.into()))?;

        if source_key == destination_key {
            // Copying onto itself and then deleting the source would lose
            // the only copy.
            self.store
                .head_object(&source_key)
                .await
                .map_err(|e| fail(MoveStage::Copy, e.into()))?;
            debug!(key = %source_key, "Move onto the same key, nothing to do");
            return Ok(());
        }

        let target = format!("/{}/{}", self.store.container_name(), destination_key);

        self.store
            .copy_object(&source_key, &target)
            .await
            .map_err(|e| fail(MoveStage::Copy, e.into()))?;
        // The copy exists from here on; a failed delete leaves both objects.
        self.store
            .delete_object(&source_key)
            .await
            .map_err(|e| fail(MoveStage::DeleteSource, e.into()))?;

        debug!(from = %source_key, to = %destination_key, "Move complete");
        Ok(())
    }

    async fn copy(&self, source: &str, destination: &str, _config: &Config) -> Result<()> {
        Err(FilesystemError::UnableToCopyFile {
            from: source.to_string(),
            to: destination.to_string(),
            reason: "Copy is not supported by the Swift adapter".to_string(),
        })
    }
}
