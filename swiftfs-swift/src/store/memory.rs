//! In-process object store.
//!
//! Keeps containers in memory with the same observable behaviour the
//! adapter relies on from Swift: 404s for missing objects, flat prefix
//! listings in key order, server-side copy, and Dynamic Large Object
//! manifests that read back as the concatenation of their segments.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::debug;

use swiftfs_common::{read_to_bytes, ByteStream, Payload};

use super::{
    new_upload_id, parse_destination, segment_key, segment_prefix, ObjectMetadata, ObjectStore,
    SegmentReader, StoreError,
};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: Option<String>,
    last_modified: DateTime<Utc>,
    /// `(segment container, segment prefix)` for manifest objects.
    manifest: Option<(String, String)>,
}

type Containers = BTreeMap<String, BTreeMap<String, StoredObject>>;

pub struct MemoryStore {
    container: String,
    containers: Mutex<Containers>,
}

impl MemoryStore {
    pub fn new(container: impl Into<String>) -> Self {
        let container = container.into();
        let mut containers = BTreeMap::new();
        containers.insert(container.clone(), BTreeMap::new());
        Self {
            container,
            containers: Mutex::new(containers),
        }
    }

    /// All keys currently stored in `container`, in key order.
    pub fn keys(&self, container: &str) -> Vec<String> {
        self.lock()
            .get(container)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, Containers> {
        self.containers.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn put(&self, container: &str, key: &str, object: StoredObject) {
        self.lock()
            .entry(container.to_string())
            .or_default()
            .insert(key.to_string(), object);
    }

    fn get(&self, key: &str, method: &str) -> Result<StoredObject, StoreError> {
        self.lock()
            .get(&self.container)
            .and_then(|objects| objects.get(key))
            .cloned()
            .ok_or_else(|| StoreError::not_found(method, key))
    }

    /// Content of an object as a reader would see it: manifests resolve to
    /// their segments, concatenated in key order.
    fn resolve(&self, object: &StoredObject) -> Bytes {
        let Some((segment_container, prefix)) = &object.manifest else {
            return object.data.clone();
        };
        let containers = self.lock();
        let mut buf = BytesMut::new();
        if let Some(objects) = containers.get(segment_container) {
            for (_, segment) in objects.range(prefix.clone()..).take_while(|(k, _)| k.starts_with(prefix.as_str())) {
                buf.extend_from_slice(&segment.data);
            }
        }
        buf.freeze()
    }

    fn metadata(&self, key: &str, object: &StoredObject) -> ObjectMetadata {
        let data = self.resolve(object);
        ObjectMetadata {
            key: key.to_string(),
            content_length: data.len() as u64,
            content_type: object.content_type.clone(),
            last_modified: Some(object.last_modified),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn container_name(&self) -> &str {
        &self.container
    }

    async fn create_object(
        &self,
        key: &str,
        payload: Payload,
        content_type: Option<&str>,
    ) -> Result<(), StoreError> {
        let data = match payload {
            Payload::Contents(data) => data,
            Payload::Stream { stream, .. } => read_to_bytes(stream).await?,
        };
        self.put(
            &self.container,
            key,
            StoredObject {
                data,
                content_type: Some(content_type.unwrap_or("application/octet-stream").to_string()),
                last_modified: Utc::now(),
                manifest: None,
            },
        );
        debug!(key = %key, "Memory upload complete");
        Ok(())
    }

    async fn create_large_object(
        &self,
        key: &str,
        stream: ByteStream,
        segment_size: u64,
        segment_container: &str,
    ) -> Result<(), StoreError> {
        let upload_id = new_upload_id();
        let mut reader = SegmentReader::new(stream, segment_size);
        let mut index = 0usize;
        while let Some(segment) = reader.next_segment().await? {
            self.put(
                segment_container,
                &segment_key(key, &upload_id, index),
                StoredObject {
                    data: segment,
                    content_type: Some("application/octet-stream".to_string()),
                    last_modified: Utc::now(),
                    manifest: None,
                },
            );
            index += 1;
        }
        self.put(
            &self.container,
            key,
            StoredObject {
                data: Bytes::new(),
                content_type: Some("application/octet-stream".to_string()),
                last_modified: Utc::now(),
                manifest: Some((segment_container.to_string(), segment_prefix(key, &upload_id))),
            },
        );
        debug!(key = %key, segments = index, "Memory large object upload complete");
        Ok(())
    }

    async fn head_object(&self, key: &str) -> Result<ObjectMetadata, StoreError> {
        let object = self.get(key, "HEAD")?;
        Ok(self.metadata(key, &object))
    }

    async fn download_object(&self, key: &str) -> Result<ByteStream, StoreError> {
        let object = self.get(key, "GET")?;
        let data = self.resolve(&object);
        Ok(Box::pin(futures::stream::once(async move { Ok(data) })))
    }

    async fn object_exists(&self, key: &str) -> Result<bool, StoreError> {
        match self.get(key, "HEAD") {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn list_objects<'a>(&'a self, prefix: &str) -> BoxStream<'a, Result<ObjectMetadata, StoreError>> {
        let snapshot: Vec<(String, StoredObject)> = self
            .lock()
            .get(&self.container)
            .map(|objects| {
                objects
                    .iter()
                    .filter(|(key, _)| key.starts_with(prefix))
                    .map(|(key, object)| (key.clone(), object.clone()))
                    .collect()
            })
            .unwrap_or_default();
        let listed: Vec<Result<ObjectMetadata, StoreError>> = snapshot
            .into_iter()
            .map(|(key, object)| Ok(self.metadata(&key, &object)))
            .collect();
        futures::stream::iter(listed).boxed()
    }

    async fn copy_object(&self, key: &str, destination: &str) -> Result<(), StoreError> {
        let (container, dest_key) = parse_destination(destination).ok_or_else(|| {
            StoreError::BadResponse {
                method: "COPY".to_string(),
                target: key.to_string(),
                status: 412,
                body: format!("invalid destination: {}", destination),
            }
        })?;
        let object = self.get(key, "COPY")?;
        let data = self.resolve(&object);
        self.put(
            container,
            dest_key,
            StoredObject {
                data,
                content_type: object.content_type.clone(),
                last_modified: Utc::now(),
                manifest: None,
            },
        );
        debug!(key = %key, destination = %destination, "Memory copy complete");
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<(), StoreError> {
        let removed = self
            .lock()
            .get_mut(&self.container)
            .and_then(|objects| objects.remove(key));
        if removed.is_none() {
            return Err(StoreError::not_found("DELETE", key));
        }
        debug!(key = %key, "Memory delete complete");
        Ok(())
    }

    fn temporary_url(&self, _key: &str, _method: &str, _expires: i64) -> Result<String, StoreError> {
        Err(StoreError::Unsupported(
            "temporary URLs are not available for in-memory stores".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    fn chunked(data: &'static [u8], chunk: usize) -> ByteStream {
        let items: Vec<std::io::Result<Bytes>> = data
            .chunks(chunk)
            .map(|c| Ok(Bytes::from_static(c)))
            .collect();
        Box::pin(futures::stream::iter(items))
    }

    #[tokio::test]
    async fn test_create_head_download_delete() {
        let store = MemoryStore::new("files");
        store
            .create_object("root/a.txt", Payload::from("hello"), Some("text/plain"))
            .await
            .unwrap();

        let meta = store.head_object("root/a.txt").await.unwrap();
        assert_eq!(meta.content_length, 5);
        assert_eq!(meta.content_type.as_deref(), Some("text/plain"));

        let data = read_to_bytes(store.download_object("root/a.txt").await.unwrap()).await.unwrap();
        assert_eq!(&data[..], b"hello");

        store.delete_object("root/a.txt").await.unwrap();
        assert!(!store.object_exists("root/a.txt").await.unwrap());
        assert!(store.delete_object("root/a.txt").await.unwrap_err().is_not_found());
        assert!(store.head_object("root/a.txt").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_large_object_reads_back_concatenated() {
        let store = MemoryStore::new("files");
        store
            .create_large_object("big.bin", chunked(b"0123456789", 3), 4, "files_segments")
            .await
            .unwrap();

        let segments = store.keys("files_segments");
        assert_eq!(segments.len(), 3);
        assert!(segments.iter().all(|k| k.starts_with("big.bin/")));

        let meta = store.head_object("big.bin").await.unwrap();
        assert_eq!(meta.content_length, 10);
        let data = read_to_bytes(store.download_object("big.bin").await.unwrap()).await.unwrap();
        assert_eq!(&data[..], b"0123456789");
    }

    #[tokio::test]
    async fn test_list_objects_by_prefix() {
        let store = MemoryStore::new("files");
        for key in ["root/a/1", "root/a/2", "root/ab", "other/x"] {
            store.create_object(key, Payload::from("x"), None).await.unwrap();
        }
        let keys: Vec<String> = store
            .list_objects("root/a/")
            .map_ok(|m| m.key)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(keys, vec!["root/a/1", "root/a/2"]);
    }

    #[tokio::test]
    async fn test_copy_to_other_container() {
        let store = MemoryStore::new("files");
        store.create_object("a", Payload::from("data"), None).await.unwrap();
        store.copy_object("a", "/archive/b").await.unwrap();
        assert_eq!(store.keys("archive"), vec!["b"]);
        assert!(store.object_exists("a").await.unwrap());

        let err = store.copy_object("a", "/archive").await.unwrap_err();
        assert_eq!(err.status(), Some(412));
        assert!(store.copy_object("missing", "/files/b").await.unwrap_err().is_not_found());
    }
}
