//! OpenStack Swift backend.
//!
//! Talks to the Swift v1 object API with reqwest. Every request carries
//! the session's `X-Auth-Token`; large objects are uploaded as Dynamic
//! Large Objects (segments plus an `X-Object-Manifest` manifest).

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Body, Client, Method, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use swiftfs_common::{ByteStream, Payload};

use super::auth::Session;
use super::{
    new_upload_id, segment_key, segment_prefix, ObjectMetadata, ObjectStore, SegmentReader,
    StoreError,
};
use crate::config::SwiftConfig;
use crate::temp_url;

const AUTH_TOKEN: &str = "X-Auth-Token";
const LIST_PAGE_SIZE: usize = 10_000;

pub struct SwiftClient {
    client: Client,
    session: Session,
    container: String,
    temp_url_key: Option<String>,
}

impl SwiftClient {
    pub fn new(client: Client, session: Session, container: impl Into<String>) -> Self {
        Self {
            client,
            session,
            container: container.into(),
            temp_url_key: None,
        }
    }

    /// Authenticate with the configured credentials and bind to the
    /// configured container.
    pub async fn connect(config: &SwiftConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let session = config.resolve_auth()?.authenticate(&client).await?;
        debug!(container = %config.container, storage_url = %session.storage_url, "Swift session established");
        Ok(Self {
            client,
            session,
            container: config.container.clone(),
            temp_url_key: config.temp_url_key.clone(),
        })
    }

    pub fn with_temp_url_key(mut self, key: impl Into<String>) -> Self {
        self.temp_url_key = Some(key.into());
        self
    }

    /// Create the bound container if it does not exist yet.
    pub async fn ensure_container(&self) -> Result<(), StoreError> {
        let resp = self
            .client
            .put(self.container_url(&self.container))
            .header(AUTH_TOKEN, &self.session.token)
            .send()
            .await?;
        check(resp, "PUT", &self.container).await?;
        debug!(container = %self.container, "Swift container ready");
        Ok(())
    }

    fn container_url(&self, container: &str) -> String {
        format!("{}/{}", self.session.storage_url, urlencoding::encode(container))
    }

    fn object_url(&self, container: &str, key: &str) -> String {
        format!("{}/{}", self.container_url(container), encode_key(key))
    }

    async fn list_page(
        &self,
        prefix: &str,
        marker: &str,
    ) -> Result<Vec<ObjectMetadata>, StoreError> {
        let mut query = vec![
            ("format", "json".to_string()),
            ("prefix", prefix.to_string()),
            ("limit", LIST_PAGE_SIZE.to_string()),
        ];
        if !marker.is_empty() {
            query.push(("marker", marker.to_string()));
        }

        let resp = self
            .client
            .get(self.container_url(&self.container))
            .header(AUTH_TOKEN, &self.session.token)
            .query(&query)
            .send()
            .await?;
        let resp = check(resp, "GET", &self.container).await?;
        let body = resp.text().await?;
        parse_listing(&body)
    }
}

#[async_trait]
impl ObjectStore for SwiftClient {
    fn container_name(&self) -> &str {
        &self.container
    }

    async fn create_object(
        &self,
        key: &str,
        payload: Payload,
        content_type: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut req = self
            .client
            .put(self.object_url(&self.container, key))
            .header(AUTH_TOKEN, &self.session.token);
        if let Some(ct) = content_type {
            req = req.header(CONTENT_TYPE, ct);
        }
        let body = match payload {
            Payload::Contents(data) => Body::from(data),
            Payload::Stream { stream, .. } => Body::wrap_stream(stream),
        };

        let resp = req.body(body).send().await?;
        check(resp, "PUT", key).await?;

        debug!(key = %key, "Swift upload complete");
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
            let name = segment_key(key, &upload_id, index);
            let resp = self
                .client
                .put(self.object_url(segment_container, &name))
                .header(AUTH_TOKEN, &self.session.token)
                .body(segment)
                .send()
                .await?;
            check(resp, "PUT", &name).await?;
            debug!(segment = %name, "Swift segment uploaded");
            index += 1;
        }

        let manifest = format!(
            "{}/{}",
            urlencoding::encode(segment_container),
            encode_key(&segment_prefix(key, &upload_id))
        );
        let resp = self
            .client
            .put(self.object_url(&self.container, key))
            .header(AUTH_TOKEN, &self.session.token)
            .header("X-Object-Manifest", manifest)
            .body(Bytes::new())
            .send()
            .await?;
        check(resp, "PUT", key).await?;

        debug!(key = %key, segments = index, "Swift large object upload complete");
        Ok(())
    }

    async fn head_object(&self, key: &str) -> Result<ObjectMetadata, StoreError> {
        let resp = self
            .client
            .head(self.object_url(&self.container, key))
            .header(AUTH_TOKEN, &self.session.token)
            .send()
            .await?;
        let resp = check(resp, "HEAD", key).await?;
        Ok(metadata_from_headers(key, resp.headers()))
    }

    async fn download_object(&self, key: &str) -> Result<ByteStream, StoreError> {
        let resp = self
            .client
            .get(self.object_url(&self.container, key))
            .header(AUTH_TOKEN, &self.session.token)
            .send()
            .await?;
        let resp = check(resp, "GET", key).await?;

        let stream = resp
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        Ok(Box::pin(stream))
    }

    async fn object_exists(&self, key: &str) -> Result<bool, StoreError> {
        let resp = self
            .client
            .head(self.object_url(&self.container, key))
            .header(AUTH_TOKEN, &self.session.token)
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check(resp, "HEAD", key).await?;
        Ok(true)
    }

    fn list_objects<'a>(&'a self, prefix: &str) -> BoxStream<'a, Result<ObjectMetadata, StoreError>> {
        let prefix = prefix.to_string();
        // State is the marker for the next page, or None once the last
        // (short) page has been returned.
        futures::stream::try_unfold(Some(String::new()), move |marker| {
            let prefix = prefix.clone();
            async move {
                let Some(marker) = marker else {
                    return Ok::<_, StoreError>(None);
                };
                let page = self.list_page(&prefix, &marker).await?;
                debug!(prefix = %prefix, count = page.len(), "Swift listing page fetched");
                let next = next_marker(&page, LIST_PAGE_SIZE);
                Ok(Some((page, next)))
            }
        })
        .map_ok(|page| futures::stream::iter(page.into_iter().map(Ok::<_, StoreError>)))
        .try_flatten()
        .boxed()
    }

    async fn copy_object(&self, key: &str, destination: &str) -> Result<(), StoreError> {
        let method = Method::from_bytes(b"COPY")
            .map_err(|e| StoreError::Unsupported(e.to_string()))?;
        let resp = self
            .client
            .request(method, self.object_url(&self.container, key))
            .header(AUTH_TOKEN, &self.session.token)
            .header("Destination", encode_key(destination))
            .send()
            .await?;
        check(resp, "COPY", key).await?;

        debug!(key = %key, destination = %destination, "Swift copy complete");
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<(), StoreError> {
        let resp = self
            .client
            .delete(self.object_url(&self.container, key))
            .header(AUTH_TOKEN, &self.session.token)
            .send()
            .await?;
        check(resp, "DELETE", key).await?;

        debug!(key = %key, "Swift delete complete");
        Ok(())
    }

    fn temporary_url(&self, key: &str, method: &str, expires: i64) -> Result<String, StoreError> {
        let secret = self
            .temp_url_key
            .as_deref()
            .ok_or_else(|| StoreError::Unsupported("no temp_url_key configured".to_string()))?;
        temp_url::sign_url(&self.object_url(&self.container, key), secret, method, expires)
    }
}

/// Turn a non-2xx response into [`StoreError::BadResponse`].
async fn check(resp: Response, method: &str, target: &str) -> Result<Response, StoreError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::BadResponse {
        method: method.to_string(),
        target: target.to_string(),
        status,
        body,
    })
}

/// Marker for the page after `page`. A short page is the last one.
fn next_marker(page: &[ObjectMetadata], page_size: usize) -> Option<String> {
    if page.len() < page_size {
        return None;
    }
    page.last().map(|o| o.key.clone())
}

/// Percent-encode each `/`-separated segment of an object key.
fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn metadata_from_headers(key: &str, headers: &HeaderMap) -> ObjectMetadata {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    ObjectMetadata {
        key: key.to_string(),
        content_length: header("content-length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
        content_type: header("content-type").map(|v| v.to_string()),
        last_modified: header("last-modified")
            .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
            .map(|d| d.with_timezone(&Utc)),
    }
}

/// One entry of a `format=json` container listing.
#[derive(Debug, Deserialize)]
struct ListedObject {
    /// Absent on `subdir` pseudo-entries.
    name: Option<String>,
    #[serde(default)]
    bytes: u64,
    content_type: Option<String>,
    last_modified: Option<String>,
}

fn parse_listing(body: &str) -> Result<Vec<ObjectMetadata>, StoreError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let entries: Vec<ListedObject> = serde_json::from_str(body)
        .map_err(|e| StoreError::InvalidResponse(format!("container listing: {}", e)))?;
    Ok(entries
        .into_iter()
        .filter_map(|entry| {
            let key = entry.name?;
            Some(ObjectMetadata {
                key,
                content_length: entry.bytes,
                content_type: entry.content_type,
                last_modified: entry.last_modified.as_deref().and_then(parse_listing_timestamp),
            })
        })
        .collect())
}

/// Listing timestamps are UTC without an offset, e.g. `2016-09-08T13:14:23.123450`.
fn parse_listing_timestamp(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}
