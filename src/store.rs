//! Object Store Module
//!
//! Capability surface of the durable remote store: put a finalized object,
//! stat its size, fetch whole or ranged bytes. Two backends: an in-process
//! memory store and a path-style HTTP client for S3-compatible endpoints.
//! Retry policy belongs to callers; nothing here retries.

use crate::{Result, StaError};
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{CONTENT_LENGTH, RANGE};
use hyper::{Method, Request, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// Durable store capability required by the upload core.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store the full object bytes under `key`.
    async fn put(&self, key: &str, bytes: Bytes) -> Result<()>;

    /// `Ok(Some(size))` when the object exists, `Ok(None)` when absent.
    async fn stat(&self, key: &str) -> Result<Option<u64>>;

    /// Fetch the whole object (`range: None`) or an inclusive byte range.
    /// `Ok(None)` when the object is absent.
    async fn get(&self, key: &str, range: Option<(u64, u64)>) -> Result<Option<Bytes>>;
}

/// In-process store, the default backend and the test double.
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<String, Bytes>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<()> {
        let mut objects = self
            .objects
            .write()
            .map_err(|_| StaError::StoreError("memory store lock poisoned".to_string()))?;
        objects.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn stat(&self, key: &str) -> Result<Option<u64>> {
        let objects = self
            .objects
            .read()
            .map_err(|_| StaError::StoreError("memory store lock poisoned".to_string()))?;
        Ok(objects.get(key).map(|bytes| bytes.len() as u64))
    }

    async fn get(&self, key: &str, range: Option<(u64, u64)>) -> Result<Option<Bytes>> {
        let objects = self
            .objects
            .read()
            .map_err(|_| StaError::StoreError("memory store lock poisoned".to_string()))?;
        let Some(bytes) = objects.get(key) else {
            return Ok(None);
        };
        match range {
            None => Ok(Some(bytes.clone())),
            Some((start, end)) => {
                if start >= bytes.len() as u64 || end < start {
                    return Err(StaError::StoreError(format!(
                        "range {}-{} outside object of {} bytes",
                        start,
                        end,
                        bytes.len()
                    )));
                }
                let end = ((end + 1) as usize).min(bytes.len());
                Ok(Some(bytes.slice(start as usize..end)))
            }
        }
    }
}

/// Path-style HTTP client for S3-compatible endpoints (MinIO and the like):
/// `PUT /{bucket}/{key}`, `HEAD` for stat, `GET` with a `Range` header for
/// ranged reads. Plain HTTP; the mock talks to a local gateway.
pub struct HttpStore {
    client: Client<HttpConnector, Full<Bytes>>,
    endpoint: String,
    bucket: String,
}

impl HttpStore {
    pub fn new(endpoint: &str, bucket: &str) -> Self {
        let client = Client::builder(TokioExecutor::new()).build_http();
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
        }
    }

    fn object_uri(&self, key: &str) -> Result<Uri> {
        format!("{}/{}/{}", self.endpoint, self.bucket, key)
            .parse()
            .map_err(|e| StaError::StoreError(format!("invalid object URI for {}: {}", key, e)))
    }

    async fn send(&self, request: Request<Full<Bytes>>) -> Result<hyper::Response<hyper::body::Incoming>> {
        self.client
            .request(request)
            .await
            .map_err(|e| StaError::StoreError(format!("store request failed: {}", e)))
    }
}

#[async_trait]
impl ObjectStore for HttpStore {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<()> {
        let request = Request::builder()
            .method(Method::PUT)
            .uri(self.object_uri(key)?)
            .header(CONTENT_LENGTH, bytes.len())
            .body(Full::new(bytes))
            .map_err(|e| StaError::StoreError(format!("failed to build put request: {}", e)))?;

        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(StaError::StoreError(format!(
                "put of {} returned {}",
                key,
                response.status()
            )));
        }
        debug!("stored object {}", key);
        Ok(())
    }

    async fn stat(&self, key: &str) -> Result<Option<u64>> {
        let request = Request::builder()
            .method(Method::HEAD)
            .uri(self.object_uri(key)?)
            .body(Full::new(Bytes::new()))
            .map_err(|e| StaError::StoreError(format!("failed to build stat request: {}", e)))?;

        let response = self.send(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(StaError::StoreError(format!(
                "stat of {} returned {}",
                key,
                response.status()
            )));
        }

        let size = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| {
                StaError::StoreError(format!("stat of {} returned no content length", key))
            })?;
        Ok(Some(size))
    }

    async fn get(&self, key: &str, range: Option<(u64, u64)>) -> Result<Option<Bytes>> {
        let mut builder = Request::builder().method(Method::GET).uri(self.object_uri(key)?);
        if let Some((start, end)) = range {
            builder = builder.header(RANGE, format!("bytes={}-{}", start, end));
        }
        let request = builder
            .body(Full::new(Bytes::new()))
            .map_err(|e| StaError::StoreError(format!("failed to build get request: {}", e)))?;

        let response = self.send(request).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(StaError::StoreError(format!(
                "get of {} returned {}",
                key, status
            )));
        }

        let bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| StaError::StoreError(format!("failed to read get response: {}", e)))?
            .to_bytes();
        Ok(Some(bytes))
    }
}
