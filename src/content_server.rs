//! Content Server Module
//!
//! Orchestrates a read request: decides whether the finalized object in the
//! durable store or the still-open local session is authoritative, resolves
//! any requested range, and returns the bytes with the matching status.
//! Once the store knows a protocol, the finalized object wins even if a
//! stale session still lingers in memory.

use crate::range_resolver::{self, RangeRequest};
use crate::range_set::ByteInterval;
use crate::registry::SessionRegistry;
use crate::store::ObjectStore;
use crate::{Result, StaError};
use bytes::Bytes;
use hyper::StatusCode;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of a content read, ready for response assembly.
#[derive(Debug)]
pub struct ContentRead {
    /// `OK` for whole-object reads, `PARTIAL_CONTENT` for satisfied ranges.
    pub status: StatusCode,
    pub body: Bytes,
    /// `Content-Range` confirmation for ranged reads.
    pub content_range: Option<String>,
}

pub struct ContentServer {
    registry: Arc<SessionRegistry>,
    store: Arc<dyn ObjectStore>,
}

impl ContentServer {
    pub fn new(registry: Arc<SessionRegistry>, store: Arc<dyn ObjectStore>) -> Self {
        Self { registry, store }
    }

    /// Serve a content read for `protocol`, optionally constrained by a
    /// parsed `Range` request.
    pub async fn serve(&self, protocol: &str, range: Option<RangeRequest>) -> Result<ContentRead> {
        if let Some(total) = self.store.stat(protocol).await? {
            return self.serve_finalized(protocol, total, range).await;
        }

        let Some(session) = self.registry.get(protocol) else {
            return Err(StaError::SessionNotFound(protocol.to_string()));
        };
        let session = session.lock().await;

        match (range, session.total_size()) {
            (None, _) => {
                // Whole-buffer read of an in-progress upload: everything
                // written so far, possibly incomplete.
                let body = Bytes::from(session.read_all()?);
                Ok(ContentRead {
                    status: StatusCode::OK,
                    body,
                    content_range: None,
                })
            }
            (Some(_), None) => {
                // A range read needs a declared size to validate against;
                // without one this is an absence, not an unsatisfiable range.
                debug!(
                    "range read against protocol {} with undeclared size",
                    protocol
                );
                Err(StaError::SessionNotFound(protocol.to_string()))
            }
            (Some(request), Some(total)) => {
                let resolved = range_resolver::resolve(&request, total)?;
                let body = Bytes::from(session.read_range(resolved.start, resolved.end)?);
                Ok(ContentRead {
                    status: StatusCode::PARTIAL_CONTENT,
                    body,
                    content_range: Some(resolved.content_range()),
                })
            }
        }
    }

    async fn serve_finalized(
        &self,
        protocol: &str,
        total: u64,
        range: Option<RangeRequest>,
    ) -> Result<ContentRead> {
        match range {
            None => {
                let Some(body) = self.store.get(protocol, None).await? else {
                    // Object vanished between stat and get; tolerated race,
                    // reported as absence.
                    warn!("object {} disappeared between stat and get", protocol);
                    return Err(StaError::SessionNotFound(protocol.to_string()));
                };
                Ok(ContentRead {
                    status: StatusCode::OK,
                    body,
                    content_range: None,
                })
            }
            Some(request) => {
                let resolved = range_resolver::resolve(&request, total)?;
                let Some(body) = self
                    .store
                    .get(protocol, Some((resolved.start, resolved.end)))
                    .await?
                else {
                    warn!("object {} disappeared between stat and get", protocol);
                    return Err(StaError::SessionNotFound(protocol.to_string()));
                };
                Ok(ContentRead {
                    status: StatusCode::PARTIAL_CONTENT,
                    body,
                    content_range: Some(resolved.content_range()),
                })
            }
        }
    }

    /// Received-ranges query. A finalized object reports the single covered
    /// interval `[0, size-1]`; an open session reports its coverage set.
    pub async fn upload_position(&self, protocol: &str) -> Result<Vec<ByteInterval>> {
        if let Some(total) = self.store.stat(protocol).await? {
            if total == 0 {
                return Ok(Vec::new());
            }
            return Ok(vec![ByteInterval::new(0, total - 1)]);
        }

        let Some(session) = self.registry.get(protocol) else {
            return Err(StaError::SessionNotFound(protocol.to_string()));
        };
        let session = session.lock().await;
        Ok(session.received_ranges().to_vec())
    }
}
