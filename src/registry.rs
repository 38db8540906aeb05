//! Session Registry Module
//!
//! Process-wide map from protocol id to its open upload session. The
//! registry owns session lifetime: creation, concurrent lookup, and the
//! completion handoff that moves a finished upload into the durable store.

use crate::session::UploadSession;
use crate::store::ObjectStore;
use crate::{Result, StaError};
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// First protocol id handed out, matching the upstream service.
const FIRST_PROTOCOL_ID: u64 = 1000;

/// Concurrent-safe registry of open upload sessions.
///
/// Each session sits behind its own lock, so all operations on one session
/// are mutually exclusive while distinct sessions proceed in parallel.
/// There is no expiry: an abandoned session stays (and keeps its temp file)
/// until process exit.
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Mutex<UploadSession>>>,
    next_protocol: AtomicU64,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            next_protocol: AtomicU64::new(FIRST_PROTOCOL_ID),
        }
    }

    /// Allocate the next protocol id and open an empty session for it.
    pub fn open(&self) -> Result<String> {
        let id = self
            .next_protocol
            .fetch_add(1, Ordering::SeqCst)
            .to_string();
        let session = UploadSession::new(id.clone())?;
        self.sessions.insert(id.clone(), Arc::new(Mutex::new(session)));
        info!("opened upload session for protocol {}", id);
        Ok(id)
    }

    /// Look up an open session.
    pub fn get(&self, id: &str) -> Option<Arc<Mutex<UploadSession>>> {
        self.sessions.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of sessions currently open.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Hand a completed session's bytes to the durable store and retire the
    /// session. Call only after `is_complete()` was observed true.
    ///
    /// The session stays in the registry until the store confirms the put,
    /// so a concurrent read always finds either the open session or the
    /// finalized object. On store failure the session is left in place for
    /// retry; previously accepted bytes are never rolled back.
    ///
    /// Idempotent: when two writers both observe completion, the loser finds
    /// the session already evicted and the object durable, which counts as
    /// success.
    pub async fn complete_and_evict(&self, id: &str, store: &dyn ObjectStore) -> Result<()> {
        let Some(session) = self.get(id) else {
            if store.stat(id).await?.is_some() {
                return Ok(());
            }
            return Err(StaError::SessionNotFound(id.to_string()));
        };

        let bytes = {
            let session = session.lock().await;
            Bytes::from(session.read_all()?)
        };

        if let Err(e) = store.put(id, bytes).await {
            warn!("handoff of protocol {} failed, session kept for retry: {}", id, e);
            return Err(e);
        }

        self.sessions.remove(id);
        info!("protocol {} finalized and evicted from the registry", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn open_allocates_sequential_protocols() {
        let registry = SessionRegistry::new();
        assert_eq!(registry.open().unwrap(), "1000");
        assert_eq!(registry.open().unwrap(), "1001");
        assert!(registry.get("1000").is_some());
        assert!(registry.get("999").is_none());
    }

    #[tokio::test]
    async fn complete_and_evict_moves_bytes_to_the_store() {
        let registry = SessionRegistry::new();
        let store = MemoryStore::new();

        let id = registry.open().unwrap();
        {
            let session = registry.get(&id).unwrap();
            session.lock().await.write_full(&[1, 2, 3]).unwrap();
        }

        registry.complete_and_evict(&id, &store).await.unwrap();
        assert!(registry.get(&id).is_none(), "session evicted after put");
        assert_eq!(store.stat(&id).await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn finalize_after_eviction_succeeds_when_the_object_is_durable() {
        let registry = SessionRegistry::new();
        let store = MemoryStore::new();

        let id = registry.open().unwrap();
        {
            let session = registry.get(&id).unwrap();
            session.lock().await.write_full(&[1, 2, 3]).unwrap();
        }

        registry.complete_and_evict(&id, &store).await.unwrap();
        // The finalize a losing concurrent writer would issue is a no-op.
        registry.complete_and_evict(&id, &store).await.unwrap();

        // With neither a session nor a durable object it is a real absence.
        assert!(matches!(
            registry.complete_and_evict("4242", &store).await,
            Err(StaError::SessionNotFound(_))
        ));
    }
}
