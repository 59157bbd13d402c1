use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use dw_types::DurableRef;

use crate::error::{StoreError, StoreResult};
use crate::traits::{content_ref, DurableObjectStore, ObjectTag};

#[derive(Clone)]
struct StoredObject {
    payload: Bytes,
    tags: Vec<ObjectTag>,
}

/// In-memory, HashMap-based durable store.
///
/// Intended for tests and embedding. Availability and upload latency can be
/// changed at runtime to exercise failure and timeout paths.
pub struct InMemoryDurableStore {
    objects: RwLock<HashMap<DurableRef, StoredObject>>,
    available: AtomicBool,
    latency_ms: AtomicU64,
}

impl InMemoryDurableStore {
    /// Create a new empty, available store with no latency.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
            latency_ms: AtomicU64::new(0),
        }
    }

    /// Make subsequent uploads and fetches succeed or fail.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Delay every upload by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Drop an object, simulating loss on the storage network.
    pub fn evict(&self, id: &DurableRef) -> bool {
        self.objects
            .write()
            .expect("lock poisoned")
            .remove(id)
            .is_some()
    }

    /// Tags recorded with an object.
    pub fn tags(&self, id: &DurableRef) -> Option<Vec<ObjectTag>> {
        self.objects
            .read()
            .expect("lock poisoned")
            .get(id)
            .map(|obj| obj.tags.clone())
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Remove all objects from the store.
    pub fn clear(&self) {
        self.objects.write().expect("lock poisoned").clear();
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store set offline".into()))
        }
    }
}

impl Default for InMemoryDurableStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DurableObjectStore for InMemoryDurableStore {
    async fn upload(&self, payload: Bytes, tags: &[ObjectTag]) -> StoreResult<DurableRef> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        self.ensure_available()?;

        let id = content_ref(&payload);
        let mut map = self.objects.write().expect("lock poisoned");
        map.entry(id.clone()).or_insert_with(|| StoredObject {
            payload,
            tags: tags.to_vec(),
        });
        tracing::debug!(object = %id, "object uploaded");
        Ok(id)
    }

    async fn fetch(&self, id: &DurableRef) -> StoreResult<Option<Bytes>> {
        self.ensure_available()?;
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.get(id).map(|obj| obj.payload.clone()))
    }

    fn resolves(&self, id: &DurableRef) -> bool {
        self.objects.read().expect("lock poisoned").contains_key(id)
    }
}

impl std::fmt::Debug for InMemoryDurableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDurableStore")
            .field("object_count", &self.len())
            .field("available", &self.available.load(Ordering::SeqCst))
            .finish()
    }
}
