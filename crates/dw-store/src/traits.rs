use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use dw_crypto::ContentHasher;
use dw_types::DurableRef;

use crate::error::StoreResult;

/// Name/value metadata attached to an uploaded object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectTag {
    pub name: String,
    pub value: String,
}

impl ObjectTag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Permanent-storage collaborator.
///
/// All implementations must satisfy these invariants:
/// - An object is visible to `fetch`/`resolves` only after `upload` returned
///   its handle.
/// - Uploading identical bytes is idempotent.
/// - The store never interprets object contents.
#[async_trait]
pub trait DurableObjectStore: Send + Sync {
    /// Store `payload` and return its handle. May fail transiently.
    async fn upload(&self, payload: Bytes, tags: &[ObjectTag]) -> StoreResult<DurableRef>;

    /// Read an object back.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    async fn fetch(&self, id: &DurableRef) -> StoreResult<Option<Bytes>>;

    /// Cheap presence check that never suspends.
    fn resolves(&self, id: &DurableRef) -> bool;
}

/// Content-addressed handle for a payload.
pub fn content_ref(payload: &[u8]) -> DurableRef {
    DurableRef::from_digest(ContentHasher::OBJECT.hash(payload).as_bytes())
}
