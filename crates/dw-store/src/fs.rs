use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use dw_types::DurableRef;

use crate::error::{StoreError, StoreResult};
use crate::traits::{content_ref, DurableObjectStore, ObjectTag};

/// Filesystem-backed durable store.
///
/// Layout under `root`:
///
/// ```text
/// <ref>.obj        object bytes
/// <ref>.tags.json  tags recorded at upload
/// ```
///
/// Objects are written to a temporary file and renamed into place, so a
/// crash mid-upload never leaves a resolvable partial object. Reads verify
/// the content address.
#[derive(Debug, Clone)]
pub struct FsDurableStore {
    root: PathBuf,
}

impl FsDurableStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Tags recorded with an object, if present.
    pub async fn tags(&self, id: &DurableRef) -> StoreResult<Option<Vec<ObjectTag>>> {
        let path = self.tags_path(id)?;
        match tokio::fs::read(&path).await {
            Ok(raw) => serde_json::from_slice(&raw)
                .map(Some)
                .map_err(|e| StoreError::Serialization(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn object_path(&self, id: &DurableRef) -> StoreResult<PathBuf> {
        Ok(self.root.join(format!("{}.obj", checked_name(id)?)))
    }

    fn tags_path(&self, id: &DurableRef) -> StoreResult<PathBuf> {
        Ok(self.root.join(format!("{}.tags.json", checked_name(id)?)))
    }
}

/// Handles become file names, so only `[a-z0-9-]` is accepted.
fn checked_name(id: &DurableRef) -> StoreResult<&str> {
    let name = id.as_str();
    let safe = name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
    if safe {
        Ok(name)
    } else {
        Err(StoreError::InvalidRef(name.to_string()))
    }
}

#[async_trait]
impl DurableObjectStore for FsDurableStore {
    async fn upload(&self, payload: Bytes, tags: &[ObjectTag]) -> StoreResult<DurableRef> {
        let id = content_ref(&payload);
        let path = self.object_path(&id)?;
        if tokio::fs::try_exists(&path).await? {
            return Ok(id);
        }

        let encoded_tags =
            serde_json::to_vec(tags).map_err(|e| StoreError::Serialization(e.to_string()))?;
        tokio::fs::write(self.tags_path(&id)?, encoded_tags).await?;

        let staging = self.root.join(format!("{}.tmp", checked_name(&id)?));
        tokio::fs::write(&staging, &payload).await?;
        tokio::fs::rename(&staging, &path).await?;

        tracing::debug!(object = %id, bytes = payload.len(), "object written");
        Ok(id)
    }

    async fn fetch(&self, id: &DurableRef) -> StoreResult<Option<Bytes>> {
        let path = self.object_path(id)?;
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if content_ref(&raw) != *id {
            return Err(StoreError::Corrupt {
                id: id.clone(),
                reason: "content address does not match stored bytes".into(),
            });
        }
        Ok(Some(Bytes::from(raw)))
    }

    fn resolves(&self, id: &DurableRef) -> bool {
        self.object_path(id).map(|p| p.is_file()).unwrap_or(false)
    }
}
