use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Handle returned by the durable object store after a successful upload.
///
/// Opaque to everything except the store that issued it. Stores in this
/// workspace content-address their objects and issue `dw-<hex digest>`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DurableRef(String);

impl DurableRef {
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(TypeError::EmptyDurableRef);
        }
        Ok(Self(id))
    }

    /// Content-addressed handle for a 32-byte digest.
    pub fn from_digest(digest: &[u8; 32]) -> Self {
        Self(format!("dw-{}", hex::encode(digest)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DurableRef {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DurableRef> for String {
    fn from(r: DurableRef) -> Self {
        r.0
    }
}

impl fmt::Debug for DurableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DurableRef({})", self.0)
    }
}

impl fmt::Display for DurableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_digest_format() {
        let r = DurableRef::from_digest(&[0x0f; 32]);
        assert_eq!(r.as_str(), format!("dw-{}", "0f".repeat(32)));
    }

    #[test]
    fn empty_rejected() {
        assert_eq!(DurableRef::new(" "), Err(TypeError::EmptyDurableRef));
        assert!(serde_json::from_str::<DurableRef>("\"\"").is_err());
    }
}
