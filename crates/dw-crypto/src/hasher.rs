use dw_types::ContentHash;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag that is prepended to every hash
/// computation, so a record digest and a durable-object digest over the same
/// bytes never collide.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for the canonical content of a provenance record.
    pub const RECORD: Self = Self {
        domain: "dataweave-record-v1",
    };
    /// Hasher used by content-addressed durable stores.
    pub const OBJECT: Self = Self {
        domain: "dataweave-object-v1",
    };

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> ContentHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        ContentHash::from_hash(*hasher.finalize().as_bytes())
    }

    /// Verify that data produces the expected digest.
    pub fn verify(&self, data: &[u8], expected: &ContentHash) -> bool {
        self.hash(data) == *expected
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let data = b"hello world";
        assert_eq!(ContentHasher::RECORD.hash(data), ContentHasher::RECORD.hash(data));
    }

    #[test]
    fn domains_are_separated() {
        let data = b"same content";
        assert_ne!(ContentHasher::RECORD.hash(data), ContentHasher::OBJECT.hash(data));
        assert_ne!(ContentHasher::RECORD.hash(data), ContentHash::from_bytes(data));
    }

    #[test]
    fn verify_detects_tampering() {
        let id = ContentHasher::RECORD.hash(b"original");
        assert!(ContentHasher::RECORD.verify(b"original", &id));
        assert!(!ContentHasher::RECORD.verify(b"tampered", &id));
    }
}
