use serde::Serialize;

use dw_types::{ContentHash, OriginId, RecordId, RecordSignature};

use crate::hasher::HasherError;

/// Fields a record signature commits to.
///
/// Serialized as compact JSON with a fixed field order; those bytes are the
/// signed message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureMaterial<'a> {
    pub record_id: &'a RecordId,
    pub content_hash: &'a ContentHash,
    pub created_at: u64,
    pub origin_id: &'a OriginId,
}

impl SignatureMaterial<'_> {
    /// Canonical message bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, HasherError> {
        serde_json::to_vec(self).map_err(|e| HasherError::Serialization(e.to_string()))
    }
}

/// Pluggable record signing strategy.
///
/// Implementations must be deterministic for verification purposes: a
/// signature produced by `sign` always passes `verify` for the same message.
pub trait RecordSigner: Send + Sync {
    /// Short scheme name, e.g. `"blake3-keyed"`.
    fn scheme(&self) -> &'static str;

    /// Sign a message.
    fn sign(&self, message: &[u8]) -> RecordSignature;

    /// Returns `true` when `signature` is valid for `message`.
    fn verify(&self, message: &[u8], signature: &RecordSignature) -> bool;

    /// Sign the canonical bytes of a record's signature material.
    fn sign_material(&self, material: &SignatureMaterial<'_>) -> Result<RecordSignature, HasherError> {
        Ok(self.sign(&material.to_bytes()?))
    }

    /// Verify a signature against a record's signature material.
    fn verify_material(
        &self,
        material: &SignatureMaterial<'_>,
        signature: &RecordSignature,
    ) -> Result<bool, HasherError> {
        Ok(self.verify(&material.to_bytes()?, signature))
    }
}

/// Keyed BLAKE3 MAC signer (HMAC-equivalent).
pub struct KeyedSigner {
    key: [u8; 32],
}

impl KeyedSigner {
    const KEY_CONTEXT: &'static str = "dataweave 2024 record signature key v1";

    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Derive the MAC key from a shared secret string.
    pub fn from_secret(secret: &str) -> Self {
        Self::new(blake3::derive_key(Self::KEY_CONTEXT, secret.as_bytes()))
    }

    /// Generate a random key.
    pub fn generate() -> Self {
        let mut key = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut key);
        Self::new(key)
    }
}

impl RecordSigner for KeyedSigner {
    fn scheme(&self) -> &'static str {
        "blake3-keyed"
    }

    fn sign(&self, message: &[u8]) -> RecordSignature {
        RecordSignature::from_bytes(blake3::keyed_hash(&self.key, message).as_bytes().to_vec())
    }

    fn verify(&self, message: &[u8], signature: &RecordSignature) -> bool {
        let Ok(bytes) = <[u8; 32]>::try_from(signature.as_bytes()) else {
            return false;
        };
        // blake3::Hash equality is constant-time.
        blake3::keyed_hash(&self.key, message) == blake3::Hash::from(bytes)
    }
}

impl std::fmt::Debug for KeyedSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyedSigner(<redacted>)")
    }
}

/// Ed25519 record signer.
pub struct Ed25519Signer(ed25519_dalek::SigningKey);

impl Ed25519Signer {
    /// Generate a new random signing key.
    pub fn generate() -> Self {
        let mut csprng = rand::thread_rng();
        Self(ed25519_dalek::SigningKey::generate(&mut csprng))
    }

    /// Create from raw 32-byte secret.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(&bytes))
    }

    /// Raw public key bytes.
    pub fn public_key(&self) -> [u8; 32] {
        self.0.verifying_key().to_bytes()
    }
}

impl RecordSigner for Ed25519Signer {
    fn scheme(&self) -> &'static str {
        "ed25519"
    }

    fn sign(&self, message: &[u8]) -> RecordSignature {
        use ed25519_dalek::Signer;
        RecordSignature::from_bytes(self.0.sign(message).to_bytes().to_vec())
    }

    fn verify(&self, message: &[u8], signature: &RecordSignature) -> bool {
        use ed25519_dalek::Verifier;
        let Ok(bytes) = <[u8; 64]>::try_from(signature.as_bytes()) else {
            return false;
        };
        let sig = ed25519_dalek::Signature::from_bytes(&bytes);
        self.0.verifying_key().verify(message, &sig).is_ok()
    }
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519Signer({})", hex::encode(self.public_key()))
    }
}
