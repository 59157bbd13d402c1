use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

const PREFIX: &str = "sig-";

/// Opaque signature token produced by a record signer.
///
/// The bytes are scheme-specific (a 32-byte MAC or a 64-byte Ed25519
/// signature). Rendered and serialized as `sig-<hex>`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RecordSignature(Vec<u8>);

impl RecordSignature {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_token(&self) -> String {
        format!("{PREFIX}{}", hex::encode(&self.0))
    }

    /// Parse a `sig-<hex>` token.
    pub fn parse(token: &str) -> Result<Self, TypeError> {
        let hex_part = token
            .strip_prefix(PREFIX)
            .ok_or_else(|| TypeError::InvalidSignature(format!("missing `{PREFIX}` prefix")))?;
        let bytes = hex::decode(hex_part).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.is_empty() {
            return Err(TypeError::InvalidSignature("empty signature".into()));
        }
        Ok(Self(bytes))
    }
}

impl fmt::Debug for RecordSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = &self.0[..self.0.len().min(8)];
        write!(f, "RecordSignature({}...)", hex::encode(head))
    }
}

impl fmt::Display for RecordSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_token())
    }
}

impl Serialize for RecordSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_token())
    }
}

impl<'de> Deserialize<'de> for RecordSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
