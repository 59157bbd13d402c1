use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Closed category of a provenance record.
///
/// Variant order matches the lexical order of the wire names, so sorting by
/// kind and sorting by kind name agree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// A compute job run by a miner.
    Compute,
    /// A proof attached to a computation.
    Proof,
    /// A reasoning chain.
    Reasoning,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [Self::Compute, Self::Proof, Self::Reasoning];

    /// Wire name (`compute`, `proof`, `reasoning`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compute => "compute",
            Self::Proof => "proof",
            Self::Reasoning => "reasoning",
        }
    }

    /// Human-facing label.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Compute => "Compute",
            Self::Proof => "Proof",
            Self::Reasoning => "Reasoning",
        }
    }
}

impl FromStr for RecordKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compute" => Ok(Self::Compute),
            "proof" => Ok(Self::Proof),
            "reasoning" => Ok(Self::Reasoning),
            other => Err(TypeError::UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("Proof".parse::<RecordKind>().unwrap(), RecordKind::Proof);
        assert_eq!(" compute ".parse::<RecordKind>().unwrap(), RecordKind::Compute);
    }

    #[test]
    fn unknown_kind_rejected() {
        let err = "inference".parse::<RecordKind>().unwrap_err();
        assert_eq!(err, TypeError::UnknownKind("inference".into()));
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&RecordKind::Reasoning).unwrap();
        assert_eq!(json, "\"reasoning\"");
        let back: RecordKind = serde_json::from_str("\"compute\"").unwrap();
        assert_eq!(back, RecordKind::Compute);
    }

    #[test]
    fn ordering_matches_names() {
        let mut kinds = RecordKind::ALL.to_vec();
        kinds.reverse();
        kinds.sort();
        let names: Vec<_> = kinds.iter().map(RecordKind::as_str).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
