//! Hashing and signing for DataWeave provenance records.
//!
//! Provides domain-separated BLAKE3 content hashing and a pluggable
//! [`RecordSigner`] strategy with two implementations: a keyed BLAKE3 MAC
//! ([`KeyedSigner`], the default) and Ed25519 ([`Ed25519Signer`]).
//!
//! All crypto operations wrap established libraries. No custom cryptography.

pub mod hasher;
pub mod signer;

pub use hasher::{ContentHasher, HasherError};
pub use signer::{Ed25519Signer, KeyedSigner, RecordSigner, SignatureMaterial};
