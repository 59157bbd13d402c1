//! Foundation types for DataWeave.
//!
//! This crate provides the identifiers and value types shared by every other
//! DataWeave crate. It has no knowledge of storage, hashing strategy or
//! signing keys.
//!
//! # Key Types
//!
//! - [`RecordId`]: UUID v7 provenance record identifier
//! - [`OriginId`]: Identifier of the producing entity (miner / agent)
//! - [`RecordKind`]: Closed record category (compute, proof, reasoning)
//! - [`ContentHash`]: 32-byte BLAKE3 content digest
//! - [`RecordSignature`]: Opaque signature token over record fields
//! - [`DurableRef`]: Handle returned by the durable object store

pub mod digest;
pub mod durable;
pub mod error;
pub mod identity;
pub mod kind;
pub mod signature;

pub use digest::ContentHash;
pub use durable::DurableRef;
pub use error::TypeError;
pub use identity::{OriginId, RecordId};
pub use kind::RecordKind;
pub use signature::RecordSignature;

/// Schema tag written on every record.
pub const SCHEMA_VERSION: &str = "1.0.0";
