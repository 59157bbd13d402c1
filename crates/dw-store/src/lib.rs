//! Durable object storage for DataWeave.
//!
//! The permanent-storage network is an external collaborator. This crate
//! defines the contract the ledger consumes ([`DurableObjectStore`]) and two
//! backends:
//!
//! - [`InMemoryDurableStore`] -- `HashMap`-based store for tests and demos,
//!   with failure injection and artificial latency
//! - [`FsDurableStore`] -- one file per object under a root directory, used by
//!   the CLI so state survives between invocations
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written; both backends content-address them.
//! 2. Uploads are idempotent: the same bytes always yield the same handle.
//! 3. `resolves` never suspends; `upload` and `fetch` may.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsDurableStore;
pub use memory::InMemoryDurableStore;
pub use traits::{content_ref, DurableObjectStore, ObjectTag};
