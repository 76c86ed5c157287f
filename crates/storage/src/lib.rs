//! In-process backends for Cirrus
//!
//! This crate implements the backend traits from `cirrus-core` in process
//! memory:
//! - [`MemoryTableStore`]: row store with ETag-conditioned replace
//! - [`MemoryBlobStore`]: container/blob content store
//! - [`MemoryNamespace`]: peek-lock broker with redelivery and dead-lettering
//! - [`registry`]: named accounts shared across the process
//!
//! They back `memory://` connection strings and the test suites.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod blob;
pub mod broker;
pub mod registry;
pub mod table;

pub use blob::MemoryBlobStore;
pub use broker::{
    BrokerLimits, DeadLetteredMessage, MemoryNamespace, MemoryQueue, MemoryQueueClient,
};
pub use registry::{open_account, open_namespace, remove_account, remove_namespace, MemoryAccount};
pub use table::{MemoryTableStore, Table};
