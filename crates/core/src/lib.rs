//! Core types for Cirrus
//!
//! This crate defines what every other crate shares:
//! - [`ResourceUri`] and [`Scheme`]: naming contract for primitive instances
//! - [`Error`] / [`Result`]: the error taxonomy
//! - [`backend`]: traits for the row store, content store and broker
//! - [`codec`]: payload encoding

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod codec;
pub mod error;
pub mod uri;

pub use backend::{
    BrokerNamespace, BrokerQueue, ContentStore, ETag, LockToken, QueueOptions, ReceivedMessage,
    Row, RowStore, VersionedRow,
};
pub use error::{Error, Result, NO_ACTIVE_CONFIGURATION};
pub use uri::{ResourceUri, Scheme};
