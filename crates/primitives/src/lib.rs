//! Coordination primitives for Cirrus
//!
//! Each primitive is a stateless handle: a [`ResourceUri`], a shared
//! [`ConnectionManager`], and local policy values. All state lives in the
//! remote stores.
//!
//! | Primitive | Backing | Guarantee |
//! |-----------|---------|-----------|
//! | [`Latch`] | Row store | N increments advance by exactly N |
//! | [`BlobCell`] | Content store | Immutable after write |
//! | [`Queue`] | Broker + BlobCell | At-least-once delivery of any size |
//! | [`ResultCell`] | Queue | Each published result read once |
//!
//! Attaching (`get`) never performs I/O; failures surface at the first
//! state-accessing call.
//!
//! [`ResourceUri`]: cirrus_core::ResourceUri
//! [`ConnectionManager`]: cirrus_engine::ConnectionManager

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod blob_cell;
pub mod cancel;
pub mod latch;
pub mod queue;
pub mod result_cell;
pub mod retry;

pub use blob_cell::BlobCell;
pub use cancel::CancellationToken;
pub use latch::Latch;
pub use queue::Queue;
pub use result_cell::ResultCell;
pub use retry::RetryPolicy;
