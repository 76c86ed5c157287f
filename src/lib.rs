//! # Cirrus
//!
//! Distributed coordination primitives built on a remote row store, a
//! remote content store and a remote message broker. Nodes never talk to
//! each other directly; they meet in the backends.
//!
//! ## Quick Start
//!
//! ```ignore
//! use cirrus::prelude::*;
//!
//! let cirrus = Cirrus::builder()
//!     .store("memory://cluster")
//!     .broker("memory://cluster")
//!     .open()?;
//!
//! // Completion barrier
//! let done = cirrus.init_latch(ResourceUri::latch("jobs", "done"), 0)?;
//! done.increment()?;
//!
//! // Work distribution with payloads of any size
//! let work = cirrus.init_queue::<Vec<f64>>(ResourceUri::queue("work"))?;
//! work.enqueue(&vec![0.0; 100_000])?;
//!
//! // Returning a task outcome
//! let result = cirrus.init_result_cell::<f64>(ResourceUri::result_cell("task-1"))?;
//! result.set_result(&42.0)?;
//! assert_eq!(result.await_result()?, 42.0);
//! ```
//!
//! ## Primitives
//!
//! - [`Latch`] - Monotonic counter with optimistic-concurrency increment
//! - [`BlobCell`] - Write-once immutable value
//! - [`Queue`] - FIFO channel passing blob references through the broker
//! - [`ResultCell`] - Consuming single-result future over a queue

#![warn(missing_docs)]

mod client;

pub mod prelude;

// Re-export main entry points
pub use client::{Cirrus, CirrusBuilder};
pub use cirrus_core::{Error, Result, ResourceUri, Scheme};

// Re-export primitives and connection layer
pub use cirrus_engine::{BackendConfig, BrokerConnection, ConnectionManager, StoreConnection};
pub use cirrus_primitives::{BlobCell, CancellationToken, Latch, Queue, ResultCell, RetryPolicy};

/// Backend traits and shared types
pub mod backend {
    pub use cirrus_core::backend::*;
    pub use cirrus_core::codec;
}

/// In-process backends
pub mod memory {
    pub use cirrus_storage::*;
}
