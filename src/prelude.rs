//! Convenient imports for Cirrus.
//!
//! ```ignore
//! use cirrus::prelude::*;
//!
//! let cirrus = Cirrus::ephemeral();
//! let cell = cirrus.init_result_cell::<u64>(ResourceUri::result_cell("task-1"))?;
//! ```

// Main entry point
pub use crate::client::{Cirrus, CirrusBuilder};

// Error handling
pub use cirrus_core::{Error, Result};

// Naming
pub use cirrus_core::{ResourceUri, Scheme};

// Backends
pub use cirrus_core::{BrokerNamespace, BrokerQueue, ContentStore, RowStore};
pub use cirrus_engine::{BackendConfig, ConnectionManager};

// Primitives
pub use cirrus_primitives::{BlobCell, CancellationToken, Latch, Queue, ResultCell, RetryPolicy};

// Serde bounds used by typed primitives
pub use serde::de::DeserializeOwned;
pub use serde::Serialize;
