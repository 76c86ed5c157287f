//! Process-wide registry of in-process accounts
//!
//! A `memory://<name>` connection string resolves to the same account from
//! every connection manager in the process, so independent handles behave
//! like separate nodes attached to one remote service.

use crate::blob::MemoryBlobStore;
use crate::broker::MemoryNamespace;
use crate::table::MemoryTableStore;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::sync::Arc;

/// Storage account: one row store and one content store
#[derive(Debug, Default)]
pub struct MemoryAccount {
    /// Row store backing latches
    pub tables: Arc<MemoryTableStore>,
    /// Content store backing blob cells
    pub blobs: Arc<MemoryBlobStore>,
}

static ACCOUNTS: Lazy<DashMap<String, Arc<MemoryAccount>>> = Lazy::new(DashMap::new);
static NAMESPACES: Lazy<DashMap<String, Arc<MemoryNamespace>>> = Lazy::new(DashMap::new);

/// Open (creating on first use) the storage account `name`.
pub fn open_account(name: &str) -> Arc<MemoryAccount> {
    Arc::clone(
        ACCOUNTS
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(account = name, "in-process storage account created");
                Arc::new(MemoryAccount::default())
            })
            .value(),
    )
}

/// Open (creating on first use) the broker namespace `name`.
pub fn open_namespace(name: &str) -> Arc<MemoryNamespace> {
    Arc::clone(
        NAMESPACES
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(namespace = name, "in-process broker namespace created");
                Arc::new(MemoryNamespace::new())
            })
            .value(),
    )
}

/// Forget an account. Existing handles keep their data alive.
pub fn remove_account(name: &str) -> bool {
    ACCOUNTS.remove(name).is_some()
}

/// Forget a namespace. Existing handles keep their queues alive.
pub fn remove_namespace(name: &str) -> bool {
    NAMESPACES.remove(name).is_some()
}
