//! Connection manager
//!
//! Holds the active [`BackendConfig`] and hands out clients derived from it.
//! A manager is an ordinary value: construct one per process (or per test),
//! share it behind `Arc`, and pass it to every primitive.
//!
//! ## Locking
//!
//! One mutex guards the active configuration. `activate` swaps it under the
//! lock; every accessor takes the lock only long enough to snapshot the
//! active backend (failing fast when there is none) and builds clients
//! outside it. Store and namespace clients are built lazily, once per
//! activation, and shared by every caller until the next `activate`. Queue
//! clients are opened from the namespace on each request and never retained,
//! so touching many queues does not grow the manager.

use crate::config::{BackendConfig, BrokerConnection, StoreConnection};
use cirrus_core::{BrokerNamespace, BrokerQueue, ContentStore, Error, Result, RowStore};
use cirrus_storage::registry;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::sync::Arc;

/// Clients derived from one activated configuration
struct ActiveBackend {
    config: BackendConfig,
    tables: OnceCell<Arc<dyn RowStore>>,
    blobs: OnceCell<Arc<dyn ContentStore>>,
    namespace: OnceCell<Arc<dyn BrokerNamespace>>,
}

impl ActiveBackend {
    fn new(config: BackendConfig) -> Self {
        Self {
            config,
            tables: OnceCell::new(),
            blobs: OnceCell::new(),
            namespace: OnceCell::new(),
        }
    }

    fn tables(&self) -> Arc<dyn RowStore> {
        Arc::clone(self.tables.get_or_init(|| match &self.config.store {
            StoreConnection::Memory { account } => {
                let tables: Arc<dyn RowStore> = registry::open_account(account).tables.clone();
                tables
            }
            StoreConnection::Clients { tables, .. } => Arc::clone(tables),
        }))
    }

    fn blobs(&self) -> Arc<dyn ContentStore> {
        Arc::clone(self.blobs.get_or_init(|| match &self.config.store {
            StoreConnection::Memory { account } => {
                let blobs: Arc<dyn ContentStore> = registry::open_account(account).blobs.clone();
                blobs
            }
            StoreConnection::Clients { blobs, .. } => Arc::clone(blobs),
        }))
    }

    fn namespace(&self) -> Arc<dyn BrokerNamespace> {
        Arc::clone(self.namespace.get_or_init(|| match &self.config.broker {
            BrokerConnection::Memory { namespace } => {
                let ns: Arc<dyn BrokerNamespace> = registry::open_namespace(namespace);
                ns
            }
            BrokerConnection::Namespace(ns) => Arc::clone(ns),
        }))
    }

    fn queue(&self, name: &str) -> Result<Arc<dyn BrokerQueue>> {
        self.namespace().queue_client(name)
    }
}

/// Gate to the backend clients of the active configuration
pub struct ConnectionManager {
    active: Mutex<Option<Arc<ActiveBackend>>>,
}

impl ConnectionManager {
    /// Create a manager with no active configuration.
    ///
    /// Every accessor fails with [`Error::Configuration`] until
    /// [`activate`](Self::activate) is called.
    pub fn new() -> Self {
        Self {
            active: Mutex::new(None),
        }
    }

    /// Create a manager and activate `config` immediately.
    pub fn with_config(config: BackendConfig) -> Self {
        let manager = Self::new();
        manager.activate(config);
        manager
    }

    /// Install `config` as the active configuration, replacing any previous
    /// one. Clients built from the previous configuration are dropped once
    /// their last holder releases them.
    pub fn activate(&self, config: BackendConfig) {
        tracing::info!(store = ?config.store, broker = ?config.broker, "backend configuration activated");
        *self.active.lock() = Some(Arc::new(ActiveBackend::new(config)));
    }

    /// Parse both connection strings, then activate. A parse failure leaves
    /// the current configuration untouched.
    pub fn activate_connection_strings(&self, store: &str, broker: &str) -> Result<()> {
        let config = BackendConfig::from_connection_strings(store, broker)?;
        self.activate(config);
        Ok(())
    }

    /// Whether a configuration has been activated
    pub fn is_active(&self) -> bool {
        self.active.lock().is_some()
    }

    fn backend(&self) -> Result<Arc<ActiveBackend>> {
        self.active
            .lock()
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(Error::not_configured)
    }

    /// The active configuration
    pub fn active_configuration(&self) -> Result<BackendConfig> {
        Ok(self.backend()?.config.clone())
    }

    /// Row store client
    pub fn table_client(&self) -> Result<Arc<dyn RowStore>> {
        Ok(self.backend()?.tables())
    }

    /// Content store client
    pub fn blob_client(&self) -> Result<Arc<dyn ContentStore>> {
        Ok(self.backend()?.blobs())
    }

    /// Broker namespace client
    pub fn namespace_client(&self) -> Result<Arc<dyn BrokerNamespace>> {
        Ok(self.backend()?.namespace())
    }

    /// Client for the broker queue `name`
    pub fn queue_client(&self, name: &str) -> Result<Arc<dyn BrokerQueue>> {
        self.backend()?.queue(name)
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let active = self.active.lock();
        let mut s = f.debug_struct("ConnectionManager");
        match active.as_ref() {
            Some(backend) => s.field("config", &backend.config),
            None => s.field("config", &"<none>"),
        };
        s.finish()
    }
}
