//! Main entry point for Cirrus.
//!
//! This module provides the `Cirrus` struct, which bundles one shared
//! [`ConnectionManager`] with constructors for every primitive.

use crate::prelude::*;
use cirrus_engine::{BrokerConnection, StoreConnection};
use cirrus_storage::{MemoryBlobStore, MemoryNamespace, MemoryTableStore};
use std::path::Path;
use std::sync::Arc;

/// Handle to the coordination backends of one process.
///
/// Cloning is cheap; clones share the connection manager.
///
/// # Example
///
/// ```ignore
/// use cirrus::prelude::*;
///
/// let cirrus = Cirrus::ephemeral();
///
/// let done = cirrus.init_latch(ResourceUri::latch("jobs", "done"), 0)?;
/// done.increment()?;
///
/// let work = cirrus.init_queue::<Vec<f64>>(ResourceUri::queue("work"))?;
/// work.enqueue(&vec![1.0, 2.0])?;
/// ```
#[derive(Clone, Debug)]
pub struct Cirrus {
    connections: Arc<ConnectionManager>,
}

impl Cirrus {
    /// Connect to a fresh, private in-process account and namespace.
    ///
    /// Nothing outside this handle (and its clones) can see the data. The
    /// backends are not entered in the `memory://` registry, so they are
    /// freed with the last handle. Use this for unit tests.
    pub fn ephemeral() -> Self {
        Self::from_config(BackendConfig::new(
            StoreConnection::Clients {
                tables: Arc::new(MemoryTableStore::new()),
                blobs: Arc::new(MemoryBlobStore::new()),
            },
            BrokerConnection::Namespace(Arc::new(MemoryNamespace::new())),
        ))
    }

    /// Create a builder for backend configuration.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let cirrus = Cirrus::builder()
    ///     .store("memory://cluster")
    ///     .broker("memory://cluster")
    ///     .open()?;
    /// ```
    pub fn builder() -> CirrusBuilder {
        CirrusBuilder::new()
    }

    /// Activate `config` on a new connection manager.
    pub fn from_config(config: BackendConfig) -> Self {
        Self::with_connections(Arc::new(ConnectionManager::with_config(config)))
    }

    /// Load a TOML configuration file.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_config(BackendConfig::from_file(path)?))
    }

    /// Read connection strings from the environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_config(BackendConfig::from_env()?))
    }

    /// Wrap an existing connection manager, activated or not.
    pub fn with_connections(connections: Arc<ConnectionManager>) -> Self {
        Self { connections }
    }

    /// The shared connection manager
    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    /// Replace the active configuration for this handle and all its clones.
    pub fn activate(&self, config: BackendConfig) {
        self.connections.activate(config);
    }

    // =========================================================================
    // Latch
    // =========================================================================

    /// Create a counter. See [`Latch::init`].
    pub fn init_latch(&self, uri: ResourceUri, initial: i64) -> Result<Latch> {
        Latch::init(&self.connections, uri, initial)
    }

    /// Attach to a counter. See [`Latch::get`].
    pub fn latch(&self, uri: ResourceUri) -> Latch {
        Latch::get(&self.connections, uri)
    }

    // =========================================================================
    // BlobCell
    // =========================================================================

    /// Store a value. See [`BlobCell::init`].
    pub fn init_blob_cell<T, F>(&self, uri: ResourceUri, value: F) -> Result<BlobCell<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        BlobCell::init(&self.connections, uri, value)
    }

    /// Attach to a stored value. See [`BlobCell::get`].
    pub fn blob_cell<T>(&self, uri: ResourceUri) -> BlobCell<T>
    where
        T: Serialize + DeserializeOwned,
    {
        BlobCell::get(&self.connections, uri)
    }

    // =========================================================================
    // Queue
    // =========================================================================

    /// Create a queue if needed. See [`Queue::init`].
    pub fn init_queue<T>(&self, uri: ResourceUri) -> Result<Queue<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        Queue::init(&self.connections, uri)
    }

    /// Attach to a queue. See [`Queue::get`].
    pub fn queue<T>(&self, uri: ResourceUri) -> Queue<T>
    where
        T: Serialize + DeserializeOwned,
    {
        Queue::get(&self.connections, uri)
    }

    // =========================================================================
    // ResultCell
    // =========================================================================

    /// Create a result cell if needed. See [`ResultCell::init`].
    pub fn init_result_cell<T>(&self, uri: ResourceUri) -> Result<ResultCell<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        ResultCell::init(&self.connections, uri)
    }

    /// Attach to a result cell. See [`ResultCell::get`].
    pub fn result_cell<T>(&self, uri: ResourceUri) -> ResultCell<T>
    where
        T: Serialize + DeserializeOwned,
    {
        ResultCell::get(&self.connections, uri)
    }
}

/// Builder for backend configuration.
///
/// Connection strings are parsed at [`open`](CirrusBuilder::open); any parse
/// error is reported there. Explicit client handles bypass parsing.
///
/// # Example
///
/// ```ignore
/// // Two nodes in one process sharing a simulated cluster
/// let node_a = Cirrus::builder().store("memory://c").broker("memory://c").open()?;
/// let node_b = Cirrus::builder().store("memory://c").broker("memory://c").open()?;
/// ```
#[derive(Default)]
pub struct CirrusBuilder {
    store: Option<String>,
    broker: Option<String>,
    store_clients: Option<StoreConnection>,
    broker_clients: Option<BrokerConnection>,
}

impl CirrusBuilder {
    /// Create a builder with nothing configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage account connection string
    pub fn store(mut self, connection: impl Into<String>) -> Self {
        self.store = Some(connection.into());
        self.store_clients = None;
        self
    }

    /// Broker namespace connection string
    pub fn broker(mut self, connection: impl Into<String>) -> Self {
        self.broker = Some(connection.into());
        self.broker_clients = None;
        self
    }

    /// Use caller-supplied store clients
    pub fn store_clients(mut self, tables: Arc<dyn RowStore>, blobs: Arc<dyn ContentStore>) -> Self {
        self.store_clients = Some(StoreConnection::Clients { tables, blobs });
        self.store = None;
        self
    }

    /// Use a caller-supplied broker namespace
    pub fn broker_namespace(mut self, namespace: Arc<dyn BrokerNamespace>) -> Self {
        self.broker_clients = Some(BrokerConnection::Namespace(namespace));
        self.broker = None;
        self
    }

    /// Resolve the configuration and activate it.
    pub fn open(self) -> Result<Cirrus> {
        let store = match (self.store_clients, self.store) {
            (Some(clients), _) => clients,
            (None, Some(s)) => s.parse()?,
            (None, None) => return Err(Error::Configuration("no store connection given".into())),
        };
        let broker = match (self.broker_clients, self.broker) {
            (Some(ns), _) => ns,
            (None, Some(s)) => s.parse()?,
            (None, None) => return Err(Error::Configuration("no broker connection given".into())),
        };
        Ok(Cirrus::from_config(BackendConfig::new(store, broker)))
    }
}
