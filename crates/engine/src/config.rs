//! Backend configuration
//!
//! A [`BackendConfig`] pairs two connection descriptors: one for the
//! storage account (row store + content store) and one for the broker
//! namespace. Descriptors come from connection strings, a TOML file,
//! environment variables, or already-constructed client handles.
//!
//! ## Connection strings
//!
//! | String | Meaning |
//! |--------|---------|
//! | `memory://<name>` | In-process account/namespace `<name>`, shared process-wide |
//!
//! ## File format
//!
//! ```toml
//! [store]
//! connection = "memory://default"
//!
//! [broker]
//! connection = "memory://default"
//! ```

use cirrus_core::{BrokerNamespace, ContentStore, Error, Result, RowStore};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Environment variable holding the store connection string
pub const STORE_CONNECTION_ENV: &str = "CIRRUS_STORE_CONNECTION";
/// Environment variable holding the broker connection string
pub const BROKER_CONNECTION_ENV: &str = "CIRRUS_BROKER_CONNECTION";

const MEMORY_PREFIX: &str = "memory://";

fn memory_name<'a>(kind: &str, s: &'a str) -> Result<&'a str> {
    let name = s.strip_prefix(MEMORY_PREFIX).ok_or_else(|| {
        Error::Configuration(format!("unsupported {} connection string '{}'", kind, s))
    })?;
    if name.is_empty() {
        return Err(Error::Configuration(format!(
            "{} connection string '{}' has no name",
            kind, s
        )));
    }
    Ok(name)
}

/// Where the row store and content store live
#[derive(Clone)]
pub enum StoreConnection {
    /// In-process account, shared by name
    Memory {
        /// Account name
        account: String,
    },
    /// Caller-supplied clients
    Clients {
        /// Row store client
        tables: Arc<dyn RowStore>,
        /// Content store client
        blobs: Arc<dyn ContentStore>,
    },
}

impl StoreConnection {
    /// In-process account `name`
    pub fn memory(account: impl Into<String>) -> Self {
        StoreConnection::Memory {
            account: account.into(),
        }
    }
}

impl FromStr for StoreConnection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        memory_name("store", s).map(StoreConnection::memory)
    }
}

impl fmt::Debug for StoreConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreConnection::Memory { account } => write!(f, "{}{}", MEMORY_PREFIX, account),
            StoreConnection::Clients { .. } => f.write_str("<custom store clients>"),
        }
    }
}

/// Where the broker namespace lives
#[derive(Clone)]
pub enum BrokerConnection {
    /// In-process namespace, shared by name
    Memory {
        /// Namespace name
        namespace: String,
    },
    /// Caller-supplied namespace client
    Namespace(Arc<dyn BrokerNamespace>),
}

impl BrokerConnection {
    /// In-process namespace `name`
    pub fn memory(namespace: impl Into<String>) -> Self {
        BrokerConnection::Memory {
            namespace: namespace.into(),
        }
    }
}

impl FromStr for BrokerConnection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        memory_name("broker", s).map(BrokerConnection::memory)
    }
}

impl fmt::Debug for BrokerConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrokerConnection::Memory { namespace } => {
                write!(f, "{}{}", MEMORY_PREFIX, namespace)
            }
            BrokerConnection::Namespace(_) => f.write_str("<custom broker namespace>"),
        }
    }
}

/// The pair of connection descriptors a process runs against
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Storage account
    pub store: StoreConnection,
    /// Broker namespace
    pub broker: BrokerConnection,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    store: Section,
    broker: Section,
}

#[derive(Debug, Deserialize)]
struct Section {
    connection: String,
}

impl BackendConfig {
    /// Pair two descriptors
    pub fn new(store: StoreConnection, broker: BrokerConnection) -> Self {
        Self { store, broker }
    }

    /// In-process account and namespace sharing one name
    pub fn memory(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(StoreConnection::memory(name.clone()), BrokerConnection::memory(name))
    }

    /// Parse both connection strings
    pub fn from_connection_strings(store: &str, broker: &str) -> Result<Self> {
        Ok(Self::new(store.parse()?, broker.parse()?))
    }

    /// Parse a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(s)
            .map_err(|e| Error::Configuration(format!("invalid config: {}", e)))?;
        Self::from_connection_strings(&file.store.connection, &file.broker.connection)
    }

    /// Read and parse a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Read connection strings from `CIRRUS_STORE_CONNECTION` and
    /// `CIRRUS_BROKER_CONNECTION`
    pub fn from_env() -> Result<Self> {
        let read = |var: &str| {
            std::env::var(var)
                .map_err(|_| Error::Configuration(format!("environment variable {} not set", var)))
        };
        Self::from_connection_strings(&read(STORE_CONNECTION_ENV)?, &read(BROKER_CONNECTION_ENV)?)
    }
}
