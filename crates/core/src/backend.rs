//! Backend traits
//!
//! The primitives never talk to a concrete service. They go through these
//! traits, which describe the remote row store, content store and message
//! broker as the primitives rely on them:
//!
//! - [`RowStore`]: key/attribute rows with version-conditioned replace
//! - [`ContentStore`]: name-addressed binary objects grouped in containers
//! - [`BrokerNamespace`]: queue management for the broker
//! - [`BrokerQueue`]: peek-lock send/receive/complete on one queue
//!
//! Every call is synchronous and may block on the network. Implementations
//! must be `Send + Sync`; handles are shared behind `Arc`.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Attribute bag stored in a row
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Opaque version stamp of a stored row
///
/// Every successful insert or replace produces a new, never reused ETag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ETag(u64);

impl ETag {
    /// Wrap a raw stamp
    pub const fn new(raw: u64) -> Self {
        ETag(raw)
    }

    /// Raw stamp
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "W/\"{}\"", self.0)
    }
}

/// A row together with the ETag it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedRow {
    /// Row attributes
    pub row: Row,
    /// Version stamp for conditional writes
    pub etag: ETag,
}

/// Remote key/attribute store
pub trait RowStore: Send + Sync {
    /// Create a table. Returns `true` if it was created, `false` if it existed.
    fn create_table_if_not_exists(&self, table: &str) -> Result<bool>;

    /// Insert a new row.
    ///
    /// Fails with `Conflict` if a row already exists under `key` and with
    /// `NotFound` if the table does not exist.
    fn insert(&self, table: &str, key: &str, row: Row) -> Result<ETag>;

    /// Read a row. Returns `None` if the table or the row is missing.
    fn get(&self, table: &str, key: &str) -> Result<Option<VersionedRow>>;

    /// Replace a row only if its current ETag equals `if_match`.
    ///
    /// Fails with `Conflict` on mismatch and `NotFound` if the row is gone.
    fn replace(&self, table: &str, key: &str, row: Row, if_match: ETag) -> Result<ETag>;

    /// Delete a row. Returns `true` if it existed.
    fn delete(&self, table: &str, key: &str) -> Result<bool>;
}

/// Remote binary object store
pub trait ContentStore: Send + Sync {
    /// Create a container. Returns `true` if it was created.
    fn create_container_if_not_exists(&self, container: &str) -> Result<bool>;

    /// Write (or overwrite) a blob. Fails with `NotFound` if the container is missing.
    fn put(&self, container: &str, name: &str, bytes: Vec<u8>) -> Result<()>;

    /// Read a blob. Fails with `NotFound` if the container or blob is missing.
    fn get(&self, container: &str, name: &str) -> Result<Vec<u8>>;

    /// Check whether a blob exists.
    fn exists(&self, container: &str, name: &str) -> Result<bool>;

    /// Delete a blob. Returns `true` if it existed.
    fn delete(&self, container: &str, name: &str) -> Result<bool>;
}

/// Creation options for a broker queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueOptions {
    /// Message time-to-live; `None` means undelivered messages never expire
    pub default_ttl: Option<Duration>,
    /// How long a received message stays invisible before redelivery
    pub lock_duration: Duration,
    /// Deliveries after which a message is moved to the dead-letter sub-queue
    pub max_delivery_count: u32,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            default_ttl: None,
            lock_duration: Duration::from_secs(60),
            max_delivery_count: 10,
        }
    }
}

/// Handle proving a received message is locked by the receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockToken(Uuid);

impl LockToken {
    /// Fresh random token
    pub fn new() -> Self {
        LockToken(Uuid::new_v4())
    }
}

impl Default for LockToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message received in peek-lock mode
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    /// Broker-assigned message id
    pub message_id: Uuid,
    /// Message body
    pub body: Vec<u8>,
    /// Token used to complete, abandon or dead-letter the message
    pub lock_token: LockToken,
    /// Number of times this message has been delivered, including this one
    pub delivery_count: u32,
    /// When the message was sent
    pub enqueued_at: DateTime<Utc>,
}

/// Broker namespace: creates, inspects and opens queues
pub trait BrokerNamespace: Send + Sync {
    /// Check whether a queue exists.
    fn queue_exists(&self, name: &str) -> Result<bool>;

    /// Create a queue. Fails with `Conflict` if it already exists.
    fn create_queue(&self, name: &str, options: &QueueOptions) -> Result<()>;

    /// Delete a queue and all its messages. Returns `true` if it existed.
    fn delete_queue(&self, name: &str) -> Result<bool>;

    /// Open a client for one queue. Performs no existence check; operations on
    /// a missing queue fail with `NotFound`.
    fn queue_client(&self, name: &str) -> Result<Arc<dyn BrokerQueue>>;
}

/// Peek-lock client for one broker queue
pub trait BrokerQueue: Send + Sync {
    /// Queue name
    fn name(&self) -> &str;

    /// Send one message.
    fn send(&self, body: Vec<u8>) -> Result<()>;

    /// Receive one message, waiting up to `wait` for one to become ready.
    ///
    /// `Duration::ZERO` makes the call non-blocking.
    fn receive(&self, wait: Duration) -> Result<Option<ReceivedMessage>>;

    /// Remove a locked message permanently.
    fn complete(&self, lock: &LockToken) -> Result<()>;

    /// Release a locked message for immediate redelivery.
    fn abandon(&self, lock: &LockToken) -> Result<()>;

    /// Move a locked message to the dead-letter sub-queue.
    fn dead_letter(&self, lock: &LockToken, reason: &str) -> Result<()>;

    /// Approximate number of active (ready or locked) messages.
    fn message_count(&self) -> Result<u64>;

    /// Number of dead-lettered messages.
    fn dead_letter_count(&self) -> Result<u64>;
}
