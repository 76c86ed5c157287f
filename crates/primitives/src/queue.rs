//! Queue primitive
//!
//! A FIFO channel that carries arbitrarily large values through a broker
//! with a small message-size limit. Each logical message is split in two:
//!
//! ```text
//! enqueue(v):   BlobCell blobcell:<container>/<uuid> ← v
//!               broker send("blobcell:<container>/<uuid>")
//!
//! try_dequeue:  broker receive → uri
//!               BlobCell(uri).value() → v
//!               broker complete
//! ```
//!
//! The broker only ever carries (and redelivers) a short URI. The blob
//! write and the send are two independent remote calls with no transaction
//! between them:
//!
//! - send fails after the blob write: the blob is deleted best-effort and
//!   the send error is returned
//! - process dies between the two: the blob is orphaned
//! - blob read or complete fails after receive: the error is returned and
//!   the broker redelivers once the message lock expires
//!
//! Consumed blobs are left in place.

use crate::blob_cell::BlobCell;
use cirrus_core::{BrokerQueue, Error, QueueOptions, ResourceUri, Result, Scheme};
use cirrus_engine::ConnectionManager;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Dead-letter reason for bodies that are not blob references
const UNREADABLE_REFERENCE: &str = "UnreadableBlobReference";

/// Handle to a reference-passing queue of `T`
pub struct Queue<T> {
    uri: ResourceUri,
    connections: Arc<ConnectionManager>,
    _value: PhantomData<fn() -> T>,
}

impl<T> Queue<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Create the broker queue if it does not exist yet.
    ///
    /// Undelivered messages never expire.
    pub fn init(connections: &Arc<ConnectionManager>, uri: ResourceUri) -> Result<Self> {
        uri.expect_scheme(Scheme::Queue)?;
        Self::ensure_broker_queue(connections, uri.container())?;
        Ok(Self::get(connections, uri))
    }

    pub(crate) fn ensure_broker_queue(connections: &ConnectionManager, name: &str) -> Result<()> {
        let namespace = connections.namespace_client()?;
        if namespace.queue_exists(name)? {
            return Ok(());
        }
        let options = QueueOptions {
            default_ttl: None,
            ..QueueOptions::default()
        };
        match namespace.create_queue(name, &options) {
            Ok(()) => {
                tracing::debug!(queue = name, "broker queue created");
                Ok(())
            }
            // Another node created it between our check and our create.
            Err(e) if e.is_conflict() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Attach to an existing queue. Performs no I/O.
    pub fn get(connections: &Arc<ConnectionManager>, uri: ResourceUri) -> Self {
        Self {
            uri,
            connections: Arc::clone(connections),
            _value: PhantomData,
        }
    }

    /// URI of this queue
    pub fn uri(&self) -> &ResourceUri {
        &self.uri
    }

    fn broker(&self) -> Result<Arc<dyn BrokerQueue>> {
        self.uri.expect_scheme(Scheme::Queue)?;
        self.connections.queue_client(self.uri.container())
    }

    /// Store `value` out of line and send a reference to it.
    pub fn enqueue(&self, value: &T) -> Result<()> {
        let broker = self.broker()?;
        let blob_uri = ResourceUri::blob_cell(self.uri.container(), Uuid::new_v4().to_string());
        let bytes = BlobCell::<T>::store(&self.connections, &blob_uri, value)?;

        if let Err(e) = broker.send(blob_uri.to_string().into_bytes()) {
            self.discard_blob(&blob_uri);
            return Err(e);
        }
        tracing::trace!(queue = %self.uri, blob = %blob_uri, bytes, "enqueued");
        Ok(())
    }

    fn discard_blob(&self, blob_uri: &ResourceUri) {
        let result = blob_uri.item(Scheme::BlobCell).and_then(|(container, name)| {
            self.connections.blob_client()?.delete(container, name)
        });
        if let Err(e) = result {
            tracing::warn!(blob = %blob_uri, error = %e, "failed to remove blob of unsent message");
        }
    }

    /// Take the next value if one is ready, without blocking.
    pub fn try_dequeue(&self) -> Result<Option<T>> {
        self.receive(Duration::ZERO)
    }

    /// Take the next value, waiting up to `wait` for one to arrive.
    ///
    /// The wait happens inside the broker's receive call.
    pub fn receive(&self, wait: Duration) -> Result<Option<T>> {
        let broker = self.broker()?;
        let Some(message) = broker.receive(wait)? else {
            return Ok(None);
        };

        let blob_uri = match std::str::from_utf8(&message.body)
            .map_err(|e| Error::Serialization(e.to_string()))
            .and_then(|s| s.parse::<ResourceUri>())
            .and_then(|uri| {
                uri.expect_scheme(Scheme::BlobCell)?;
                Ok(uri)
            })
        {
            Ok(uri) => uri,
            Err(e) => {
                tracing::warn!(queue = %self.uri, message_id = %message.message_id, error = %e, "dead-lettering unreadable message");
                broker.dead_letter(&message.lock_token, UNREADABLE_REFERENCE)?;
                return Err(Error::Serialization(format!(
                    "message {} on {} is not a blob reference: {}",
                    message.message_id, self.uri, e
                )));
            }
        };

        let value = BlobCell::<T>::get(&self.connections, blob_uri).value()?;
        broker.complete(&message.lock_token)?;
        Ok(Some(value))
    }

    /// Broker-reported number of pending messages. Approximate.
    pub fn len(&self) -> Result<u64> {
        self.broker()?.message_count()
    }

    /// Whether the broker reports no pending messages
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Number of messages moved to the dead-letter sub-queue
    pub fn dead_letter_len(&self) -> Result<u64> {
        self.broker()?.dead_letter_count()
    }
}

impl<T> Clone for Queue<T> {
    fn clone(&self) -> Self {
        Self {
            uri: self.uri.clone(),
            connections: Arc::clone(&self.connections),
            _value: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue").field("uri", &self.uri).finish()
    }
}
