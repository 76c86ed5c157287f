//! BlobCell primitive
//!
//! Write-once, immutable payload storage addressed by
//! `blobcell:<container>/<id>`. Moves values that are too large for a
//! broker message or a table row.
//!
//! There is no update operation. Two concurrent `init` calls on one id
//! race and the last writer wins; nothing in this layer prevents it.
//! Every [`value`](BlobCell::value) call downloads and decodes afresh, so
//! each caller gets its own owned copy.

use cirrus_core::{codec, ResourceUri, Result, Scheme};
use cirrus_engine::ConnectionManager;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;

/// Handle to an immutable stored value of type `T`
pub struct BlobCell<T> {
    uri: ResourceUri,
    connections: Arc<ConnectionManager>,
    _value: PhantomData<fn() -> T>,
}

impl<T> BlobCell<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Store `value()` under `uri` and return a handle to it.
    ///
    /// Creates the container if needed. The thunk runs once, before any I/O.
    pub fn init<F>(connections: &Arc<ConnectionManager>, uri: ResourceUri, value: F) -> Result<Self>
    where
        F: FnOnce() -> T,
    {
        let value = value();
        Self::store(connections, &uri, &value)?;
        Ok(Self::get(connections, uri))
    }

    pub(crate) fn store(
        connections: &ConnectionManager,
        uri: &ResourceUri,
        value: &T,
    ) -> Result<usize> {
        let (container, name) = uri.item(Scheme::BlobCell)?;
        let bytes = codec::encode(value)?;
        let len = bytes.len();
        let blobs = connections.blob_client()?;
        blobs.create_container_if_not_exists(container)?;
        blobs.put(container, name, bytes)?;
        tracing::trace!(uri = %uri, bytes = len, "blob written");
        Ok(len)
    }

    /// Attach to a stored value. Performs no I/O.
    pub fn get(connections: &Arc<ConnectionManager>, uri: ResourceUri) -> Self {
        Self {
            uri,
            connections: Arc::clone(connections),
            _value: PhantomData,
        }
    }

    /// URI of this cell
    pub fn uri(&self) -> &ResourceUri {
        &self.uri
    }

    /// Download and decode the value.
    ///
    /// Fails with `NotFound` if the blob is missing and `Serialization` if
    /// the stored bytes do not decode as `T`.
    pub fn value(&self) -> Result<T> {
        let (container, name) = self.uri.item(Scheme::BlobCell)?;
        let bytes = self.connections.blob_client()?.get(container, name)?;
        codec::decode(&bytes)
    }

    /// Whether the blob exists
    pub fn exists(&self) -> Result<bool> {
        let (container, name) = self.uri.item(Scheme::BlobCell)?;
        self.connections.blob_client()?.exists(container, name)
    }
}

impl<T> Clone for BlobCell<T> {
    fn clone(&self) -> Self {
        Self {
            uri: self.uri.clone(),
            connections: Arc::clone(&self.connections),
            _value: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for BlobCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobCell").field("uri", &self.uri).finish()
    }
}
