//! ResultCell primitive
//!
//! Carries the outcome of one unit of distributed work back to whoever is
//! waiting for it. `resultcell:<container>/` is backed by the queue
//! `queue:<container>`.
//!
//! This is a consuming future, not a broadcast promise: every successful
//! read takes one message, and `set_result` may be called more than once,
//! each call appending another message. Two awaiters of one cell receive
//! two different results (or the second one keeps waiting).
//!
//! Waits long-poll the broker in slices of at most
//! [`ResultCell::DEFAULT_WAIT_SLICE`], checking the cancellation token and
//! the deadline between slices.

use crate::cancel::CancellationToken;
use crate::queue::Queue;
use cirrus_core::{Error, ResourceUri, Result, Scheme};
use cirrus_engine::ConnectionManager;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Handle to a single-result future of `T`
pub struct ResultCell<T> {
    uri: ResourceUri,
    queue: Queue<T>,
    wait_slice: Duration,
}

impl<T> ResultCell<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Longest single broker wait inside the blocking calls
    pub const DEFAULT_WAIT_SLICE: Duration = Duration::from_millis(200);

    fn backing_queue(uri: &ResourceUri) -> ResourceUri {
        ResourceUri::queue(uri.container())
    }

    /// Create the backing queue if needed.
    pub fn init(connections: &Arc<ConnectionManager>, uri: ResourceUri) -> Result<Self> {
        uri.expect_scheme(Scheme::ResultCell)?;
        Queue::<T>::init(connections, Self::backing_queue(&uri))?;
        Ok(Self::get(connections, uri))
    }

    /// Attach to an existing cell. Performs no I/O.
    pub fn get(connections: &Arc<ConnectionManager>, uri: ResourceUri) -> Self {
        let queue = Queue::get(connections, Self::backing_queue(&uri));
        Self {
            uri,
            queue,
            wait_slice: Self::DEFAULT_WAIT_SLICE,
        }
    }

    /// Change the longest single broker wait.
    pub fn with_wait_slice(mut self, slice: Duration) -> Self {
        self.wait_slice = slice.max(Duration::from_millis(1));
        self
    }

    /// URI of this cell
    pub fn uri(&self) -> &ResourceUri {
        &self.uri
    }

    fn checked(&self) -> Result<&Queue<T>> {
        self.uri.expect_scheme(Scheme::ResultCell)?;
        Ok(&self.queue)
    }

    /// Publish a result. Each call appends one more message.
    pub fn set_result(&self, value: &T) -> Result<()> {
        self.checked()?.enqueue(value)
    }

    /// Take a result if one is ready, without blocking.
    pub fn try_get_result(&self) -> Result<Option<T>> {
        self.checked()?.try_dequeue()
    }

    /// Block until a result is available and take it.
    pub fn await_result(&self) -> Result<T> {
        let queue = self.checked()?;
        loop {
            if let Some(value) = queue.receive(self.wait_slice)? {
                return Ok(value);
            }
        }
    }

    /// Block for at most `timeout`. Returns `None` if nothing arrived.
    pub fn await_result_timeout(&self, timeout: Duration) -> Result<Option<T>> {
        self.await_result_with(Some(timeout), &CancellationToken::new())
    }

    /// Block until a result arrives, `timeout` elapses, or `cancel` fires.
    ///
    /// At least one receive attempt is made even with a zero timeout.
    /// Cancellation is observed between wait slices and reported as
    /// [`Error::Cancelled`].
    pub fn await_result_with(
        &self,
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<Option<T>> {
        let queue = self.checked()?;
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));

        loop {
            if cancel.is_cancelled() {
                tracing::debug!(uri = %self.uri, "result wait cancelled");
                return Err(Error::Cancelled(self.uri.to_string()));
            }
            let slice = deadline.map_or(self.wait_slice, |d| {
                d.saturating_duration_since(Instant::now()).min(self.wait_slice)
            });
            if let Some(value) = queue.receive(slice)? {
                return Ok(Some(value));
            }
            if deadline.map_or(false, |d| Instant::now() >= d) {
                return Ok(None);
            }
        }
    }
}

impl<T> Clone for ResultCell<T> {
    fn clone(&self) -> Self {
        Self {
            uri: self.uri.clone(),
            queue: self.queue.clone(),
            wait_slice: self.wait_slice,
        }
    }
}

impl<T> std::fmt::Debug for ResultCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCell")
            .field("uri", &self.uri)
            .field("wait_slice", &self.wait_slice)
            .finish()
    }
}
