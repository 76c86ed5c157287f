//! Latch primitive
//!
//! A named distributed counter that only moves up, one step at a time.
//! Used for completion barriers across parallel sub-tasks: each finishing
//! task increments, and whoever observes the expected total proceeds.
//!
//! ## Design
//!
//! Latch is a stateless handle over one row in the row store
//! (`latch:<table>/<key>`). The row holds `{ "value": n }` and the store's
//! ETag serves as the version stamp.
//!
//! `increment` is an optimistic-concurrency loop:
//!
//! ```text
//! loop {
//!     (n, etag) = read
//!     replace(n + 1, if_match = etag)
//!     ok        → return n + 1
//!     conflict  → back off, retry from read
//!     other err → return err
//! }
//! ```
//!
//! A conflict means another writer advanced the counter between our read
//! and our write; retrying from a fresh read is what makes N concurrent
//! increments land exactly N steps. The loop is bounded by a
//! [`RetryPolicy`]; exhaustion surfaces as [`Error::RetryExhausted`].

use crate::retry::RetryPolicy;
use cirrus_core::{Error, ResourceUri, Result, Row, RowStore, Scheme, VersionedRow};
use cirrus_engine::ConnectionManager;
use std::sync::Arc;

const VALUE_FIELD: &str = "value";

fn to_row(value: i64) -> Row {
    let mut row = Row::new();
    row.insert(VALUE_FIELD.to_string(), serde_json::Value::from(value));
    row
}

fn from_row(uri: &ResourceUri, row: &VersionedRow) -> Result<i64> {
    row.row
        .get(VALUE_FIELD)
        .and_then(serde_json::Value::as_i64)
        .ok_or_else(|| Error::Serialization(format!("{} holds no integer value", uri)))
}

/// Handle to a distributed counter
#[derive(Clone)]
pub struct Latch {
    uri: ResourceUri,
    connections: Arc<ConnectionManager>,
    retry: RetryPolicy,
}

impl Latch {
    /// Create the counter with an initial value.
    ///
    /// Creates the backing table if needed. Fails with [`Error::Conflict`]
    /// if a counter already exists at `uri`.
    pub fn init(connections: &Arc<ConnectionManager>, uri: ResourceUri, initial: i64) -> Result<Self> {
        let (table, key) = uri.item(Scheme::Latch)?;
        let tables = connections.table_client()?;
        tables.create_table_if_not_exists(table)?;
        tables.insert(table, key, to_row(initial))?;
        tracing::debug!(uri = %uri, initial, "latch created");
        Ok(Self::get(connections, uri))
    }

    /// Attach to an existing counter. Performs no I/O; the first read fails
    /// with [`Error::NotFound`] if nothing exists at `uri`.
    pub fn get(connections: &Arc<ConnectionManager>, uri: ResourceUri) -> Self {
        Self {
            uri,
            connections: Arc::clone(connections),
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the conflict-retry policy used by [`increment`](Self::increment).
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// URI of this counter
    pub fn uri(&self) -> &ResourceUri {
        &self.uri
    }

    fn read(&self, tables: &dyn RowStore) -> Result<(i64, VersionedRow)> {
        let (table, key) = self.uri.item(Scheme::Latch)?;
        let row = tables
            .get(table, key)?
            .ok_or_else(|| Error::NotFound(self.uri.to_string()))?;
        Ok((from_row(&self.uri, &row)?, row))
    }

    /// Current persisted value. Always re-read; never cached.
    pub fn value(&self) -> Result<i64> {
        let tables = self.connections.table_client()?;
        self.read(tables.as_ref()).map(|(value, _)| value)
    }

    /// Whether the counter exists
    pub fn exists(&self) -> Result<bool> {
        let (table, key) = self.uri.item(Scheme::Latch)?;
        Ok(self.connections.table_client()?.get(table, key)?.is_some())
    }

    /// Advance the counter by exactly one and return the new value.
    pub fn increment(&self) -> Result<i64> {
        let (table, key) = self.uri.item(Scheme::Latch)?;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            // Read and conditional write must hit the same store: an ETag is
            // only meaningful to the store that issued it.
            let tables = self.connections.table_client()?;
            let (current, row) = self.read(tables.as_ref())?;
            let next = current
                .checked_add(1)
                .ok_or_else(|| Error::Overflow(self.uri.to_string()))?;

            match tables.replace(table, key, to_row(next), row.etag) {
                Ok(_) => {
                    if attempts > 1 {
                        tracing::debug!(uri = %self.uri, attempts, value = next, "latch incremented after contention");
                    }
                    return Ok(next);
                }
                Err(e) if e.is_conflict() => {
                    if !self.retry.allows(attempts) {
                        tracing::warn!(uri = %self.uri, attempts, "latch increment gave up");
                        return Err(Error::RetryExhausted {
                            resource: self.uri.to_string(),
                            attempts,
                        });
                    }
                    let delay = self.retry.backoff(attempts);
                    tracing::trace!(uri = %self.uri, attempts, delay_us = delay.as_micros() as u64, "latch conflict, retrying");
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl std::fmt::Debug for Latch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Latch")
            .field("uri", &self.uri)
            .field("retry", &self.retry)
            .finish()
    }
}
