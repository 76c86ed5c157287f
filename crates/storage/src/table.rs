//! In-process row store
//!
//! DashMap keyed by table name, FxHashMap of rows within each table.
//! A conditional replace holds the table's shard lock for the whole
//! compare-and-write, which gives the per-row atomicity a remote table
//! service provides.
//!
//! ETags come from one store-wide counter, so a stamp is never reused even
//! after a row is deleted and re-inserted.

use cirrus_core::{ETag, Error, Result, Row, RowStore, VersionedRow};
use dashmap::DashMap;
use rustc_hash::FxHashMap;
use std::collections::hash_map::Entry;
use std::sync::atomic::{AtomicU64, Ordering};

/// One table: rows by key
#[derive(Debug, Default)]
pub struct Table {
    pub(crate) rows: FxHashMap<String, VersionedRow>,
}

impl Table {
    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Row store held in process memory
pub struct MemoryTableStore {
    tables: DashMap<String, Table>,
    version: AtomicU64,
}

impl MemoryTableStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
            version: AtomicU64::new(0),
        }
    }

    #[inline]
    fn next_etag(&self) -> ETag {
        ETag::new(self.version.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Number of tables
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Number of rows in one table (0 if missing)
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.get(table).map(|t| t.len()).unwrap_or(0)
    }
}

impl Default for MemoryTableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryTableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTableStore")
            .field("table_count", &self.table_count())
            .field("version", &self.version.load(Ordering::Acquire))
            .finish()
    }
}

impl RowStore for MemoryTableStore {
    fn create_table_if_not_exists(&self, table: &str) -> Result<bool> {
        let mut created = false;
        self.tables.entry(table.to_string()).or_insert_with(|| {
            created = true;
            Table::default()
        });
        Ok(created)
    }

    fn insert(&self, table: &str, key: &str, row: Row) -> Result<ETag> {
        let mut t = self
            .tables
            .get_mut(table)
            .ok_or_else(|| Error::NotFound(format!("table {}", table)))?;
        match t.rows.entry(key.to_string()) {
            Entry::Occupied(_) => Err(Error::Conflict(format!(
                "row {}/{} already exists",
                table, key
            ))),
            Entry::Vacant(slot) => {
                let etag = self.next_etag();
                slot.insert(VersionedRow { row, etag });
                Ok(etag)
            }
        }
    }

    fn get(&self, table: &str, key: &str) -> Result<Option<VersionedRow>> {
        Ok(self
            .tables
            .get(table)
            .and_then(|t| t.rows.get(key).cloned()))
    }

    fn replace(&self, table: &str, key: &str, row: Row, if_match: ETag) -> Result<ETag> {
        let mut t = self
            .tables
            .get_mut(table)
            .ok_or_else(|| Error::NotFound(format!("table {}", table)))?;
        let current = t
            .rows
            .get_mut(key)
            .ok_or_else(|| Error::NotFound(format!("row {}/{}", table, key)))?;
        if current.etag != if_match {
            return Err(Error::Conflict(format!(
                "etag mismatch on {}/{}: expected {}, found {}",
                table, key, if_match, current.etag
            )));
        }
        let etag = self.next_etag();
        *current = VersionedRow { row, etag };
        Ok(etag)
    }

    fn delete(&self, table: &str, key: &str) -> Result<bool> {
        Ok(self
            .tables
            .get_mut(table)
            .map(|mut t| t.rows.remove(key).is_some())
            .unwrap_or(false))
    }
}
