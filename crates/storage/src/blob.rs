//! In-process content store
//!
//! Containers are DashMap entries; blobs inside a container live in an
//! FxHashMap. Blob bytes are shared behind `Arc` so reads copy out of a
//! stable buffer without holding the shard lock during the copy.

use cirrus_core::{ContentStore, Error, Result};
use dashmap::DashMap;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Content store held in process memory
#[derive(Default)]
pub struct MemoryBlobStore {
    containers: DashMap<String, FxHashMap<String, Arc<[u8]>>>,
}

impl MemoryBlobStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs in a container (0 if missing)
    pub fn blob_count(&self, container: &str) -> usize {
        self.containers
            .get(container)
            .map(|c| c.len())
            .unwrap_or(0)
    }

    /// Names of the blobs in a container, sorted
    pub fn blob_names(&self, container: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .containers
            .get(container)
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    /// Total bytes stored across all containers
    pub fn total_bytes(&self) -> usize {
        self.containers
            .iter()
            .map(|c| c.value().values().map(|b| b.len()).sum::<usize>())
            .sum()
    }
}

impl std::fmt::Debug for MemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBlobStore")
            .field("containers", &self.containers.len())
            .field("total_bytes", &self.total_bytes())
            .finish()
    }
}

impl ContentStore for MemoryBlobStore {
    fn create_container_if_not_exists(&self, container: &str) -> Result<bool> {
        let mut created = false;
        self.containers
            .entry(container.to_string())
            .or_insert_with(|| {
                created = true;
                FxHashMap::default()
            });
        Ok(created)
    }

    fn put(&self, container: &str, name: &str, bytes: Vec<u8>) -> Result<()> {
        let mut blobs = self
            .containers
            .get_mut(container)
            .ok_or_else(|| Error::NotFound(format!("container {}", container)))?;
        blobs.insert(name.to_string(), Arc::from(bytes));
        Ok(())
    }

    fn get(&self, container: &str, name: &str) -> Result<Vec<u8>> {
        let bytes = {
            let blobs = self
                .containers
                .get(container)
                .ok_or_else(|| Error::NotFound(format!("container {}", container)))?;
            blobs
                .get(name)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("blob {}/{}", container, name)))?
        };
        Ok(bytes.to_vec())
    }

    fn exists(&self, container: &str, name: &str) -> Result<bool> {
        Ok(self
            .containers
            .get(container)
            .map(|c| c.contains_key(name))
            .unwrap_or(false))
    }

    fn delete(&self, container: &str, name: &str) -> Result<bool> {
        Ok(self
            .containers
            .get_mut(container)
            .map(|mut c| c.remove(name).is_some())
            .unwrap_or(false))
    }
}
