//! Memoized spreadsheet loads.
//!
//! Entries are keyed by source path and remember the freshness token they were
//! read under. Only the latest token per path is kept: a load under a new token
//! replaces the old entry instead of growing the map.

use crate::error::Result;
use crate::inventory::RawTable;
use crate::loader::{self, FreshnessToken};
use log::debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

struct CacheEntry {
    token: FreshnessToken,
    table: Arc<RawTable>,
}

/// Cache of raw tables keyed by `(path, freshness token)`.
#[derive(Default)]
pub struct SnapshotCache {
    entries: HashMap<PathBuf, CacheEntry>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the table for `path` under `token`, calling `read` on a miss.
    pub fn get_or_load_with<F>(
        &mut self,
        path: &Path,
        token: FreshnessToken,
        read: F,
    ) -> Result<Arc<RawTable>>
    where
        F: FnOnce(&Path) -> Result<RawTable>,
    {
        if let Some(entry) = self.entries.get(path) {
            if entry.token == token {
                debug!("cache hit for {}", path.display());
                return Ok(Arc::clone(&entry.table));
            }
            debug!("source changed, evicting cached {}", path.display());
        } else {
            debug!("cache miss for {}", path.display());
        }

        let table = Arc::new(read(path)?);
        self.entries.insert(
            path.to_path_buf(),
            CacheEntry {
                token,
                table: Arc::clone(&table),
            },
        );
        Ok(table)
    }

    /// `load(path, token)`: reads the sheet through the cache.
    pub fn load(
        &mut self,
        path: &Path,
        token: FreshnessToken,
        sheet_name: &str,
    ) -> Result<Arc<RawTable>> {
        self.get_or_load_with(path, token, |p| loader::load_table(p, sheet_name))
    }

    /// Stats the file for its current token, then loads through the cache.
    pub fn load_current(&mut self, path: &Path, sheet_name: &str) -> Result<Arc<RawTable>> {
        let token = loader::freshness_token(path)?;
        self.load(path, token, sheet_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
