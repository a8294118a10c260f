//! Build-once, read-many cache of resolved configurations.
//!
//! Every SQL file in a directory sees the same configuration, so entries are
//! keyed by the target's directory. Entries are never mutated after insertion;
//! when two threads race on a miss both resolve, and the first stored value is
//! returned to both.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;

use crate::builder::Sqlfig;
use crate::error::SqlfigError;
use crate::file::target_dir;
use crate::resolve::ResolvedConfig;

pub struct ConfigCache {
    loader: Sqlfig,
    entries: DashMap<PathBuf, Arc<ResolvedConfig>>,
}

impl ConfigCache {
    pub fn new(loader: Sqlfig) -> Self {
        Self {
            loader,
            entries: DashMap::new(),
        }
    }

    pub fn loader(&self) -> &Sqlfig {
        &self.loader
    }

    /// The configuration for `target`, resolving it on first use of its
    /// directory. Errors are not cached.
    pub fn get_for(&self, target: &Path) -> Result<Arc<ResolvedConfig>, SqlfigError> {
        let dir = target_dir(target);
        if let Some(hit) = self.entries.get(&dir) {
            tracing::debug!(dir = %dir.display(), "config cache hit");
            return Ok(Arc::clone(hit.value()));
        }

        let resolved = Arc::new(self.loader.load_for(&dir)?);
        let stored = self.entries.entry(dir).or_insert(resolved);
        Ok(Arc::clone(stored.value()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry, e.g. after config files changed on disk.
    pub fn clear(&self) {
        self.entries.clear();
    }
}
