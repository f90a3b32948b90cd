//! Compiled policy cache
//!
//! Backends are plain key/value stores behind [`CacheBackend`]. [`PolicyCache`]
//! wraps a backend with the compiler's failure semantics: a failed read is a
//! miss and a failed write is logged and dropped. Entries never expire; callers
//! that change provider configuration must use a new key or invalidate the old
//! one.

pub mod filesystem;
pub mod memory;

pub use filesystem::FilesystemCache;
pub use memory::MemoryCache;

use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::policy::CompiledPolicy;

/// Cache backend errors
#[derive(Debug, Error)]
pub enum CacheError {
    /// Backend-specific failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// The policy could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Key/value store for compiled policies
pub trait CacheBackend: Send + Sync {
    /// Name used in diagnostics
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Fetch the policy stored under `key`
    fn get_item(&self, key: &str) -> Result<Option<Arc<CompiledPolicy>>, CacheError>;

    /// Store `policy` under `key`, replacing any previous entry
    fn set_item(&self, key: &str, policy: &Arc<CompiledPolicy>) -> Result<(), CacheError>;

    /// Drop the entry under `key`; returns whether one existed
    fn remove_item(&self, key: &str) -> Result<bool, CacheError>;
}

/// Backend that never stores anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCache;

impl CacheBackend for NullCache {
    fn name(&self) -> &str {
        "null"
    }

    fn get_item(&self, _key: &str) -> Result<Option<Arc<CompiledPolicy>>, CacheError> {
        Ok(None)
    }

    fn set_item(&self, _key: &str, _policy: &Arc<CompiledPolicy>) -> Result<(), CacheError> {
        Ok(())
    }

    fn remove_item(&self, _key: &str) -> Result<bool, CacheError> {
        Ok(false)
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub writes: usize,
    pub failures: usize,
}

impl CacheStats {
    /// Calculate cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Backend wrapper applying non-fatal failure handling
pub struct PolicyCache {
    backend: Arc<dyn CacheBackend>,
    stats: DashMap<&'static str, usize>,
}

impl PolicyCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            stats: DashMap::new(),
        }
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    /// Look up a policy; backend errors count as a miss
    pub fn lookup(&self, key: &str) -> Option<Arc<CompiledPolicy>> {
        match self.backend.get_item(key) {
            Ok(Some(policy)) => {
                debug!("Policy cache hit for '{}' ({})", key, self.backend.name());
                self.increment_stat("hits");
                Some(policy)
            }
            Ok(None) => {
                debug!("Policy cache miss for '{}' ({})", key, self.backend.name());
                self.increment_stat("misses");
                None
            }
            Err(e) => {
                warn!(
                    "Policy cache read for '{}' failed on {}, treating as miss: {}",
                    key,
                    self.backend.name(),
                    e
                );
                self.increment_stat("failures");
                self.increment_stat("misses");
                None
            }
        }
    }

    /// Store a policy; returns false (after logging) when the backend fails
    pub fn store(&self, key: &str, policy: &Arc<CompiledPolicy>) -> bool {
        match self.backend.set_item(key, policy) {
            Ok(()) => {
                debug!("Stored compiled policy under '{}' ({})", key, self.backend.name());
                self.increment_stat("writes");
                true
            }
            Err(e) => {
                warn!(
                    "Policy cache write for '{}' failed on {}: {}",
                    key,
                    self.backend.name(),
                    e
                );
                self.increment_stat("failures");
                false
            }
        }
    }

    /// Drop the entry under `key`
    pub fn invalidate(&self, key: &str) -> bool {
        match self.backend.remove_item(key) {
            Ok(removed) => removed,
            Err(e) => {
                warn!("Policy cache invalidation for '{}' failed: {}", key, e);
                self.increment_stat("failures");
                false
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.get_stat("hits"),
            misses: self.get_stat("misses"),
            writes: self.get_stat("writes"),
            failures: self.get_stat("failures"),
        }
    }

    fn increment_stat(&self, key: &'static str) {
        self.stats
            .entry(key)
            .and_modify(|count| *count += 1)
            .or_insert(1);
    }

    fn get_stat(&self, key: &'static str) -> usize {
        self.stats.get(key).map(|v| *v).unwrap_or(0)
    }
}

impl std::fmt::Debug for PolicyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyCache")
            .field("backend", &self.backend.name())
            .field("stats", &self.stats())
            .finish()
    }
}
