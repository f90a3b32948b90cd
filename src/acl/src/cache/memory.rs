//! In-process cache backend

use dashmap::DashMap;
use std::sync::Arc;

use super::{CacheBackend, CacheError};
use crate::policy::CompiledPolicy;

/// Keeps compiled policies in memory, returning the stored `Arc` itself
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, Arc<CompiledPolicy>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl CacheBackend for MemoryCache {
    fn name(&self) -> &str {
        "memory"
    }

    fn get_item(&self, key: &str) -> Result<Option<Arc<CompiledPolicy>>, CacheError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn set_item(&self, key: &str, policy: &Arc<CompiledPolicy>) -> Result<(), CacheError> {
        self.entries.insert(key.to_string(), policy.clone());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ResourceTree;
    use crate::roles::RoleGraph;
    use crate::rules::RuleSet;

    #[test]
    fn test_returns_same_instance() {
        let cache = MemoryCache::new();
        let policy = Arc::new(CompiledPolicy::new(
            RoleGraph::default(),
            ResourceTree::default(),
            RuleSet::default(),
        ));

        assert!(cache.get_item("acl").unwrap().is_none());
        cache.set_item("acl", &policy).unwrap();

        let cached = cache.get_item("acl").unwrap().unwrap();
        assert!(Arc::ptr_eq(&cached, &policy));
        assert_eq!(cache.len(), 1);

        assert!(cache.remove_item("acl").unwrap());
        assert!(!cache.remove_item("acl").unwrap());
        assert!(cache.is_empty());
    }
}
