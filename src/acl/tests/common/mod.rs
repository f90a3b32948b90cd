//! Shared fixtures for ACL integration tests
#![allow(dead_code)]

use cretoai_acl::cache::{CacheError, MemoryCache};
use cretoai_acl::provider::{Entries, StaticProvider};
use cretoai_acl::{
    CacheBackend, CompiledPolicy, ResourceEntry, ResourceProvider, RoleEntry, RoleProvider, Rule,
    RuleProvider,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness (`RUST_LOG=debug` to see it)
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Static provider that counts how often it is asked for entries
pub struct Counting<T> {
    inner: StaticProvider<T>,
    calls: Arc<AtomicUsize>,
}

impl<T> Counting<T> {
    pub fn new(name: &str, entries: Vec<T>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = Self {
            inner: StaticProvider::new(name, entries),
            calls: calls.clone(),
        };
        (provider, calls)
    }
}

impl RoleProvider for Counting<RoleEntry> {
    fn get_roles(&self) -> cretoai_acl::Result<Entries<'_, RoleEntry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_roles()
    }
}

impl ResourceProvider for Counting<ResourceEntry> {
    fn get_resources(&self) -> cretoai_acl::Result<Entries<'_, ResourceEntry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_resources()
    }
}

impl RuleProvider for Counting<Rule> {
    fn get_rules(&self) -> cretoai_acl::Result<Entries<'_, Rule>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_rules()
    }
}

/// Memory cache that records every write
#[derive(Default)]
pub struct RecordingCache {
    inner: MemoryCache,
    pub writes: Mutex<Vec<String>>,
}

impl RecordingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn written_keys(&self) -> Vec<String> {
        self.writes.lock().clone()
    }
}

impl CacheBackend for RecordingCache {
    fn get_item(&self, key: &str) -> Result<Option<Arc<CompiledPolicy>>, CacheError> {
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, policy: &Arc<CompiledPolicy>) -> Result<(), CacheError> {
        self.writes.lock().push(key.to_string());
        self.inner.set_item(key, policy)
    }

    fn remove_item(&self, key: &str) -> Result<bool, CacheError> {
        self.inner.remove_item(key)
    }
}

/// Backend whose reads and writes always fail
pub struct UnavailableCache;

impl CacheBackend for UnavailableCache {
    fn get_item(&self, _key: &str) -> Result<Option<Arc<CompiledPolicy>>, CacheError> {
        Err(CacheError::Backend("connection refused".to_string()))
    }

    fn set_item(&self, _key: &str, _policy: &Arc<CompiledPolicy>) -> Result<(), CacheError> {
        Err(CacheError::Backend("connection refused".to_string()))
    }

    fn remove_item(&self, _key: &str) -> Result<bool, CacheError> {
        Err(CacheError::Backend("connection refused".to_string()))
    }
}

/// guest <- user <- admin, plus an unrelated auditor role
pub fn site_roles() -> Vec<RoleEntry> {
    vec![
        RoleEntry::new("guest"),
        RoleEntry::new("user").with_parent("guest"),
        RoleEntry::new("admin").with_parent("user"),
        RoleEntry::new("auditor"),
    ]
}

/// docs <- docs.private, images
pub fn site_resources() -> Vec<ResourceEntry> {
    vec![
        ResourceEntry::new("docs"),
        ResourceEntry::new("docs.private").with_parent("docs"),
        ResourceEntry::new("images"),
    ]
}

pub fn site_rules() -> Vec<Rule> {
    vec![
        Rule::allow("guest", "docs", "read"),
        Rule::deny("guest", "docs.private", "read"),
        Rule::allow("user", "docs.private", "read"),
        Rule::allow("admin", cretoai_acl::Target::all(), cretoai_acl::Target::all()),
    ]
}
