//! Policy compiler: orchestrates providers, builders and the policy cache
//!
//! ```text
//! compile() ──► PolicyCache::lookup(key) ──hit──► adopt cached policy
//!                     │ miss
//!                     ▼
//!               RoleGraph::build ─► ResourceTree::build ─► RuleApplier::apply
//!                     │
//!                     ▼
//!               CompiledPolicy ─► PolicyCache::store(key) (best effort)
//! ```
//!
//! Compilation is not meant to run concurrently on one compiler. Two callers
//! racing on [`PolicyCompiler::compile`] each build and store an equivalent
//! policy, which is harmless because policies are immutable and the cache is
//! idempotent per key.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::cache::{CacheBackend, CacheStats, PolicyCache};
use crate::error::Result;
use crate::policy::CompiledPolicy;
use crate::provider::{ResourceProvider, RoleProvider, RuleProvider};
use crate::resources::ResourceTree;
use crate::roles::RoleGraph;
use crate::rules::RuleApplier;

/// Provider lists, in registration order
#[derive(Clone, Default)]
pub struct Providers {
    pub roles: Vec<Arc<dyn RoleProvider>>,
    pub resources: Vec<Arc<dyn ResourceProvider>>,
    pub rules: Vec<Arc<dyn RuleProvider>>,
}

impl std::fmt::Debug for Providers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = |list: Vec<&str>| list.join(", ");
        f.debug_struct("Providers")
            .field("roles", &names(self.roles.iter().map(|p| p.name()).collect()))
            .field("resources", &names(self.resources.iter().map(|p| p.name()).collect()))
            .field("rules", &names(self.rules.iter().map(|p| p.name()).collect()))
            .finish()
    }
}

/// Builds and memoizes the [`CompiledPolicy`]
#[derive(Debug)]
pub struct PolicyCompiler {
    cache_key: String,
    providers: Providers,
    cache: Option<PolicyCache>,
    compiled: RwLock<Option<Arc<CompiledPolicy>>>,
}

impl PolicyCompiler {
    /// Create a compiler
    ///
    /// # Arguments
    ///
    /// * `cache_key` - Key the compiled policy is stored under
    /// * `providers` - Role, resource and rule providers
    /// * `cache` - Optional cache backend; without one every compiler builds
    pub fn new(
        cache_key: impl Into<String>,
        providers: Providers,
        cache: Option<Arc<dyn CacheBackend>>,
    ) -> Self {
        Self {
            cache_key: cache_key.into(),
            providers,
            cache: cache.map(PolicyCache::new),
            compiled: RwLock::new(None),
        }
    }

    pub fn builder(cache_key: impl Into<String>) -> PolicyCompilerBuilder {
        PolicyCompilerBuilder {
            cache_key: cache_key.into(),
            providers: Providers::default(),
            cache: None,
        }
    }

    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    pub fn providers(&self) -> &Providers {
        &self.providers
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(PolicyCache::stats)
    }

    /// Load the policy from the cache or build it from the providers
    ///
    /// A cache hit is adopted as-is and no provider is consulted. On a miss the
    /// freshly built policy is written back; a failed write is logged only.
    pub fn compile(&self) -> Result<Arc<CompiledPolicy>> {
        if let Some(cache) = &self.cache {
            if let Some(policy) = cache.lookup(&self.cache_key) {
                debug!("Adopted cached policy '{}'", self.cache_key);
                *self.compiled.write() = Some(policy.clone());
                return Ok(policy);
            }
        }

        let policy = Arc::new(self.build()?);

        if let Some(cache) = &self.cache {
            cache.store(&self.cache_key, &policy);
        }

        *self.compiled.write() = Some(policy.clone());
        Ok(policy)
    }

    /// Last compiled policy, compiling on first access
    pub fn compiled_policy(&self) -> Result<Arc<CompiledPolicy>> {
        if let Some(policy) = self.compiled.read().as_ref() {
            return Ok(policy.clone());
        }
        self.compile()
    }

    /// Forget the memoized policy so the next access compiles again
    ///
    /// The cache entry is left alone; use [`invalidate_cache`](Self::invalidate_cache)
    /// to drop it as well.
    pub fn reset(&self) {
        *self.compiled.write() = None;
    }

    /// Drop the cache entry under this compiler's key
    pub fn invalidate_cache(&self) -> bool {
        let removed = self
            .cache
            .as_ref()
            .map(|cache| cache.invalidate(&self.cache_key))
            .unwrap_or(false);
        if removed {
            info!("Invalidated cached policy '{}'", self.cache_key);
        }
        removed
    }

    /// Build a policy from the providers, bypassing the cache
    pub fn build(&self) -> Result<CompiledPolicy> {
        let start = Instant::now();

        let roles = RoleGraph::build(&self.providers.roles)?;
        let resources = ResourceTree::build(&self.providers.resources)?;
        let rules = RuleApplier::apply(&roles, &resources, &self.providers.rules)?;

        info!(
            "Compiled policy '{}': {} roles, {} resources, {} rules in {:?}",
            self.cache_key,
            roles.len(),
            resources.len(),
            rules.len(),
            start.elapsed()
        );

        Ok(CompiledPolicy::new(roles, resources, rules))
    }
}

/// Builder for [`PolicyCompiler`]
pub struct PolicyCompilerBuilder {
    cache_key: String,
    providers: Providers,
    cache: Option<Arc<dyn CacheBackend>>,
}

impl PolicyCompilerBuilder {
    pub fn role_provider(mut self, provider: impl RoleProvider + 'static) -> Self {
        self.providers.roles.push(Arc::new(provider));
        self
    }

    pub fn resource_provider(mut self, provider: impl ResourceProvider + 'static) -> Self {
        self.providers.resources.push(Arc::new(provider));
        self
    }

    pub fn rule_provider(mut self, provider: impl RuleProvider + 'static) -> Self {
        self.providers.rules.push(Arc::new(provider));
        self
    }

    pub fn cache(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.cache = Some(backend);
        self
    }

    pub fn build(self) -> PolicyCompiler {
        PolicyCompiler::new(self.cache_key, self.providers, self.cache)
    }
}
