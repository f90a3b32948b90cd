//! # CretoAI ACL Compiler
//!
//! Compiles role, resource and rule definitions from pluggable providers into an
//! immutable, cacheable access control policy.
//!
//! ## Features
//!
//! - **Provider-driven** role graph, resource tree and rule list
//! - **Multiple inheritance** for roles, single-parent resource hierarchy
//! - **Last-match-wins** rule evaluation with deny by default
//! - **Dynamic assertions** as CEL expressions or native callbacks
//! - **Policy caching** in memory or on disk, shared across compilers
//!
//! ## Example
//!
//! ```rust
//! use cretoai_acl::{EvalContext, PolicyCompiler, ResourceEntry, RoleEntry, Rule};
//! use cretoai_acl::cache::MemoryCache;
//! use cretoai_acl::provider::StaticProvider;
//! use std::sync::Arc;
//!
//! fn main() -> cretoai_acl::Result<()> {
//!     let compiler = PolicyCompiler::builder("acl")
//!         .role_provider(StaticProvider::new("roles", vec![
//!             RoleEntry::new("guest"),
//!             RoleEntry::new("user").with_parent("guest"),
//!         ]))
//!         .resource_provider(StaticProvider::new("resources", vec![
//!             ResourceEntry::new("docs"),
//!         ]))
//!         .rule_provider(StaticProvider::new("rules", vec![
//!             Rule::allow("guest", "docs", "read"),
//!             Rule::deny("guest", "docs", "edit"),
//!         ]))
//!         .cache(Arc::new(MemoryCache::new()))
//!         .build();
//!
//!     let policy = compiler.compiled_policy()?;
//!     let ctx = EvalContext::new();
//!
//!     assert!(policy.is_allowed("user", "docs", "read", &ctx)?);
//!     assert!(!policy.is_allowed("user", "docs", "edit", &ctx)?);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod cel;
pub mod compiler;
pub mod config;
pub mod error;
pub mod identity;
pub mod policy;
pub mod provider;
pub mod resources;
pub mod roles;
pub mod rules;
pub mod types;

// Re-export commonly used types
pub use cache::{CacheBackend, CacheStats, PolicyCache};
pub use cel::EvalContext;
pub use compiler::{PolicyCompiler, PolicyCompilerBuilder, Providers};
pub use config::{AclConfig, CacheSettings};
pub use error::{AclError, Result};
pub use identity::{Authorizer, IdentityProvider, StaticIdentity};
pub use policy::{CompiledPolicy, Decision};
pub use provider::{ResourceProvider, RoleProvider, RuleProvider};
pub use rules::{AccessQuery, Assertion, Rule};
pub use types::{Effect, Privilege, ResourceEntry, ResourceId, RoleEntry, RoleId, Target};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
