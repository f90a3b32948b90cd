//! Role, resource and rule providers
//!
//! A provider is a read-only source of ACL entries. Each call produces a fresh,
//! finite iterator; the compiler drains it exactly once per compilation.
//!
//! # Example
//!
//! ```rust
//! use cretoai_acl::provider::{FnProvider, StaticProvider};
//! use cretoai_acl::{ResourceEntry, RoleEntry};
//! use std::collections::BTreeSet;
//!
//! let roles = StaticProvider::new("roles", vec![
//!     RoleEntry::new("guest"),
//!     RoleEntry::new("user").with_parent("guest"),
//! ]);
//!
//! // Any iterable collection of ids is accepted
//! let resources = FnProvider::new("resources", || {
//!     BTreeSet::from(["docs", "images"])
//! });
//! # let _ = (roles, resources);
//! ```

pub mod config;

pub use config::{ConfigResourceProvider, ConfigRoleProvider, ConfigRuleProvider};

use crate::error::Result;
use crate::rules::Rule;
use crate::types::{ResourceEntry, RoleEntry};

/// Lazily produced sequence of provider entries
pub type Entries<'a, T> = Box<dyn Iterator<Item = T> + 'a>;

/// Source of role definitions
pub trait RoleProvider: Send + Sync {
    /// Name used in diagnostics
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn get_roles(&self) -> Result<Entries<'_, RoleEntry>>;
}

/// Source of resource definitions
pub trait ResourceProvider: Send + Sync {
    /// Name used in diagnostics
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn get_resources(&self) -> Result<Entries<'_, ResourceEntry>>;
}

/// Source of allow/deny rules
pub trait RuleProvider: Send + Sync {
    /// Name used in diagnostics
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn get_rules(&self) -> Result<Entries<'_, Rule>>;
}

/// Provider backed by a fixed list of entries
#[derive(Debug, Clone)]
pub struct StaticProvider<T> {
    name: String,
    entries: Vec<T>,
}

impl<T> StaticProvider<T> {
    pub fn new(name: impl Into<String>, entries: Vec<T>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }
}

impl RoleProvider for StaticProvider<RoleEntry> {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_roles(&self) -> Result<Entries<'_, RoleEntry>> {
        Ok(Box::new(self.entries.iter().cloned()))
    }
}

impl ResourceProvider for StaticProvider<ResourceEntry> {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_resources(&self) -> Result<Entries<'_, ResourceEntry>> {
        Ok(Box::new(self.entries.iter().cloned()))
    }
}

impl RuleProvider for StaticProvider<Rule> {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_rules(&self) -> Result<Entries<'_, Rule>> {
        Ok(Box::new(self.entries.iter().cloned()))
    }
}

/// Provider calling a closure that returns any iterable collection
///
/// Items only need to convert into the entry type, so a `HashSet<&str>` of
/// resource ids works as well as a `Vec<ResourceEntry>`.
pub struct FnProvider<F> {
    name: String,
    source: F,
}

impl<F> FnProvider<F> {
    pub fn new(name: impl Into<String>, source: F) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }
}

impl<F, I> RoleProvider for FnProvider<F>
where
    F: Fn() -> I + Send + Sync,
    I: IntoIterator,
    I::Item: Into<RoleEntry> + 'static,
    I::IntoIter: 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn get_roles(&self) -> Result<Entries<'_, RoleEntry>> {
        Ok(Box::new((self.source)().into_iter().map(Into::into)))
    }
}

impl<F, I> ResourceProvider for FnProvider<F>
where
    F: Fn() -> I + Send + Sync,
    I: IntoIterator,
    I::Item: Into<ResourceEntry> + 'static,
    I::IntoIter: 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn get_resources(&self) -> Result<Entries<'_, ResourceEntry>> {
        Ok(Box::new((self.source)().into_iter().map(Into::into)))
    }
}

impl<F, I> RuleProvider for FnProvider<F>
where
    F: Fn() -> I + Send + Sync,
    I: IntoIterator<Item = Rule>,
    I::IntoIter: 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn get_rules(&self) -> Result<Entries<'_, Rule>> {
        Ok(Box::new((self.source)().into_iter()))
    }
}
