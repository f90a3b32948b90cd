//! Core ACL types

use serde::{Deserialize, Serialize};

/// Unique role identifier
pub type RoleId = String;

/// Unique resource identifier
pub type ResourceId = String;

/// Privilege name (e.g., "read", "edit")
pub type Privilege = String;

/// Rule effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    /// Grant the privilege
    Allow,
    /// Refuse the privilege
    Deny,
}

impl Effect {
    pub fn is_allow(self) -> bool {
        matches!(self, Effect::Allow)
    }
}

impl std::fmt::Display for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effect::Allow => f.write_str("allow"),
            Effect::Deny => f.write_str("deny"),
        }
    }
}

/// Either every member of a set ("all roles", "all resources", "all privileges")
/// or an explicit list of identifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    All,
    Only(Vec<String>),
}

impl Target {
    /// Wildcard target
    pub fn all() -> Self {
        Target::All
    }

    /// Explicit target list
    pub fn only<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Target::Only(ids.into_iter().map(Into::into).collect())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Target::All)
    }

    /// Check whether `id` is covered by this target
    pub fn matches(&self, id: &str) -> bool {
        match self {
            Target::All => true,
            Target::Only(ids) => ids.iter().any(|candidate| candidate == id),
        }
    }

    /// Explicitly named identifiers (empty for the wildcard)
    pub fn ids(&self) -> &[String] {
        match self {
            Target::All => &[],
            Target::Only(ids) => ids,
        }
    }
}

impl From<&str> for Target {
    fn from(id: &str) -> Self {
        Target::Only(vec![id.to_string()])
    }
}

impl From<String> for Target {
    fn from(id: String) -> Self {
        Target::Only(vec![id])
    }
}

impl From<Vec<&str>> for Target {
    fn from(ids: Vec<&str>) -> Self {
        Target::only(ids)
    }
}

impl From<Vec<String>> for Target {
    fn from(ids: Vec<String>) -> Self {
        Target::Only(ids)
    }
}

/// Role definition as produced by a role provider
///
/// A bare identifier converts into an entry without parents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleEntry {
    /// Role identifier
    pub id: RoleId,

    /// Roles this role inherits from
    #[serde(default)]
    pub parents: Vec<RoleId>,
}

impl RoleEntry {
    pub fn new(id: impl Into<RoleId>) -> Self {
        Self {
            id: id.into(),
            parents: Vec::new(),
        }
    }

    /// Add a parent role
    pub fn with_parent(mut self, parent: impl Into<RoleId>) -> Self {
        self.parents.push(parent.into());
        self
    }
}

impl From<&str> for RoleEntry {
    fn from(id: &str) -> Self {
        RoleEntry::new(id)
    }
}

impl From<String> for RoleEntry {
    fn from(id: String) -> Self {
        RoleEntry::new(id)
    }
}

/// Resource definition as produced by a resource provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntry {
    /// Resource identifier
    pub id: ResourceId,

    /// Parent resource (resources form a tree)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ResourceId>,

    /// Privileges this resource declares
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub privileges: Vec<Privilege>,
}

impl ResourceEntry {
    pub fn new(id: impl Into<ResourceId>) -> Self {
        Self {
            id: id.into(),
            parent: None,
            privileges: Vec::new(),
        }
    }

    /// Set the parent resource
    pub fn with_parent(mut self, parent: impl Into<ResourceId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Declare a privilege on this resource
    pub fn with_privilege(mut self, privilege: impl Into<Privilege>) -> Self {
        self.privileges.push(privilege.into());
        self
    }
}

impl From<&str> for ResourceEntry {
    fn from(id: &str) -> Self {
        ResourceEntry::new(id)
    }
}

impl From<String> for ResourceEntry {
    fn from(id: String) -> Self {
        ResourceEntry::new(id)
    }
}
