//! Error types for ACL compilation and queries

use thiserror::Error;

/// ACL compiler errors
#[derive(Debug, Error)]
pub enum AclError {
    /// A provider produced something that is not a collection of entries
    #[error("Invalid provider output from '{provider}': {reason}")]
    InvalidProviderOutput { provider: String, reason: String },

    /// A role declares a parent that no provider defines
    #[error("Role '{role}' inherits from unknown role '{parent}'")]
    UnknownRoleReference { role: String, parent: String },

    /// A resource declares a parent that no provider defines
    #[error("Resource '{resource}' has unknown parent '{parent}'")]
    UnknownResourceParent { resource: String, parent: String },

    /// A rule references a role, resource or privilege missing from the graphs
    #[error("Rule #{rule} references unknown {kind} '{id}'")]
    UnknownRuleReference {
        rule: usize,
        kind: &'static str,
        id: String,
    },

    /// A query names a role or resource absent from the compiled policy
    #[error("Unknown {kind} '{id}'")]
    UnknownIdentifier { kind: &'static str, id: String },

    /// The same role id was registered twice
    #[error("Duplicate role: {0}")]
    DuplicateRole(String),

    /// The same resource id was registered twice
    #[error("Duplicate resource: {0}")]
    DuplicateResource(String),

    /// Role inheritance loops back on itself
    #[error("Circular role inheritance: {0}")]
    CircularRoleInheritance(String),

    /// Resource parents loop back on themselves
    #[error("Circular resource hierarchy: {0}")]
    CircularResourceHierarchy(String),

    /// Invalid configuration document
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AclError {
    /// Shorthand for [`AclError::InvalidProviderOutput`]
    pub fn invalid_output(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidProviderOutput {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unknown_role(id: impl Into<String>) -> Self {
        Self::UnknownIdentifier {
            kind: "role",
            id: id.into(),
        }
    }

    pub(crate) fn unknown_resource(id: impl Into<String>) -> Self {
        Self::UnknownIdentifier {
            kind: "resource",
            id: id.into(),
        }
    }
}

/// Result type for ACL operations
pub type Result<T> = std::result::Result<T, AclError>;
